use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, SqlContext, StoreError};
use crate::models::Action;

use super::bindings::create_binding;
use super::catalog::{
    create_category, fetch_category, find_category_by_name, find_game_key_by_name,
    find_modifier_by_name, required,
};
use super::games::fetch_default_game;

/// Every action grouped by category, then in creation order.
pub fn fetch_actions(conn: &Connection) -> Result<Vec<Action>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, description, category_id
             FROM actions
             ORDER BY category_id, id",
        )
        .sql_context("failed to prepare action query")?;

    let actions = stmt
        .query_map([], read_action)
        .sql_context("failed to load actions")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect actions")?;

    Ok(actions)
}

pub fn fetch_action(conn: &Connection, id: i64) -> Result<Action> {
    conn.query_row(
        "SELECT id, name, description, category_id FROM actions WHERE id = ?1",
        [id],
        read_action,
    )
    .optional()
    .sql_context("failed to load action")?
    .ok_or_else(|| StoreError::not_found(format!("Action {id} not found.")))
}

/// Insert a bare action without any binding. `add_new_action` is the form
/// flow; this is the building block underneath it.
pub fn create_action(
    conn: &Connection,
    name: &str,
    description: &str,
    category_id: i64,
) -> Result<Action> {
    let name = required(name, "Please enter an action name.")?;
    fetch_category(conn, category_id)?;

    conn.execute(
        "INSERT INTO actions (name, description, category_id) VALUES (?1, ?2, ?3)",
        params![name, description.trim(), category_id],
    )
    .sql_context("failed to insert action")?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, name, category_id, "created action");
    Ok(Action {
        id,
        name: name.to_string(),
        description: description.trim().to_string(),
        category_id,
    })
}

/// Rename, redescribe or move an action to another category. Its bindings
/// follow automatically since category membership is derived.
pub fn update_action(
    conn: &Connection,
    id: i64,
    name: &str,
    description: &str,
    category_id: i64,
) -> Result<Action> {
    let name = required(name, "Please enter an action name.")?;
    fetch_category(conn, category_id)?;

    let updated = conn
        .execute(
            "UPDATE actions SET name = ?1, description = ?2, category_id = ?3 WHERE id = ?4",
            params![name, description.trim(), category_id, id],
        )
        .sql_context("failed to update action")?;

    if updated == 0 {
        return Err(StoreError::not_found(format!("Action {id} not found.")));
    }
    tracing::info!(id, name, category_id, "updated action");
    fetch_action(conn, id)
}

/// Create an action from the admin form. The category is looked up by name and
/// created when it is new; the default key and modifier must already exist.
/// The action always gets a binding on the default game so other games have
/// something to copy.
pub fn add_new_action(
    conn: &Connection,
    name: &str,
    category_name: &str,
    default_key_name: &str,
    default_modifier_name: &str,
) -> Result<Action> {
    let name = required(name, "Please enter an action name.")?;
    let category_name = required(
        category_name,
        "Please select an existing category or create a new one.",
    )?;

    let key = find_game_key_by_name(conn, default_key_name)?.ok_or_else(|| {
        StoreError::not_found(format!("Key '{}' not found.", default_key_name.trim()))
    })?;
    let modifier = find_modifier_by_name(conn, default_modifier_name)?.ok_or_else(|| {
        StoreError::not_found(format!(
            "Modifier '{}' not found.",
            default_modifier_name.trim()
        ))
    })?;
    let default_game = fetch_default_game(conn)?;

    let tx = conn
        .unchecked_transaction()
        .sql_context("failed to start transaction")?;

    let category = match find_category_by_name(&tx, category_name)? {
        Some(category) => category,
        None => create_category(&tx, category_name, "")?,
    };
    let action = create_action(&tx, name, "", category.id)?;
    create_binding(
        &tx,
        default_game.id,
        action.id,
        Some(key.id),
        modifier.id,
        "",
    )?;

    tx.commit().sql_context("failed to commit new action")?;
    Ok(action)
}

fn read_action(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
    })
}
