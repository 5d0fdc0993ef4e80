//! Binding CRUD plus the per-category ordering rules.
//!
//! Display order inside a category is `sort_order, id`. New bindings land after
//! the last one in their category and `reorder_bindings` renumbers a whole
//! category in steps of [`SORT_ORDER_STEP`], which leaves room between
//! neighbours for later point insertions.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_constraint, Result, SqlContext, StoreError};
use crate::models::{Binding, BindingLocation, BindingView, CategorySection};

use super::actions::fetch_action;
use super::catalog::{fetch_categories, require_game_key, require_modifier};
use super::games::fetch_game;

/// Gap between consecutive `sort_order` values after a reorder.
pub const SORT_ORDER_STEP: i64 = 100;

const BINDING_COLUMNS: &str =
    "id, game_id, action_id, key_id, modifier_id, description, sort_order";

const BINDING_VIEW_SELECT: &str = "SELECT b.id, b.game_id, b.action_id, a.name, a.category_id,
            b.key_id, k.name, b.modifier_id, m.name, b.description, b.sort_order
     FROM bindings b
     INNER JOIN actions a ON a.id = b.action_id
     INNER JOIN game_keys k ON k.id = b.key_id
     INNER JOIN modifiers m ON m.id = b.modifier_id";

pub fn fetch_binding(conn: &Connection, id: i64) -> Result<Binding> {
    conn.query_row(
        &format!("SELECT {BINDING_COLUMNS} FROM bindings WHERE id = ?1"),
        [id],
        read_binding,
    )
    .optional()
    .sql_context("failed to load binding")?
    .ok_or_else(|| StoreError::not_found(format!("Binding {id} not found.")))
}

/// Same as [`fetch_binding`] but joined with action, key and modifier names.
pub fn fetch_binding_view(conn: &Connection, id: i64) -> Result<BindingView> {
    conn.query_row(
        &format!("{BINDING_VIEW_SELECT} WHERE b.id = ?1"),
        [id],
        read_binding_view,
    )
    .optional()
    .sql_context("failed to load binding")?
    .ok_or_else(|| StoreError::not_found(format!("Binding {id} not found.")))
}

/// Every binding of a game in display order, regardless of category.
pub fn fetch_bindings_for_game(conn: &Connection, game_id: i64) -> Result<Vec<Binding>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BINDING_COLUMNS} FROM bindings WHERE game_id = ?1 ORDER BY sort_order, id"
        ))
        .sql_context("failed to prepare game bindings query")?;

    let bindings = stmt
        .query_map([game_id], read_binding)
        .sql_context("failed to load game bindings")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect game bindings")?;

    Ok(bindings)
}

/// The rows of one category table for one game.
pub fn fetch_category_bindings(
    conn: &Connection,
    game_id: i64,
    category_id: i64,
) -> Result<Vec<BindingView>> {
    let mut stmt = conn
        .prepare(&format!(
            "{BINDING_VIEW_SELECT}
             WHERE b.game_id = ?1 AND a.category_id = ?2
             ORDER BY b.sort_order, b.id"
        ))
        .sql_context("failed to prepare category bindings query")?;

    let bindings = stmt
        .query_map(params![game_id, category_id], read_binding_view)
        .sql_context("failed to load category bindings")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect category bindings")?;

    Ok(bindings)
}

/// A game's full layout: every category that has at least one action, each
/// with the game's bindings in display order. Categories without bindings for
/// this game still appear (with an empty table) so the UI can offer to fill
/// them.
pub fn fetch_game_layout(conn: &Connection, game_id: i64) -> Result<Vec<CategorySection>> {
    fetch_game(conn, game_id)?;

    let mut stmt = conn
        .prepare("SELECT DISTINCT category_id FROM actions")
        .sql_context("failed to prepare category usage query")?;
    let used = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .sql_context("failed to load category usage")?
        .collect::<rusqlite::Result<HashSet<_>>>()
        .sql_context("failed to collect category usage")?;

    let mut sections = Vec::new();
    for category in fetch_categories(conn)? {
        if !used.contains(&category.id) {
            continue;
        }
        let bindings = fetch_category_bindings(conn, game_id, category.id)?;
        sections.push(CategorySection { category, bindings });
    }
    Ok(sections)
}

/// Insert a binding for `action_id` in `game_id`. The key must be a real
/// selection; every referenced row must exist. The new row is placed after the
/// existing bindings of the action's category.
pub fn create_binding(
    conn: &Connection,
    game_id: i64,
    action_id: i64,
    key_id: Option<i64>,
    modifier_id: i64,
    description: &str,
) -> Result<Binding> {
    let key_id = validate_key(key_id)?;
    fetch_game(conn, game_id)?;
    let action = fetch_action(conn, action_id)?;
    require_game_key(conn, key_id)?;
    require_modifier(conn, modifier_id)?;

    let sort_order = next_sort_order(conn, game_id, action.category_id)?;
    conn.execute(
        "INSERT INTO bindings (game_id, action_id, key_id, modifier_id, description, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![game_id, action_id, key_id, modifier_id, description, sort_order],
    )
    .map_err(|err| {
        map_constraint(
            err,
            "failed to insert binding",
            format!("Action '{}' already has a binding in this game.", action.name),
        )
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, game_id, action_id, key_id, modifier_id, sort_order, "created binding");
    Ok(Binding {
        id,
        game_id,
        action_id,
        key_id,
        modifier_id,
        description: description.to_string(),
        sort_order,
    })
}

/// Change key, modifier and description. `sort_order` is left alone; only
/// `reorder_bindings` moves rows.
pub fn update_binding(
    conn: &Connection,
    id: i64,
    key_id: Option<i64>,
    modifier_id: i64,
    description: &str,
) -> Result<Binding> {
    let key_id = validate_key(key_id)?;
    let current = fetch_binding(conn, id)?;
    require_game_key(conn, key_id)?;
    require_modifier(conn, modifier_id)?;

    conn.execute(
        "UPDATE bindings SET key_id = ?1, modifier_id = ?2, description = ?3 WHERE id = ?4",
        params![key_id, modifier_id, description, id],
    )
    .sql_context("failed to update binding")?;

    tracing::info!(id, game_id = current.game_id, key_id, modifier_id, "updated binding");
    Ok(Binding {
        key_id,
        modifier_id,
        description: description.to_string(),
        ..current
    })
}

/// Remove one binding and report which category table needs refreshing.
pub fn delete_binding(conn: &Connection, id: i64) -> Result<BindingLocation> {
    let binding = fetch_binding(conn, id)?;
    let action = fetch_action(conn, binding.action_id)?;

    let deleted = conn
        .execute("DELETE FROM bindings WHERE id = ?1", [id])
        .sql_context("failed to delete binding")?;
    if deleted == 0 {
        return Err(StoreError::not_found(format!("Binding {id} not found.")));
    }

    tracing::info!(id, game_id = binding.game_id, "deleted binding");
    Ok(BindingLocation {
        game_id: binding.game_id,
        category_id: action.category_id,
    })
}

/// Renumber one category of one game in the order given, `index * 100`.
/// Runs in one transaction and checks every id before anything is written;
/// ids from another game or category, and repeated ids, are rejected.
/// Bindings not listed keep their current `sort_order`.
pub fn reorder_bindings(
    conn: &Connection,
    game_id: i64,
    category_id: i64,
    ordered_ids: &[i64],
) -> Result<Vec<BindingView>> {
    let tx = conn
        .unchecked_transaction()
        .sql_context("failed to start transaction")?;

    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for &id in ordered_ids {
        if !seen.insert(id) {
            return Err(StoreError::validation(format!(
                "Binding {id} appears more than once in the new order."
            )));
        }
        let view = fetch_binding_view(&tx, id)?;
        if view.game_id != game_id || view.category_id != category_id {
            return Err(StoreError::validation(format!(
                "Binding {id} does not belong to this category table."
            )));
        }
    }

    for (index, id) in ordered_ids.iter().enumerate() {
        tx.execute(
            "UPDATE bindings SET sort_order = ?1 WHERE id = ?2",
            params![index as i64 * SORT_ORDER_STEP, id],
        )
        .sql_context("failed to update binding order")?;
    }
    tx.commit().sql_context("failed to commit binding order")?;

    tracing::info!(game_id, category_id, count = ordered_ids.len(), "reordered bindings");
    fetch_category_bindings(conn, game_id, category_id)
}

/// One step past the highest `sort_order` in the category, or 0 for the first
/// binding.
pub(crate) fn next_sort_order(conn: &Connection, game_id: i64, category_id: i64) -> Result<i64> {
    let max: Option<i64> = conn
        .query_row(
            "SELECT MAX(b.sort_order)
             FROM bindings b
             INNER JOIN actions a ON a.id = b.action_id
             WHERE b.game_id = ?1 AND a.category_id = ?2",
            params![game_id, category_id],
            |row| row.get(0),
        )
        .sql_context("failed to compute next sort order")?;
    Ok(max.map_or(0, |max| max + SORT_ORDER_STEP))
}

fn validate_key(key_id: Option<i64>) -> Result<i64> {
    match key_id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(StoreError::validation(
            "Please choose a key to bind to this action.",
        )),
    }
}

fn read_binding(row: &Row<'_>) -> rusqlite::Result<Binding> {
    Ok(Binding {
        id: row.get(0)?,
        game_id: row.get(1)?,
        action_id: row.get(2)?,
        key_id: row.get(3)?,
        modifier_id: row.get(4)?,
        description: row.get(5)?,
        sort_order: row.get(6)?,
    })
}

pub(crate) fn read_binding_view(row: &Row<'_>) -> rusqlite::Result<BindingView> {
    Ok(BindingView {
        id: row.get(0)?,
        game_id: row.get(1)?,
        action_id: row.get(2)?,
        action_name: row.get(3)?,
        category_id: row.get(4)?,
        key_id: row.get(5)?,
        key_name: row.get(6)?,
        modifier_id: row.get(7)?,
        modifier_name: row.get(8)?,
        description: row.get(9)?,
        sort_order: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::Fixture;
    use crate::error::ErrorKind;

    #[test]
    fn create_then_lookup_returns_same_fields() {
        let fx = Fixture::new();
        let created = create_binding(
            &fx.conn,
            fx.game_id,
            fx.jump,
            Some(fx.key_space),
            fx.hold,
            "vault over ledges",
        )
        .unwrap();

        let loaded = fetch_binding(&fx.conn, created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.game_id, fx.game_id);
        assert_eq!(loaded.action_id, fx.jump);
        assert_eq!(loaded.key_id, fx.key_space);
        assert_eq!(loaded.modifier_id, fx.hold);
        assert_eq!(loaded.description, "vault over ledges");
        assert_eq!(loaded.sort_order, 0);
    }

    #[test]
    fn create_without_key_writes_nothing() {
        let fx = Fixture::new();
        let before = fx.binding_count();

        for key in [None, Some(0)] {
            let err = create_binding(&fx.conn, fx.game_id, fx.jump, key, fx.tap, "").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(fx.binding_count(), before);
    }

    #[test]
    fn create_rejects_dangling_references() {
        let fx = Fixture::new();
        let before = fx.binding_count();

        let cases = [
            (999, fx.jump, fx.key_space, fx.tap),
            (fx.game_id, 999, fx.key_space, fx.tap),
            (fx.game_id, fx.jump, 999, fx.tap),
            (fx.game_id, fx.jump, fx.key_space, 999),
        ];
        for (game, action, key, modifier) in cases {
            let err = create_binding(&fx.conn, game, action, Some(key), modifier, "").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
        assert_eq!(fx.binding_count(), before);
    }

    #[test]
    fn second_binding_for_same_action_is_integrity_error() {
        let fx = Fixture::new();
        create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        let err = create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_w), fx.tap, "")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn new_bindings_go_after_their_category() {
        let fx = Fixture::new();
        let first =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();
        let second =
            create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        let other =
            create_binding(&fx.conn, fx.game_id, fx.fire, Some(fx.key_mouse1), fx.tap, "").unwrap();

        assert_eq!(first.sort_order, 0);
        assert_eq!(second.sort_order, SORT_ORDER_STEP);
        assert_eq!(other.sort_order, 0);
    }

    #[test]
    fn update_keeps_game_and_sort_order() {
        let fx = Fixture::new();
        let created =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();
        let jump =
            create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        reorder_bindings(&fx.conn, fx.game_id, fx.movement, &[jump.id, created.id]).unwrap();

        let updated =
            update_binding(&fx.conn, created.id, Some(fx.key_s), fx.hold, "sprint").unwrap();
        assert_eq!(updated.game_id, fx.game_id);
        assert_eq!(updated.sort_order, SORT_ORDER_STEP);
        assert_eq!(fetch_binding(&fx.conn, created.id).unwrap(), updated);
    }

    #[test]
    fn update_validates_key_and_existence() {
        let fx = Fixture::new();
        let created =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();

        let err = update_binding(&fx.conn, created.id, None, fx.tap, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = update_binding(&fx.conn, 999, Some(fx.key_w), fx.tap, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fetch_binding(&fx.conn, created.id).unwrap(), created);
    }

    #[test]
    fn delete_reports_location_and_removes_one_row() {
        let fx = Fixture::new();
        let created =
            create_binding(&fx.conn, fx.game_id, fx.fire, Some(fx.key_mouse1), fx.tap, "").unwrap();
        let before = fx.binding_count();

        let location = delete_binding(&fx.conn, created.id).unwrap();
        assert_eq!(
            location,
            BindingLocation {
                game_id: fx.game_id,
                category_id: fx.combat,
            }
        );
        assert_eq!(fx.binding_count(), before - 1);
        assert_eq!(
            fetch_binding(&fx.conn, created.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            delete_binding(&fx.conn, created.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn reorder_assigns_steps_in_given_order() {
        let fx = Fixture::new();
        let forward =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();
        let backward =
            create_binding(&fx.conn, fx.game_id, fx.backward, Some(fx.key_s), fx.tap, "").unwrap();
        let jump =
            create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        let fire =
            create_binding(&fx.conn, fx.game_id, fx.fire, Some(fx.key_mouse1), fx.tap, "").unwrap();
        fx.conn
            .execute("UPDATE bindings SET sort_order = 7 WHERE id = ?1", [fire.id])
            .unwrap();

        let rows = reorder_bindings(
            &fx.conn,
            fx.game_id,
            fx.movement,
            &[jump.id, forward.id, backward.id],
        )
        .unwrap();

        let order: Vec<(i64, i64)> = rows.iter().map(|row| (row.id, row.sort_order)).collect();
        assert_eq!(
            order,
            vec![(jump.id, 0), (forward.id, 100), (backward.id, 200)]
        );
        assert_eq!(fetch_binding(&fx.conn, fire.id).unwrap().sort_order, 7);
    }

    #[test]
    fn reorder_rejects_foreign_and_repeated_ids() {
        let fx = Fixture::new();
        let forward =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();
        let jump =
            create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        let fire =
            create_binding(&fx.conn, fx.game_id, fx.fire, Some(fx.key_mouse1), fx.tap, "").unwrap();

        let err = reorder_bindings(&fx.conn, fx.game_id, fx.movement, &[jump.id, fire.id])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = reorder_bindings(&fx.conn, fx.game_id, fx.movement, &[jump.id, jump.id])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err =
            reorder_bindings(&fx.conn, fx.game_id, fx.movement, &[jump.id, 999]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // Nothing was written by the failed attempts.
        assert_eq!(fetch_binding(&fx.conn, forward.id).unwrap().sort_order, 0);
        assert_eq!(fetch_binding(&fx.conn, jump.id).unwrap().sort_order, 100);
    }

    #[test]
    fn reorder_failing_on_last_id_keeps_earlier_order() {
        let fx = Fixture::new();
        let forward =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();
        let backward =
            create_binding(&fx.conn, fx.game_id, fx.backward, Some(fx.key_s), fx.tap, "").unwrap();
        let jump =
            create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();

        let err = reorder_bindings(
            &fx.conn,
            fx.game_id,
            fx.movement,
            &[jump.id, backward.id, forward.id, 4242],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let orders: Vec<(i64, i64)> = fetch_category_bindings(&fx.conn, fx.game_id, fx.movement)
            .unwrap()
            .iter()
            .map(|binding| (binding.id, binding.sort_order))
            .collect();
        assert_eq!(
            orders,
            vec![(forward.id, 0), (backward.id, 100), (jump.id, 200)]
        );
    }

    #[test]
    fn ties_fall_back_to_id_order() {
        let fx = Fixture::new();
        let forward =
            create_binding(&fx.conn, fx.game_id, fx.forward, Some(fx.key_w), fx.tap, "").unwrap();
        let jump =
            create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        fx.conn
            .execute("UPDATE bindings SET sort_order = 50 WHERE game_id = ?1", [fx.game_id])
            .unwrap();

        let ids: Vec<i64> = fetch_category_bindings(&fx.conn, fx.game_id, fx.movement)
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec![forward.id, jump.id]);
    }

    #[test]
    fn layout_lists_used_categories_with_names() {
        let fx = Fixture::new();
        let sections = fetch_game_layout(&fx.conn, fx.default_id).unwrap();
        let names: Vec<&str> = sections
            .iter()
            .map(|section| section.category.name.as_str())
            .collect();
        assert_eq!(names, vec!["movement", "combat"]);

        let movement = &sections[0].bindings;
        assert_eq!(movement.len(), 3);
        assert_eq!(movement[0].action_name, "forward");
        assert_eq!(movement[0].key_label(), "W");

        let empty = fetch_game_layout(&fx.conn, fx.game_id).unwrap();
        assert!(empty.iter().all(|section| section.bindings.is_empty()));
        assert_eq!(
            fetch_game_layout(&fx.conn, 999).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
