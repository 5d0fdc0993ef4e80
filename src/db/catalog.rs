//! Shared lookup tables: categories, physical keys and modifiers. They are
//! created from admin forms and never deleted.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{map_constraint, Result, SqlContext, StoreError};
use crate::models::{Category, GameKey, Modifier};

/// Every category ordered by id, which is also the order the layout view
/// lists them in.
pub fn fetch_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn
        .prepare("SELECT id, name, description FROM categories ORDER BY id")
        .sql_context("failed to prepare category query")?;

    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })
        .sql_context("failed to load categories")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect categories")?;

    Ok(categories)
}

pub fn fetch_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, description FROM categories WHERE id = ?1",
        [id],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        },
    )
    .optional()
    .sql_context("failed to load category")?
    .ok_or_else(|| StoreError::not_found(format!("Category {id} not found.")))
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name, description FROM categories WHERE name = ?1",
        [name.trim()],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        },
    )
    .optional()
    .sql_context("failed to look up category")
}

/// Insert a category. Names are unique; a duplicate surfaces as an integrity
/// error rather than a raw SQLite message.
pub fn create_category(conn: &Connection, name: &str, description: &str) -> Result<Category> {
    let name = required(name, "Category name is required.")?;
    conn.execute(
        "INSERT INTO categories (name, description) VALUES (?1, ?2)",
        params![name, description.trim()],
    )
    .map_err(|err| {
        map_constraint(
            err,
            "failed to insert category",
            format!("Category '{name}' already exists."),
        )
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, name, "created category");
    Ok(Category {
        id,
        name: name.to_string(),
        description: description.trim().to_string(),
    })
}

/// Keys sorted by id so the seeded keyboard order is kept in pickers.
pub fn fetch_game_keys(conn: &Connection) -> Result<Vec<GameKey>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM game_keys ORDER BY id")
        .sql_context("failed to prepare key query")?;

    let keys = stmt
        .query_map([], |row| {
            Ok(GameKey {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .sql_context("failed to load keys")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect keys")?;

    Ok(keys)
}

pub fn find_game_key_by_name(conn: &Connection, name: &str) -> Result<Option<GameKey>> {
    conn.query_row(
        "SELECT id, name FROM game_keys WHERE name = ?1",
        [name.trim()],
        |row| {
            Ok(GameKey {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .sql_context("failed to look up key")
}

pub fn create_game_key(conn: &Connection, name: &str) -> Result<GameKey> {
    let name = required(name, "Key name is required.")?;
    conn.execute("INSERT INTO game_keys (name) VALUES (?1)", [name])
        .map_err(|err| {
            map_constraint(
                err,
                "failed to insert key",
                format!("Key '{name}' already exists."),
            )
        })?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, name, "created key");
    Ok(GameKey {
        id,
        name: name.to_string(),
    })
}

pub fn fetch_modifiers(conn: &Connection) -> Result<Vec<Modifier>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM modifiers ORDER BY id")
        .sql_context("failed to prepare modifier query")?;

    let modifiers = stmt
        .query_map([], |row| {
            Ok(Modifier {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .sql_context("failed to load modifiers")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect modifiers")?;

    Ok(modifiers)
}

pub fn find_modifier_by_name(conn: &Connection, name: &str) -> Result<Option<Modifier>> {
    conn.query_row(
        "SELECT id, name FROM modifiers WHERE name = ?1",
        [name.trim()],
        |row| {
            Ok(Modifier {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .sql_context("failed to look up modifier")
}

pub fn create_modifier(conn: &Connection, name: &str) -> Result<Modifier> {
    let name = required(name, "Modifier name is required.")?;
    conn.execute("INSERT INTO modifiers (name) VALUES (?1)", [name])
        .map_err(|err| {
            map_constraint(
                err,
                "failed to insert modifier",
                format!("Modifier '{name}' already exists."),
            )
        })?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, name, "created modifier");
    Ok(Modifier {
        id,
        name: name.to_string(),
    })
}

/// Fail with `NotFound` unless a key with this id exists.
pub(crate) fn require_game_key(conn: &Connection, id: i64) -> Result<()> {
    require_row(conn, "SELECT 1 FROM game_keys WHERE id = ?1", id)?
        .ok_or_else(|| StoreError::not_found(format!("Key {id} not found.")))
}

pub(crate) fn require_modifier(conn: &Connection, id: i64) -> Result<()> {
    require_row(conn, "SELECT 1 FROM modifiers WHERE id = ?1", id)?
        .ok_or_else(|| StoreError::not_found(format!("Modifier {id} not found.")))
}

fn require_row(conn: &Connection, sql: &str, id: i64) -> Result<Option<()>> {
    conn.query_row(sql, [id], |_| Ok(()))
        .optional()
        .sql_context("failed to check reference")
}

/// Trim `value` and reject it when nothing is left.
pub(crate) fn required<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(StoreError::validation(message))
    } else {
        Ok(trimmed)
    }
}
