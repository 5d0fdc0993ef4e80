use std::fs;
use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, SqlContext};

/// Open (or create) the SQLite file at `path`, make sure its parent directory
/// exists, and run the lazy migrations.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path).sql_context("failed to open SQLite database")?;
    ensure_schema(&conn)?;
    tracing::debug!(path = %path.display(), "opened keybinding store");
    Ok(conn)
}

/// Throwaway store with the full schema. Used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().sql_context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Create the six tables if they are missing. The function also toggles
/// `PRAGMA foreign_keys = ON` so references are checked on every write and
/// deleting a game cascades to its bindings.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .sql_context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )",
        [],
    )
    .sql_context("failed to create categories table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS actions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category_id INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES categories(id)
        )",
        [],
    )
    .sql_context("failed to create actions table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            game_type TEXT NOT NULL CHECK (game_type IN ('tactical', 'dumb')),
            image BLOB
        )",
        [],
    )
    .sql_context("failed to create games table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS game_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .sql_context("failed to create game_keys table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS modifiers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .sql_context("failed to create modifiers table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bindings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id INTEGER NOT NULL,
            action_id INTEGER NOT NULL,
            key_id INTEGER NOT NULL,
            modifier_id INTEGER NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            UNIQUE (game_id, action_id),
            FOREIGN KEY(game_id) REFERENCES games(id) ON DELETE CASCADE,
            FOREIGN KEY(action_id) REFERENCES actions(id) ON DELETE CASCADE,
            FOREIGN KEY(key_id) REFERENCES game_keys(id),
            FOREIGN KEY(modifier_id) REFERENCES modifiers(id)
        )",
        [],
    )
    .sql_context("failed to create bindings table")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('categories', 'actions', 'games', 'game_keys', 'modifiers', 'bindings')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }

    #[test]
    fn foreign_keys_are_enabled() {
        let conn = open_in_memory().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
