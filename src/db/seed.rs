//! First-run data: the categories, keys and modifiers a typical shooter needs,
//! the default game, and a baseline binding for every seeded action.

use std::collections::HashMap;

use rusqlite::{params, Connection};

use crate::error::{Result, SqlContext};
use crate::models::{GameType, DEFAULT_GAME_NAME};

use super::bindings::SORT_ORDER_STEP;

const CATEGORIES: &[(&str, &str)] = &[
    ("movement", "Moving the character around"),
    ("combat", "Weapons, aiming and abilities"),
    ("interaction", "Using the world and inventory"),
    ("communication", "Voice, chat and pings"),
    ("menu", "Menus and overlays"),
];

const MODIFIERS: &[&str] = &["tap", "hold", "double tap"];

const KEYS: &[&str] = &[
    "W", "A", "S", "D", "Q", "E", "R", "F", "G", "C", "V", "X", "Z", "B", "T", "Y", "M", "I",
    "1", "2", "3", "4", "5", "Space", "Shift", "Ctrl", "Alt", "Tab", "Esc", "Enter", "Caps Lock",
    "Mouse1", "Mouse2", "Mouse3", "Mouse4", "Mouse5", "Wheel Up", "Wheel Down",
];

/// (category, action, key, modifier)
const ACTIONS: &[(&str, &str, &str, &str)] = &[
    ("movement", "forward", "W", "tap"),
    ("movement", "backward", "S", "tap"),
    ("movement", "strafe left", "A", "tap"),
    ("movement", "strafe right", "D", "tap"),
    ("movement", "jump", "Space", "tap"),
    ("movement", "crouch", "Ctrl", "tap"),
    ("movement", "sprint", "Shift", "hold"),
    ("movement", "walk", "Alt", "hold"),
    ("combat", "fire", "Mouse1", "tap"),
    ("combat", "aim down sights", "Mouse2", "hold"),
    ("combat", "reload", "R", "tap"),
    ("combat", "melee", "V", "tap"),
    ("combat", "primary weapon", "1", "tap"),
    ("combat", "secondary weapon", "2", "tap"),
    ("combat", "throwable", "G", "tap"),
    ("combat", "lean left", "Q", "hold"),
    ("combat", "lean right", "E", "hold"),
    ("interaction", "use", "F", "tap"),
    ("interaction", "inventory", "Tab", "tap"),
    ("interaction", "heal", "4", "tap"),
    ("communication", "push to talk", "T", "hold"),
    ("communication", "text chat", "Enter", "tap"),
    ("communication", "ping", "Mouse3", "tap"),
    ("menu", "pause menu", "Esc", "tap"),
    ("menu", "map", "M", "tap"),
    ("menu", "scoreboard", "Tab", "hold"),
];

/// Fill an empty store. Returns `false` without touching anything when any
/// category already exists, so it is safe to call on every start.
pub fn seed_defaults(conn: &Connection) -> Result<bool> {
    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
        .sql_context("failed to count categories")?;
    if existing > 0 {
        return Ok(false);
    }

    let tx = conn
        .unchecked_transaction()
        .sql_context("failed to start seed transaction")?;

    for (name, description) in CATEGORIES {
        tx.execute(
            "INSERT INTO categories (name, description) VALUES (?1, ?2)",
            params![name, description],
        )
        .sql_context("failed to seed categories")?;
    }
    for name in MODIFIERS {
        tx.execute("INSERT INTO modifiers (name) VALUES (?1)", [name])
            .sql_context("failed to seed modifiers")?;
    }
    for name in KEYS {
        tx.execute("INSERT INTO game_keys (name) VALUES (?1)", [name])
            .sql_context("failed to seed keys")?;
    }
    tx.execute(
        "INSERT OR IGNORE INTO games (name, game_type) VALUES (?1, ?2)",
        params![DEFAULT_GAME_NAME, GameType::Tactical.as_str()],
    )
    .sql_context("failed to seed default game")?;

    let default_id: i64 = tx
        .query_row(
            "SELECT id FROM games WHERE name = ?1",
            [DEFAULT_GAME_NAME],
            |row| row.get(0),
        )
        .sql_context("failed to load default game")?;

    let mut position_in_category = HashMap::new();
    for (category, action, key, modifier) in ACTIONS {
        tx.execute(
            "INSERT INTO actions (name, category_id)
             SELECT ?1, id FROM categories WHERE name = ?2",
            params![action, category],
        )
        .sql_context("failed to seed actions")?;
        let action_id = tx.last_insert_rowid();

        let position = position_in_category.entry(*category).or_insert(0i64);
        tx.execute(
            "INSERT INTO bindings (game_id, action_id, key_id, modifier_id, sort_order)
             SELECT ?1, ?2, k.id, m.id, ?3
             FROM game_keys k, modifiers m
             WHERE k.name = ?4 AND m.name = ?5",
            params![
                default_id,
                action_id,
                *position * SORT_ORDER_STEP,
                key,
                modifier
            ],
        )
        .sql_context("failed to seed default bindings")?;
        *position += 1;
    }

    tx.commit().sql_context("failed to commit seed data")?;
    tracing::info!(
        categories = CATEGORIES.len(),
        actions = ACTIONS.len(),
        keys = KEYS.len(),
        "seeded fresh keybinding store"
    );
    Ok(true)
}
