use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{map_constraint, Result, SqlContext, StoreError};
use crate::models::{Game, GameType, DEFAULT_GAME_NAME};

use super::catalog::required;

const GAME_COLUMNS: &str = "id, name, game_type, image";

/// All user games sorted by name. The default template is left out because it
/// is edited through the same screens but never listed as a playable game.
pub fn fetch_games(conn: &Connection) -> Result<Vec<Game>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE name <> ?1 ORDER BY name COLLATE NOCASE"
        ))
        .sql_context("failed to prepare game query")?;

    let games = stmt
        .query_map([DEFAULT_GAME_NAME], read_game)
        .sql_context("failed to load games")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect games")?;

    Ok(games)
}

pub fn fetch_game(conn: &Connection, id: i64) -> Result<Game> {
    conn.query_row(
        &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"),
        [id],
        read_game,
    )
    .optional()
    .sql_context("failed to load game")?
    .ok_or_else(|| StoreError::not_found(format!("Game {id} not found.")))
}

pub fn find_game_by_name(conn: &Connection, name: &str) -> Result<Option<Game>> {
    conn.query_row(
        &format!("SELECT {GAME_COLUMNS} FROM games WHERE name = ?1"),
        [name.trim()],
        read_game,
    )
    .optional()
    .sql_context("failed to look up game")
}

/// The template game every other game copies from.
pub fn fetch_default_game(conn: &Connection) -> Result<Game> {
    find_game_by_name(conn, DEFAULT_GAME_NAME)?.ok_or_else(|| {
        StoreError::not_found(format!(
            "The '{DEFAULT_GAME_NAME}' game is missing; seed the store first."
        ))
    })
}

/// Create the game when the name is new, otherwise update its type. The image
/// is only replaced when a new one is supplied so re-submitting the form
/// without a file keeps the existing cover.
pub fn upsert_game(
    conn: &Connection,
    name: &str,
    game_type: &str,
    image: Option<Vec<u8>>,
) -> Result<Game> {
    let name = required(name, "Game name is required.")?;
    let game_type: GameType = game_type.parse()?;

    if let Some(existing) = find_game_by_name(conn, name)? {
        conn.execute(
            "UPDATE games SET game_type = ?1, image = COALESCE(?2, image) WHERE id = ?3",
            params![game_type.as_str(), image, existing.id],
        )
        .sql_context("failed to update game")?;
        tracing::info!(id = existing.id, name, %game_type, "updated game");
        return fetch_game(conn, existing.id);
    }

    conn.execute(
        "INSERT INTO games (name, game_type, image) VALUES (?1, ?2, ?3)",
        params![name, game_type.as_str(), image],
    )
    .map_err(|err| {
        map_constraint(
            err,
            "failed to insert game",
            format!("Game '{name}' already exists."),
        )
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, name, %game_type, "created game");
    Ok(Game {
        id,
        name: name.to_string(),
        game_type,
        image,
    })
}

/// Remove a game. The schema cascades to `bindings`, so the game's layout goes
/// with it. The default game is protected because every other game copies
/// from it.
pub fn delete_game(conn: &Connection, id: i64) -> Result<String> {
    let game = fetch_game(conn, id)?;
    if game.is_default() {
        return Err(StoreError::integrity(
            "The default game holds the baseline bindings and cannot be deleted.",
        ));
    }

    let bindings: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM bindings WHERE game_id = ?1",
            [id],
            |row| row.get(0),
        )
        .sql_context("failed to count game bindings")?;

    let deleted = conn
        .execute("DELETE FROM games WHERE id = ?1", [id])
        .sql_context("failed to delete game")?;
    if deleted == 0 {
        return Err(StoreError::not_found(format!("Game {id} not found.")));
    }

    tracing::info!(id, name = %game.name, bindings, "deleted game");
    Ok(format!(
        "Deleted game '{}' and {bindings} binding(s).",
        game.name
    ))
}

fn read_game(row: &Row<'_>) -> rusqlite::Result<Game> {
    let raw_type: String = row.get(2)?;
    let game_type = raw_type
        .parse::<GameType>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    Ok(Game {
        id: row.get(0)?,
        name: row.get(1)?,
        game_type,
        image: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::Fixture;
    use crate::db::{create_binding, fetch_binding};
    use crate::error::ErrorKind;

    #[test]
    fn upsert_creates_then_updates_by_name() {
        let fx = Fixture::new();
        let created = upsert_game(&fx.conn, "Hunt", "tactical", Some(vec![1, 2, 3])).unwrap();
        assert_eq!(created.game_type, GameType::Tactical);

        let updated = upsert_game(&fx.conn, "Hunt", "dumb", None).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.game_type, GameType::Dumb);
        assert_eq!(updated.image, Some(vec![1, 2, 3]));

        let replaced = upsert_game(&fx.conn, "Hunt", "dumb", Some(vec![9])).unwrap();
        assert_eq!(replaced.image, Some(vec![9]));
    }

    #[test]
    fn upsert_rejects_unknown_type_and_blank_name() {
        let fx = Fixture::new();
        let before = fetch_games(&fx.conn).unwrap().len();
        assert_eq!(
            upsert_game(&fx.conn, "Hunt", "arcade", None).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            upsert_game(&fx.conn, "  ", "tactical", None).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(fetch_games(&fx.conn).unwrap().len(), before);
    }

    #[test]
    fn listing_excludes_default_game() {
        let fx = Fixture::new();
        let names: Vec<String> = fetch_games(&fx.conn)
            .unwrap()
            .into_iter()
            .map(|game| game.name)
            .collect();
        assert_eq!(names, vec!["apex".to_string()]);
        assert!(fetch_default_game(&fx.conn).unwrap().is_default());
    }

    #[test]
    fn delete_cascades_to_bindings() {
        let fx = Fixture::new();
        let binding = create_binding(
            &fx.conn,
            fx.game_id,
            fx.jump,
            Some(fx.key_space),
            fx.tap,
            "",
        )
        .unwrap();

        let message = delete_game(&fx.conn, fx.game_id).unwrap();
        assert_eq!(message, "Deleted game 'apex' and 1 binding(s).");
        assert_eq!(
            fetch_binding(&fx.conn, binding.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            fetch_game(&fx.conn, fx.game_id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn default_game_cannot_be_deleted() {
        let fx = Fixture::new();
        let err = delete_game(&fx.conn, fx.default_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(fetch_default_game(&fx.conn).is_ok());
    }

    #[test]
    fn deleting_unknown_game_is_not_found() {
        let fx = Fixture::new();
        assert_eq!(
            delete_game(&fx.conn, 999).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
