//! Everything that compares or copies against the default game.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, SqlContext, StoreError};
use crate::models::{Action, BindingView, DEFAULT_GAME_NAME};

use super::bindings::read_binding_view;
use super::games::{fetch_default_game, fetch_game, find_game_by_name};

/// Action ids whose (key, modifier) pair in `game_name` differs from the
/// default game. Actions bound in only one of the two games are skipped; use
/// [`fetch_unbound_actions`] to find those.
pub fn compare_with_default(conn: &Connection, game_name: &str) -> Result<HashSet<i64>> {
    let game = find_game_by_name(conn, game_name)?
        .ok_or_else(|| StoreError::not_found(format!("Game '{}' not found.", game_name.trim())))?;
    let default_game = fetch_default_game(conn)?;

    let mut stmt = conn
        .prepare(
            "SELECT g.action_id
             FROM bindings g
             INNER JOIN bindings d ON d.action_id = g.action_id AND d.game_id = ?2
             WHERE g.game_id = ?1
               AND (g.key_id <> d.key_id OR g.modifier_id <> d.modifier_id)",
        )
        .sql_context("failed to prepare default comparison")?;

    let differences = stmt
        .query_map(params![game.id, default_game.id], |row| row.get::<_, i64>(0))
        .sql_context("failed to compare with default")?
        .collect::<rusqlite::Result<HashSet<_>>>()
        .sql_context("failed to collect differences")?;

    tracing::debug!(game = %game.name, count = differences.len(), "compared with default");
    Ok(differences)
}

/// Reset `game_id` to the default layout. Each default binding is copied,
/// overwriting the game's existing binding for the same action, so running it
/// twice leaves the same rows as running it once. Bindings for actions the
/// default game does not bind are kept. Returns how many rows were written.
pub fn copy_default_bindings(conn: &Connection, game_id: i64) -> Result<usize> {
    let game = fetch_game(conn, game_id)?;
    if game.is_default() {
        return Err(StoreError::validation(format!(
            "Cannot copy the '{DEFAULT_GAME_NAME}' bindings onto themselves."
        )));
    }
    let default_game = fetch_default_game(conn)?;

    let written = conn
        .execute(
            "INSERT INTO bindings (game_id, action_id, key_id, modifier_id, description, sort_order)
             SELECT ?1, action_id, key_id, modifier_id, description, sort_order
             FROM bindings
             WHERE game_id = ?2
             ORDER BY id
             ON CONFLICT(game_id, action_id) DO UPDATE SET
                 key_id = excluded.key_id,
                 modifier_id = excluded.modifier_id,
                 description = excluded.description,
                 sort_order = excluded.sort_order",
            params![game.id, default_game.id],
        )
        .sql_context("failed to copy default bindings")?;

    tracing::info!(game_id, game = %game.name, written, "copied default bindings");
    Ok(written)
}

/// The default game's binding for an action, if it has one. The edit form
/// shows it next to the game's own values; `None` renders as "no default".
pub fn default_binding_for_action(
    conn: &Connection,
    action_id: i64,
) -> Result<Option<BindingView>> {
    conn.query_row(
        "SELECT b.id, b.game_id, b.action_id, a.name, a.category_id,
                b.key_id, k.name, b.modifier_id, m.name, b.description, b.sort_order
         FROM bindings b
         INNER JOIN games g ON g.id = b.game_id
         INNER JOIN actions a ON a.id = b.action_id
         INNER JOIN game_keys k ON k.id = b.key_id
         INNER JOIN modifiers m ON m.id = b.modifier_id
         WHERE g.name = ?1 AND b.action_id = ?2",
        params![DEFAULT_GAME_NAME, action_id],
        read_binding_view,
    )
    .optional()
    .sql_context("failed to load default binding")
}

/// Actions the game has no binding for, grouped by category. Feeds the
/// "add binding" picker and shows the gaps `compare_with_default` skips.
pub fn fetch_unbound_actions(conn: &Connection, game_id: i64) -> Result<Vec<Action>> {
    fetch_game(conn, game_id)?;

    let mut stmt = conn
        .prepare(
            "SELECT a.id, a.name, a.description, a.category_id
             FROM actions a
             WHERE NOT EXISTS (
                 SELECT 1 FROM bindings b WHERE b.action_id = a.id AND b.game_id = ?1
             )
             ORDER BY a.category_id, a.id",
        )
        .sql_context("failed to prepare unbound actions query")?;

    let actions = stmt
        .query_map([game_id], |row| {
            Ok(Action {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                category_id: row.get(3)?,
            })
        })
        .sql_context("failed to load unbound actions")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context("failed to collect unbound actions")?;

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::Fixture;
    use crate::db::{
        create_action, create_binding, fetch_bindings_for_game, update_binding,
    };
    use crate::error::ErrorKind;

    #[test]
    fn identical_game_has_no_differences() {
        let fx = Fixture::new();
        copy_default_bindings(&fx.conn, fx.game_id).unwrap();
        assert!(compare_with_default(&fx.conn, "apex").unwrap().is_empty());
        assert!(compare_with_default(&fx.conn, "default").unwrap().is_empty());
    }

    #[test]
    fn changed_key_marks_exactly_that_action() {
        let fx = Fixture::new();
        copy_default_bindings(&fx.conn, fx.game_id).unwrap();
        let jump = fetch_bindings_for_game(&fx.conn, fx.game_id)
            .unwrap()
            .into_iter()
            .find(|binding| binding.action_id == fx.jump)
            .unwrap();
        update_binding(&fx.conn, jump.id, Some(fx.key_ctrl), fx.tap, "").unwrap();

        let differences = compare_with_default(&fx.conn, "apex").unwrap();
        assert_eq!(differences, HashSet::from([fx.jump]));
    }

    #[test]
    fn changed_modifier_counts_as_difference() {
        let fx = Fixture::new();
        let binding =
            create_binding(&fx.conn, fx.game_id, fx.fire, Some(fx.key_mouse1), fx.hold, "")
                .unwrap();
        assert_eq!(binding.key_id, fx.key_mouse1);
        assert_eq!(
            compare_with_default(&fx.conn, "apex").unwrap(),
            HashSet::from([fx.fire])
        );
    }

    #[test]
    fn actions_bound_on_one_side_are_skipped() {
        let fx = Fixture::new();
        let slide = create_action(&fx.conn, "slide", "", fx.movement).unwrap();
        create_binding(&fx.conn, fx.game_id, slide.id, Some(fx.key_ctrl), fx.tap, "").unwrap();

        assert!(compare_with_default(&fx.conn, "apex").unwrap().is_empty());
    }

    #[test]
    fn comparing_unknown_game_is_not_found() {
        let fx = Fixture::new();
        let err = compare_with_default(&fx.conn, "quake").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn copy_into_empty_game_mirrors_default() {
        let fx = Fixture::new();
        let written = copy_default_bindings(&fx.conn, fx.game_id).unwrap();
        assert_eq!(written, 4);

        let defaults = fetch_bindings_for_game(&fx.conn, fx.default_id).unwrap();
        let copies = fetch_bindings_for_game(&fx.conn, fx.game_id).unwrap();
        assert_eq!(copies.len(), defaults.len());
        for (copy, default) in copies.iter().zip(&defaults) {
            assert_eq!(copy.game_id, fx.game_id);
            assert_eq!(copy.action_id, default.action_id);
            assert_eq!(copy.key_id, default.key_id);
            assert_eq!(copy.modifier_id, default.modifier_id);
            assert_eq!(copy.description, default.description);
            assert_eq!(copy.sort_order, default.sort_order);
        }
    }

    #[test]
    fn copy_twice_resets_without_duplicates() {
        let fx = Fixture::new();
        copy_default_bindings(&fx.conn, fx.game_id).unwrap();
        let jump = fetch_bindings_for_game(&fx.conn, fx.game_id)
            .unwrap()
            .into_iter()
            .find(|binding| binding.action_id == fx.jump)
            .unwrap();
        update_binding(&fx.conn, jump.id, Some(fx.key_ctrl), fx.hold, "custom").unwrap();

        copy_default_bindings(&fx.conn, fx.game_id).unwrap();

        let copies = fetch_bindings_for_game(&fx.conn, fx.game_id).unwrap();
        assert_eq!(copies.len(), 4);
        let reset = copies
            .iter()
            .find(|binding| binding.action_id == fx.jump)
            .unwrap();
        assert_eq!(reset.id, jump.id);
        assert_eq!(reset.key_id, fx.key_space);
        assert_eq!(reset.modifier_id, fx.tap);
        assert_eq!(reset.description, "");
    }

    #[test]
    fn copy_keeps_bindings_without_default() {
        let fx = Fixture::new();
        let slide = create_action(&fx.conn, "slide", "", fx.movement).unwrap();
        create_binding(&fx.conn, fx.game_id, slide.id, Some(fx.key_ctrl), fx.tap, "").unwrap();

        copy_default_bindings(&fx.conn, fx.game_id).unwrap();
        assert_eq!(fetch_bindings_for_game(&fx.conn, fx.game_id).unwrap().len(), 5);
    }

    #[test]
    fn copy_onto_default_is_rejected() {
        let fx = Fixture::new();
        let err = copy_default_bindings(&fx.conn, fx.default_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = copy_default_bindings(&fx.conn, 999).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn default_lookup_and_unbound_actions() {
        let fx = Fixture::new();
        let baseline = default_binding_for_action(&fx.conn, fx.fire)
            .unwrap()
            .unwrap();
        assert_eq!(baseline.key_name, "Mouse1");

        let slide = create_action(&fx.conn, "slide", "", fx.movement).unwrap();
        assert!(default_binding_for_action(&fx.conn, slide.id)
            .unwrap()
            .is_none());

        create_binding(&fx.conn, fx.game_id, fx.jump, Some(fx.key_space), fx.tap, "").unwrap();
        let unbound: Vec<i64> = fetch_unbound_actions(&fx.conn, fx.game_id)
            .unwrap()
            .iter()
            .map(|action| action.id)
            .collect();
        assert_eq!(unbound, vec![fx.forward, fx.backward, slide.id, fx.fire]);
    }
}
