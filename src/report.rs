//! Plain-text renderings of the store for `--print` and `--list-games`, also
//! used by the TUI's print view.

use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db::{
    compare_with_default, fetch_default_game, fetch_game_layout, fetch_games, find_game_by_name,
};
use crate::error::StoreError;
use crate::models::{CategorySection, Game};

/// Marker printed in front of actions that differ from the default game.
const DIFFERENCE_MARKER: char = '*';

/// Render a game's layout as aligned text, one block per category. Categories
/// with no bindings are left out.
pub fn render_layout(
    game: &Game,
    sections: &[CategorySection],
    differences: &HashSet<i64>,
) -> String {
    let action_width = sections
        .iter()
        .flat_map(|section| section.bindings.iter())
        .map(|binding| binding.action_name.chars().count())
        .max()
        .unwrap_or(0);
    let key_width = sections
        .iter()
        .flat_map(|section| section.bindings.iter())
        .map(|binding| binding.key_label().chars().count())
        .max()
        .unwrap_or(0);

    let mut out = format!("{} ({})\n", game.name, game.game_type);
    for section in sections.iter().filter(|section| !section.bindings.is_empty()) {
        out.push('\n');
        out.push_str(&section.category.name.to_uppercase());
        out.push('\n');
        for binding in &section.bindings {
            let marker = if differences.contains(&binding.action_id) {
                DIFFERENCE_MARKER
            } else {
                ' '
            };
            let line = format!(
                "{marker} {:<action_width$}  {:<key_width$}  {}",
                binding.action_name,
                binding.key_label(),
                binding.description,
            );
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

/// Look a game up by name and write its layout to `out`.
pub fn write_layout<W: Write>(conn: &Connection, game_name: &str, out: &mut W) -> Result<()> {
    let game = find_game_by_name(conn, game_name)?
        .ok_or_else(|| StoreError::not_found(format!("Game '{}' not found.", game_name.trim())))?;
    let sections = fetch_game_layout(conn, game.id)?;
    let differences = compare_with_default(conn, &game.name)?;

    out.write_all(render_layout(&game, &sections, &differences).as_bytes())
        .context("failed to write layout")?;
    if !differences.is_empty() {
        writeln!(
            out,
            "\n{DIFFERENCE_MARKER} differs from the default layout"
        )
        .context("failed to write layout")?;
    }
    Ok(())
}

/// Write the default game followed by every other game, one per line.
pub fn write_game_list<W: Write>(conn: &Connection, out: &mut W) -> Result<()> {
    let default_game = fetch_default_game(conn)?;
    writeln!(out, "{} ({})  [default]", default_game.name, default_game.game_type)
        .context("failed to write game list")?;
    for game in fetch_games(conn)? {
        writeln!(out, "{} ({})", game.name, game.game_type).context("failed to write game list")?;
    }
    Ok(())
}
