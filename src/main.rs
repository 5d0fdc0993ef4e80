//! Binary entry point: resolve configuration, open (and on first run seed) the
//! store, then either run the TUI or print a report and exit.
use std::io::{self, Write};

use anyhow::Context;
use keybinding_manager::report::{write_game_list, write_layout};
use keybinding_manager::{init_logging, open_store, run_app, seed_defaults, App, Config, RunMode};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config.log_path)?;
    tracing::info!(db = %config.db_path.display(), "starting keybinding manager");

    let conn = open_store(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    seed_defaults(&conn)?;

    match config.mode {
        RunMode::Interactive => {
            let mut app = App::new(conn)?;
            run_app(&mut app)
        }
        RunMode::PrintLayout(game) => {
            let mut stdout = io::stdout().lock();
            write_layout(&conn, &game, &mut stdout)?;
            stdout.flush().context("failed to flush stdout")
        }
        RunMode::ListGames => {
            let mut stdout = io::stdout().lock();
            write_game_list(&conn, &mut stdout)?;
            stdout.flush().context("failed to flush stdout")
        }
    }
}
