//! Command-line and environment configuration.
//!
//! The database lives in `~/.keybinding-manager/` unless `--db` or the
//! `KEYBINDINGS_DB` environment variable points elsewhere. Logs go next to the
//! database because the TUI owns the terminal.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".keybinding-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "game_bindings.sqlite";
/// Log file name, written next to the database.
const LOG_FILE_NAME: &str = "keybindings.log";
/// Environment variable that overrides the database location.
pub const DB_ENV_VAR: &str = "KEYBINDINGS_DB";
/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "keybinding_manager=info";

/// What the binary should do once the store is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Interactive,
    PrintLayout(String),
    ListGames,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub mode: RunMode,
}

impl Config {
    /// Parse the process arguments and environment. `--help`, `--version`
    /// and usage errors are printed by clap, which then exits the process.
    pub fn from_env() -> Result<Self> {
        let matches = command().get_matches();
        Self::from_matches(&matches, std::env::var_os(DB_ENV_VAR))
    }

    /// Parse an explicit argument list. `env_db` stands in for
    /// `KEYBINDINGS_DB` so callers and tests control the environment. Help
    /// and version requests come back as a `clap::Error`.
    pub fn from_args<I, T>(args: I, env_db: Option<OsString>) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Self::from_matches(&matches, env_db)
    }

    fn from_matches(matches: &ArgMatches, env_db: Option<OsString>) -> Result<Self> {
        let db_path = match matches.get_one::<PathBuf>("db") {
            Some(path) => path.clone(),
            None => match env_db.filter(|value| !value.is_empty()) {
                Some(value) => PathBuf::from(value),
                None => default_db_path()?,
            },
        };

        let log_path = match matches.get_one::<PathBuf>("log-file") {
            Some(path) => path.clone(),
            None => db_path
                .parent()
                .map(|dir| dir.join(LOG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME)),
        };

        let mode = if let Some(game) = matches.get_one::<String>("print") {
            RunMode::PrintLayout(game.clone())
        } else if matches.get_flag("list-games") {
            RunMode::ListGames
        } else {
            RunMode::Interactive
        };

        Ok(Self {
            db_path,
            log_path,
            mode,
        })
    }
}

fn command() -> Command {
    Command::new("keybinding-manager")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manage per-game keyboard and mouse binding layouts")
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .help("SQLite database file (defaults to ~/.keybinding-manager/game_bindings.sqlite)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Where to write logs (defaults to a file next to the database)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("print")
                .long("print")
                .value_name("GAME")
                .help("Print the layout of GAME to stdout and exit")
                .conflicts_with("list-games"),
        )
        .arg(
            Arg::new("list-games")
                .long("list-games")
                .help("List the configured games and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_db_wins_over_environment() {
        let config = Config::from_args(
            ["keybinding-manager", "--db", "/tmp/kb/test.sqlite"],
            Some(OsString::from("/elsewhere/other.sqlite")),
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/kb/test.sqlite"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/kb/keybindings.log"));
        assert_eq!(config.mode, RunMode::Interactive);
    }

    #[test]
    fn environment_overrides_default() {
        let config = Config::from_args(
            ["keybinding-manager"],
            Some(OsString::from("/data/bindings.sqlite")),
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/bindings.sqlite"));
    }

    #[test]
    fn print_and_list_select_run_mode() {
        let config = Config::from_args(
            ["keybinding-manager", "--db", "x.sqlite", "--print", "apex"],
            None,
        )
        .unwrap();
        assert_eq!(config.mode, RunMode::PrintLayout("apex".to_string()));

        let config =
            Config::from_args(["keybinding-manager", "--db", "x.sqlite", "--list-games"], None)
                .unwrap();
        assert_eq!(config.mode, RunMode::ListGames);

        assert!(Config::from_args(
            ["keybinding-manager", "--print", "apex", "--list-games"],
            None
        )
        .is_err());
    }

    #[test]
    fn help_and_version_are_display_requests() {
        let err = Config::from_args(["keybinding-manager", "--help"], None).unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(clap_err.exit_code(), 0);

        let err = Config::from_args(["keybinding-manager", "--version"], None).unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert_eq!(clap_err.exit_code(), 0);
    }
}
