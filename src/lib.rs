//! Per-game keyboard and mouse binding manager.
//!
//! Bindings live in an embedded SQLite store. A special game named `default`
//! holds the baseline layout every other game is compared against and can be
//! reset to. The `bin` target wires the store to a Ratatui front end and a
//! couple of plain-text reports.
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;
pub mod ui;

pub use config::{Config, RunMode};
pub use db::{open_store, seed_defaults};
pub use error::{ErrorKind, StoreError};
pub use logging::init_logging;
pub use models::{Action, Binding, BindingView, Category, Game, GameType};
pub use ui::{run_app, App};
