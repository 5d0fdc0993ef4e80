//! Domain models that mirror the SQLite schema and get passed between the
//! store and the TUI. They stay plain data holders; the persistence layer owns
//! every rule about how they relate to each other.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Name of the template game whose bindings every other game starts from.
pub const DEFAULT_GAME_NAME: &str = "default";

/// Modifier name that the print layout leaves implicit.
pub const TAP_MODIFIER: &str = "tap";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Groups actions for display (movement, combat, ...).
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Something a player can do in a game. Every action belongs to exactly one
/// category, and bindings inherit their category through it.
pub struct Action {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    Tactical,
    Dumb,
}

impl GameType {
    pub const ALL: [GameType; 2] = [GameType::Tactical, GameType::Dumb];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Tactical => "tactical",
            GameType::Dumb => "dumb",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tactical" => Ok(GameType::Tactical),
            "dumb" => Ok(GameType::Dumb),
            other => Err(StoreError::validation(format!(
                "Unknown game type '{other}'. Expected one of: tactical, dumb."
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub game_type: GameType,
    /// Raw cover image bytes, when one was supplied.
    pub image: Option<Vec<u8>>,
}

impl Game {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_GAME_NAME
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Physical key identifier shared by all games.
pub struct GameKey {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// How a key is pressed ("tap", "hold", ...). Shared by all games.
pub struct Modifier {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Assignment of one (key, modifier) pair to one action within one game.
pub struct Binding {
    pub id: i64,
    pub game_id: i64,
    pub action_id: i64,
    pub key_id: i64,
    pub modifier_id: i64,
    pub description: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A binding joined with the names the UI shows next to it.
pub struct BindingView {
    pub id: i64,
    pub game_id: i64,
    pub action_id: i64,
    pub action_name: String,
    pub category_id: i64,
    pub key_id: i64,
    pub key_name: String,
    pub modifier_id: i64,
    pub modifier_name: String,
    pub description: String,
    pub sort_order: i64,
}

impl BindingView {
    /// `"W"` for plain taps, `"Shift (hold)"` for everything else.
    pub fn key_label(&self) -> String {
        if self.modifier_name == TAP_MODIFIER {
            self.key_name.clone()
        } else {
            format!("{} ({})", self.key_name, self.modifier_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One category of a game's layout with its bindings in display order.
pub struct CategorySection {
    pub category: Category,
    pub bindings: Vec<BindingView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a deleted binding used to live, so the caller can refresh just that
/// category table.
pub struct BindingLocation {
    pub game_id: i64,
    pub category_id: i64,
}
