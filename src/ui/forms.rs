use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{
    Action, BindingView, Game, GameKey, GameType, Modifier, DEFAULT_GAME_NAME,
};

/// A cycling choice over `(id, label)` pairs. `selected` starts empty for new
/// records so an untouched picker really means "nothing chosen".
#[derive(Clone, Default)]
pub(crate) struct Picker {
    pub(crate) options: Vec<(i64, String)>,
    pub(crate) selected: Option<usize>,
}

impl Picker {
    pub(crate) fn new(options: Vec<(i64, String)>) -> Self {
        Self {
            options,
            selected: None,
        }
    }

    /// Start on the option with `id`, or on nothing if it is not listed.
    pub(crate) fn with_selected(options: Vec<(i64, String)>, id: i64) -> Self {
        let selected = options.iter().position(|(option_id, _)| *option_id == id);
        Self { options, selected }
    }

    pub(crate) fn keys(keys: &[GameKey]) -> Vec<(i64, String)> {
        keys.iter().map(|key| (key.id, key.name.clone())).collect()
    }

    pub(crate) fn modifiers(modifiers: &[Modifier]) -> Vec<(i64, String)> {
        modifiers
            .iter()
            .map(|modifier| (modifier.id, modifier.name.clone()))
            .collect()
    }

    pub(crate) fn cycle(&mut self, delta: isize) {
        if self.options.is_empty() {
            return;
        }
        let len = self.options.len() as isize;
        let next = match self.selected {
            None if delta < 0 => len - 1,
            None => 0,
            Some(current) => (current as isize + delta).rem_euclid(len),
        };
        self.selected = Some(next as usize);
    }

    pub(crate) fn selected_id(&self) -> Option<i64> {
        self.selected
            .and_then(|index| self.options.get(index))
            .map(|(id, _)| *id)
    }

    pub(crate) fn selected_label(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.options.get(index))
            .map(|(_, label)| label.as_str())
    }

    pub(crate) fn display(&self, placeholder: &str) -> String {
        match self.selected_label() {
            Some(label) => format!("< {label} >"),
            None => format!("< {placeholder} >"),
        }
    }
}

/// Fields available within the game form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum GameField {
    #[default]
    Name,
    Type,
    Image,
}

/// Add/edit game form. Submitting always goes through the upsert, so editing
/// a game and re-adding one with the same name behave the same.
#[derive(Clone, Default)]
pub(crate) struct GameForm {
    pub(crate) name: String,
    pub(crate) game_type: usize,
    pub(crate) image_path: String,
    pub(crate) has_image: bool,
    pub(crate) name_locked: bool,
    pub(crate) active: GameField,
    pub(crate) error: Option<String>,
}

impl GameForm {
    /// Populate the form from an existing game. The name is the upsert key so
    /// it stays read-only while editing.
    pub(crate) fn from_game(game: &Game) -> Self {
        Self {
            name: game.name.clone(),
            game_type: GameType::ALL
                .iter()
                .position(|kind| *kind == game.game_type)
                .unwrap_or(0),
            image_path: String::new(),
            has_image: game.image.is_some(),
            name_locked: true,
            active: GameField::Type,
            error: None,
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            GameField::Name => GameField::Type,
            GameField::Type => GameField::Image,
            GameField::Image if self.name_locked => GameField::Type,
            GameField::Image => GameField::Name,
        };
    }

    pub(crate) fn cycle(&mut self, delta: isize) {
        if self.active == GameField::Type {
            let len = GameType::ALL.len() as isize;
            self.game_type = (self.game_type as isize + delta).rem_euclid(len) as usize;
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            GameField::Name if !self.name_locked => self.name.push(ch),
            GameField::Image => self.image_path.push(ch),
            GameField::Type => match ch {
                ' ' => self.cycle(1),
                _ => return false,
            },
            GameField::Name => return false,
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            GameField::Name if !self.name_locked => {
                self.name.pop();
            }
            GameField::Image => {
                self.image_path.pop();
            }
            _ => {}
        }
    }

    pub(crate) fn game_type(&self) -> GameType {
        GameType::ALL[self.game_type % GameType::ALL.len()]
    }

    /// Read the image file, if a path was typed. Name and type are validated
    /// by the store.
    pub(crate) fn load_image(&self) -> Result<Option<Vec<u8>>> {
        let path = self.image_path.trim();
        if path.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(path);
        let bytes = fs::read(&path)
            .with_context(|| format!("Could not read image file {}", path.display()))?;
        Ok(Some(bytes))
    }

    pub(crate) fn build_lines(&self) -> Vec<Line<'static>> {
        let image_hint = if self.has_image {
            "<keep current image>"
        } else {
            "<optional path>"
        };
        vec![
            field_line(
                "Name",
                &self.name,
                "<required>",
                self.active == GameField::Name,
            ),
            field_line(
                "Type",
                &format!("< {} >", self.game_type()),
                "",
                self.active == GameField::Type,
            ),
            field_line(
                "Image",
                &self.image_path,
                image_hint,
                self.active == GameField::Image,
            ),
        ]
    }

    /// Cursor column offset and row for text fields; `None` for pickers.
    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        match self.active {
            GameField::Name if !self.name_locked => {
                Some((("Name: ".len() + self.name.chars().count()) as u16, 0))
            }
            GameField::Image => Some((
                ("Image: ".len() + self.image_path.chars().count()) as u16,
                2,
            )),
            _ => None,
        }
    }
}

/// Fields of the new-action form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum ActionField {
    #[default]
    Name,
    Category,
    Key,
    Modifier,
}

/// Admin form for a brand new action and its default binding. The category is
/// free text: an unknown name creates the category.
#[derive(Clone, Default)]
pub(crate) struct ActionForm {
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) categories: Vec<String>,
    pub(crate) key: Picker,
    pub(crate) modifier: Picker,
    pub(crate) active: ActionField,
    pub(crate) error: Option<String>,
}

impl ActionForm {
    pub(crate) fn new(categories: Vec<String>, keys: &[GameKey], modifiers: &[Modifier]) -> Self {
        let mut modifier = Picker::new(Picker::modifiers(modifiers));
        modifier.cycle(1);
        Self {
            category: categories.first().cloned().unwrap_or_default(),
            categories,
            key: Picker::new(Picker::keys(keys)),
            modifier,
            ..Self::default()
        }
    }

    pub(crate) fn toggle_field(&mut self, delta: isize) {
        const ORDER: [ActionField; 4] = [
            ActionField::Name,
            ActionField::Category,
            ActionField::Key,
            ActionField::Modifier,
        ];
        let index = ORDER.iter().position(|field| *field == self.active).unwrap_or(0) as isize;
        self.active = ORDER[(index + delta).rem_euclid(ORDER.len() as isize) as usize];
    }

    /// Left/right: cycle pickers, or step through known categories.
    pub(crate) fn cycle(&mut self, delta: isize) {
        match self.active {
            ActionField::Key => self.key.cycle(delta),
            ActionField::Modifier => self.modifier.cycle(delta),
            ActionField::Category if !self.categories.is_empty() => {
                let len = self.categories.len() as isize;
                let current = self
                    .categories
                    .iter()
                    .position(|name| *name == self.category)
                    .map(|index| index as isize + delta)
                    .unwrap_or(0);
                self.category = self.categories[current.rem_euclid(len) as usize].clone();
            }
            _ => {}
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            ActionField::Name => self.name.push(ch),
            ActionField::Category => self.category.push(ch),
            ActionField::Key | ActionField::Modifier => match ch {
                ' ' => self.cycle(1),
                _ => return false,
            },
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            ActionField::Name => {
                self.name.pop();
            }
            ActionField::Category => {
                self.category.pop();
            }
            _ => {}
        }
    }

    /// Names as the store expects them; empty strings are rejected there.
    pub(crate) fn inputs(&self) -> (String, String, String, String) {
        (
            self.name.clone(),
            self.category.clone(),
            self.key.selected_label().unwrap_or_default().to_string(),
            self.modifier.selected_label().unwrap_or_default().to_string(),
        )
    }

    pub(crate) fn build_lines(&self) -> Vec<Line<'static>> {
        let category_hint = if self.categories.contains(&self.category.trim().to_string()) {
            ""
        } else {
            "  (new)"
        };
        vec![
            field_line(
                "Action",
                &self.name,
                "<required>",
                self.active == ActionField::Name,
            ),
            field_line(
                "Category",
                &format!("{}{category_hint}", self.category),
                "<required>",
                self.active == ActionField::Category,
            ),
            field_line(
                "Default key",
                &self.key.display("choose a key"),
                "",
                self.active == ActionField::Key,
            ),
            field_line(
                "Default modifier",
                &self.modifier.display("choose a modifier"),
                "",
                self.active == ActionField::Modifier,
            ),
        ]
    }

    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        match self.active {
            ActionField::Name => Some((("Action: ".len() + self.name.chars().count()) as u16, 0)),
            ActionField::Category => Some((
                ("Category: ".len() + self.category.chars().count()) as u16,
                1,
            )),
            _ => None,
        }
    }
}

/// Fields of the binding form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum BindingField {
    #[default]
    Action,
    Key,
    Modifier,
    Description,
}

/// Add/edit binding form. When adding, the action picker lists only actions
/// the game has not bound yet; when editing, the action is fixed.
#[derive(Clone, Default)]
pub(crate) struct BindingForm {
    pub(crate) binding_id: Option<i64>,
    pub(crate) action_name: Option<String>,
    pub(crate) action: Picker,
    pub(crate) key: Picker,
    pub(crate) modifier: Picker,
    pub(crate) description: String,
    pub(crate) default_hint: Option<String>,
    pub(crate) active: BindingField,
    pub(crate) error: Option<String>,
}

impl BindingForm {
    pub(crate) fn for_new(actions: &[Action], keys: &[GameKey], modifiers: &[Modifier]) -> Self {
        let mut action = Picker::new(
            actions
                .iter()
                .map(|action| (action.id, action.name.clone()))
                .collect(),
        );
        action.cycle(1);
        let mut modifier = Picker::new(Picker::modifiers(modifiers));
        modifier.cycle(1);
        Self {
            action,
            key: Picker::new(Picker::keys(keys)),
            modifier,
            ..Self::default()
        }
    }

    /// Edit form for `binding`, showing the default game's values alongside.
    pub(crate) fn for_existing(
        binding: &BindingView,
        default: Option<&BindingView>,
        keys: &[GameKey],
        modifiers: &[Modifier],
    ) -> Self {
        let default_hint = Some(match default {
            Some(default) if default.id == binding.id => {
                format!("This is the '{DEFAULT_GAME_NAME}' binding.")
            }
            Some(default) => format!(
                "Default: {} / {}",
                default.key_name, default.modifier_name
            ),
            None => "No default binding for this action.".to_string(),
        });
        Self {
            binding_id: Some(binding.id),
            action_name: Some(binding.action_name.clone()),
            action: Picker::default(),
            key: Picker::with_selected(Picker::keys(keys), binding.key_id),
            modifier: Picker::with_selected(Picker::modifiers(modifiers), binding.modifier_id),
            description: binding.description.clone(),
            default_hint,
            active: BindingField::Key,
            error: None,
        }
    }

    pub(crate) fn toggle_field(&mut self, delta: isize) {
        let order: &[BindingField] = if self.binding_id.is_some() {
            &[
                BindingField::Key,
                BindingField::Modifier,
                BindingField::Description,
            ]
        } else {
            &[
                BindingField::Action,
                BindingField::Key,
                BindingField::Modifier,
                BindingField::Description,
            ]
        };
        let index = order.iter().position(|field| *field == self.active).unwrap_or(0) as isize;
        self.active = order[(index + delta).rem_euclid(order.len() as isize) as usize];
    }

    pub(crate) fn cycle(&mut self, delta: isize) {
        match self.active {
            BindingField::Action => self.action.cycle(delta),
            BindingField::Key => self.key.cycle(delta),
            BindingField::Modifier => self.modifier.cycle(delta),
            BindingField::Description => {}
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            BindingField::Description => self.description.push(ch),
            _ if ch == ' ' => self.cycle(1),
            _ => return false,
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        if self.active == BindingField::Description {
            self.description.pop();
        }
    }

    pub(crate) fn build_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::with_capacity(5);
        match &self.action_name {
            Some(name) => lines.push(Line::from(vec![
                Span::raw("Action: "),
                Span::styled(name.clone(), Style::default().fg(Color::Cyan)),
            ])),
            None => lines.push(field_line(
                "Action",
                &self.action.display("no unbound actions"),
                "",
                self.active == BindingField::Action,
            )),
        }
        lines.push(field_line(
            "Key",
            &self.key.display("choose a key"),
            "",
            self.active == BindingField::Key,
        ));
        lines.push(field_line(
            "Modifier",
            &self.modifier.display("choose a modifier"),
            "",
            self.active == BindingField::Modifier,
        ));
        lines.push(field_line(
            "Description",
            &self.description,
            "<optional>",
            self.active == BindingField::Description,
        ));
        if let Some(hint) = &self.default_hint {
            lines.push(Line::from(Span::styled(
                hint.clone(),
                Style::default().fg(Color::Gray),
            )));
        }
        lines
    }

    pub(crate) fn cursor(&self) -> Option<(u16, u16)> {
        (self.active == BindingField::Description).then(|| {
            (
                ("Description: ".len() + self.description.chars().count()) as u16,
                3,
            )
        })
    }
}

#[derive(Clone)]
pub(crate) struct ConfirmGameDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Clone)]
pub(crate) struct ConfirmBindingDelete {
    pub(crate) binding: BindingView,
}

#[derive(Clone)]
pub(crate) struct ConfirmCopyDefaults {
    pub(crate) game_id: i64,
    pub(crate) name: String,
}

/// One `Label: value` row, highlighted when focused and ghosted when empty.
fn field_line(field_name: &str, value: &str, placeholder: &str, is_active: bool) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, style),
    ])
}
