use std::mem;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    add_new_action, compare_with_default, copy_default_bindings, create_binding,
    default_binding_for_action, delete_binding, delete_game, fetch_binding_view, fetch_categories,
    fetch_category_bindings, fetch_default_game, fetch_game, fetch_game_keys, fetch_game_layout,
    fetch_games, fetch_modifiers, fetch_unbound_actions, reorder_bindings, update_binding,
    upsert_game,
};
use crate::error::ErrorKind;
use crate::models::{self, BindingLocation, BindingView, Game, GameKey};
use crate::report::render_layout;

use super::forms::{
    ActionForm, BindingForm, ConfirmBindingDelete, ConfirmCopyDefaults, ConfirmGameDelete,
    GameForm,
};
use super::helpers::{centered_rect, surface_error};
use super::screens::BindingsScreen;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Width of the action column in the bindings tables.
const ACTION_COLUMN: usize = 26;
/// Width of the key column in the bindings tables.
const KEY_COLUMN: usize = 20;

/// Which list is on screen.
enum Screen {
    Games,
    Bindings(BindingsScreen),
}

/// Popups and prompts layered over the current screen.
enum Mode {
    Normal,
    AddingGame(GameForm),
    EditingGame(GameForm),
    ConfirmGameDelete(ConfirmGameDelete),
    AddingAction(ActionForm),
    AddingBinding(BindingForm),
    EditingBinding(BindingForm),
    ConfirmBindingDelete(ConfirmBindingDelete),
    ConfirmCopyDefaults(ConfirmCopyDefaults),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Warning,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    /// The default game first, then the rest by name.
    games: Vec<Game>,
    selected: usize,
    keys: Vec<GameKey>,
    modifiers: Vec<models::Modifier>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection) -> Result<Self> {
        let keys = fetch_game_keys(&conn)?;
        let modifiers = fetch_modifiers(&conn)?;
        let mut app = Self {
            conn,
            games: Vec::new(),
            selected: 0,
            keys,
            modifiers,
            screen: Screen::Games,
            mode: Mode::Normal,
            status: None,
        };
        app.reload_games(None)?;
        Ok(app)
    }

    /// Route one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingGame(form) => self.handle_game_form(code, form, false)?,
            Mode::EditingGame(form) => self.handle_game_form(code, form, true)?,
            Mode::ConfirmGameDelete(confirm) => self.handle_confirm_game_delete(code, confirm)?,
            Mode::AddingAction(form) => self.handle_action_form(code, form)?,
            Mode::AddingBinding(form) => self.handle_binding_form(code, form)?,
            Mode::EditingBinding(form) => self.handle_binding_form(code, form)?,
            Mode::ConfirmBindingDelete(confirm) => {
                self.handle_confirm_binding_delete(code, confirm)?
            }
            Mode::ConfirmCopyDefaults(confirm) => self.handle_confirm_copy(code, confirm)?,
        };

        Ok(exit)
    }

    /// Move the selected binding one row up or down within its category.
    pub(crate) fn handle_reorder(&mut self, offset: isize) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let Screen::Bindings(ref mut bindings) = self.screen else {
            return Ok(());
        };
        let Some((category_id, moved_id, ids)) = bindings.reordered_ids(offset) else {
            return Ok(());
        };

        let game_id = bindings.game.id;
        match reorder_bindings(&self.conn, game_id, category_id, &ids) {
            Ok(rows) => {
                bindings.replace_section(category_id, rows);
                bindings.focus_binding(moved_id);
                self.clear_status();
            }
            Err(err) => {
                self.report_error(&err.into());
            }
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        if matches!(self.screen, Screen::Games) {
            self.handle_games_key(code, exit)
        } else {
            self.handle_bindings_key(code, exit)
        }
    }

    fn handle_games_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.move_game_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_game_selection(1),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.games.len().saturating_sub(1),
            KeyCode::Enter => {
                if let Some(game) = self.current_game().cloned() {
                    self.clear_status();
                    self.open_bindings(game)?;
                }
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::AddingGame(GameForm::default()));
            }
            KeyCode::Char('e') => {
                if let Some(game) = self.current_game() {
                    let form = GameForm::from_game(game);
                    self.clear_status();
                    return Ok(Mode::EditingGame(form));
                }
            }
            KeyCode::Char('-') | KeyCode::Delete => {
                if let Some(game) = self.current_game() {
                    let confirm = ConfirmGameDelete {
                        id: game.id,
                        name: game.name.clone(),
                    };
                    return Ok(Mode::ConfirmGameDelete(confirm));
                }
            }
            KeyCode::Char('a') => return self.open_action_form(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_bindings_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Bindings(ref mut bindings) = self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if bindings.print_layout {
                    bindings.print_layout = false;
                } else {
                    let focus = bindings.game.id;
                    self.screen = Screen::Games;
                    self.clear_status();
                    self.reload_games(Some(focus))?;
                }
            }
            KeyCode::Char('p') => bindings.print_layout = !bindings.print_layout,
            _ if bindings.print_layout => {}
            KeyCode::Up | KeyCode::Char('k') => bindings.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => bindings.move_selection(1),
            KeyCode::PageUp => bindings.move_selection(-10),
            KeyCode::PageDown => bindings.move_selection(10),
            KeyCode::Home => bindings.select_first(),
            KeyCode::End => bindings.select_last(),
            KeyCode::Char('[') => self.handle_reorder(-1)?,
            KeyCode::Char(']') => self.handle_reorder(1)?,
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(binding) = bindings.current().cloned() {
                    let default = default_binding_for_action(&self.conn, binding.action_id)?;
                    let form = BindingForm::for_existing(
                        &binding,
                        default.as_ref(),
                        &self.keys,
                        &self.modifiers,
                    );
                    self.clear_status();
                    return Ok(Mode::EditingBinding(form));
                }
            }
            KeyCode::Char('+') => {
                let actions = fetch_unbound_actions(&self.conn, bindings.game.id)?;
                if actions.is_empty() {
                    self.set_status("Every action already has a binding.", StatusKind::Info);
                } else {
                    self.clear_status();
                    return Ok(Mode::AddingBinding(BindingForm::for_new(
                        &actions,
                        &self.keys,
                        &self.modifiers,
                    )));
                }
            }
            KeyCode::Char('-') | KeyCode::Delete => {
                if let Some(binding) = bindings.current().cloned() {
                    return Ok(Mode::ConfirmBindingDelete(ConfirmBindingDelete { binding }));
                }
            }
            KeyCode::Char('c') => {
                let confirm = ConfirmCopyDefaults {
                    game_id: bindings.game.id,
                    name: bindings.game.name.clone(),
                };
                return Ok(Mode::ConfirmCopyDefaults(confirm));
            }
            KeyCode::Char('a') => return self.open_action_form(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_game_form(&mut self, code: KeyCode, mut form: GameForm, editing: bool) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left => form.cycle(-1),
            KeyCode::Right => form.cycle(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_game(&form) {
                Ok(_) => keep_open = false,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(match (keep_open, editing) {
            (false, _) => Mode::Normal,
            (true, true) => Mode::EditingGame(form),
            (true, false) => Mode::AddingGame(form),
        })
    }

    fn handle_confirm_game_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmGameDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_game(&self.conn, confirm.id) {
                    Ok(message) => {
                        self.reload_games(None)?;
                        self.set_status(message, StatusKind::Info);
                    }
                    Err(err) => {
                        self.report_error(&err.into());
                    }
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmGameDelete(confirm)),
        }
    }

    fn handle_action_form(&mut self, code: KeyCode, mut form: ActionForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add action cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.toggle_field(1),
            KeyCode::BackTab | KeyCode::Up => form.toggle_field(-1),
            KeyCode::Left => form.cycle(-1),
            KeyCode::Right => form.cycle(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_action(&form) {
                Ok(_) => keep_open = false,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingAction(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_binding_form(&mut self, code: KeyCode, mut form: BindingForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.toggle_field(1),
            KeyCode::BackTab | KeyCode::Up => form.toggle_field(-1),
            KeyCode::Left => form.cycle(-1),
            KeyCode::Right => form.cycle(1),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_binding(&form) {
                Ok(_) => keep_open = false,
                Err(err) => form.error = Some(self.report_error(&err)),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(match (keep_open, form.binding_id.is_some()) {
            (false, _) => Mode::Normal,
            (true, true) => Mode::EditingBinding(form),
            (true, false) => Mode::AddingBinding(form),
        })
    }

    fn handle_confirm_binding_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmBindingDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = self.perform_binding_delete(&confirm) {
                    self.report_error(&err);
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmBindingDelete(confirm)),
        }
    }

    fn handle_confirm_copy(&mut self, code: KeyCode, confirm: ConfirmCopyDefaults) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Copy cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match copy_default_bindings(&self.conn, confirm.game_id) {
                    Ok(written) => {
                        self.refresh_layout()?;
                        self.set_status(
                            format!(
                                "Copied {written} default binding(s) into '{}'.",
                                confirm.name
                            ),
                            StatusKind::Info,
                        );
                    }
                    Err(err) => {
                        self.report_error(&err.into());
                    }
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmCopyDefaults(confirm)),
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Games => self.draw_games(frame, content_area),
            Screen::Bindings(bindings) if bindings.print_layout => {
                self.draw_print_layout(frame, content_area, bindings)
            }
            Screen::Bindings(bindings) => self.draw_bindings(frame, content_area, bindings),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingGame(form) => self.draw_game_form(frame, area, "Add Game", form),
            Mode::EditingGame(form) => self.draw_game_form(frame, area, "Edit Game", form),
            Mode::ConfirmGameDelete(confirm) => {
                let lines = vec![
                    Line::from(format!("Delete game '{}'?", confirm.name)),
                    Line::from("All of its bindings are removed with it."),
                ];
                draw_confirm(frame, area, "Confirm Delete", lines);
            }
            Mode::AddingAction(form) => {
                let lines = form.build_lines();
                draw_form(
                    frame,
                    area,
                    "Add Action",
                    (60, 45),
                    lines,
                    form.error.as_deref(),
                    form.cursor(),
                );
            }
            Mode::AddingBinding(form) => self.draw_binding_form(frame, area, "Add Binding", form),
            Mode::EditingBinding(form) => {
                self.draw_binding_form(frame, area, "Edit Binding", form)
            }
            Mode::ConfirmBindingDelete(confirm) => {
                let lines = vec![Line::from(format!(
                    "Remove the binding for '{}' ({})?",
                    confirm.binding.action_name,
                    confirm.binding.key_label()
                ))];
                draw_confirm(frame, area, "Confirm Removal", lines);
            }
            Mode::ConfirmCopyDefaults(confirm) => {
                let lines = vec![
                    Line::from(format!(
                        "Reset '{}' to the default layout?",
                        confirm.name
                    )),
                    Line::from("Bindings shared with the default game are overwritten."),
                ];
                draw_confirm(frame, area, "Copy Defaults", lines);
            }
            Mode::Normal => {}
        }
    }

    fn draw_games(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Games");
        if self.games.is_empty() {
            let message = Paragraph::new("No games yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = self
            .games
            .iter()
            .map(|game| {
                let name_style = if game.is_default() {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let mut spans = vec![
                    Span::styled(game.name.clone(), name_style),
                    Span::styled(
                        format!("  {}", game.game_type),
                        Style::default().fg(Color::Gray),
                    ),
                ];
                if game.image.is_some() {
                    spans.push(Span::styled(
                        "  [image]",
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_bindings(&self, frame: &mut Frame, area: Rect, bindings: &BindingsScreen) {
        let title = format!("{} ({})", bindings.game.name, bindings.game.game_type);
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let header_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();
        let mut selected_line = 0usize;
        let mut row_index = 0usize;

        for section in &bindings.sections {
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled(
                section.category.name.to_uppercase(),
                header_style,
            )));
            if section.bindings.is_empty() {
                lines.push(Line::from(Span::styled(
                    "  (no bindings)",
                    Style::default().fg(Color::DarkGray),
                )));
                continue;
            }
            for binding in &section.bindings {
                let selected = row_index == bindings.selected;
                if selected {
                    selected_line = lines.len();
                }
                lines.push(binding_row(
                    binding,
                    bindings.is_different(binding.action_id),
                    selected,
                ));
                row_index += 1;
            }
        }

        if row_index == 0 && bindings.sections.is_empty() {
            lines.push(Line::from("No actions yet. Press 'a' to add one."));
        }

        let visible = inner.height.max(1) as usize;
        let scroll = selected_line.saturating_sub(visible - 1) as u16;
        let paragraph = Paragraph::new(lines).scroll((scroll, 0));
        frame.render_widget(paragraph, inner);
    }

    fn draw_print_layout(&self, frame: &mut Frame, area: Rect, bindings: &BindingsScreen) {
        let text = render_layout(&bindings.game, &bindings.sections, &bindings.differences);
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Print Layout"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match &self.mode {
            Mode::Normal => match &self.screen {
                Screen::Games => &[
                    ("[↑↓]", " Navigate   "),
                    ("[Enter]", " Open   "),
                    ("[+]", " Add Game   "),
                    ("[e]", " Edit   "),
                    ("[-]", " Delete   "),
                    ("[a]", " New Action   "),
                    ("[q]", " Quit"),
                ],
                Screen::Bindings(bindings) if bindings.print_layout => {
                    &[("[p]", " Table View   "), ("[Esc]", " Back   "), ("[q]", " Quit")]
                }
                Screen::Bindings(_) => &[
                    ("[↑↓]", " Navigate   "),
                    ("[Ctrl+↑↓]", " Move   "),
                    ("[e]", " Edit   "),
                    ("[+]", " Add   "),
                    ("[-]", " Remove   "),
                    ("[c]", " Copy Defaults   "),
                    ("[p]", " Print   "),
                    ("[Esc]", " Back   "),
                    ("[q]", " Quit"),
                ],
            },
            Mode::ConfirmGameDelete(_)
            | Mode::ConfirmBindingDelete(_)
            | Mode::ConfirmCopyDefaults(_) => &[("[y]", " Confirm   "), ("[n/Esc]", " Cancel")],
            _ => &[
                ("[Tab]", " Next Field   "),
                ("[←→]", " Choose   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
        };

        let spans: Vec<Span<'static>> = hints
            .iter()
            .flat_map(|(key, label)| {
                [
                    Span::styled(key.to_string(), key_style),
                    Span::raw(label.to_string()),
                ]
            })
            .collect();
        Line::from(spans)
    }

    fn draw_game_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &GameForm) {
        draw_form(
            frame,
            area,
            title,
            (60, 40),
            form.build_lines(),
            form.error.as_deref(),
            form.cursor(),
        );
    }

    fn draw_binding_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BindingForm) {
        draw_form(
            frame,
            area,
            title,
            (70, 50),
            form.build_lines(),
            form.error.as_deref(),
            form.cursor(),
        );
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Show a failure in the footer and hand the message back for the form.
    fn report_error(&mut self, err: &anyhow::Error) -> String {
        let (message, kind) = surface_error(err);
        let status_kind = match kind {
            Some(ErrorKind::Validation) => StatusKind::Warning,
            _ => StatusKind::Error,
        };
        tracing::warn!(%message, "action failed");
        self.set_status(message.clone(), status_kind);
        message
    }

    fn save_game(&mut self, form: &GameForm) -> Result<()> {
        let image = form.load_image()?;
        let game = upsert_game(&self.conn, &form.name, form.game_type().as_str(), image)?;
        self.reload_games(Some(game.id))?;
        self.set_status(format!("Saved game '{}'.", game.name), StatusKind::Info);
        Ok(())
    }

    fn save_new_action(&mut self, form: &ActionForm) -> Result<()> {
        let (name, category, key, modifier) = form.inputs();
        let action = add_new_action(&self.conn, &name, &category, &key, &modifier)?;
        let on_default =
            matches!(&self.screen, Screen::Bindings(bindings) if bindings.game.is_default());
        if on_default {
            self.refresh_layout()?;
        } else {
            self.refresh_categories()?;
        }
        self.set_status(
            format!(
                "Added action '{}' with default {}.",
                action.name,
                form.key.selected_label().unwrap_or_default()
            ),
            StatusKind::Info,
        );
        Ok(())
    }

    fn save_binding(&mut self, form: &BindingForm) -> Result<()> {
        let Screen::Bindings(ref bindings) = self.screen else {
            return Ok(());
        };
        let game_id = bindings.game.id;
        let modifier_id = form
            .modifier
            .selected_id()
            .ok_or_else(|| anyhow!("Please choose a modifier."))?;

        let binding = match form.binding_id {
            Some(id) => update_binding(
                &self.conn,
                id,
                form.key.selected_id(),
                modifier_id,
                &form.description,
            )?,
            None => {
                let action_id = form
                    .action
                    .selected_id()
                    .ok_or_else(|| anyhow!("Please choose an action."))?;
                create_binding(
                    &self.conn,
                    game_id,
                    action_id,
                    form.key.selected_id(),
                    modifier_id,
                    &form.description,
                )?
            }
        };

        let category_id = fetch_binding_view(&self.conn, binding.id)?.category_id;
        self.refresh_category(BindingLocation {
            game_id,
            category_id,
        })?;
        if let Screen::Bindings(ref mut bindings) = self.screen {
            bindings.focus_binding(binding.id);
        }
        self.set_status("Binding saved.", StatusKind::Info);
        Ok(())
    }

    fn perform_binding_delete(&mut self, confirm: &ConfirmBindingDelete) -> Result<()> {
        let location = delete_binding(&self.conn, confirm.binding.id)?;
        self.refresh_category(location)?;
        self.set_status(
            format!("Removed binding for '{}'.", confirm.binding.action_name),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Replace one category table and recompute the differences; the other
    /// tables are left as they are.
    fn refresh_category(&mut self, location: BindingLocation) -> Result<()> {
        let Screen::Bindings(ref mut bindings) = self.screen else {
            return Ok(());
        };
        if bindings.game.id != location.game_id {
            return Ok(());
        }
        let rows = fetch_category_bindings(&self.conn, location.game_id, location.category_id)?;
        bindings.replace_section(location.category_id, rows);
        bindings.differences = compare_with_default(&self.conn, &bindings.game.name)?;
        Ok(())
    }

    /// Reload every table of the open game, keeping the selection on the same
    /// binding when it still exists.
    fn refresh_layout(&mut self) -> Result<()> {
        let Screen::Bindings(ref mut bindings) = self.screen else {
            return Ok(());
        };
        let focus = bindings.current().map(|binding| binding.id);
        bindings.sections = fetch_game_layout(&self.conn, bindings.game.id)?;
        bindings.differences = compare_with_default(&self.conn, &bindings.game.name)?;
        bindings.ensure_in_bounds();
        if let Some(id) = focus {
            bindings.focus_binding(id);
        }
        Ok(())
    }

    /// A new category may have appeared; pick it up without touching rows.
    fn refresh_categories(&mut self) -> Result<()> {
        let Screen::Bindings(ref mut bindings) = self.screen else {
            return Ok(());
        };
        let known: Vec<i64> = bindings
            .sections
            .iter()
            .map(|section| section.category.id)
            .collect();
        for section in fetch_game_layout(&self.conn, bindings.game.id)? {
            if !known.contains(&section.category.id) {
                bindings.sections.push(section);
            }
        }
        Ok(())
    }

    fn reload_games(&mut self, focus_id: Option<i64>) -> Result<()> {
        let mut games = vec![fetch_default_game(&self.conn)?];
        games.extend(fetch_games(&self.conn)?);
        self.games = games;

        if let Some(id) = focus_id {
            if let Some(idx) = self.games.iter().position(|game| game.id == id) {
                self.selected = idx;
                return Ok(());
            }
        }

        if self.selected >= self.games.len() {
            self.selected = self.games.len().saturating_sub(1);
        }
        Ok(())
    }

    fn open_bindings(&mut self, game: Game) -> Result<()> {
        let game = fetch_game(&self.conn, game.id)?;
        let sections = fetch_game_layout(&self.conn, game.id)?;
        let differences = compare_with_default(&self.conn, &game.name)?;
        tracing::debug!(game = %game.name, categories = sections.len(), "opened layout");
        self.screen = Screen::Bindings(BindingsScreen::new(game, sections, differences));
        Ok(())
    }

    fn open_action_form(&mut self) -> Result<Mode> {
        let categories = fetch_categories(&self.conn)?
            .into_iter()
            .map(|category| category.name)
            .collect();
        self.clear_status();
        Ok(Mode::AddingAction(ActionForm::new(
            categories,
            &self.keys,
            &self.modifiers,
        )))
    }

    fn current_game(&self) -> Option<&Game> {
        self.games.get(self.selected)
    }

    fn move_game_selection(&mut self, offset: isize) {
        if self.games.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.games.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }
}

fn binding_row(binding: &BindingView, different: bool, selected: bool) -> Line<'static> {
    let mut style = if different {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }

    Line::from(vec![
        Span::raw(if selected { "▶ " } else { "  " }),
        Span::styled(
            format!(
                "{:<ACTION_COLUMN$}{:<KEY_COLUMN$}",
                binding.action_name,
                binding.key_label()
            ),
            style,
        ),
        Span::styled(
            binding.description.clone(),
            Style::default().fg(Color::Gray),
        ),
    ])
}

/// Popup with the form's lines, then either its error or the key hints.
fn draw_form(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    (percent_x, percent_y): (u16, u16),
    mut lines: Vec<Line<'static>>,
    error: Option<&str>,
    cursor: Option<(u16, u16)>,
) {
    let popup_area = centered_rect(percent_x, percent_y, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    lines.push(Line::from(""));
    match error {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::from(Span::styled(
            "Enter to save • Tab to switch • ←→ to choose • Esc to cancel",
            Style::default().fg(Color::Gray),
        ))),
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    if let Some((x, y)) = cursor {
        frame.set_cursor_position((inner.x + x, inner.y + y));
    }
}

fn draw_confirm(frame: &mut Frame, area: Rect, title: &str, mut lines: Vec<Line<'static>>) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Y to confirm or N / Esc to cancel.",
        Style::default().fg(Color::Gray),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}
