//! Terminal prompts drawn in an inline ratatui viewport

use std::env;
use std::io::{self, Stdout, Write};
use std::process::Command;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal, TerminalOptions, Viewport};

use super::{Answer, PromptError, Prompter, Question, Validator};

/// Rows shown at once by a select list
const MAX_VISIBLE_OPTIONS: usize = 10;

/// Raw mode cleanup guard
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Outcome of one key press
#[derive(Debug, PartialEq)]
enum Step<T> {
    Continue,
    Done(T),
    Interrupt,
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d')))
}

struct SelectState {
    options: Vec<String>,
    list: ListState,
}

impl SelectState {
    fn new(options: &[String], default: Option<&str>) -> Self {
        let selected = default
            .and_then(|d| options.iter().position(|o| o == d))
            .unwrap_or(0);
        SelectState {
            options: options.to_vec(),
            list: ListState::default().with_selected(Some(selected)),
        }
    }

    fn selected(&self) -> usize {
        self.list.selected().unwrap_or(0)
    }

    fn on_key(&mut self, key: KeyEvent) -> Step<String> {
        if is_interrupt(&key) {
            return Step::Interrupt;
        }
        let last = self.options.len().saturating_sub(1);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.selected();
                self.list.select(Some(if i == 0 { last } else { i - 1 }));
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                let i = self.selected();
                self.list.select(Some(if i >= last { 0 } else { i + 1 }));
            }
            KeyCode::Home => self.list.select(Some(0)),
            KeyCode::End => self.list.select(Some(last)),
            KeyCode::Enter => {
                if let Some(option) = self.options.get(self.selected()) {
                    return Step::Done(option.clone());
                }
            }
            _ => {}
        }
        Step::Continue
    }
}

struct InputState {
    buffer: String,
    default: Option<String>,
    error: Option<String>,
    validator: Option<Validator>,
}

impl InputState {
    fn on_key(&mut self, key: KeyEvent) -> Step<String> {
        if is_interrupt(&key) {
            return Step::Interrupt;
        }
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.buffer.push(c);
                self.error = None;
            }
            KeyCode::Backspace => {
                self.buffer.pop();
                self.error = None;
            }
            KeyCode::Enter => {
                let value = match (&self.default, self.buffer.is_empty()) {
                    (Some(default), true) => default.clone(),
                    _ => self.buffer.clone(),
                };
                if let Some(check) = &self.validator {
                    if let Err(message) = check(&value) {
                        self.error = Some(message);
                        return Step::Continue;
                    }
                }
                return Step::Done(value);
            }
            _ => {}
        }
        Step::Continue
    }
}

fn confirm_key(key: KeyEvent, default: bool) -> Step<bool> {
    if is_interrupt(&key) {
        return Step::Interrupt;
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Step::Done(true),
        KeyCode::Char('n') | KeyCode::Char('N') => Step::Done(false),
        KeyCode::Enter => Step::Done(default),
        _ => Step::Continue,
    }
}

fn mask(text: &str) -> String {
    "*".repeat(text.chars().count())
}

fn question_line(message: &str) -> Vec<Span<'static>> {
    vec![
        Span::styled("? ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::styled(message.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
    ]
}

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter
    }

    /// Runs one inline prompt until it completes or is interrupted
    fn run_inline<S, T>(
        &self,
        height: u16,
        state: &mut S,
        draw: impl Fn(&mut Frame, &mut S),
        mut on_key: impl FnMut(&mut S, KeyEvent) -> Step<T>,
    ) -> Result<T, PromptError> {
        let guard = RawModeGuard::enable()?;
        let mut terminal: Terminal<CrosstermBackend<Stdout>> = Terminal::with_options(
            CrosstermBackend::new(io::stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        )?;

        let outcome = loop {
            terminal.draw(|f| draw(f, state))?;

            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match on_key(state, key) {
                    Step::Continue => {}
                    Step::Done(value) => break Ok(value),
                    Step::Interrupt => break Err(PromptError::Interrupted),
                }
            }
        };

        terminal.clear()?;
        drop(guard);
        outcome
    }

    fn select(
        &self,
        message: &str,
        options: &[String],
        default: Option<&str>,
    ) -> Result<Answer, PromptError> {
        if options.is_empty() {
            return Err(PromptError::Unexpected(format!("no options for {:?}", message)));
        }
        let visible = options.len().min(MAX_VISIBLE_OPTIONS) as u16;
        let mut state = SelectState::new(options, default);

        let choice = self.run_inline(
            visible + 2,
            &mut state,
            |f, state| {
                let chunks = Layout::vertical([
                    Constraint::Length(1),
                    Constraint::Length(visible),
                    Constraint::Length(1),
                ])
                .split(f.area());

                f.render_widget(Paragraph::new(Line::from(question_line(message))), chunks[0]);

                let items: Vec<ListItem> = state
                    .options
                    .iter()
                    .map(|o| ListItem::new(o.as_str()))
                    .collect();
                let list = List::new(items)
                    .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");
                f.render_stateful_widget(list, chunks[1], &mut state.list);

                f.render_widget(
                    Paragraph::new("[↑↓ to move, enter to select, esc to go back]")
                        .style(Style::default().fg(Color::DarkGray)),
                    chunks[2],
                );
            },
            SelectState::on_key,
        )?;

        print_answer(message, &choice);
        Ok(Answer::Choice(choice))
    }

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        secret: bool,
        validator: Option<&Validator>,
    ) -> Result<Answer, PromptError> {
        let mut state = InputState {
            buffer: String::new(),
            default: default.map(str::to_string),
            error: None,
            validator: validator.cloned(),
        };

        let text = self.run_inline(
            2,
            &mut state,
            |f, state| {
                let chunks =
                    Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).split(f.area());

                let mut spans = question_line(message);
                if state.buffer.is_empty() {
                    if let Some(default) = &state.default {
                        spans.push(Span::styled(
                            format!("({}) ", default),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                }
                let shown = if secret { mask(&state.buffer) } else { state.buffer.clone() };
                spans.push(Span::styled(shown, Style::default().fg(Color::Cyan)));
                f.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

                if let Some(error) = &state.error {
                    f.render_widget(
                        Paragraph::new(format!("✗ {}", error)).style(Style::default().fg(Color::Red)),
                        chunks[1],
                    );
                }
            },
            InputState::on_key,
        )?;

        print_answer(message, &if secret { mask(&text) } else { text.clone() });
        Ok(Answer::Text(text))
    }

    fn confirm(&self, message: &str, default: bool) -> Result<Answer, PromptError> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        let value = self.run_inline(
            1,
            &mut (),
            |f, _| {
                let mut spans = question_line(message);
                spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
                f.render_widget(Paragraph::new(Line::from(spans)), f.area());
            },
            |_, key| confirm_key(key, default),
        )?;

        print_answer(message, if value { "Yes" } else { "No" });
        Ok(Answer::Bool(value))
    }

    fn edit(
        &self,
        message: &str,
        initial: &str,
        extension: &str,
        validator: Option<&Validator>,
    ) -> Result<Answer, PromptError> {
        let mut content = initial.to_string();
        loop {
            println!("{} {} {}", "?".green().bold(), message.bold(), "[editor]".dark_grey());
            content = open_editor(&content, extension)?;

            match validator.map(|check| check(&content)) {
                Some(Err(error)) => println!("{}", format!("✗ {}", error).red()),
                _ => return Ok(Answer::Text(content)),
            }
        }
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&self, question: &Question) -> Result<Answer, PromptError> {
        match question {
            Question::Select {
                message,
                options,
                default,
            } => self.select(message, options, default.as_deref()),
            Question::Input {
                message,
                default,
                secret,
                validator,
            } => self.input(message, default.as_deref(), *secret, validator.as_ref()),
            Question::Confirm { message, default } => self.confirm(message, *default),
            Question::Editor {
                message,
                initial,
                extension,
                validator,
            } => self.edit(message, initial, extension, validator.as_ref()),
        }
    }
}

/// Leaves the answered question in the scrollback
fn print_answer(message: &str, answer: &str) {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "{} {} {}", "?".green().bold(), message.bold(), answer.cyan());
    let _ = stdout.flush();
}

/// Editor command: `$VISUAL`, then `$EDITOR`, then `vi`
fn editor_command() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string())
}

/// Opens `initial` in the user's editor and returns the saved text
fn open_editor(initial: &str, extension: &str) -> Result<String, PromptError> {
    let mut file = tempfile::Builder::new()
        .prefix("http-tanker-")
        .suffix(extension)
        .tempfile()?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;

    let editor = editor_command();
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");

    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .map_err(|e| PromptError::Editor(format!("{}: {}", program, e)))?;
    if !status.success() {
        return Err(PromptError::Editor(format!("{} exited with {}", program, status)));
    }

    Ok(std::fs::read_to_string(file.path())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn options() -> Vec<String> {
        vec!["Run".into(), "Edit".into(), "Exit".into()]
    }

    #[test]
    fn test_select_wraps_and_picks() {
        let mut state = SelectState::new(&options(), None);
        assert_eq!(state.on_key(key(KeyCode::Up)), Step::Continue);
        assert_eq!(state.on_key(key(KeyCode::Enter)), Step::Done("Exit".into()));
        assert_eq!(state.on_key(key(KeyCode::Down)), Step::Continue);
        assert_eq!(state.on_key(key(KeyCode::Enter)), Step::Done("Run".into()));
    }

    #[test]
    fn test_select_starts_on_default() {
        let mut state = SelectState::new(&options(), Some("Edit"));
        assert_eq!(state.on_key(key(KeyCode::Enter)), Step::Done("Edit".into()));
    }

    #[test]
    fn test_interrupt_keys() {
        let mut state = SelectState::new(&options(), None);
        assert_eq!(state.on_key(key(KeyCode::Esc)), Step::Interrupt);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(state.on_key(ctrl_c), Step::Interrupt);
        assert_eq!(confirm_key(ctrl_c, true), Step::Interrupt);
    }

    #[test]
    fn test_input_default_and_validation() {
        let validator: Validator = Arc::new(|s: &str| {
            if s.starts_with('{') {
                Ok(())
            } else {
                Err("Wrong input format".to_string())
            }
        });
        let mut state = InputState {
            buffer: String::new(),
            default: Some("{}".into()),
            error: None,
            validator: Some(validator),
        };
        assert_eq!(state.on_key(key(KeyCode::Enter)), Step::Done("{}".into()));

        state.on_key(key(KeyCode::Char('x')));
        assert_eq!(state.on_key(key(KeyCode::Enter)), Step::Continue);
        assert_eq!(state.error.as_deref(), Some("Wrong input format"));

        state.on_key(key(KeyCode::Backspace));
        assert!(state.error.is_none());
        for c in "{\"a\":\"b\"}".chars() {
            state.on_key(key(KeyCode::Char(c)));
        }
        assert_eq!(state.on_key(key(KeyCode::Enter)), Step::Done("{\"a\":\"b\"}".into()));
    }

    #[test]
    fn test_confirm_default() {
        assert_eq!(confirm_key(key(KeyCode::Enter), false), Step::Done(false));
        assert_eq!(confirm_key(key(KeyCode::Char('Y')), false), Step::Done(true));
        assert_eq!(confirm_key(key(KeyCode::Char('x')), false), Step::Continue);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("s3cr€t"), "******");
    }
}
