use crossterm::event::{KeyCode, KeyEvent};
use driver::Driver;
use unicode_width::UnicodeWidthStr;

use super::{KeyOutcome, LineClass, ListView, ViewLine};
use crate::history::HistoryCursor;

/// Console for typing debugger commands, with history and completion
#[derive(Debug, Default)]
pub struct CommandPane {
    input: String,
    character_index: usize,
    history: HistoryCursor,
    view: ListView,
}

impl CommandPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.character_index
    }

    /// Terminal columns taken by the input before the cursor
    pub fn cursor_width(&self) -> usize {
        self.input[..self.byte_index()].width()
    }

    pub(super) fn view(&self) -> &ListView {
        &self.view
    }

    pub(super) fn view_mut(&mut self) -> &mut ListView {
        &mut self.view
    }

    pub fn handle_key(&mut self, key: KeyEvent, driver: &dyn Driver) -> KeyOutcome {
        match key.code {
            KeyCode::Enter => return self.submit(driver),
            KeyCode::Char(to_insert) => self.enter_char(to_insert),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Up => {
                let text = self.history.older(&self.input);
                self.set_input(text);
            }
            KeyCode::Down => {
                let text = self.history.newer();
                self.set_input(text);
            }
            KeyCode::Tab => self.complete(driver),
            KeyCode::PageUp => self.view.page_up(),
            KeyCode::PageDown => self.view.page_down(),
            _ => return KeyOutcome::Ignored,
        }
        self.view.mark_dirty();
        KeyOutcome::Handled
    }

    fn submit(&mut self, driver: &dyn Driver) -> KeyOutcome {
        // an empty line repeats the previous command
        let command = if self.input.is_empty() {
            self.history.older("")
        } else {
            std::mem::take(&mut self.input)
        };
        self.set_input(String::new());
        self.history.reset();

        if command.is_empty() {
            return KeyOutcome::Handled;
        }

        if matches!(command.trim(), "q" | "quit") {
            tracing::info!("quit requested from the command line");
            if let Err(e) = driver.terminate() {
                tracing::warn!(error = %e, "terminating debugger");
            }
            return KeyOutcome::Quit;
        }

        self.history.record(&command);
        self.run(driver, &command);
        KeyOutcome::Handled
    }

    /// Run a command and append what it printed to the scrollback
    pub fn run(&mut self, driver: &dyn Driver, command: &str) {
        tracing::debug!(%command, "running command");
        let result = driver.handle_command(command);
        for line in result.output.lines() {
            self.view.push(ViewLine::new(line, LineClass::Normal));
        }
        if !result.succeeded {
            for line in result.error.lines() {
                self.view.push(ViewLine::new(line, LineClass::Error));
            }
        }
        self.view.follow_tail();
    }

    fn complete(&mut self, driver: &dyn Driver) {
        let candidates: Vec<String> = driver
            .completions(&self.input, self.input.chars().count())
            .into_iter()
            .filter(|candidate| !candidate.is_empty())
            .collect();

        match candidates.as_slice() {
            [] => self.info("No completions"),
            [only] => {
                let completed = if only.starts_with(self.input.as_str()) {
                    only.clone()
                } else {
                    format!("{}{only}", self.input)
                };
                self.set_input(completed);
            }
            many => {
                self.info("Available completions:");
                for candidate in many {
                    self.info(candidate);
                }
            }
        }
    }

    pub fn report_error(&mut self, message: &str) {
        for line in message.lines() {
            self.view.push(ViewLine::new(line, LineClass::Error));
        }
        self.view.follow_tail();
    }

    fn info(&mut self, text: &str) {
        self.view.push(ViewLine::new(text, LineClass::Info));
        self.view.follow_tail();
    }

    /// Replace the input, leaving the cursor at its end
    fn set_input(&mut self, text: String) {
        self.input = text;
        self.character_index = self.input.chars().count();
    }

    fn move_cursor_right(&mut self) {
        let cursor_moved_right = self.character_index.saturating_add(1);
        self.character_index = self.clamp_cursor(cursor_moved_right);
    }

    fn move_cursor_left(&mut self) {
        let cursor_moved_left = self.character_index.saturating_sub(1);
        self.character_index = self.clamp_cursor(cursor_moved_left);
    }

    fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index();
        self.input.insert(index, new_char);
        self.move_cursor_right();
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.character_index)
            .unwrap_or(self.input.len())
    }

    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.input.chars().count())
    }

    fn delete_char(&mut self) {
        if self.character_index == 0 {
            return;
        }
        // rebuilt from chars so multi-byte characters are removed whole
        let before = self.input.chars().take(self.character_index - 1);
        let after = self.input.chars().skip(self.character_index);
        self.input = before.chain(after).collect();
        self.move_cursor_left();
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use driver::{CommandResult, testing::FakeDriver};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(pane: &mut CommandPane, driver: &FakeDriver, text: &str) {
        for c in text.chars() {
            pane.handle_key(key(KeyCode::Char(c)), driver);
        }
    }

    fn texts(pane: &CommandPane) -> Vec<(&str, LineClass)> {
        pane.view
            .lines()
            .iter()
            .map(|line| (line.text.as_str(), line.class))
            .collect()
    }

    #[test]
    fn editing_the_input() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "brak");
        pane.handle_key(key(KeyCode::Left), &driver);
        pane.handle_key(key(KeyCode::Left), &driver);
        pane.handle_key(key(KeyCode::Backspace), &driver);
        type_text(&mut pane, &driver, "re");
        assert_eq!(pane.input(), "break");
        assert_eq!(pane.cursor(), 3);

        pane.handle_key(key(KeyCode::Right), &driver);
        pane.handle_key(key(KeyCode::Right), &driver);
        pane.handle_key(key(KeyCode::Right), &driver);
        assert_eq!(pane.cursor(), 5);
    }

    #[test]
    fn multibyte_characters_are_edited_whole() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "pé");
        pane.handle_key(key(KeyCode::Backspace), &driver);
        assert_eq!(pane.input(), "p");
    }

    #[test]
    fn cursor_width_counts_columns() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "p 日本");
        assert_eq!(pane.cursor(), 4);
        assert_eq!(pane.cursor_width(), 6);
        pane.handle_key(key(KeyCode::Left), &driver);
        assert_eq!(pane.cursor_width(), 4);
    }

    #[test]
    fn submitting_runs_the_command() {
        let driver = FakeDriver::new();
        driver.respond("info line", CommandResult::success("Line 5 of main.c\nstarts here\n"));
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "info line");

        let outcome = pane.handle_key(key(KeyCode::Enter), &driver);

        assert_eq!(outcome, KeyOutcome::Handled);
        assert_eq!(driver.commands(), vec!["info line"]);
        assert_eq!(
            texts(&pane),
            vec![
                ("Line 5 of main.c", LineClass::Normal),
                ("starts here", LineClass::Normal)
            ]
        );
        assert_eq!(pane.input(), "");
        assert_eq!(pane.view.focus(), 1);
    }

    #[test]
    fn failures_are_error_lines() {
        let driver = FakeDriver::new();
        driver.respond(
            "frob",
            CommandResult::failure("Undefined command: \"frob\"."),
        );
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "frob");
        pane.handle_key(key(KeyCode::Enter), &driver);

        assert_eq!(
            texts(&pane),
            vec![("Undefined command: \"frob\".", LineClass::Error)]
        );
    }

    #[test]
    fn empty_line_repeats_the_previous_command() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "next");
        pane.handle_key(key(KeyCode::Enter), &driver);
        pane.handle_key(key(KeyCode::Enter), &driver);
        assert_eq!(driver.commands(), vec!["next", "next"]);
    }

    #[test]
    fn empty_line_without_history_does_nothing() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        let outcome = pane.handle_key(key(KeyCode::Enter), &driver);
        assert_eq!(outcome, KeyOutcome::Handled);
        assert!(driver.commands().is_empty());
    }

    #[test]
    fn blank_submit_keeps_the_next_draft() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        pane.handle_key(key(KeyCode::Enter), &driver);
        type_text(&mut pane, &driver, "abc");
        pane.handle_key(key(KeyCode::Up), &driver);
        pane.handle_key(key(KeyCode::Down), &driver);
        assert_eq!(pane.input(), "abc");
    }

    #[test]
    fn submit_after_walking_past_the_oldest_entry() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "run");
        pane.handle_key(key(KeyCode::Enter), &driver);

        // walk back past the oldest entry, leaving an empty line
        pane.handle_key(key(KeyCode::Up), &driver);
        pane.handle_key(key(KeyCode::Up), &driver);
        assert_eq!(pane.input(), "");
        pane.handle_key(key(KeyCode::Enter), &driver);
        assert_eq!(driver.commands(), vec!["run"]);

        type_text(&mut pane, &driver, "bt");
        pane.handle_key(key(KeyCode::Up), &driver);
        assert_eq!(pane.input(), "run");
        pane.handle_key(key(KeyCode::Down), &driver);
        assert_eq!(pane.input(), "bt");
    }

    #[test]
    fn quit_terminates_the_driver() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "quit");
        assert_eq!(pane.handle_key(key(KeyCode::Enter), &driver), KeyOutcome::Quit);
        assert!(driver.is_terminated());
        assert!(driver.commands().is_empty());
    }

    #[test]
    fn history_navigation_keeps_the_draft() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "run");
        pane.handle_key(key(KeyCode::Enter), &driver);
        type_text(&mut pane, &driver, "bt");

        pane.handle_key(key(KeyCode::Up), &driver);
        assert_eq!(pane.input(), "run");
        assert_eq!(pane.cursor(), 3);
        pane.handle_key(key(KeyCode::Down), &driver);
        assert_eq!(pane.input(), "bt");
    }

    #[test]
    fn ambiguous_completion_lists_candidates() {
        let driver = FakeDriver::new();
        driver.set_completions(["run", "runUntil"]);
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "ru");

        pane.handle_key(key(KeyCode::Tab), &driver);

        assert_eq!(pane.input(), "ru");
        assert_eq!(driver.completion_requests(), vec![("ru".to_string(), 2)]);
        assert_eq!(
            texts(&pane),
            vec![
                ("Available completions:", LineClass::Info),
                ("run", LineClass::Info),
                ("runUntil", LineClass::Info),
            ]
        );
    }

    #[test]
    fn single_completion_replaces_the_input() {
        let driver = FakeDriver::new();
        driver.set_completions(["run", ""]);
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "ru");

        pane.handle_key(key(KeyCode::Tab), &driver);

        assert_eq!(pane.input(), "run");
        assert_eq!(pane.cursor(), 3);
        assert!(texts(&pane).is_empty());
    }

    #[test]
    fn single_suffix_completion_is_appended() {
        let driver = FakeDriver::new();
        driver.set_completions(["ain"]);
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "break m");

        pane.handle_key(key(KeyCode::Tab), &driver);

        assert_eq!(pane.input(), "break main");
    }

    #[test]
    fn no_completions() {
        let driver = FakeDriver::new();
        let mut pane = CommandPane::new();
        type_text(&mut pane, &driver, "zz");
        pane.handle_key(key(KeyCode::Tab), &driver);
        assert_eq!(texts(&pane), vec![("No completions", LineClass::Info)]);
        assert_eq!(pane.input(), "zz");
    }
}
