use std::collections::HashSet;

use driver::{Driver, Event, ProcessState, SourceLocation};

use super::{LineClass, ListView, ViewLine};

const BREAKPOINT_MARKER: &str = "B> ";
const NO_MARKER: &str = "   ";

/// Source file around the selected frame
#[derive(Debug, Default)]
pub struct SourcePane {
    pub(super) view: ListView,
}

impl SourcePane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, event: &Event, driver: &dyn Driver) -> eyre::Result<()> {
        match event {
            Event::ProcessStateChanged {
                state: ProcessState::Exited,
                exit_code,
            } => self.show_exit(*exit_code, driver),
            Event::ProcessStateChanged {
                state: ProcessState::Stopped,
                ..
            }
            | Event::ThreadChanged { .. } => self.refresh(driver),
            Event::BreakpointChanged { .. } => {
                if let Some(location) = driver.selected_location() {
                    self.show_location(&location, driver);
                }
            }
            Event::ProcessStateChanged { .. } => {}
        }
        Ok(())
    }

    fn refresh(&mut self, driver: &dyn Driver) {
        match driver.selected_location() {
            Some(location) => self.show_location(&location, driver),
            None => self
                .view
                .set_lines(vec![ViewLine::centered("Source information unavailable")]),
        }
    }

    fn show_location(&mut self, location: &SourceLocation, driver: &dyn Driver) {
        let contents = match std::fs::read_to_string(&location.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(path = %location.path.display(), error = %e, "cannot read source");
                self.view
                    .set_lines(vec![ViewLine::centered(format!("unavailable: {e}"))]);
                return;
            }
        };

        let marked: HashSet<usize> = driver
            .breakpoints()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|breakpoint| !breakpoint.internal)
            .filter_map(|breakpoint| breakpoint.location)
            .filter(|bp_location| bp_location.same_file(&location.path))
            .map(|bp_location| bp_location.line)
            .collect();

        let lines = contents
            .lines()
            .enumerate()
            .map(|(index, text)| {
                let number = index + 1;
                let marker = if marked.contains(&number) {
                    BREAKPOINT_MARKER
                } else {
                    NO_MARKER
                };
                let class = if number == location.line {
                    LineClass::Current
                } else {
                    LineClass::Normal
                };
                ViewLine::new(format!("{marker}{number:>4} | {text}"), class)
            })
            .collect();

        self.view.set_lines(lines);
        self.view.set_focus(location.line.saturating_sub(1));
    }

    fn show_exit(&mut self, exit_code: Option<i32>, driver: &dyn Driver) {
        let process = driver.process();
        let target = process
            .as_ref()
            .and_then(|p| p.target.clone())
            .unwrap_or_else(|| "?".to_string());
        let pid = process
            .as_ref()
            .and_then(|p| p.pid)
            .map_or_else(|| "?".to_string(), |pid| pid.to_string());
        let code = exit_code
            .or_else(|| process.as_ref().and_then(|p| p.exit_code))
            .map_or_else(|| "?".to_string(), |code| code.to_string());

        self.view.set_lines(vec![ViewLine::centered(format!(
            "Process {target} [{pid}] has exited with exit-code {code}"
        ))]);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use driver::{Breakpoint, BreakpointChange, ProcessInfo, testing::FakeDriver};

    use super::*;
    use crate::panes::Align;

    fn stopped() -> Event {
        Event::ProcessStateChanged {
            state: ProcessState::Stopped,
            exit_code: None,
        }
    }

    fn source_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "int main() {{\n    int x = 1;\n    return x;\n}}\n").unwrap();
        file
    }

    fn breakpoint(id: i64, location: SourceLocation) -> Breakpoint {
        Breakpoint {
            id,
            enabled: true,
            internal: false,
            description: format!("at {}", location.line),
            location: Some(location),
        }
    }

    #[test]
    fn stopping_shows_the_current_line() {
        let file = source_file();
        let driver = FakeDriver::new();
        driver.set_location(Some(SourceLocation::new(file.path(), 2)));
        driver.set_breakpoints(vec![Ok(breakpoint(
            1,
            SourceLocation::new(file.path(), 3),
        ))]);

        let mut pane = SourcePane::new();
        pane.on_event(&stopped(), &driver).unwrap();

        let texts: Vec<&str> = pane.view.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "      1 | int main() {",
                "      2 |     int x = 1;",
                "B>    3 |     return x;",
                "      4 | }",
            ]
        );
        assert_eq!(pane.view.lines()[1].class, LineClass::Current);
        assert_eq!(pane.view.focus(), 1);
    }

    #[test]
    fn missing_location() {
        let driver = FakeDriver::new();
        let mut pane = SourcePane::new();
        pane.on_event(&Event::ThreadChanged { thread_id: 1 }, &driver)
            .unwrap();

        let lines = pane.view.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Source information unavailable");
        assert_eq!(lines[0].align, Align::Center);
    }

    #[test]
    fn unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver::new();
        driver.set_location(Some(SourceLocation::new(dir.path().join("gone.c"), 1)));

        let mut pane = SourcePane::new();
        pane.on_event(&stopped(), &driver).unwrap();

        let lines = pane.view.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.starts_with("unavailable: "), "{}", lines[0].text);
    }

    #[test]
    fn exit_message() {
        let driver = FakeDriver::new();
        driver.set_process(Some(ProcessInfo {
            target: Some("a.out".to_string()),
            pid: Some(42),
            state: ProcessState::Exited,
            exit_code: Some(0),
        }));

        let mut pane = SourcePane::new();
        pane.on_event(
            &Event::ProcessStateChanged {
                state: ProcessState::Exited,
                exit_code: Some(0),
            },
            &driver,
        )
        .unwrap();

        let texts: Vec<&str> = pane.view.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Process a.out [42] has exited with exit-code 0"]);
    }

    #[test]
    fn breakpoint_changes_refresh_markers() {
        let file = source_file();
        let driver = FakeDriver::new();
        let mut pane = SourcePane::new();
        let added = Event::BreakpointChanged {
            change: BreakpointChange::Added,
            id: 1,
        };

        // nothing to refresh without a frame
        pane.on_event(&added, &driver).unwrap();
        assert!(pane.view.lines().is_empty());

        driver.set_location(Some(SourceLocation::new(file.path(), 1)));
        pane.on_event(&stopped(), &driver).unwrap();
        assert!(!pane.view.lines()[0].text.starts_with(BREAKPOINT_MARKER));

        driver.set_breakpoints(vec![Ok(breakpoint(
            1,
            SourceLocation::new(file.path(), 1),
        ))]);
        pane.on_event(&added, &driver).unwrap();
        assert!(pane.view.lines()[0].text.starts_with(BREAKPOINT_MARKER));
    }

    #[test]
    fn running_keeps_the_view() {
        let file = source_file();
        let driver = FakeDriver::new();
        driver.set_location(Some(SourceLocation::new(file.path(), 1)));
        let mut pane = SourcePane::new();
        pane.on_event(&stopped(), &driver).unwrap();

        pane.on_event(
            &Event::ProcessStateChanged {
                state: ProcessState::Running,
                exit_code: None,
            },
            &driver,
        )
        .unwrap();
        assert_eq!(pane.view.lines().len(), 4);
    }
}
