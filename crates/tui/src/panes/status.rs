use driver::{Event, ProcessState};

use super::{Align, LineClass, ListView, ViewLine};

pub const LEGEND: &str = "LUI    F1 Demo  F3 Cycle-focus  F10 Quit";

/// Footer with the key legend and the process state
///
/// The view always holds two lines: the legend, then the right-aligned state.
#[derive(Debug)]
pub struct StatusPane {
    view: ListView,
    process_state: Option<ProcessState>,
}

impl Default for StatusPane {
    fn default() -> Self {
        let mut view = ListView::default();
        view.set_lines(vec![ViewLine::normal(LEGEND), state_line(String::new())]);
        Self {
            view,
            process_state: None,
        }
    }
}

impl StatusPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn view(&self) -> &ListView {
        &self.view
    }

    pub(super) fn view_mut(&mut self) -> &mut ListView {
        &mut self.view
    }

    pub fn legend(&self) -> &str {
        &self.view.lines()[0].text
    }

    pub fn state(&self) -> &str {
        &self.view.lines()[1].text
    }

    /// Last reported process state, `None` before the first process event
    pub fn process_state(&self) -> Option<ProcessState> {
        self.process_state
    }

    pub fn on_event(&mut self, event: &Event) -> eyre::Result<()> {
        if let Event::ProcessStateChanged { state, .. } = event {
            self.process_state = Some(*state);
            self.view
                .set_lines(vec![ViewLine::normal(LEGEND), state_line(state.to_string())]);
        }
        Ok(())
    }
}

fn state_line(state: String) -> ViewLine {
    ViewLine::new(state, LineClass::Info).aligned(Align::Right)
}

#[cfg(test)]
mod tests {
    use driver::BreakpointChange;

    use super::*;

    #[test]
    fn state_token_tracks_the_process() {
        let mut pane = StatusPane::new();
        assert_eq!(pane.state(), "");
        assert_eq!(pane.process_state(), None);

        pane.on_event(&Event::ProcessStateChanged {
            state: ProcessState::Running,
            exit_code: None,
        })
        .unwrap();
        assert_eq!(pane.state(), "running");
        assert_eq!(pane.process_state(), Some(ProcessState::Running));

        pane.on_event(&Event::BreakpointChanged {
            change: BreakpointChange::Removed,
            id: 1,
        })
        .unwrap();
        assert_eq!(pane.state(), "running");
        assert_eq!(pane.legend(), LEGEND);
    }
}
