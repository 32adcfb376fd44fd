use driver::Event;

use super::{ListView, ViewLine};

/// Every debugger event, newest last
#[derive(Debug, Default)]
pub struct EventLogPane {
    pub(super) view: ListView,
}

impl EventLogPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, event: &Event) -> eyre::Result<()> {
        self.view.push(ViewLine::normal(event.to_string()));
        self.view.follow_tail();
        Ok(())
    }
}
