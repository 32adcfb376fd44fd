use driver::{Breakpoint, Driver, Event};

use super::{ListView, ViewLine};

#[derive(Debug, Default)]
pub struct BreakpointsPane {
    pub(super) view: ListView,
}

impl BreakpointsPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, event: &Event, driver: &dyn Driver) -> eyre::Result<()> {
        if let Event::BreakpointChanged { .. } = event {
            self.rebuild(driver);
        }
        Ok(())
    }

    fn rebuild(&mut self, driver: &dyn Driver) {
        let lines = driver
            .breakpoints()
            .into_iter()
            .filter_map(|breakpoint| match breakpoint {
                Ok(breakpoint) => Some(breakpoint),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping breakpoint");
                    None
                }
            })
            .filter(|breakpoint| !breakpoint.internal)
            .map(|breakpoint| ViewLine::normal(describe(&breakpoint)))
            .collect();
        self.view.set_lines(lines);
    }
}

fn describe(breakpoint: &Breakpoint) -> String {
    if breakpoint.enabled {
        format!("{}: {}", breakpoint.id, breakpoint.description)
    } else {
        format!("{}: (disabled) {}", breakpoint.id, breakpoint.description)
    }
}
