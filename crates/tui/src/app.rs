use std::path::Path;

use bus::{EventBus, Listeners, Publisher};
use color_eyre::eyre::{self, Context};
use config::{LayoutError, LayoutNode};
use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use driver::{Driver, Event};
use ratatui::DefaultTerminal;

use crate::{
    layout::{Arrangement, LayoutBuilder},
    panes::{KeyOutcome, Pane, PaneId, Panes, StatusPane},
    render::{self, Screen},
};

const DEMO_TARGET: &str = "a.out";
const DEMO_COMMANDS: &[&str] = &["break main", "run"];

/// Panes built from a layout, wired to the event bus
pub struct Workspace {
    bus: EventBus<Event, PaneId>,
    panes: Panes,
    arrangement: Arrangement,
    status: PaneId,
}

impl Workspace {
    pub fn build(layout: &LayoutNode) -> Result<Self, LayoutError> {
        let bus = EventBus::new();
        let mut panes = Panes::default();
        let arrangement = LayoutBuilder::new(&mut panes, &bus).build(layout)?;

        let status = panes.insert(Pane::Status(StatusPane::new()));
        bus.register(status);

        Ok(Self {
            bus,
            panes,
            arrangement,
            status,
        })
    }

    /// Handle for the debugger to publish events with
    pub fn publisher(&self) -> Publisher<Event> {
        self.bus.publisher()
    }
}

/// Hands each event to the pane it is addressed to
struct Delivery<'a> {
    panes: &'a mut Panes,
    driver: &'a dyn Driver,
}

impl Listeners<PaneId, Event> for Delivery<'_> {
    fn deliver(&mut self, key: &PaneId, event: &Event) -> eyre::Result<()> {
        let pane = self
            .panes
            .get_mut(*key)
            .ok_or_else(|| eyre::eyre!("no pane with id {key:?}"))?;
        pane.on_event(event, self.driver)
            .wrap_err_with(|| format!("{} pane handling `{event}`", pane.title()))
    }
}

pub struct App<'a> {
    driver: &'a dyn Driver,
    workspace: Workspace,
    /// Panes in document order, for cycling focus
    focus_ring: Vec<PaneId>,
    focused: usize,
    redraw: bool,
    should_terminate: bool,
}

impl<'a> App<'a> {
    pub fn new(driver: &'a dyn Driver, workspace: Workspace) -> Self {
        let focus_ring = workspace.arrangement.panes();
        // start in the console when the layout has one
        let focused = focus_ring
            .iter()
            .position(|id| matches!(workspace.panes.get(*id), Some(Pane::Command(_))))
            .unwrap_or(0);
        Self {
            driver,
            workspace,
            focus_ring,
            focused,
            redraw: true,
            should_terminate: false,
        }
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> eyre::Result<()> {
        let (wake_tx, wake_rx) = bus::wake_channel();
        self.workspace
            .bus
            .arm_wake(wake_tx)
            .wrap_err("connecting the event bus to the UI")?;

        // set up background thread polling for keyboard events
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::Builder::new()
            .name("keyboard".to_string())
            .spawn(move || {
                loop {
                    match event::read() {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "error reading from event stream");
                        }
                    }
                }
            })
            .wrap_err("spawning keyboard thread")?;

        loop {
            if self.should_terminate {
                tracing::info!("terminating application");
                return Ok(());
            }

            if self.take_redraw() {
                terminal
                    .draw(|frame| render::draw(frame, &self.screen()))
                    .wrap_err("drawing frame")?;
            }

            crossbeam_channel::select! {
                recv(wake_rx) -> msg => match msg {
                    Ok(()) => self.dispatch_events()?,
                    Err(e) => {
                        tracing::info!(error = %e, "event bus closed");
                        return Ok(());
                    }
                },

                recv(rx) -> msg => match msg.wrap_err("keyboard thread stopped")? {
                    event::Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    event::Event::Resize(..) => self.redraw = true,
                    _ => {}
                },
            }
        }
    }

    /// Deliver every queued debugger event to the panes
    pub fn dispatch_events(&mut self) -> eyre::Result<()> {
        let mut delivery = Delivery {
            panes: &mut self.workspace.panes,
            driver: self.driver,
        };
        let report = self
            .workspace
            .bus
            .drain_and_dispatch(&mut delivery)
            .wrap_err("dispatching debugger events")?;
        if report.events > 0 {
            tracing::trace!(?report, "dispatched debugger events");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "trace")]
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::F(10) => self.quit(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            KeyCode::F(3) => self.cycle_focus(),
            KeyCode::F(1) => self.demo(),
            _ => {
                let driver = self.driver;
                let Some(pane) = self
                    .focused_pane()
                    .and_then(|id| self.workspace.panes.get_mut(id))
                else {
                    return;
                };
                if pane.handle_key(key, driver) == KeyOutcome::Quit {
                    self.should_terminate = true;
                }
            }
        }
    }

    pub fn focused_pane(&self) -> Option<PaneId> {
        self.focus_ring.get(self.focused).copied()
    }

    pub fn should_terminate(&self) -> bool {
        self.should_terminate
    }

    fn quit(&mut self) {
        if let Err(e) = self.driver.terminate() {
            tracing::warn!(error = %e, "terminating debugger");
        }
        self.should_terminate = true;
    }

    fn cycle_focus(&mut self) {
        if self.focus_ring.is_empty() {
            return;
        }
        self.focused = (self.focused + 1) % self.focus_ring.len();
        self.redraw = true;
        tracing::debug!(pane = ?self.focused_pane(), "focus changed");
    }

    /// Load `a.out`, stop at `main` and run it
    fn demo(&mut self) {
        tracing::info!("running demo session");
        let driver = self.driver;
        let mut console = self
            .workspace
            .panes
            .iter_mut()
            .find_map(Pane::as_command_mut);

        if let Err(e) = driver.create_target(Path::new(DEMO_TARGET), &[]) {
            tracing::warn!(error = %e, "creating demo target");
            if let Some(console) = console {
                console.report_error(&format!("{e:#}"));
            }
            return;
        }

        for command in DEMO_COMMANDS {
            match console.as_deref_mut() {
                Some(console) => console.run(driver, command),
                None => {
                    let result = driver.handle_command(command);
                    if !result.succeeded {
                        tracing::warn!(%command, error = %result.error, "demo command failed");
                    }
                }
            }
        }
    }

    fn take_redraw(&mut self) -> bool {
        let dirty = self.workspace.panes.take_dirty();
        std::mem::take(&mut self.redraw) || dirty
    }

    fn screen(&self) -> Screen<'_> {
        Screen {
            panes: &self.workspace.panes,
            arrangement: &self.workspace.arrangement,
            focused: self.focused_pane(),
            status: self.workspace.status,
        }
    }
}
