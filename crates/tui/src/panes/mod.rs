//! View models for the terminal regions
//!
//! Every pane owns a [`ListView`] of pre-formatted lines. Debugger events and key presses
//! mutate the view; rendering only reads it.

use crossterm::event::{KeyCode, KeyEvent};
use driver::{Driver, Event};

mod breakpoints;
mod command;
mod events;
mod source;
mod status;

pub use breakpoints::BreakpointsPane;
pub use command::CommandPane;
pub use events::EventLogPane;
pub use source::SourcePane;
pub use status::{LEGEND, StatusPane};

/// Lines moved by PageUp and PageDown
const PAGE: usize = 10;

/// Index of a pane in the [`Panes`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(usize);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineClass {
    #[default]
    Normal,
    Error,
    Info,
    /// The line the debugged program is stopped on
    Current,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewLine {
    pub text: String,
    pub class: LineClass,
    pub align: Align,
}

impl ViewLine {
    pub fn new(text: impl Into<String>, class: LineClass) -> Self {
        Self {
            text: text.into(),
            class,
            align: Align::Left,
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(text, LineClass::Normal)
    }

    pub fn centered(text: impl Into<String>) -> Self {
        Self {
            align: Align::Center,
            ..Self::new(text, LineClass::Info)
        }
    }

    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }
}

/// Scrollable list of lines with a focused line
#[derive(Debug, Default)]
pub struct ListView {
    lines: Vec<ViewLine>,
    focus: usize,
    dirty: bool,
}

impl ListView {
    pub fn lines(&self) -> &[ViewLine] {
        &self.lines
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Replace every line, moving the focus to the top
    pub fn set_lines(&mut self, lines: Vec<ViewLine>) {
        self.lines = lines;
        self.focus = 0;
        self.dirty = true;
    }

    pub fn push(&mut self, line: ViewLine) {
        self.lines.push(line);
        self.dirty = true;
    }

    pub fn set_focus(&mut self, index: usize) {
        self.focus = index.min(self.lines.len().saturating_sub(1));
        self.dirty = true;
    }

    pub fn follow_tail(&mut self) {
        self.set_focus(self.lines.len().saturating_sub(1));
    }

    /// Move the focus down one line. Returns `None`, without moving, at the last line.
    pub fn focus_next(&mut self) -> Option<(&ViewLine, usize)> {
        let next = self.focus + 1;
        if next >= self.lines.len() {
            return None;
        }
        self.focus = next;
        self.dirty = true;
        Some((&self.lines[next], next))
    }

    /// Move the focus up one line. Returns `None`, without moving, at the first line.
    pub fn focus_prev(&mut self) -> Option<(&ViewLine, usize)> {
        let prev = self.focus.checked_sub(1)?;
        if prev >= self.lines.len() {
            return None;
        }
        self.focus = prev;
        self.dirty = true;
        Some((&self.lines[prev], prev))
    }

    pub fn page_down(&mut self) {
        self.set_focus(self.focus.saturating_add(PAGE));
    }

    pub fn page_up(&mut self) {
        self.set_focus(self.focus.saturating_sub(PAGE));
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the view changed since the last call
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Scrolling keys shared by every list pane
    fn handle_scroll_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Up => {
                self.focus_prev();
            }
            KeyCode::Down => {
                self.focus_next();
            }
            KeyCode::PageUp => self.page_up(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::Home => self.set_focus(0),
            KeyCode::End => self.follow_tail(),
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Ignored,
    /// The user asked to leave
    Quit,
}

/// Title-only pane for views that are not implemented
#[derive(Debug)]
pub struct PlaceholderPane {
    title: &'static str,
    view: ListView,
}

impl PlaceholderPane {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            view: ListView::default(),
        }
    }
}

/// Names a layout file can use for panes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneKind {
    Source,
    Command,
    Breakpoints,
    Events,
    Threads,
    Backtrace,
    /// Program input and output; shown as a placeholder
    Terminal,
}

impl PaneKind {
    pub const ALL: [PaneKind; 7] = [
        PaneKind::Source,
        PaneKind::Command,
        PaneKind::Breakpoints,
        PaneKind::Events,
        PaneKind::Threads,
        PaneKind::Backtrace,
        PaneKind::Terminal,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            PaneKind::Source => "source",
            PaneKind::Command => "command",
            PaneKind::Breakpoints => "breakpoints",
            PaneKind::Events => "events",
            PaneKind::Threads => "threads",
            PaneKind::Backtrace => "backtrace",
            PaneKind::Terminal => "terminal",
        }
    }

    pub fn create(self) -> Pane {
        match self {
            PaneKind::Source => Pane::Source(SourcePane::new()),
            PaneKind::Command => Pane::Command(CommandPane::new()),
            PaneKind::Breakpoints => Pane::Breakpoints(BreakpointsPane::new()),
            PaneKind::Events => Pane::EventLog(EventLogPane::new()),
            PaneKind::Threads => Pane::Placeholder(PlaceholderPane::new("Threads")),
            PaneKind::Backtrace => Pane::Placeholder(PlaceholderPane::new("Backtrace")),
            PaneKind::Terminal => Pane::Placeholder(PlaceholderPane::new("Terminal")),
        }
    }
}

#[derive(Debug)]
pub enum Pane {
    Source(SourcePane),
    Breakpoints(BreakpointsPane),
    Command(CommandPane),
    EventLog(EventLogPane),
    Status(StatusPane),
    Placeholder(PlaceholderPane),
}

impl Pane {
    pub fn title(&self) -> &'static str {
        match self {
            Pane::Source(_) => "Source",
            Pane::Breakpoints(_) => "Breakpoints",
            Pane::Command(_) => "Commands",
            Pane::EventLog(_) => "Debugger Events",
            Pane::Status(_) => "Status",
            Pane::Placeholder(pane) => pane.title,
        }
    }

    pub fn view(&self) -> &ListView {
        match self {
            Pane::Source(pane) => &pane.view,
            Pane::Breakpoints(pane) => &pane.view,
            Pane::Command(pane) => pane.view(),
            Pane::EventLog(pane) => &pane.view,
            Pane::Status(pane) => pane.view(),
            Pane::Placeholder(pane) => &pane.view,
        }
    }

    fn view_mut(&mut self) -> &mut ListView {
        match self {
            Pane::Source(pane) => &mut pane.view,
            Pane::Breakpoints(pane) => &mut pane.view,
            Pane::Command(pane) => pane.view_mut(),
            Pane::EventLog(pane) => &mut pane.view,
            Pane::Status(pane) => pane.view_mut(),
            Pane::Placeholder(pane) => &mut pane.view,
        }
    }

    pub fn on_event(&mut self, event: &Event, driver: &dyn Driver) -> eyre::Result<()> {
        match self {
            Pane::Source(pane) => pane.on_event(event, driver),
            Pane::Breakpoints(pane) => pane.on_event(event, driver),
            Pane::EventLog(pane) => pane.on_event(event),
            Pane::Status(pane) => pane.on_event(event),
            Pane::Command(_) | Pane::Placeholder(_) => Ok(()),
        }
    }

    pub fn render(&self) -> Vec<ViewLine> {
        self.view().lines().to_vec()
    }

    pub fn focus_next(&mut self) -> Option<(&ViewLine, usize)> {
        self.view_mut().focus_next()
    }

    pub fn focus_prev(&mut self) -> Option<(&ViewLine, usize)> {
        self.view_mut().focus_prev()
    }

    pub fn handle_key(&mut self, key: KeyEvent, driver: &dyn Driver) -> KeyOutcome {
        match self {
            Pane::Command(pane) => pane.handle_key(key, driver),
            Pane::Status(_) => KeyOutcome::Ignored,
            other => other.view_mut().handle_scroll_key(key),
        }
    }

    pub fn take_dirty(&mut self) -> bool {
        self.view_mut().take_dirty()
    }

    pub fn as_command_mut(&mut self) -> Option<&mut CommandPane> {
        match self {
            Pane::Command(pane) => Some(pane),
            _ => None,
        }
    }
}

/// Arena owning every pane, addressed by [`PaneId`]
#[derive(Debug, Default)]
pub struct Panes {
    panes: Vec<Pane>,
}

impl Panes {
    pub fn insert(&mut self, pane: Pane) -> PaneId {
        self.panes.push(pane);
        PaneId(self.panes.len() - 1)
    }

    pub fn get(&self, id: PaneId) -> Option<&Pane> {
        self.panes.get(id.0)
    }

    pub fn get_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pane> {
        self.panes.iter_mut()
    }

    /// Whether any pane changed since the last call, clearing every flag
    pub fn take_dirty(&mut self) -> bool {
        self.panes
            .iter_mut()
            .fold(false, |dirty, pane| pane.take_dirty() || dirty)
    }
}
