use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Debugger breakpoint number. Negative numbers are internal to the debugger.
pub type BreakpointId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Exited,
    Detached,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Running => "running",
            ProcessState::Stopped => "stopped",
            ProcessState::Exited => "exited",
            ProcessState::Detached => "detached",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointChange {
    Added,
    Removed,
    Enabled,
    Disabled,
    /// A pending breakpoint was bound to a location, or another field changed
    Resolved,
}

impl fmt::Display for BreakpointChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BreakpointChange::Added => "added",
            BreakpointChange::Removed => "removed",
            BreakpointChange::Enabled => "enabled",
            BreakpointChange::Disabled => "disabled",
            BreakpointChange::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Notification from the debugger backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ProcessStateChanged {
        state: ProcessState,
        exit_code: Option<i32>,
    },
    BreakpointChanged {
        change: BreakpointChange,
        id: BreakpointId,
    },
    ThreadChanged {
        thread_id: u64,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ProcessStateChanged {
                state: ProcessState::Exited,
                exit_code: Some(code),
            } => write!(f, "process exited with code {code}"),
            Event::ProcessStateChanged { state, .. } => write!(f, "process {state}"),
            Event::BreakpointChanged { change, id } => write!(f, "breakpoint {id} {change}"),
            Event::ThreadChanged { thread_id } => write!(f, "thread {thread_id} selected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Whether both locations point into the same file, comparing canonical paths when
    /// they can be resolved
    pub fn same_file(&self, other: &Path) -> bool {
        if self.path == other {
            return true;
        }
        match (self.path.canonicalize(), other.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub enabled: bool,
    pub internal: bool,
    /// Human readable location, e.g. `in main at main.c:10`
    pub description: String,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakpointError {
    #[error("breakpoint record has no `{0}` field")]
    MissingField(&'static str),

    #[error("breakpoint number `{0}` is not an integer")]
    InvalidNumber(String),

    #[error("breakpoint {0} has no location")]
    NoLocation(BreakpointId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Executable being debugged, if known
    pub target: Option<String>,
    pub pid: Option<u32>,
    pub state: ProcessState,
    pub exit_code: Option<i32>,
}

/// Outcome of a console command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    pub output: String,
    pub error: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: String::new(),
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_read_well_in_a_log() {
        let cases = [
            (
                Event::ProcessStateChanged {
                    state: ProcessState::Stopped,
                    exit_code: None,
                },
                "process stopped",
            ),
            (
                Event::ProcessStateChanged {
                    state: ProcessState::Exited,
                    exit_code: Some(3),
                },
                "process exited with code 3",
            ),
            (
                Event::BreakpointChanged {
                    change: BreakpointChange::Disabled,
                    id: 2,
                },
                "breakpoint 2 disabled",
            ),
            (Event::ThreadChanged { thread_id: 4 }, "thread 4 selected"),
        ];

        for (event, expected) in cases {
            assert_eq!(event.to_string(), expected);
        }
    }

    #[test]
    fn same_file_without_canonical_paths() {
        let location = SourceLocation::new("/does/not/exist.c", 1);
        assert!(location.same_file(Path::new("/does/not/exist.c")));
        assert!(!location.same_file(Path::new("/does/not/other.c")));
    }
}
