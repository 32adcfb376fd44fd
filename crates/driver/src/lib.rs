//! Debugger control
//!
//! The [`Driver`] trait is everything the user interface needs from a debugger: running
//! console commands, completion, and a view of the current process, frame and breakpoints.
//! Asynchronous state changes are reported as [`Event`]s through a [`bus::Publisher`].
//!
//! [`gdb::GdbDriver`] implements the trait on top of GDB's machine interface.
use std::path::Path;

pub mod gdb;
#[cfg(feature = "testing")]
pub mod testing;
mod types;

pub use types::{
    Breakpoint, BreakpointChange, BreakpointError, BreakpointId, CommandResult, Event,
    ProcessInfo, ProcessState, SourceLocation,
};

/// Debugger collaborator used by the user interface
///
/// All methods are called from the UI thread and may block until the debugger answers.
pub trait Driver {
    /// Run a console command, e.g. `break main`
    fn handle_command(&self, command: &str) -> CommandResult;

    /// Candidate completions for `text`, considering the characters before `cursor`.
    /// Candidates are whole command lines.
    fn completions(&self, text: &str, cursor: usize) -> Vec<String>;

    /// The debugged process, if there is a target
    fn process(&self) -> Option<ProcessInfo>;

    /// Source location of the selected frame
    fn selected_location(&self) -> Option<SourceLocation>;

    /// Every known breakpoint, including ones that could not be interpreted
    fn breakpoints(&self) -> Vec<Result<Breakpoint, BreakpointError>>;

    fn create_target(&self, path: &Path, args: &[String]) -> eyre::Result<()>;

    fn attach(&self, pid: u32) -> eyre::Result<()>;

    fn load_core(&self, path: &Path) -> eyre::Result<()>;

    /// Shut the debugger down, killing the debugged process
    fn terminate(&self) -> eyre::Result<()>;
}
