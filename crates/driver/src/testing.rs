//! Scriptable [`Driver`] for user interface tests
use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    Breakpoint, BreakpointError, CommandResult, Driver, ProcessInfo, SourceLocation,
};

#[derive(Default)]
struct State {
    commands: Vec<String>,
    responses: HashMap<String, CommandResult>,
    completions: Vec<String>,
    completion_requests: Vec<(String, usize)>,
    breakpoints: Vec<Result<Breakpoint, BreakpointError>>,
    location: Option<SourceLocation>,
    process: Option<ProcessInfo>,
    targets: Vec<(PathBuf, Vec<String>)>,
    attached: Vec<u32>,
    cores: Vec<PathBuf>,
    terminated: bool,
}

/// In-process driver that answers from canned data and records what it was asked
///
/// Commands without a canned response succeed with no output.
#[derive(Default)]
pub struct FakeDriver {
    state: RefCell<State>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command: impl Into<String>, result: CommandResult) {
        self.state
            .borrow_mut()
            .responses
            .insert(command.into(), result);
    }

    pub fn set_completions<S: Into<String>>(&self, completions: impl IntoIterator<Item = S>) {
        self.state.borrow_mut().completions = completions.into_iter().map(Into::into).collect();
    }

    pub fn set_breakpoints(&self, breakpoints: Vec<Result<Breakpoint, BreakpointError>>) {
        self.state.borrow_mut().breakpoints = breakpoints;
    }

    pub fn set_location(&self, location: Option<SourceLocation>) {
        self.state.borrow_mut().location = location;
    }

    pub fn set_process(&self, process: Option<ProcessInfo>) {
        self.state.borrow_mut().process = process;
    }

    /// Console commands in the order they were run
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    pub fn completion_requests(&self) -> Vec<(String, usize)> {
        self.state.borrow().completion_requests.clone()
    }

    pub fn targets(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.state.borrow().targets.clone()
    }

    pub fn attached(&self) -> Vec<u32> {
        self.state.borrow().attached.clone()
    }

    pub fn cores(&self) -> Vec<PathBuf> {
        self.state.borrow().cores.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.borrow().terminated
    }
}

impl Driver for FakeDriver {
    fn handle_command(&self, command: &str) -> CommandResult {
        let mut state = self.state.borrow_mut();
        state.commands.push(command.to_string());
        state
            .responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandResult::success(""))
    }

    fn completions(&self, text: &str, cursor: usize) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        state.completion_requests.push((text.to_string(), cursor));
        state.completions.clone()
    }

    fn process(&self) -> Option<ProcessInfo> {
        self.state.borrow().process.clone()
    }

    fn selected_location(&self) -> Option<SourceLocation> {
        self.state.borrow().location.clone()
    }

    fn breakpoints(&self) -> Vec<Result<Breakpoint, BreakpointError>> {
        self.state.borrow().breakpoints.clone()
    }

    fn create_target(&self, path: &Path, args: &[String]) -> eyre::Result<()> {
        self.state
            .borrow_mut()
            .targets
            .push((path.to_path_buf(), args.to_vec()));
        Ok(())
    }

    fn attach(&self, pid: u32) -> eyre::Result<()> {
        self.state.borrow_mut().attached.push(pid);
        Ok(())
    }

    fn load_core(&self, path: &Path) -> eyre::Result<()> {
        self.state.borrow_mut().cores.push(path.to_path_buf());
        Ok(())
    }

    fn terminate(&self) -> eyre::Result<()> {
        self.state.borrow_mut().terminated = true;
        Ok(())
    }
}
