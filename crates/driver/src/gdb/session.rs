//! Debugger state reconstructed from MI async records

use std::path::PathBuf;

use super::mi::{AsyncKind, Results, Value, lookup, lookup_str};
use crate::{
    Breakpoint, BreakpointChange, BreakpointError, BreakpointId, Event, ProcessInfo,
    ProcessState, SourceLocation,
};

/// Cached view of the debugger, kept current by [`Session::apply`]
#[derive(Debug, Default)]
pub(crate) struct Session {
    target: Option<String>,
    pid: Option<u32>,
    state: Option<ProcessState>,
    exit_code: Option<i32>,
    location: Option<SourceLocation>,
    // raw `bkpt` tuples in creation order, keyed by breakpoint number
    breakpoints: Vec<(String, Results)>,
}

impl Session {
    pub(crate) fn set_target(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    pub(crate) fn set_pid(&mut self, pid: u32) {
        self.pid = Some(pid);
    }

    pub(crate) fn process(&self) -> Option<ProcessInfo> {
        if self.target.is_none() && self.pid.is_none() && self.state.is_none() {
            return None;
        }
        Some(ProcessInfo {
            target: self.target.clone(),
            pid: self.pid,
            // a loaded target that has not been started yet is not running
            state: self.state.unwrap_or(ProcessState::Stopped),
            exit_code: self.exit_code,
        })
    }

    pub(crate) fn location(&self) -> Option<SourceLocation> {
        self.location.clone()
    }

    pub(crate) fn breakpoints(&self) -> Vec<Result<Breakpoint, BreakpointError>> {
        self.breakpoints
            .iter()
            .map(|(_, fields)| breakpoint_from_fields(fields))
            .collect()
    }

    /// Fold an async record into the cache, returning the events it represents
    pub(crate) fn apply(&mut self, kind: AsyncKind, class: &str, results: &[(String, Value)]) -> Vec<Event> {
        match (kind, class) {
            (AsyncKind::Exec, "running") => {
                self.location = None;
                self.state_change(ProcessState::Running, None)
            }
            (AsyncKind::Exec, "stopped") => self.stopped(results),
            (AsyncKind::Notify, "breakpoint-created") => self.breakpoint_created(results),
            (AsyncKind::Notify, "breakpoint-modified") => self.breakpoint_modified(results),
            (AsyncKind::Notify, "breakpoint-deleted") => self.breakpoint_deleted(results),
            (AsyncKind::Notify, "thread-group-started") => {
                match lookup_str(results, "pid").map(str::parse::<u32>) {
                    Some(Ok(pid)) => {
                        tracing::debug!(pid, "process started");
                        self.pid = Some(pid);
                        self.exit_code = None;
                    }
                    other => tracing::debug!(?other, "thread group started without a usable pid"),
                }
                Vec::new()
            }
            (AsyncKind::Notify, "thread-selected") => {
                let Some(thread_id) = lookup_str(results, "id").and_then(|id| id.parse::<u64>().ok())
                else {
                    tracing::debug!(?results, "thread selected without an id");
                    return Vec::new();
                };
                if let Some(frame) = lookup(results, "frame") {
                    self.location = frame_location(frame);
                }
                vec![Event::ThreadChanged { thread_id }]
            }
            (kind, class) => {
                tracing::trace!(?kind, %class, "ignoring async record");
                Vec::new()
            }
        }
    }

    fn state_change(&mut self, state: ProcessState, exit_code: Option<i32>) -> Vec<Event> {
        tracing::debug!(%state, ?exit_code, "process state changed");
        self.state = Some(state);
        self.exit_code = exit_code;
        vec![Event::ProcessStateChanged { state, exit_code }]
    }

    fn stopped(&mut self, results: &[(String, Value)]) -> Vec<Event> {
        match lookup_str(results, "reason") {
            Some("exited-normally") => {
                self.location = None;
                self.state_change(ProcessState::Exited, Some(0))
            }
            Some("exited") => {
                // GDB prints the exit code in octal
                let code = lookup_str(results, "exit-code")
                    .and_then(|code| i32::from_str_radix(code, 8).ok());
                self.location = None;
                self.state_change(ProcessState::Exited, code)
            }
            Some("exited-signalled") => {
                self.location = None;
                self.state_change(ProcessState::Exited, None)
            }
            Some("detached") => {
                self.location = None;
                self.state_change(ProcessState::Detached, None)
            }
            _ => {
                self.location = lookup(results, "frame").and_then(frame_location);
                self.state_change(ProcessState::Stopped, None)
            }
        }
    }

    fn breakpoint_created(&mut self, results: &[(String, Value)]) -> Vec<Event> {
        let Some((number, fields)) = bkpt(results) else {
            return Vec::new();
        };
        let id = parse_id(&number);
        self.breakpoints.retain(|(n, _)| *n != number);
        self.breakpoints.push((number, fields));
        id.map(|id| Event::BreakpointChanged {
            change: BreakpointChange::Added,
            id,
        })
        .into_iter()
        .collect()
    }

    fn breakpoint_modified(&mut self, results: &[(String, Value)]) -> Vec<Event> {
        let Some((number, fields)) = bkpt(results) else {
            return Vec::new();
        };
        let id = parse_id(&number);

        let change = match self.breakpoints.iter().position(|(n, _)| *n == number) {
            Some(index) => {
                let existing = &mut self.breakpoints[index].1;
                let change = match (is_enabled(existing), is_enabled(&fields)) {
                    (false, true) => BreakpointChange::Enabled,
                    (true, false) => BreakpointChange::Disabled,
                    _ => BreakpointChange::Resolved,
                };
                *existing = fields;
                change
            }
            None => {
                self.breakpoints.push((number, fields));
                BreakpointChange::Added
            }
        };

        id.map(|id| Event::BreakpointChanged { change, id })
            .into_iter()
            .collect()
    }

    fn breakpoint_deleted(&mut self, results: &[(String, Value)]) -> Vec<Event> {
        let Some(number) = lookup_str(results, "id") else {
            tracing::debug!(?results, "breakpoint deleted without an id");
            return Vec::new();
        };
        self.breakpoints.retain(|(n, _)| n != number);
        parse_id(number)
            .map(|id| Event::BreakpointChanged {
                change: BreakpointChange::Removed,
                id,
            })
            .into_iter()
            .collect()
    }
}

/// The `bkpt` tuple of a breakpoint notification, with any unnamed location tuples that
/// follow it folded in as a `locations` list
fn bkpt(results: &[(String, Value)]) -> Option<(String, Results)> {
    let Some(mut fields) = lookup(results, "bkpt")
        .and_then(Value::as_tuple)
        .map(<[_]>::to_vec)
    else {
        tracing::debug!(?results, "breakpoint notification without a bkpt tuple");
        return None;
    };

    let extra: Vec<Value> = results
        .iter()
        .filter(|(name, _)| name.is_empty())
        .map(|(_, value)| value.clone())
        .collect();
    if !extra.is_empty() && lookup(&fields, "locations").is_none() {
        fields.push(("locations".to_string(), Value::List(extra)));
    }

    let Some(number) = lookup_str(&fields, "number").map(str::to_string) else {
        tracing::debug!(?fields, "bkpt tuple without a number");
        return None;
    };
    Some((number, fields))
}

fn is_enabled(fields: &[(String, Value)]) -> bool {
    lookup_str(fields, "enabled") != Some("n")
}

fn parse_id(number: &str) -> Option<BreakpointId> {
    match number.parse() {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::debug!(%number, error = %e, "breakpoint number is not an integer");
            None
        }
    }
}

fn frame_location(frame: &Value) -> Option<SourceLocation> {
    let path = frame
        .get("fullname")
        .or_else(|| frame.get("file"))
        .and_then(Value::as_str)?;
    let line = frame.get("line").and_then(Value::as_str)?.parse().ok()?;
    Some(SourceLocation::new(path, line))
}

pub(crate) fn breakpoint_from_fields(fields: &[(String, Value)]) -> Result<Breakpoint, BreakpointError> {
    let number = lookup_str(fields, "number").ok_or(BreakpointError::MissingField("number"))?;
    let id: BreakpointId = number
        .parse()
        .map_err(|_| BreakpointError::InvalidNumber(number.to_string()))?;
    let enabled = is_enabled(fields);

    // multi-location breakpoints keep file and line on their first location
    let first_location = lookup(fields, "locations")
        .and_then(Value::as_list)
        .and_then(|locations| locations.first())
        .and_then(Value::as_tuple);
    let field = |key: &str| {
        lookup_str(fields, key).or_else(|| first_location.and_then(|loc| lookup_str(loc, key)))
    };

    let line = field("line").and_then(|line| line.parse::<usize>().ok());
    let location = match (field("fullname").or_else(|| field("file")), line) {
        (Some(path), Some(line)) => Some(SourceLocation::new(PathBuf::from(path), line)),
        _ => None,
    };

    let description = match (field("func"), field("file"), line) {
        (Some(func), Some(file), Some(line)) => format!("in {func} at {file}:{line}"),
        (None, Some(file), Some(line)) => format!("at {file}:{line}"),
        _ => match (lookup_str(fields, "pending"), lookup_str(fields, "original-location")) {
            (Some(pending), _) => format!("pending {pending}"),
            (None, Some(original)) => original.to_string(),
            (None, None) => match field("addr") {
                Some(addr) if addr != "<MULTIPLE>" && addr != "<PENDING>" => format!("at {addr}"),
                _ => return Err(BreakpointError::NoLocation(id)),
            },
        },
    };

    Ok(Breakpoint {
        id,
        enabled,
        internal: id < 0,
        description,
        location,
    })
}
