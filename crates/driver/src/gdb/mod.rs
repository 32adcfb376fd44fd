//! [`Driver`] implementation for GDB's machine interface
//!
//! Commands are written to GDB with a numeric token and the calling thread blocks until
//! the result record carrying the same token comes back. A background thread reads every
//! line GDB prints: result records complete pending commands, console stream records are
//! collected as the output of the running command, and async records update the cached
//! [`Session`] and are published as [`Event`]s.

use std::{
    collections::HashMap,
    io::{BufRead, Write},
    path::Path,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use bus::Publisher;
use eyre::{Context, Result};

use crate::{
    Breakpoint, BreakpointError, CommandResult, Driver, Event, ProcessInfo, SourceLocation,
};

mod io;
pub mod mi;
mod session;

pub use io::{InMemoryReader, InMemoryTransport, InMemoryWriter, MiTransport, ProcessTransport};
use mi::{Record, ResultClass, Results, StreamKind};
use session::Session;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings sent before any user command
const STARTUP_COMMANDS: &[&str] = &["-gdb-set confirm off", "-gdb-set pagination off"];

/// A result record together with the console output printed while it ran
#[derive(Debug)]
struct Reply {
    class: ResultClass,
    results: Results,
    console: String,
}

impl Reply {
    fn error_message(&self) -> Option<&str> {
        (self.class == ResultClass::Error)
            .then(|| mi::lookup_str(&self.results, "msg").unwrap_or("unknown error"))
    }
}

/// Commands waiting for their result record
#[derive(Default)]
struct PendingRequests {
    pending: HashMap<u64, oneshot::Sender<Reply>>,
    console: String,
}

struct Shared {
    session: Mutex<Session>,
    pending: Mutex<PendingRequests>,
}

pub struct GdbDriver {
    writer: Mutex<Box<dyn Write + Send>>,
    shared: Arc<Shared>,
    next_token: AtomicU64,
    timeout: Duration,
    terminated: AtomicBool,
}

impl GdbDriver {
    /// Spawn `gdb` and connect to it
    pub fn spawn(gdb: &Path, events: Publisher<Event>) -> Result<Self> {
        let transport = ProcessTransport::spawn(gdb)?;
        Self::with_transport(transport, events)
    }

    /// Connect to a debugger over any transport and apply the startup settings
    pub fn with_transport<T>(transport: T, events: Publisher<Event>) -> Result<Self>
    where
        T: MiTransport,
    {
        let (reader, writer) = transport.split()?;
        let shared = Arc::new(Shared {
            session: Mutex::new(Session::default()),
            pending: Mutex::new(PendingRequests::default()),
        });

        let background_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("gdb-reader".to_string())
            .spawn(move || read_loop(reader, &background_shared, &events))
            .wrap_err("spawning gdb reader thread")?;

        let driver = Self {
            writer: Mutex::new(Box::new(writer)),
            shared,
            next_token: AtomicU64::new(0),
            timeout: DEFAULT_TIMEOUT,
            terminated: AtomicBool::new(false),
        };

        for command in STARTUP_COMMANDS {
            driver
                .execute_checked(command)
                .wrap_err_with(|| format!("configuring debugger with `{command}`"))?;
        }
        Ok(driver)
    }

    /// How long to wait for a result record
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[tracing::instrument(skip(self), level = "debug")]
    fn execute(&self, command: &str) -> Result<Reply> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        with_lock("pending", &self.shared.pending, |mut pending| {
            pending.pending.insert(token, tx);
        })?;

        {
            let mut writer = self
                .writer
                .lock()
                .map_err(|e| eyre::eyre!("writer mutex poisoned: {}", e))?;
            writeln!(writer, "{token}{command}").wrap_err("writing command")?;
            writer.flush().wrap_err("flushing command")?;
        }
        tracing::debug!(token, "sent command");

        match rx.recv_timeout(self.timeout) {
            Ok(reply) => Ok(reply),
            Err(oneshot::RecvTimeoutError::Timeout) => {
                with_lock("pending", &self.shared.pending, |mut pending| {
                    pending.pending.remove(&token);
                })?;
                eyre::bail!("no reply from the debugger after {:?}", self.timeout)
            }
            Err(oneshot::RecvTimeoutError::Disconnected) => {
                eyre::bail!("the debugger exited before replying")
            }
        }
    }

    /// Execute a command, turning an `^error` reply into an error
    fn execute_checked(&self, command: &str) -> Result<Reply> {
        let reply = self.execute(command)?;
        if let Some(message) = reply.error_message() {
            eyre::bail!("{message}");
        }
        Ok(reply)
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>> {
        self.shared
            .session
            .lock()
            .map_err(|e| eyre::eyre!("session mutex poisoned: {}", e))
    }
}

impl Driver for GdbDriver {
    #[tracing::instrument(skip(self))]
    fn handle_command(&self, command: &str) -> CommandResult {
        let request = format!("-interpreter-exec console {}", mi::quote(command));
        match self.execute(&request) {
            Ok(reply) => match reply.error_message() {
                Some(message) => CommandResult {
                    succeeded: false,
                    output: reply.console.clone(),
                    error: message.to_string(),
                },
                None => CommandResult::success(reply.console),
            },
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                CommandResult::failure(format!("{e:#}"))
            }
        }
    }

    fn completions(&self, text: &str, cursor: usize) -> Vec<String> {
        let prefix: String = text.chars().take(cursor).collect();
        let reply = match self.execute_checked(&format!("-complete {}", mi::quote(&prefix))) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "completion failed");
                return Vec::new();
            }
        };

        mi::lookup(&reply.results, "matches")
            .and_then(mi::Value::as_list)
            .map(|matches| {
                matches
                    .iter()
                    .filter_map(mi::Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn process(&self) -> Option<ProcessInfo> {
        self.session().ok()?.process()
    }

    fn selected_location(&self) -> Option<SourceLocation> {
        self.session().ok()?.location()
    }

    fn breakpoints(&self) -> Vec<Result<Breakpoint, BreakpointError>> {
        match self.session() {
            Ok(session) => session.breakpoints(),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read breakpoints");
                Vec::new()
            }
        }
    }

    fn create_target(&self, path: &Path, args: &[String]) -> Result<()> {
        let quoted = mi::quote(&path.to_string_lossy());
        self.execute_checked(&format!("-file-exec-and-symbols {quoted}"))
            .wrap_err_with(|| format!("loading {}", path.display()))?;

        if !args.is_empty() {
            let args = args.iter().map(|a| mi::quote(a)).collect::<Vec<_>>().join(" ");
            self.execute_checked(&format!("-exec-arguments {args}"))
                .wrap_err("setting program arguments")?;
        }

        self.session()?.set_target(path.display().to_string());
        tracing::info!(target = %path.display(), "created target");
        Ok(())
    }

    fn attach(&self, pid: u32) -> Result<()> {
        self.execute_checked(&format!("-target-attach {pid}"))
            .wrap_err_with(|| format!("attaching to process {pid}"))?;
        self.session()?.set_pid(pid);
        tracing::info!(pid, "attached");
        Ok(())
    }

    fn load_core(&self, path: &Path) -> Result<()> {
        let quoted = mi::quote(&path.to_string_lossy());
        self.execute_checked(&format!("-target-select core {quoted}"))
            .wrap_err_with(|| format!("loading core file {}", path.display()))?;
        tracing::info!(core = %path.display(), "loaded core file");
        Ok(())
    }

    fn terminate(&self) -> Result<()> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("terminating debugger");
        // GDB may close its output before the reply arrives
        match self.execute("-gdb-exit") {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "no reply to -gdb-exit");
                Ok(())
            }
        }
    }
}

fn with_lock<T, F, R>(name: &str, lock: &Mutex<T>, f: F) -> Result<R>
where
    F: FnOnce(MutexGuard<'_, T>) -> R,
{
    tracing::trace!(%name, "taking lock");
    let inner = lock
        .lock()
        .map_err(|e| eyre::eyre!("{} mutex poisoned: {}", name, e))?;
    let res = f(inner);
    tracing::trace!(%name, "releasing lock");
    Ok(res)
}

fn read_loop<R: BufRead>(reader: R, shared: &Shared, events: &Publisher<Event>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "error reading from debugger");
                break;
            }
        };
        if let Err(e) = handle_line(&line, shared, events) {
            tracing::error!(error = %e, "stopping debugger reader");
            break;
        }
    }

    tracing::debug!("debugger output closed");
    // waking everyone still waiting with a disconnect
    if let Ok(mut pending) = shared.pending.lock() {
        pending.pending.clear();
    }
}

fn handle_line(line: &str, shared: &Shared, events: &Publisher<Event>) -> Result<()> {
    let record = match mi::parse_line(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(%line, error = %e, "treating unparsable line as program output");
            return Ok(());
        }
    };

    match record {
        Record::Result {
            token,
            class,
            results,
        } => with_lock("pending", &shared.pending, |mut pending| {
            let console = std::mem::take(&mut pending.console);
            match token.and_then(|token| pending.pending.remove(&token)) {
                Some(tx) => {
                    let _ = tx.send(Reply {
                        class,
                        results,
                        console,
                    });
                }
                None => tracing::warn!(?token, ?class, "result record without a waiting command"),
            }
        }),
        Record::Async {
            kind,
            class,
            results,
            ..
        } => {
            let published =
                with_lock("session", &shared.session, |mut session| {
                    session.apply(kind, &class, &results)
                })?;
            for event in published {
                tracing::debug!(%event, "publishing debugger event");
                events.publish(event);
            }
            Ok(())
        }
        Record::Stream {
            kind: StreamKind::Console,
            text,
        } => with_lock("pending", &shared.pending, |mut pending| {
            if pending.pending.is_empty() {
                tracing::debug!(%text, "console output outside of a command");
            } else {
                pending.console.push_str(&text);
            }
        }),
        Record::Stream {
            kind: StreamKind::Target,
            text,
        } => {
            tracing::debug!(%text, "program output");
            Ok(())
        }
        Record::Stream {
            kind: StreamKind::Log,
            text,
        } => {
            tracing::trace!(%text, "debugger log");
            Ok(())
        }
        Record::Prompt => Ok(()),
    }
}
