use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use driver::{Driver, gdb::GdbDriver};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod history;
mod layout;
mod panes;
mod render;

use app::{App, Workspace};

/// Terminal front-end for gdb
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Attach to a running process
    #[clap(short = 'p', long = "attach", value_name = "PID", conflicts_with_all = ["core", "target"])]
    attach: Option<u32>,

    /// Inspect a core file
    #[clap(short, long, value_name = "FILE", conflicts_with = "target")]
    core: Option<PathBuf>,

    /// Use the debug layout and log at debug level
    #[clap(short, long)]
    debug: bool,

    /// Print the built-in layout file and exit
    #[clap(long)]
    dump_layout: bool,

    /// Layout file to use instead of the user configuration
    #[clap(short, long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// Named layout to select from the layout file
    #[clap(short, long)]
    name: Option<String>,

    /// Debugger executable
    #[clap(long, value_name = "PATH", default_value = "gdb")]
    gdb: PathBuf,

    /// Program to debug
    target: Option<PathBuf>,

    /// Arguments for the program
    #[clap(trailing_var_arg = true, allow_hyphen_values = true, requires = "target")]
    args: Vec<String>,
}

fn init_logging(debug: bool) -> eyre::Result<WorkerGuard> {
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("lui");
    std::fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("creating log directory {}", log_dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, "lui.log"));
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn ensure_file(path: &Path, what: &str) -> eyre::Result<()> {
    eyre::ensure!(path.is_file(), "{what} {} does not exist", path.display());
    Ok(())
}

/// Point the debugger at whatever the command line asked for
fn open_session(driver: &dyn Driver, args: &Args) -> eyre::Result<()> {
    if let Some(pid) = args.attach {
        driver.attach(pid)
    } else if let Some(core) = &args.core {
        driver.load_core(core)
    } else if let Some(target) = &args.target {
        driver.create_target(target, &args.args)
    } else {
        Ok(())
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if args.dump_layout {
        print!("{}", config::DEFAULT_LAYOUT);
        return Ok(());
    }

    let _guard = init_logging(args.debug)?;

    let (layouts, source) = config::load(args.layout.as_deref()).wrap_err("loading layout")?;
    let node = layouts
        .select(args.name.as_deref(), args.debug)
        .wrap_err_with(|| format!("selecting layout from {source:?}"))?;
    let workspace = Workspace::build(node).wrap_err("building layout")?;
    tracing::debug!(?source, panes = ?node.leaves(), "layout built");

    if let Some(target) = &args.target {
        ensure_file(target, "target")?;
    }
    if let Some(core) = &args.core {
        ensure_file(core, "core file")?;
    }

    let driver = GdbDriver::spawn(&args.gdb, workspace.publisher())
        .wrap_err_with(|| format!("starting {}", args.gdb.display()))?;
    open_session(&driver, &args)?;
    tracing::info!("debugger ready");

    let terminal = ratatui::init();
    let app = App::new(&driver, workspace);
    let result = app.run(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use driver::testing::FakeDriver;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn target_with_arguments() {
        let args = Args::try_parse_from(["lui", "./prog", "x", "--verbose"]).unwrap();
        assert_eq!(args.target, Some(PathBuf::from("./prog")));
        assert_eq!(args.args, vec!["x", "--verbose"]);
    }

    #[test]
    fn attach_and_target_are_exclusive() {
        assert!(Args::try_parse_from(["lui", "-p", "12", "./prog"]).is_err());
        assert!(Args::try_parse_from(["lui", "-c", "core", "./prog"]).is_err());
        assert!(Args::try_parse_from(["lui", "-p", "12", "-c", "core"]).is_err());
    }

    #[test]
    fn session_follows_the_arguments() {
        let driver = FakeDriver::new();
        let args = Args::try_parse_from(["lui", "-p", "12"]).unwrap();
        open_session(&driver, &args).unwrap();
        assert_eq!(driver.attached(), vec![12]);

        let args = Args::try_parse_from(["lui", "--core", "core.1"]).unwrap();
        open_session(&driver, &args).unwrap();
        assert_eq!(driver.cores(), vec![PathBuf::from("core.1")]);

        let args = Args::try_parse_from(["lui", "prog", "a"]).unwrap();
        open_session(&driver, &args).unwrap();
        assert_eq!(
            driver.targets(),
            vec![(PathBuf::from("prog"), vec!["a".to_string()])]
        );
    }

    #[test]
    fn missing_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_file(&dir.path().join("nope"), "target").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
