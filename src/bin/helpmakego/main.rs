//! helpmakego CLI - find all files a Go package depends on.

use std::env;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use helpmakego::resolver::{self, FindOptions, FindResult};
use helpmakego::util::display;
use helpmakego::util::fs::clean_path;

mod cli;

use cli::Cli;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cwd = env::current_dir().context("failed to get current directory")?;
    let pkg_dir = match &cli.path_to_package {
        Some(path) if path.is_absolute() => clean_path(path),
        Some(path) => clean_path(&cwd.join(path)),
        None => cwd.clone(),
    };

    // Set by another helpmakego invocation, never by users.
    if cli.x_daemon {
        return serve_daemon(&pkg_dir);
    }

    let opts = FindOptions {
        include_tests: cli.test,
        include_mod: cli.include_mod,
        go_work: env::var("GOWORK").as_deref() != Ok("off"),
    };

    let result = if daemon_enabled() {
        daemon_find(&pkg_dir, &opts)
    } else {
        resolver::find(&pkg_dir, &opts)
    };
    let files = result.into_result()?;

    let paths: Vec<String> = if cli.abs {
        files.iter().map(|path| path.display().to_string()).collect()
    } else {
        display::relative(&cwd, &files)
    };

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if cli.json {
        serde_json::to_writer(&mut stdout, &paths)?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "{}", paths.join(" "))?;
    }
    Ok(())
}

fn daemon_enabled() -> bool {
    env::var("HELPMAKEGO_EXPERIMENT_DAEMON")
        .is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
}

#[cfg(unix)]
fn serve_daemon(module_root: &Path) -> Result<()> {
    helpmakego::daemon::serve(module_root)
}

#[cfg(not(unix))]
fn serve_daemon(_module_root: &Path) -> Result<()> {
    anyhow::bail!("the daemon is only supported on Unix platforms")
}

#[cfg(unix)]
fn daemon_find(pkg_dir: &Path, opts: &FindOptions) -> FindResult {
    helpmakego::daemon::find(pkg_dir, opts)
}

#[cfg(not(unix))]
fn daemon_find(pkg_dir: &Path, opts: &FindOptions) -> FindResult {
    resolver::find(pkg_dir, opts)
}

fn init_logging() {
    let log = env::var("LOG").unwrap_or_default();
    let (level, invalid) = match log.as_str() {
        "debug" => ("debug", false),
        "info" => ("info", false),
        "error" => ("error", false),
        "" | "warn" => ("warn", false),
        _ => ("warn", true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("helpmakego={level}")))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if invalid {
        tracing::warn!(
            "invalid log level {log:?}: valid options are \"error\", \"warn\", \"info\" and \"debug\""
        );
    }
}
