//! The daemon client: dial the per-module socket, fall back to in-process
//! resolution whenever a daemon answer is not available right now.

use std::io;
use std::os::unix::net::UnixStream;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::cache::find_module_root;
use crate::daemon::wire::{socket_path, Request, Response};
use crate::resolver::{self, FindOptions, FindResult};

/// Resolve through the daemon when one is listening.
///
/// The caller is never blocked by daemon startup: when no daemon is
/// reachable, the request runs in-process and a detached daemon is left
/// behind to answer the next invocation.
pub fn find(pkg_dir: &Path, opts: &FindOptions) -> FindResult {
    let module_root = match find_module_root(pkg_dir) {
        Ok(root) => root,
        Err(err) => {
            return FindResult {
                files: Vec::new(),
                error: Some(err.into()),
            }
        }
    };
    let path = socket_path(&module_root);

    match UnixStream::connect(&path) {
        Ok(stream) => {
            tracing::info!("connected to existing server on {}", path.display());
            exchange(stream, pkg_dir, opts)
        }
        Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => {
            // A stale socket nobody is listening behind.
            tracing::info!("restarting daemon on {}", path.display());
            let _ = std::fs::remove_file(&path);
            spawn_daemon(&module_root);
            resolver::find(pkg_dir, opts)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::info!("starting daemon for next run on {}", path.display());
            spawn_daemon(&module_root);
            resolver::find(pkg_dir, opts)
        }
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            tracing::warn!("permission denied dialing daemon: {err}");
            resolver::find(pkg_dir, opts)
        }
        Err(err) => FindResult {
            files: Vec::new(),
            error: Some(anyhow!(err).context("unexpected dial error for find daemon")),
        },
    }
}

fn exchange(stream: UnixStream, pkg_dir: &Path, opts: &FindOptions) -> FindResult {
    let run = || -> anyhow::Result<Response> {
        serde_json::to_writer(
            &stream,
            &Request {
                path_to_package: pkg_dir.to_path_buf(),
                include_test: opts.include_tests,
                include_mod: opts.include_mod,
                go_work: opts.go_work,
            },
        )
        .context("failed to encode request")?;

        let mut deserializer = serde_json::Deserializer::from_reader(&stream);
        Response::deserialize(&mut deserializer).context("failed to decode response")
    };

    match run() {
        Ok(response) => FindResult {
            files: response.files,
            error: (!response.error.is_empty()).then(|| anyhow!(response.error)),
        },
        Err(err) => FindResult {
            files: Vec::new(),
            error: Some(err),
        },
    }
}

/// Start a detached daemon for future invocations.
///
/// The child joins a fresh process group so that whatever kills this
/// short-lived CLI (a shell, Make) does not take the daemon with it, and
/// it is never waited on.
fn spawn_daemon(module_root: &Path) {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            tracing::warn!("failed to locate executable for daemon: {err}");
            return;
        }
    };

    let spawned = Command::new(exe)
        .arg("--x-daemon")
        .arg(module_root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn();

    match spawned {
        // Dropping the handle releases the child; it is reaped by init
        // once this process exits.
        Ok(child) => drop(child),
        Err(err) => tracing::warn!("failed to start daemon: {err}"),
    }
}
