//! The daemon server: an accept loop over a per-module Unix socket.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cache::Cache;
use crate::daemon::wire::{socket_path, Request, Response};

/// How long the daemon lingers with no client before shutting down.
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);
/// Per-connection read/write deadline, protecting against stuck clients.
const IO_TIMEOUT: Duration = Duration::from_secs(1);
/// Granularity of the nonblocking accept loop.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Serve the warm cache for the module enclosing `pkg_root`.
///
/// Binds the module's socket (removing any stale one first), handles each
/// connection on its own thread, and returns cleanly once no client has
/// connected for the idle timeout and all in-flight handlers have
/// drained.
pub fn serve(pkg_root: &Path) -> Result<()> {
    serve_with_idle(pkg_root, IDLE_TIMEOUT)
}

pub(crate) fn serve_with_idle(pkg_root: &Path, idle: Duration) -> Result<()> {
    let cache = Arc::new(Cache::new(pkg_root)?);
    let path = socket_path(cache.module_root());

    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to remove stale socket {}", path.display()))
        }
    }

    let listener = UnixListener::bind(&path)
        .with_context(|| format!("failed to bind {}", path.display()))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure listener")?;
    tracing::info!("daemon listening on {}", path.display());

    let mut handlers: Vec<JoinHandle<()>> = Vec::new();
    let mut deadline = Instant::now() + idle;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                deadline = Instant::now() + idle;
                let cache = Arc::clone(&cache);
                handlers.push(thread::spawn(move || handle(&cache, stream)));
                handlers.retain(|handler| !handler.is_finished());
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    // Idle. Let in-flight connections finish, then leave.
                    for handler in handlers {
                        let _ = handler.join();
                    }
                    let _ = std::fs::remove_file(&path);
                    tracing::info!("daemon idle, shutting down");
                    return Ok(());
                }
                thread::sleep(ACCEPT_POLL);
            }
            Err(err) => return Err(err).context("failed to accept connection"),
        }
    }
}

fn handle(cache: &Cache, stream: UnixStream) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
    let _ = stream.set_write_timeout(Some(IO_TIMEOUT));

    let mut deserializer = serde_json::Deserializer::from_reader(&stream);
    let request = match Request::deserialize(&mut deserializer) {
        Ok(request) => request,
        Err(err) => {
            respond(
                &stream,
                Response {
                    files: Vec::new(),
                    error: err.to_string(),
                },
            );
            return;
        }
    };

    tracing::debug!("handling request for {}", request.path_to_package.display());
    let result = cache.find(&request.path_to_package, request.shape());
    respond(
        &stream,
        Response {
            files: result.files,
            error: result
                .error
                .map(|err| format!("{err:#}"))
                .unwrap_or_default(),
        },
    );
}

fn respond(mut stream: &UnixStream, response: Response) {
    if let Err(err) = serde_json::to_writer(&mut stream, &response) {
        tracing::warn!("failed to write response: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    use crate::daemon::client;
    use crate::resolver::{self, FindOptions};

    fn module_fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("go.mod"),
            "module test.example/foo\n\ngo 1.24\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("main.go"),
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hello\")\n}\n",
        )
        .unwrap();
        tmp
    }

    fn wait_for_socket(path: &Path) -> bool {
        for _ in 0..100 {
            if path.exists() {
                return true;
            }
            thread::sleep(Duration::from_millis(50));
        }
        false
    }

    #[test]
    fn test_daemon_round_trip_matches_in_process() {
        let tmp = module_fixture();
        let root = tmp.path().to_path_buf();

        let server = thread::spawn(move || serve_with_idle(&root, Duration::from_secs(2)));
        let path = socket_path(tmp.path());
        assert!(wait_for_socket(&path), "daemon socket was not created");

        let opts = FindOptions::default();
        let via_daemon = client::find(tmp.path(), &opts).into_result().unwrap();
        let direct = resolver::find(tmp.path(), &opts).into_result().unwrap();
        assert_eq!(via_daemon, direct);
        assert!(!via_daemon.is_empty());

        // The server exits on its own once idle, removing the socket.
        server.join().unwrap().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_request_gets_an_error_response() {
        let tmp = module_fixture();
        let root = tmp.path().to_path_buf();

        let server = thread::spawn(move || serve_with_idle(&root, Duration::from_secs(2)));
        let path = socket_path(tmp.path());
        assert!(wait_for_socket(&path), "daemon socket was not created");

        let stream = UnixStream::connect(&path).unwrap();
        (&stream).write_all(b"{\"pathToPackage\": 42}").unwrap();
        let mut deserializer = serde_json::Deserializer::from_reader(&stream);
        let response = Response::deserialize(&mut deserializer).unwrap();
        assert!(!response.error.is_empty());
        assert!(response.files.is_empty());
        drop(stream);

        server.join().unwrap().unwrap();
    }

    #[test]
    fn test_serve_requires_a_module() {
        let tmp = TempDir::new().unwrap();
        assert!(serve_with_idle(tmp.path(), Duration::from_millis(100)).is_err());
    }
}
