//! The warm-cache daemon.
//!
//! Each module root gets its own Unix-domain socket. A short-lived CLI
//! invocation dials the socket and gets an answer from the daemon's warm
//! [`Cache`](crate::Cache); when no daemon is running, the invocation
//! resolves in-process and leaves a detached daemon behind for next time.
//! The daemon is best-effort and self-terminating: it shuts down after a
//! few idle seconds so no process outlives its usefulness.

mod client;
mod server;
mod wire;

pub use client::find;
pub use server::serve;
pub use wire::socket_path;
