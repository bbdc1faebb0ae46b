//! The daemon wire protocol: one JSON request per connection, one JSON
//! response back. Unknown fields are rejected in both directions so a
//! version skew between client and daemon fails loudly instead of
//! silently dropping an option.

use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::RequestShape;
use crate::util::hash::sha256_hex;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Request {
    pub path_to_package: PathBuf,
    #[serde(default)]
    pub include_test: bool,
    #[serde(default)]
    pub include_mod: bool,
    #[serde(default)]
    pub go_work: bool,
}

impl Request {
    pub fn shape(&self) -> RequestShape {
        RequestShape {
            include_tests: self.include_test,
            include_mod: self.include_mod,
            go_work: self.go_work,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Response {
    #[serde(rename = "Files", default)]
    pub files: Vec<PathBuf>,
    /// Empty means success.
    #[serde(rename = "Error", default)]
    pub error: String,
}

/// The socket path for a module root: `/tmp/helpmakego-<digest>.sock`,
/// where the digest is the first half of the hex SHA256 of the absolute
/// module-root path.
pub fn socket_path(module_root: &Path) -> PathBuf {
    let digest = sha256_hex(module_root.as_os_str().as_bytes());
    PathBuf::from(format!("/tmp/helpmakego-{}.sock", &digest[..32]))
}
