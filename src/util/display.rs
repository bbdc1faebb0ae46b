//! Path rendering for terminal and Makefile consumption.
//!
//! Converts absolute result paths into paths relative to the working
//! directory and escapes them so that a Make rule (or a shell) reads each
//! path as a single word.

use std::path::{Path, PathBuf};

use crate::util::fs::clean_path;

/// Render `paths` relative to `wd`, escaped for shell consumption.
pub fn relative(wd: &Path, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| escape_path(&make_relative(wd, path)))
        .collect()
}

fn make_relative(wd: &Path, path: &Path) -> String {
    match pathdiff::diff_paths(path, wd) {
        Some(rel) => rel.display().to_string(),
        None => {
            tracing::warn!(
                "unable to get relative path from {} to {}",
                wd.display(),
                path.display()
            );
            clean_path(path).display().to_string()
        }
    }
}

/// Escape a path so it survives being pasted into a shell word.
///
/// Single quotes are preferred since they suppress all interpolation. A
/// path that itself contains a single quote falls back to double quotes,
/// and a path that contains both kinds of quote cannot be escaped at all;
/// both fallbacks are best-effort and warn.
fn escape_path(path: &str) -> String {
    if !path.contains([' ', '\'', '"', '$']) {
        return path.to_string();
    }

    if !path.contains('\'') {
        return format!("'{path}'");
    }

    if !path.contains('"') {
        if path.contains('$') {
            tracing::warn!("unable to fully escape path {path:?}: contains a \"$\"");
        }
        return format!("\"{path}\"");
    }

    tracing::warn!("unable to escape path {path:?}: contains both '\"' and \"'\"");
    path.to_string()
}
