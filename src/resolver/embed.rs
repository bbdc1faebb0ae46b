//! Expansion of `//go:embed` patterns into concrete file lists.
//!
//! The semantics mirror the embed directive: patterns are interpreted
//! relative to the package directory with `/` separators; a pattern may be
//! written as a double-quoted or backquoted string literal; the single
//! pattern `*` embeds the whole package directory; a pattern naming a
//! directory embeds its subtree, excluding entries whose names begin with
//! `.` or `_`. A pattern that matches nothing contributes nothing and is
//! not an error.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use walkdir::WalkDir;

use crate::resolver::join_errors;

/// Expand every pattern in `patterns` against the package directory
/// `dir`, feeding matched files (relative to `dir`) to `sink`.
///
/// Failures are isolated per pattern: one bad pattern never suppresses the
/// expansion of the others. All errors encountered are returned for the
/// caller to aggregate.
pub fn expand_embeds(
    dir: &Path,
    patterns: &[String],
    sink: &mut dyn FnMut(PathBuf),
) -> Vec<anyhow::Error> {
    let mut errors = Vec::new();
    for pattern in patterns {
        if let Err(err) = expand_embed(dir, pattern, sink) {
            errors.push(err);
        }
    }
    errors
}

fn expand_embed(dir: &Path, pattern: &str, sink: &mut dyn FnMut(PathBuf)) -> Result<()> {
    let pattern = if pattern.starts_with('"') || pattern.starts_with('`') {
        unquote(pattern).context("invalid embed - failed to parse string")?
    } else {
        pattern.to_string()
    };

    if pattern == "*" {
        return embed_dir(dir, dir, sink);
    }

    let root = dir
        .to_str()
        .ok_or_else(|| anyhow!("package directory {} is not valid UTF-8", dir.display()))?;
    let full_pattern = format!("{}/{}", glob::Pattern::escape(root), pattern);
    let matches = glob::glob(&full_pattern).context("invalid embed - invalid glob")?;

    let mut errors = Vec::new();
    for entry in matches {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                errors.push(anyhow!(err));
                continue;
            }
        };
        match path.metadata() {
            Ok(meta) if meta.is_dir() => {
                if let Err(err) = embed_dir(dir, &path, sink) {
                    errors.push(err);
                }
            }
            Ok(_) => {
                if let Ok(rel) = path.strip_prefix(dir) {
                    sink(rel.to_path_buf());
                }
            }
            Err(err) => {
                errors.push(anyhow!(err).context(format!(
                    "could not get FS info on {}",
                    path.display()
                )));
            }
        }
    }

    join_errors(errors).map_or(Ok(()), Err)
}

/// Embed an entire directory subtree. Entries named with a leading `.` or
/// `_` are skipped, along with everything beneath them; the walk root
/// itself is exempt since a pattern named it explicitly.
fn embed_dir(root: &Path, dir: &Path, sink: &mut dyn FnMut(PathBuf)) -> Result<()> {
    let mut errors = Vec::new();
    let walk = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry
                .file_name()
                .to_string_lossy()
                .starts_with(['.', '_'])
    });

    for entry in walk {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Ok(rel) = entry.path().strip_prefix(root) {
                    sink(rel.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(err) => errors.push(anyhow!(err)),
        }
    }

    join_errors(errors).map_or(Ok(()), Err)
}

/// Unquote a double-quoted or backquoted pattern literal.
fn unquote(quoted: &str) -> Result<String> {
    let mut chars = quoted.chars();
    match chars.next() {
        Some('`') => {
            let rest = chars.as_str();
            let inner = rest
                .strip_suffix('`')
                .ok_or_else(|| anyhow!("unterminated raw string: {quoted}"))?;
            if inner.contains('`') {
                bail!("stray backquote in raw string: {quoted}");
            }
            Ok(inner.to_string())
        }
        Some('"') => {
            let mut out = String::new();
            loop {
                match chars.next() {
                    Some('"') => {
                        if chars.next().is_some() {
                            bail!("trailing characters after string: {quoted}");
                        }
                        return Ok(out);
                    }
                    Some('\\') => match chars.next() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('\\') => out.push('\\'),
                        Some('"') => out.push('"'),
                        Some('\'') => out.push('\''),
                        other => bail!("invalid escape \\{} in {quoted}", other.unwrap_or(' ')),
                    },
                    Some(c) => out.push(c),
                    None => bail!("unterminated string: {quoted}"),
                }
            }
        }
        _ => bail!("not a quoted string: {quoted}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for file in files {
            let path = tmp.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "content").unwrap();
        }
        tmp
    }

    fn expand(tmp: &TempDir, pattern: &str) -> Vec<String> {
        let mut actual = Vec::new();
        let errors = expand_embeds(
            tmp.path(),
            &[pattern.to_string()],
            &mut |path| actual.push(path.display().to_string()),
        );
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        actual.sort();
        actual
    }

    #[test]
    fn test_simple_match() {
        let tmp = fixture(&["example.txt"]);
        assert_eq!(expand(&tmp, "example.txt"), vec!["example.txt"]);
    }

    #[test]
    fn test_glob() {
        let tmp = fixture(&["foo.txt", "bar.txt", "other.go"]);
        assert_eq!(expand(&tmp, "*.txt"), vec!["bar.txt", "foo.txt"]);
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let tmp = fixture(&["foo.txt"]);
        assert_eq!(expand(&tmp, "fizz*"), Vec::<String>::new());
        assert_eq!(expand(&tmp, "fizz.txt"), Vec::<String>::new());
    }

    #[test]
    fn test_directory_expansion() {
        let tmp = fixture(&["d/foo", "d/bar", "d/nested/baz", "top"]);
        assert_eq!(expand(&tmp, "d"), vec!["d/bar", "d/foo", "d/nested/baz"]);
    }

    #[test]
    fn test_star_expands_package_dir() {
        let tmp = fixture(&["d/foo", "d/bar", "foo"]);
        assert_eq!(expand(&tmp, "*"), vec!["d/bar", "d/foo", "foo"]);
    }

    #[test]
    fn test_excludes_dot_and_underscore() {
        let tmp = fixture(&["d/_foo", "d/bar", "_foo", ".ignored", "d/.ignored", "_d/inner"]);
        assert_eq!(expand(&tmp, "*"), vec!["d/bar"]);
    }

    #[test]
    fn test_quoted_pattern_with_spaces() {
        let tmp = fixture(&["a file.txt"]);
        assert_eq!(expand(&tmp, "`a file.txt`"), vec!["a file.txt"]);
        assert_eq!(expand(&tmp, "\"a file.txt\""), vec!["a file.txt"]);
    }

    #[test]
    fn test_invalid_quoting_is_an_error() {
        let tmp = fixture(&["a.txt"]);
        let mut sink = |_: PathBuf| {};
        let errors = expand_embeds(
            tmp.path(),
            &["\"unterminated".to_string()],
            &mut sink,
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("invalid embed"));
    }

    #[test]
    fn test_bad_pattern_does_not_suppress_others() {
        let tmp = fixture(&["a.txt"]);
        let mut actual = Vec::new();
        let errors = expand_embeds(
            tmp.path(),
            &["\"broken".to_string(), "a.txt".to_string()],
            &mut |path| actual.push(path),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(actual, vec![PathBuf::from("a.txt")]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("`raw text`").unwrap(), "raw text");
        assert_eq!(unquote("\"a\\tb\"").unwrap(), "a\tb");
        assert!(unquote("\"open").is_err());
        assert!(unquote("`open").is_err());
    }
}
