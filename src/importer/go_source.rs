//! The production importer: scans one directory of Go sources.
//!
//! Classification mirrors what the Go toolchain's importer reports for the
//! default build configuration: regular, cgo, test, external-test, ignored
//! and invalid Go files, plus companion sources bucketed by extension.
//! Build constraints are honored at filename granularity (`_GOOS`,
//! `_GOARCH` suffixes) against the host defaults; `//go:build` expressions
//! are not evaluated.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::core::{ImportMode, PackageDescriptor};
use crate::importer::{ImportError, Importer};

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "illumos", "ios", "js", "linux",
    "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle",
    "ppc64", "ppc64le", "riscv64", "s390x", "wasm",
];

/// Imports Go packages from the real filesystem.
pub struct GoSourceImporter {
    goos: String,
    goarch: String,
}

impl GoSourceImporter {
    /// An importer targeting an explicit OS/architecture pair.
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        GoSourceImporter {
            goos: goos.into(),
            goarch: goarch.into(),
        }
    }

    /// An importer targeting the host build environment: `GOOS`/`GOARCH`
    /// from the environment when set, the host platform otherwise.
    pub fn host() -> Self {
        let goos = std::env::var("GOOS").unwrap_or_else(|_| go_os(std::env::consts::OS));
        let goarch = std::env::var("GOARCH").unwrap_or_else(|_| go_arch(std::env::consts::ARCH));
        GoSourceImporter::new(goos, goarch)
    }

    /// Whether a `.go` filename passes the `name_GOOS_GOARCH.go` filename
    /// constraints for the target platform. A trailing `_test` is ignored
    /// for constraint purposes, and a constraint token must not be the
    /// first component of the name (`linux.go` is unconstrained).
    fn filename_matches_target(&self, name: &str) -> bool {
        let base = name.strip_suffix(".go").unwrap_or(name);
        let mut parts: Vec<&str> = base.split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        if parts.len() >= 3 {
            let os = parts[parts.len() - 2];
            let arch = parts[parts.len() - 1];
            if KNOWN_OS.contains(&os) && KNOWN_ARCH.contains(&arch) {
                return os == self.goos && arch == self.goarch;
            }
        }
        if parts.len() >= 2 {
            let last = parts[parts.len() - 1];
            if KNOWN_OS.contains(&last) {
                return last == self.goos;
            }
            if KNOWN_ARCH.contains(&last) {
                return last == self.goarch;
            }
        }
        true
    }
}

fn go_os(os: &str) -> String {
    match os {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

fn go_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        "x86" => "386".to_string(),
        "powerpc64" => "ppc64".to_string(),
        other => other.to_string(),
    }
}

impl Importer for GoSourceImporter {
    fn import_dir(
        &self,
        dir: &Path,
        _mode: ImportMode,
    ) -> Result<Arc<PackageDescriptor>, ImportError> {
        let entries = std::fs::read_dir(dir).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ImportError::NotFound {
                dir: dir.to_path_buf(),
            },
            _ => ImportError::Io {
                dir: dir.to_path_buf(),
                message: err.to_string(),
            },
        })?;

        let io_error = |err: io::Error| ImportError::Io {
            dir: dir.to_path_buf(),
            message: err.to_string(),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error)?;
            // Stat through symlinks; skip entries that are not regular
            // files, including broken links.
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => {
                    if let Ok(name) = entry.file_name().into_string() {
                        names.push(name);
                    }
                }
                _ => {}
            }
        }
        names.sort();

        let mut pkg = PackageDescriptor {
            dir: dir.to_path_buf(),
            ..Default::default()
        };
        let mut imports = BTreeSet::new();
        let mut test_imports = BTreeSet::new();
        let mut xtest_imports = BTreeSet::new();
        let mut saw_go_file = false;

        for name in names {
            // Files invisible to the Go build.
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            let Some((_, ext)) = name.rsplit_once('.') else {
                continue;
            };
            match ext {
                "go" => {}
                "c" => {
                    pkg.c_files.push(name);
                    continue;
                }
                "cc" | "cpp" | "cxx" => {
                    pkg.cxx_files.push(name);
                    continue;
                }
                "m" => {
                    pkg.m_files.push(name);
                    continue;
                }
                "h" | "hh" | "hpp" | "hxx" => {
                    pkg.h_files.push(name);
                    continue;
                }
                "f" | "F" | "for" | "f90" => {
                    pkg.f_files.push(name);
                    continue;
                }
                "s" | "S" => {
                    pkg.s_files.push(name);
                    continue;
                }
                "swig" => {
                    pkg.swig_files.push(name);
                    continue;
                }
                "swigcxx" => {
                    pkg.swig_cxx_files.push(name);
                    continue;
                }
                "syso" => {
                    pkg.syso_files.push(name);
                    continue;
                }
                _ => continue,
            }

            saw_go_file = true;
            if !self.filename_matches_target(&name) {
                pkg.ignored_go_files.push(name);
                continue;
            }

            let contents = std::fs::read_to_string(dir.join(&name)).map_err(io_error)?;
            let info = scan_go_file(&contents);
            let Some(package_name) = info.package else {
                pkg.invalid_go_files.push(name);
                continue;
            };

            if name.ends_with("_test.go") {
                if package_name.ends_with("_test") {
                    pkg.xtest_go_files.push(name);
                    xtest_imports.extend(info.imports);
                    extend_patterns(&mut pkg.xtest_embed_patterns, info.embeds);
                } else {
                    pkg.test_go_files.push(name);
                    test_imports.extend(info.imports);
                    extend_patterns(&mut pkg.test_embed_patterns, info.embeds);
                }
            } else {
                let is_cgo = info.imports.iter().any(|import| import == "C");
                if is_cgo {
                    pkg.cgo_files.push(name);
                } else {
                    pkg.go_files.push(name);
                }
                imports.extend(info.imports.into_iter().filter(|import| import != "C"));
                extend_patterns(&mut pkg.embed_patterns, info.embeds);
            }
        }

        if !saw_go_file {
            return Err(ImportError::NoGoFiles {
                dir: dir.to_path_buf(),
            });
        }

        pkg.imports = imports.into_iter().collect();
        pkg.test_imports = test_imports.into_iter().collect();
        pkg.xtest_imports = xtest_imports.into_iter().collect();
        Ok(Arc::new(pkg))
    }
}

fn extend_patterns(patterns: &mut Vec<String>, new: Vec<String>) {
    for pattern in new {
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }
}

#[derive(Debug, Default)]
struct GoFileInfo {
    package: Option<String>,
    imports: Vec<String>,
    embeds: Vec<String>,
}

/// Scan one Go source file for its package clause, import paths, and
/// `//go:embed` patterns. This is a line-shaped scan, not a full parse:
/// the declarations it cares about are line-oriented in gofmt'ed and
/// hand-written code alike.
fn scan_go_file(contents: &str) -> GoFileInfo {
    let mut info = GoFileInfo::default();
    let mut in_block_comment = false;
    let mut in_import_block = false;

    for raw_line in contents.lines() {
        let mut line = raw_line.trim();

        if in_block_comment {
            match line.find("*/") {
                Some(end) => {
                    line = line[end + 2..].trim();
                    in_block_comment = false;
                }
                None => continue,
            }
        }

        if let Some(patterns) = line.strip_prefix("//go:embed") {
            info.embeds.extend(split_embed_patterns(patterns));
            continue;
        }
        if line.starts_with("//") {
            continue;
        }
        if let Some(start) = line.find("/*") {
            // A block comment opening; anything before it still counts.
            let rest = &line[start + 2..];
            if !rest.contains("*/") {
                in_block_comment = true;
            }
            line = line[..start].trim_end();
        }
        if line.is_empty() {
            continue;
        }

        if in_import_block {
            if line.starts_with(')') {
                in_import_block = false;
            } else if let Some(path) = quoted_segment(line) {
                info.imports.push(path.to_string());
            }
            continue;
        }

        if info.package.is_none() {
            if let Some(rest) = line.strip_prefix("package ") {
                let name = rest.split_whitespace().next().unwrap_or_default();
                if !name.is_empty() {
                    info.package = Some(name.to_string());
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("import") {
            let rest = rest.trim_start();
            if rest.starts_with('(') {
                in_import_block = true;
            } else if let Some(path) = quoted_segment(rest) {
                info.imports.push(path.to_string());
            }
        }
    }

    info
}

/// The contents of the first double-quoted segment in `line`, if any.
fn quoted_segment(line: &str) -> Option<&str> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Split a `//go:embed` argument list on whitespace, keeping quoted and
/// backquoted patterns intact (delimiters included; the expander unquotes
/// them).
fn split_embed_patterns(args: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut chars = args.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut pattern = String::new();
        match c {
            '"' => {
                pattern.push(c);
                chars.next();
                while let Some(next) = chars.next() {
                    pattern.push(next);
                    if next == '\\' {
                        if let Some(escaped) = chars.next() {
                            pattern.push(escaped);
                        }
                    } else if next == '"' {
                        break;
                    }
                }
            }
            '`' => {
                pattern.push(c);
                chars.next();
                for next in chars.by_ref() {
                    pattern.push(next);
                    if next == '`' {
                        break;
                    }
                }
            }
            _ => {
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() {
                        break;
                    }
                    pattern.push(next);
                    chars.next();
                }
            }
        }
        patterns.push(pattern);
    }

    patterns
}
