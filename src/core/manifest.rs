//! `go.mod` / `go.work` manifests and their parser.
//!
//! Only the directives the resolver consumes are parsed: the `module`
//! declaration, `replace` directives, and (for workspaces) `use` entries.
//! `require`, `exclude`, `retract`, `go`, and `toolchain` lines are
//! skipped. Replace directives whose target carries a version instead of a
//! directory are module-version replaces and are dropped; only local
//! directory redirects matter for file enumeration.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::core::module_path::ModulePath;

/// A replace directive retargeting one module path to a local directory.
#[derive(Debug, Clone)]
pub struct RawReplace {
    pub from: ModulePath,
    /// The directory path exactly as written in the manifest, possibly
    /// relative to the manifest's directory.
    pub to: String,
}

/// The parsed contents of a `go.mod` file.
#[derive(Debug, Clone)]
pub struct ModuleManifest {
    pub module_path: ModulePath,
    /// Absolute directory containing the `go.mod` file.
    pub root_dir: PathBuf,
    /// Local (directory-target) replace directives, in declaration order.
    pub replaces: Vec<RawReplace>,
}

/// The parsed contents of a `go.work` file.
#[derive(Debug, Clone)]
pub struct WorkspaceManifest {
    /// Absolute directory containing the `go.work` file.
    pub root_dir: PathBuf,
    /// Local replace directives, in declaration order.
    pub replaces: Vec<RawReplace>,
    /// `use` entries: directory paths relative to the workspace root.
    pub use_dirs: Vec<String>,
}

/// Whether a replace target is a filesystem path rather than a module
/// path. Mirrors the module file convention: directory targets start with
/// `./`, `../`, or are absolute.
pub fn is_directory_path(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../") || path.starts_with('/')
}

/// Parse the contents of a `go.mod` file rooted at `root_dir`.
pub fn parse_module_manifest(contents: &str, root_dir: &Path) -> Result<ModuleManifest> {
    let mut module_path = None;
    let mut replaces = Vec::new();

    parse_directives(contents, |directive, args| {
        match directive {
            "module" => {
                let path = args
                    .first()
                    .ok_or_else(|| anyhow!("module directive missing a path"))?;
                module_path = Some(ModulePath::new(path.clone()));
            }
            "replace" => {
                if let Some(replace) = parse_replace(args)? {
                    replaces.push(replace);
                }
            }
            _ => {}
        }
        Ok(())
    })?;

    Ok(ModuleManifest {
        module_path: module_path.ok_or_else(|| anyhow!("missing module directive"))?,
        root_dir: root_dir.to_path_buf(),
        replaces,
    })
}

/// Parse the contents of a `go.work` file rooted at `root_dir`.
pub fn parse_workspace_manifest(contents: &str, root_dir: &Path) -> Result<WorkspaceManifest> {
    let mut replaces = Vec::new();
    let mut use_dirs = Vec::new();

    parse_directives(contents, |directive, args| {
        match directive {
            "use" => {
                let dir = args
                    .first()
                    .ok_or_else(|| anyhow!("use directive missing a directory"))?;
                use_dirs.push(dir.clone());
            }
            "replace" => {
                if let Some(replace) = parse_replace(args)? {
                    replaces.push(replace);
                }
            }
            _ => {}
        }
        Ok(())
    })?;

    Ok(WorkspaceManifest {
        root_dir: root_dir.to_path_buf(),
        replaces,
        use_dirs,
    })
}

/// Parse one replace entry of the form `old [version] => new [version]`.
///
/// Returns `None` for version replaces, which do not redirect to a local
/// directory.
fn parse_replace(args: &[String]) -> Result<Option<RawReplace>> {
    let arrow = args
        .iter()
        .position(|token| token == "=>")
        .ok_or_else(|| anyhow!("replace directive missing \"=>\""))?;
    let (old, new) = args.split_at(arrow);
    let new = &new[1..];

    let from = old
        .first()
        .ok_or_else(|| anyhow!("replace directive missing an old path"))?;
    let to = new
        .first()
        .ok_or_else(|| anyhow!("replace directive missing a new path"))?;

    if !is_directory_path(to) {
        return Ok(None);
    }
    Ok(Some(RawReplace {
        from: ModulePath::new(from.clone()),
        to: to.clone(),
    }))
}

/// Drive `visit` with every `(directive, args)` pair in a module file,
/// flattening block form (`replace ( ... )`) into repeated directives.
fn parse_directives(
    contents: &str,
    mut visit: impl FnMut(&str, &[String]) -> Result<()>,
) -> Result<()> {
    let mut block: Option<String> = None;

    for (number, line) in contents.lines().enumerate() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        let context = || format!("line {}", number + 1);

        if let Some(directive) = block.clone() {
            if line == ")" {
                block = None;
                continue;
            }
            let args = tokenize(line).with_context(context)?;
            visit(&directive, &args).with_context(context)?;
            continue;
        }

        let mut tokens = tokenize(line).with_context(context)?;
        if tokens.is_empty() {
            continue;
        }
        let directive = tokens.remove(0);
        if tokens.first().map(String::as_str) == Some("(") {
            block = Some(directive);
            continue;
        }
        visit(&directive, &tokens).with_context(context)?;
    }

    if block.is_some() {
        bail!("unclosed block");
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(index) => &line[..index],
        None => line,
    }
}

/// Split a directive line into whitespace-separated tokens, honoring
/// double-quoted and backquoted strings.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => token.push(escaped),
                        None => bail!("unterminated string"),
                    },
                    Some(other) => token.push(other),
                    None => bail!("unterminated string"),
                }
            }
            tokens.push(token);
        } else if c == '`' {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    Some('`') => break,
                    Some(other) => token.push(other),
                    None => bail!("unterminated raw string"),
                }
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_whitespace() {
                    break;
                }
                token.push(next);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_module() {
        let manifest = parse_module_manifest(
            "module example.com/testmod\n\ngo 1.22\n",
            Path::new("/work/testmod"),
        )
        .unwrap();
        assert_eq!(manifest.module_path.as_str(), "example.com/testmod");
        assert_eq!(manifest.root_dir, PathBuf::from("/work/testmod"));
        assert!(manifest.replaces.is_empty());
    }

    #[test]
    fn test_parse_inline_replace() {
        let manifest = parse_module_manifest(
            "module example.com/pkg1\n\nrequire example.com/pkg2 v0.0.0\n\nreplace example.com/pkg2 => ../pkg2\n",
            Path::new("/work/pkg1"),
        )
        .unwrap();
        assert_eq!(manifest.replaces.len(), 1);
        assert_eq!(manifest.replaces[0].from.as_str(), "example.com/pkg2");
        assert_eq!(manifest.replaces[0].to, "../pkg2");
    }

    #[test]
    fn test_parse_replace_block() {
        let manifest = parse_module_manifest(
            "module example.com/m\n\nreplace (\n\texample.com/a => ./vendor-a\n\texample.com/b v1.0.0 => ../b\n)\n",
            Path::new("/work/m"),
        )
        .unwrap();
        assert_eq!(manifest.replaces.len(), 2);
        assert_eq!(manifest.replaces[0].to, "./vendor-a");
        assert_eq!(manifest.replaces[1].from.as_str(), "example.com/b");
    }

    #[test]
    fn test_version_replace_is_dropped() {
        let manifest = parse_module_manifest(
            "module example.com/m\n\nreplace example.com/a => example.com/a-fork v1.2.3\n",
            Path::new("/work/m"),
        )
        .unwrap();
        assert!(manifest.replaces.is_empty());
    }

    #[test]
    fn test_missing_module_directive() {
        assert!(parse_module_manifest("go 1.22\n", Path::new("/work/m")).is_err());
    }

    #[test]
    fn test_parse_workspace() {
        let workspace = parse_workspace_manifest(
            "go 1.22\n\nuse (\n\t./pkg1\n\t./pkg2\n)\n\nreplace example.com/c => ../c\n",
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(workspace.use_dirs, vec!["./pkg1", "./pkg2"]);
        assert_eq!(workspace.replaces.len(), 1);
        assert_eq!(workspace.replaces[0].to, "../c");
    }

    #[test]
    fn test_comments_and_quotes() {
        let manifest = parse_module_manifest(
            "// the main module\nmodule \"example.com/quoted\" // trailing\n",
            Path::new("/work/m"),
        )
        .unwrap();
        assert_eq!(manifest.module_path.as_str(), "example.com/quoted");
    }
}
