//! The dependency resolver: everything between "a package directory" and
//! "the sorted list of files its build consumes".

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::core::manifest::WorkspaceManifest;
use crate::core::{ModuleManifest, ReplaceTable};
use crate::importer::{CachedImporter, GoSourceImporter, Importer};
use crate::util::fs::clean_path;

pub mod embed;
pub mod enumerate;
pub mod locate;
mod traverse;

pub use locate::{LocateError, ManifestLocator};

use locate::find_workspace;
use traverse::Traversal;

/// Knobs for one resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Include test files and follow test-only imports.
    pub include_tests: bool,
    /// Include `go.mod`/`go.sum` (and workspace) manifest files.
    pub include_mod: bool,
    /// Honor an enclosing `go.work` workspace.
    pub go_work: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions {
            include_tests: false,
            include_mod: true,
            go_work: true,
        }
    }
}

/// The outcome of a resolution request.
///
/// Mirrors the partial-result contract of the wire protocol: hard errors
/// abort the traversal but files gathered up to that point are still
/// returned, and non-fatal embed failures are composed into `error`
/// alongside a complete file list.
#[derive(Debug)]
pub struct FindResult {
    /// Sorted, duplicate-free absolute paths.
    pub files: Vec<PathBuf>,
    /// The composed error, when anything went wrong.
    pub error: Option<anyhow::Error>,
}

impl FindResult {
    fn from_error(error: anyhow::Error) -> Self {
        FindResult {
            files: Vec::new(),
            error: Some(error),
        }
    }

    /// Collapse into a `Result`, dropping partial files on error.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.files),
        }
    }
}

/// Find the set of files that the package at `pkg_dir` depends on.
pub fn find(pkg_dir: &Path, opts: &FindOptions) -> FindResult {
    let locator = ManifestLocator::new();
    let importer = CachedImporter::new(GoSourceImporter::host());
    find_with(pkg_dir, opts, &locator, &importer)
}

/// [`find`] against caller-provided caches, so a warm daemon can reuse its
/// manifest and importer state across requests.
pub(crate) fn find_with(
    pkg_dir: &Path,
    opts: &FindOptions,
    locator: &ManifestLocator,
    importer: &dyn Importer,
) -> FindResult {
    if std::env::var("GO111MODULE").as_deref() == Ok("off") {
        return FindResult::from_error(anyhow!("Go modules disabled"));
    }
    let pkg_dir = clean_path(pkg_dir);

    let entry_module = match locator.find_module(&pkg_dir) {
        Ok(module) => module,
        Err(err) => return FindResult::from_error(err.into()),
    };
    let workspace = if opts.go_work {
        match find_workspace(&entry_module) {
            Ok(workspace) => workspace,
            Err(err) => return FindResult::from_error(err),
        }
    } else {
        None
    };

    let replaces = build_replace_table(&entry_module, workspace.as_ref(), locator);
    let outcome = Traversal::new(locator, importer, &replaces, opts.include_tests).run(pkg_dir);

    let mut files = outcome.files;
    let mut errors = Vec::new();
    if let Some(cause) = outcome.cause {
        errors.push(cause);
    }
    errors.extend(outcome.soft_errors);

    if opts.include_mod {
        for module in outcome.modules.values() {
            // go.mod must exist: finding the module proved as much.
            files.insert(module.root_dir.join("go.mod"));
            if let Err(err) = insert_if_exists(&mut files, module.root_dir.join("go.sum")) {
                errors.push(err);
            }
        }
        if let Some(workspace) = &workspace {
            files.insert(workspace.root_dir.join("go.work"));
            if let Err(err) =
                insert_if_exists(&mut files, workspace.root_dir.join("go.work.sum"))
            {
                errors.push(err);
            }
        }
    }

    let mut sorted: Vec<PathBuf> = files.into_iter().collect();
    sorted.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    FindResult {
        files: sorted,
        error: join_errors(errors),
    }
}

/// Merge module replaces, workspace replaces, and workspace `use` entries
/// into one ordered table. Workspace entries shadow module entries with
/// the same source path, and each `use` entry acts as a replace pointing
/// at the used module's root.
fn build_replace_table(
    module: &ModuleManifest,
    workspace: Option<&WorkspaceManifest>,
    locator: &ManifestLocator,
) -> ReplaceTable {
    let mut table = ReplaceTable::new();
    for replace in &module.replaces {
        table.insert(replace.from.clone(), module.root_dir.join(&replace.to));
    }
    if let Some(workspace) = workspace {
        for replace in &workspace.replaces {
            table.insert(replace.from.clone(), workspace.root_dir.join(&replace.to));
        }
        for use_dir in &workspace.use_dirs {
            let dir = clean_path(&workspace.root_dir.join(use_dir));
            match locator.find_module(&dir) {
                Ok(used) => table.insert(used.module_path.clone(), used.root_dir.clone()),
                Err(err) => tracing::error!(
                    "skipping workspace use entry {}: {err:#}",
                    dir.display()
                ),
            }
        }
    }
    table.finish()
}

fn insert_if_exists(files: &mut HashSet<PathBuf>, path: PathBuf) -> Result<()> {
    match std::fs::metadata(&path) {
        Ok(_) => {
            files.insert(path);
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("could not stat {}", path.display())),
    }
}

/// Compose many errors into one, preserving each message.
pub(crate) fn join_errors(errors: Vec<anyhow::Error>) -> Option<anyhow::Error> {
    let mut errors = errors.into_iter();
    let first = errors.next()?;
    let mut message = format!("{first:#}");
    for err in errors {
        message.push('\n');
        message.push_str(&format!("{err:#}"));
    }
    Some(anyhow!(message))
}
