//! Warm per-module-root state shared across resolution requests.
//!
//! A [`Cache`] is what the daemon keeps alive between invocations: the
//! manifest-lookup tables (one per request shape), one shared importer
//! cache, and memoized resolved file lists. A request that the daemon has
//! answered before returns without touching the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::importer::{CachedImporter, GoSourceImporter};
use crate::resolver::{find_with, FindOptions, FindResult, LocateError, ManifestLocator};
use crate::util::fs::clean_path;

/// The option combination a cached resolver state is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestShape {
    pub include_tests: bool,
    pub include_mod: bool,
    pub go_work: bool,
}

impl From<&FindOptions> for RequestShape {
    fn from(opts: &FindOptions) -> Self {
        RequestShape {
            include_tests: opts.include_tests,
            include_mod: opts.include_mod,
            go_work: opts.go_work,
        }
    }
}

impl From<RequestShape> for FindOptions {
    fn from(shape: RequestShape) -> Self {
        FindOptions {
            include_tests: shape.include_tests,
            include_mod: shape.include_mod,
            go_work: shape.go_work,
        }
    }
}

/// A memoized find outcome. Errors are kept as rendered strings so the
/// value can be handed out repeatedly.
struct CachedFind {
    files: Vec<PathBuf>,
    error: Option<String>,
}

impl CachedFind {
    fn to_result(&self) -> FindResult {
        FindResult {
            files: self.files.clone(),
            error: self.error.clone().map(|message| anyhow!(message)),
        }
    }
}

/// Resolver state for one request shape: requests with identical options
/// share a manifest cache and a result memo.
#[derive(Default)]
struct ShapeState {
    locator: ManifestLocator,
    results: Mutex<HashMap<PathBuf, Arc<CachedFind>>>,
}

/// Memoization bound to a single module root.
pub struct Cache {
    module_root: PathBuf,
    importer: CachedImporter<GoSourceImporter>,
    shapes: Mutex<HashMap<RequestShape, Arc<ShapeState>>>,
}

impl Cache {
    /// Create a cache bound to the module enclosing `pkg_root`.
    pub fn new(pkg_root: &Path) -> Result<Self, LocateError> {
        let module = ManifestLocator::new().find_module(&clean_path(pkg_root))?;
        Ok(Cache {
            module_root: module.root_dir.clone(),
            importer: CachedImporter::new(GoSourceImporter::host()),
            shapes: Mutex::new(HashMap::new()),
        })
    }

    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    /// Identical to [`crate::resolver::find`], but backed by this cache's
    /// warm state.
    pub fn find(&self, pkg_dir: &Path, shape: RequestShape) -> FindResult {
        let pkg_dir = clean_path(pkg_dir);
        let state = self.shape_state(shape);

        if let Some(hit) = state.results.lock().unwrap().get(&pkg_dir) {
            tracing::debug!("returning memoized result for {}", pkg_dir.display());
            return hit.to_result();
        }

        let result = find_with(&pkg_dir, &shape.into(), &state.locator, &self.importer);
        let computed = Arc::new(CachedFind {
            files: result.files,
            error: result.error.map(|err| format!("{err:#}")),
        });
        let result = state
            .results
            .lock()
            .unwrap()
            .entry(pkg_dir)
            .or_insert(computed)
            .to_result();
        result
    }

    fn shape_state(&self, shape: RequestShape) -> Arc<ShapeState> {
        Arc::clone(
            self.shapes
                .lock()
                .unwrap()
                .entry(shape)
                .or_default(),
        )
    }
}

/// Find the module root enclosing `pkg_root` without sharing any cache,
/// so that locating a daemon socket leaks no state between unrelated
/// requests.
pub fn find_module_root(pkg_root: &Path) -> Result<PathBuf, LocateError> {
    let module = ManifestLocator::new().find_module(&clean_path(pkg_root))?;
    Ok(module.root_dir.clone())
}
