//! The package importer contract.
//!
//! The graph traversal only needs one capability: given a directory,
//! produce a [`PackageDescriptor`]. Expressing it as a trait keeps the
//! traversal unit-testable with an in-memory importer while the production
//! path scans real Go source directories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::core::{ImportMode, PackageDescriptor};

mod go_source;

pub use go_source::GoSourceImporter;

/// Errors produced while importing a package directory.
///
/// The variants are cloneable so a cached import failure can be handed out
/// repeatedly.
#[derive(Debug, Clone, Error)]
pub enum ImportError {
    #[error("package directory {} does not exist", dir.display())]
    NotFound { dir: PathBuf },

    #[error("no Go source files in {}", dir.display())]
    NoGoFiles { dir: PathBuf },

    #[error("could not import {}: {message}", dir.display())]
    Io { dir: PathBuf, message: String },
}

/// The single capability the traversal requires: directory in, package
/// descriptor out.
pub trait Importer: Sync {
    fn import_dir(
        &self,
        dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<PackageDescriptor>, ImportError>;
}

/// An importer wrapper memoizing results (successes and failures) by
/// `(dir, mode)`.
///
/// The map only grows. Concurrent importers may race on a cold key and
/// both compute; the first stored value wins and later computations are
/// discarded, which keeps results consistent.
pub struct CachedImporter<I> {
    inner: I,
    cache: RwLock<HashMap<(PathBuf, ImportMode), Result<Arc<PackageDescriptor>, ImportError>>>,
}

impl<I: Importer> CachedImporter<I> {
    pub fn new(inner: I) -> Self {
        CachedImporter {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl<I: Importer> Importer for CachedImporter<I> {
    fn import_dir(
        &self,
        dir: &Path,
        mode: ImportMode,
    ) -> Result<Arc<PackageDescriptor>, ImportError> {
        let key = (dir.to_path_buf(), mode);
        if let Some(cached) = self.cache.read().unwrap().get(&key) {
            return cached.clone();
        }

        let computed = self.inner.import_dir(dir, mode);
        let mut cache = self.cache.write().unwrap();
        cache.entry(key).or_insert(computed).clone()
    }
}
