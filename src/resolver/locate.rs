//! Locating `go.mod` and `go.work` manifests by upward search.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::manifest::{parse_module_manifest, parse_workspace_manifest};
use crate::core::{ModuleManifest, WorkspaceManifest};

/// Failure to locate or load a module manifest.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no go.mod file found")]
    NotFound,

    #[error("could not read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Finds the module manifest enclosing a directory, caching the result
/// under every directory visited on the way up.
///
/// The cache is what makes a parallel traversal cheap: sibling package
/// directories of one module all ascend through the same ancestors, and
/// after the first ascent each of them resolves in a single lookup.
/// Concurrent ascents may parse the same manifest twice; both writers
/// store equivalent values, so either winning is fine.
#[derive(Default)]
pub struct ManifestLocator {
    cache: RwLock<HashMap<PathBuf, Arc<ModuleManifest>>>,
}

impl ManifestLocator {
    pub fn new() -> Self {
        ManifestLocator::default()
    }

    /// Find the nearest enclosing module manifest of `dir`.
    pub fn find_module(&self, dir: &Path) -> Result<Arc<ModuleManifest>, LocateError> {
        tracing::debug!("searching for go.mod above {}", dir.display());

        let mut visited = Vec::new();
        let mut current = dir.to_path_buf();
        loop {
            let hit = self.cache.read().unwrap().get(&current).cloned();
            if let Some(manifest) = hit {
                self.store(visited, &manifest);
                return Ok(manifest);
            }
            visited.push(current.clone());

            let manifest_path = current.join("go.mod");
            match std::fs::read_to_string(&manifest_path) {
                Ok(contents) => {
                    let manifest = parse_module_manifest(&contents, &current).map_err(
                        |source| LocateError::Parse {
                            path: manifest_path,
                            source,
                        },
                    )?;
                    tracing::debug!(
                        "found module {} at {}",
                        manifest.module_path,
                        current.display()
                    );
                    let manifest = Arc::new(manifest);
                    self.store(visited, &manifest);
                    return Ok(manifest);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    match current.parent() {
                        Some(parent) if !parent.as_os_str().is_empty() => {
                            current = parent.to_path_buf();
                        }
                        _ => return Err(LocateError::NotFound),
                    }
                }
                Err(source) => {
                    return Err(LocateError::Io {
                        path: manifest_path,
                        source,
                    })
                }
            }
        }
    }

    fn store(&self, visited: Vec<PathBuf>, manifest: &Arc<ModuleManifest>) {
        if visited.is_empty() {
            return;
        }
        let mut cache = self.cache.write().unwrap();
        for dir in visited {
            cache.entry(dir).or_insert_with(|| Arc::clone(manifest));
        }
    }
}

/// Find the workspace manifest governing `module`, if any.
///
/// The ascent starts at the module root rather than the requesting
/// directory: a workspace sits at or above its modules, so subdirectories
/// never need their own scan. Running out of parents is the ordinary "no
/// workspace" outcome, not an error.
pub fn find_workspace(module: &ModuleManifest) -> Result<Option<WorkspaceManifest>> {
    let mut current = module.root_dir.clone();
    loop {
        let manifest_path = current.join("go.work");
        match std::fs::read_to_string(&manifest_path) {
            Ok(contents) => {
                let workspace = parse_workspace_manifest(&contents, &current)
                    .with_context(|| format!("could not parse {}", manifest_path.display()))?;
                tracing::debug!("found workspace at {}", current.display());
                return Ok(Some(workspace));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    current = parent.to_path_buf();
                }
                _ => return Ok(None),
            },
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("could not read {}", manifest_path.display()))
            }
        }
    }
}
