//! Parallel traversal of the first-party import graph.
//!
//! Starting from the entry package directory, each discovered package
//! becomes a scoped task. Tasks share a seen-set keyed by import path, so
//! every import is processed at most once and cycles terminate at their
//! first revisit. The first hard error cancels the traversal; tasks that
//! have not run yet observe the cancellation and return without spawning
//! more work.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::core::replace::join_suffix;
use crate::core::{ImportMode, ModuleManifest, ReplaceTable};
use crate::importer::Importer;
use crate::resolver::enumerate::enumerate_package;
use crate::resolver::locate::ManifestLocator;

/// A cancellation handle carrying the first reported cause.
#[derive(Default)]
struct Cancellation {
    cancelled: AtomicBool,
    cause: Mutex<Option<anyhow::Error>>,
}

impl Cancellation {
    fn cancel_with(&self, cause: anyhow::Error) {
        let mut slot = self.cause.lock().unwrap();
        if slot.is_none() {
            *slot = Some(cause);
        }
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What a finished traversal hands to the aggregator.
pub(crate) struct TraversalOutcome {
    /// Every file emitted by package enumeration, deduplicated.
    pub files: HashSet<PathBuf>,
    /// Every module manifest visited, keyed by root directory.
    pub modules: HashMap<PathBuf, Arc<ModuleManifest>>,
    /// Non-fatal errors (embed expansion) gathered along the way.
    pub soft_errors: Vec<anyhow::Error>,
    /// The first hard error, when the traversal was cancelled.
    pub cause: Option<anyhow::Error>,
}

pub(crate) struct Traversal<'a> {
    locator: &'a ManifestLocator,
    importer: &'a dyn Importer,
    replaces: &'a ReplaceTable,
    include_tests: bool,

    seen: Mutex<HashSet<String>>,
    files: Mutex<HashSet<PathBuf>>,
    modules: Mutex<HashMap<PathBuf, Arc<ModuleManifest>>>,
    soft_errors: Mutex<Vec<anyhow::Error>>,
    cancel: Cancellation,
}

impl<'a> Traversal<'a> {
    pub fn new(
        locator: &'a ManifestLocator,
        importer: &'a dyn Importer,
        replaces: &'a ReplaceTable,
        include_tests: bool,
    ) -> Self {
        Traversal {
            locator,
            importer,
            replaces,
            include_tests,
            seen: Mutex::default(),
            files: Mutex::default(),
            modules: Mutex::default(),
            soft_errors: Mutex::default(),
            cancel: Cancellation::default(),
        }
    }

    /// Run the traversal to quiescence, rooted at `entry_dir`.
    pub fn run(self, entry_dir: PathBuf) -> TraversalOutcome {
        rayon::scope(|scope| self.enqueue(scope, entry_dir, None));

        TraversalOutcome {
            files: self.files.into_inner().unwrap(),
            modules: self.modules.into_inner().unwrap(),
            soft_errors: self.soft_errors.into_inner().unwrap(),
            cause: self.cancel.cause.into_inner().unwrap(),
        }
    }

    fn enqueue<'s>(
        &'s self,
        scope: &rayon::Scope<'s>,
        dir: PathBuf,
        import_name: Option<String>,
    ) {
        scope.spawn(move |scope| self.process(scope, dir, import_name));
    }

    fn process<'s>(
        &'s self,
        scope: &rayon::Scope<'s>,
        dir: PathBuf,
        import_name: Option<String>,
    ) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::debug!("searching for imports of {}", dir.display());

        let module = match self.locator.find_module(&dir) {
            Ok(module) => module,
            Err(err) => {
                self.cancel.cancel_with(err.into());
                return;
            }
        };
        self.modules
            .lock()
            .unwrap()
            .entry(module.root_dir.clone())
            .or_insert_with(|| Arc::clone(&module));

        let pkg = match self.importer.import_dir(&dir, ImportMode::default()) {
            Ok(pkg) => pkg,
            Err(err) => {
                let cause = match &import_name {
                    Some(name) if !dir.exists() => anyhow!(
                        "referenced package {name} was not found: expected to be at {}",
                        dir.display()
                    ),
                    _ => anyhow!(err),
                };
                self.cancel.cancel_with(cause);
                return;
            }
        };

        let mut emitted = Vec::new();
        let errors = enumerate_package(&pkg, self.include_tests, &mut |path| emitted.push(path));
        self.files.lock().unwrap().extend(emitted);
        if !errors.is_empty() {
            self.soft_errors.lock().unwrap().extend(errors);
        }

        let test_imports = self
            .include_tests
            .then(|| pkg.test_imports.iter().chain(&pkg.xtest_imports));
        for import in pkg.imports.iter().chain(test_imports.into_iter().flatten()) {
            if self.cancel.is_cancelled() {
                return;
            }
            if !self.seen.lock().unwrap().insert(import.clone()) {
                tracing::debug!("skipping repeated import {import}");
                continue;
            }

            // The enclosing module is checked before the replace table so
            // it keeps its own imports even when a replace names a prefix
            // of the module path.
            let target = if let Some(suffix) = module.module_path.covers(import) {
                join_suffix(&module.root_dir, suffix)
            } else if let Some(target) = self.replaces.resolve(import) {
                tracing::debug!("replacing import {import} with {}", target.display());
                target
            } else {
                tracing::debug!("skipping foreign import {import}");
                continue;
            };
            self.enqueue(scope, target, Some(import.clone()));
        }
    }
}
