//! The merged replace table.
//!
//! Module-level replaces, workspace-level replaces, and workspace `use`
//! entries all funnel into one ordered lookup: longest `from` first, so a
//! linear scan returns the most specific cover.

use std::path::{Path, PathBuf};

use crate::core::module_path::ModulePath;
use crate::util::fs::clean_path;

/// One replace directive with its target resolved to an absolute directory.
#[derive(Debug, Clone)]
pub struct ReplaceEntry {
    pub from: ModulePath,
    pub to: PathBuf,
}

/// An ordered replace lookup table. Immutable once built.
#[derive(Debug, Default)]
pub struct ReplaceTable {
    entries: Vec<ReplaceEntry>,
}

impl ReplaceTable {
    pub fn new() -> Self {
        ReplaceTable::default()
    }

    /// Add an entry, overriding any existing entry with the same `from`.
    /// Later inserts win, which lets workspace entries shadow module
    /// entries.
    pub fn insert(&mut self, from: ModulePath, to: PathBuf) {
        let to = clean_path(&to);
        match self.entries.iter_mut().find(|entry| entry.from == from) {
            Some(existing) => existing.to = to,
            None => self.entries.push(ReplaceEntry { from, to }),
        }
    }

    /// Freeze the table: most-specific (most components) `from` first,
    /// lexicographic tiebreak for a stable iteration order.
    pub fn finish(mut self) -> Self {
        self.entries.sort_by(|a, b| {
            b.from
                .component_count()
                .cmp(&a.from.component_count())
                .then_with(|| a.from.cmp(&b.from))
        });
        self
    }

    /// Resolve `import_path` through the table: the first (longest-first)
    /// entry that covers it wins, yielding the covered directory.
    pub fn resolve(&self, import_path: &str) -> Option<PathBuf> {
        self.entries.iter().find_map(|entry| {
            entry
                .from
                .covers(import_path)
                .map(|suffix| join_suffix(&entry.to, suffix))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Join a module-path suffix onto a root directory. An empty suffix names
/// the root itself; going through `Path::join` would leave a trailing
/// separator that breaks path equality.
pub fn join_suffix(root: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        root.to_path_buf()
    } else {
        root.join(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> ReplaceTable {
        let mut table = ReplaceTable::new();
        for (from, to) in entries {
            table.insert(ModulePath::new(*from), PathBuf::from(to));
        }
        table.finish()
    }

    #[test]
    fn test_longest_from_wins() {
        let table = table(&[
            ("example.com/mod", "/replace/outer"),
            ("example.com/mod/inner", "/replace/inner"),
        ]);

        assert_eq!(
            table.resolve("example.com/mod/inner/pkg"),
            Some(PathBuf::from("/replace/inner/pkg"))
        );
        assert_eq!(
            table.resolve("example.com/mod/other"),
            Some(PathBuf::from("/replace/outer/other"))
        );
    }

    #[test]
    fn test_ambiguous_prefixes_stay_separate() {
        let table = table(&[
            ("example.com/pkg2", "/work/pkg2"),
            ("example.com/pkg2nested", "/work/pkg2nested"),
        ]);

        assert_eq!(
            table.resolve("example.com/pkg2"),
            Some(PathBuf::from("/work/pkg2"))
        );
        assert_eq!(
            table.resolve("example.com/pkg2nested"),
            Some(PathBuf::from("/work/pkg2nested"))
        );
        assert_eq!(
            table.resolve("example.com/pkg2nested/sub"),
            Some(PathBuf::from("/work/pkg2nested/sub"))
        );
    }

    #[test]
    fn test_later_insert_overrides() {
        let mut table = ReplaceTable::new();
        table.insert(ModulePath::new("example.com/a"), PathBuf::from("/module"));
        table.insert(ModulePath::new("example.com/a"), PathBuf::from("/workspace"));
        let table = table.finish();

        assert_eq!(
            table.resolve("example.com/a"),
            Some(PathBuf::from("/workspace"))
        );
    }

    #[test]
    fn test_foreign_import_misses() {
        let table = table(&[("example.com/pkg2", "/work/pkg2")]);
        assert_eq!(table.resolve("golang.org/x/mod"), None);
    }

    #[test]
    fn test_target_paths_are_cleaned() {
        let table = table(&[("example.com/pkg2", "/work/pkg1/../pkg2")]);
        assert_eq!(
            table.resolve("example.com/pkg2"),
            Some(PathBuf::from("/work/pkg2"))
        );
    }
}
