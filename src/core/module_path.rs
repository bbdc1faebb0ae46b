//! Module paths and component-wise prefix matching.

use std::fmt;

/// A slash-separated logical identifier for a Go module, e.g.
/// `example.com/foo`.
///
/// A module path is semantically a sequence of slash-separated components.
/// All prefix checks align on component boundaries: `k8s.io/api` does not
/// cover `k8s.io/apimachinery` even though it is a string prefix of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(path: impl Into<String>) -> Self {
        ModulePath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The number of slash-separated components.
    pub fn component_count(&self) -> usize {
        self.0.split('/').count()
    }

    /// Whether this module path covers `import_path`.
    ///
    /// Returns the remaining components of `import_path` (joined by `/`,
    /// empty when the paths are equal) when every component of `self`
    /// matches the corresponding leading component of `import_path`, and
    /// `None` otherwise.
    pub fn covers<'a>(&self, import_path: &'a str) -> Option<&'a str> {
        let mut remaining = import_path;
        let mut components = self.0.split('/').peekable();
        while let Some(component) = components.next() {
            match remaining.split_once('/') {
                Some((head, tail)) if head == component => remaining = tail,
                None if remaining == component && components.peek().is_none() => {
                    return Some("");
                }
                _ => return None,
            }
        }
        Some(remaining)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ModulePath {
    fn from(path: &str) -> Self {
        ModulePath::new(path)
    }
}
