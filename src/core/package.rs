//! The package descriptor contract consumed by the graph traversal.

use std::path::PathBuf;

/// Import-mode flags accepted by an importer. The resolver only uses the
/// default mode; the type exists so importer caches can key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImportMode(pub u32);

/// Everything the resolver needs to know about one package directory.
///
/// All file fields hold bare filenames within [`dir`](Self::dir); import
/// fields hold module paths.
#[derive(Debug, Clone, Default)]
pub struct PackageDescriptor {
    /// Absolute directory the package was loaded from.
    pub dir: PathBuf,

    /// Buildable `.go` source files, excluding cgo and test files.
    pub go_files: Vec<String>,
    /// `.go` source files that import "C".
    pub cgo_files: Vec<String>,
    /// `.go` source files ignored for this build configuration.
    pub ignored_go_files: Vec<String>,
    /// `.go` source files with detected problems.
    pub invalid_go_files: Vec<String>,

    /// `.c` source files.
    pub c_files: Vec<String>,
    /// `.cc`, `.cpp` and `.cxx` source files.
    pub cxx_files: Vec<String>,
    /// `.m` (Objective-C) source files.
    pub m_files: Vec<String>,
    /// `.h`, `.hh`, `.hpp` and `.hxx` header files.
    pub h_files: Vec<String>,
    /// `.f`, `.F`, `.for` and `.f90` Fortran source files.
    pub f_files: Vec<String>,
    /// `.s` and `.S` assembly files.
    pub s_files: Vec<String>,
    /// `.swig` files.
    pub swig_files: Vec<String>,
    /// `.swigcxx` files.
    pub swig_cxx_files: Vec<String>,
    /// `.syso` system object files.
    pub syso_files: Vec<String>,

    /// In-package `_test.go` files.
    pub test_go_files: Vec<String>,
    /// External (`package foo_test`) test files.
    pub xtest_go_files: Vec<String>,

    /// `//go:embed` patterns from non-test files.
    pub embed_patterns: Vec<String>,
    /// `//go:embed` patterns from in-package test files.
    pub test_embed_patterns: Vec<String>,
    /// `//go:embed` patterns from external test files.
    pub xtest_embed_patterns: Vec<String>,

    /// Import paths from non-test files.
    pub imports: Vec<String>,
    /// Import paths from in-package test files.
    pub test_imports: Vec<String>,
    /// Import paths from external test files.
    pub xtest_imports: Vec<String>,
}
