//! Core data model: module paths, manifests, package descriptors, and the
//! replace table.

pub mod manifest;
pub mod module_path;
pub mod package;
pub mod replace;

pub use manifest::{ModuleManifest, WorkspaceManifest};
pub use module_path::ModulePath;
pub use package::{ImportMode, PackageDescriptor};
pub use replace::{ReplaceEntry, ReplaceTable};
