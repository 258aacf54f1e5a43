//! Readers for the dependency descriptions produced by a package restore.
//!
//! A restore runs in two steps and this crate models the output of both:
//!
//! - [`RestoreGraph`]: the dependency-graph description written for an entry
//!   manifest. It lists every project reachable from the manifest, its target
//!   frameworks, and the direct dependencies declared for each framework.
//! - [`LockFile`]: the resolved lock description written per project. For each
//!   target framework it lists every resolved library and that library's own
//!   dependencies.
//!
//! Both types are plain data with public fields, so callers (and tests) can
//! build them in memory as easily as parse them from disk.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod graph_spec;
pub mod lock_file;

pub use error::{Error, Result};
pub use graph_spec::{
    DependencyKind, LibraryDependency, ProjectStyle, RestoreGraph, RestoreProject, TargetFramework,
};
pub use lock_file::{LockFile, LockFileLibrary, LockFileTarget, PackageDependency};

/// Compare two identifiers the way package managers do (ASCII case-insensitive).
#[must_use]
pub fn same_id(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
