//! Seam to the external package manager

use crate::package::Package;
use quay_manifest::{DependencySpec, Version};
use std::path::Path;
use std::sync::Arc;

/// Interface the project model uses to materialize packages.
///
/// The package manager proper implements this; the project model only
/// looks packages up, it never fetches or installs anything.
/// Implementations must hand out stable handles: repeated lookups of
/// the same package return the same `Arc`, because the dependency
/// graph identifies packages by reference.
pub trait PackageStore {
    /// The best installed package matching `spec`, or `None` when
    /// nothing installed satisfies it.
    fn best_match(&self, name: &str, spec: &DependencySpec) -> Option<Arc<Package>>;

    /// Wrap the package rooted at `path` as a temporary package bound
    /// to `version`, or `None` when no package lives there.
    fn load_temporary(&self, path: &Path, version: &Version) -> Option<Arc<Package>>;
}
