//! Project model and configuration resolution for quay
//!
//! This crate materializes the dependency graph of a root package from
//! the versions recorded in the lockfile, resolves one mutually
//! compatible build configuration per package, and aggregates the
//! per-package build settings into a single flat recipe. Fetching,
//! version-range solving and code generation live elsewhere; the
//! [`PackageStore`] trait and the [`Action`] type are the seams to
//! them.

pub mod action;
mod configs;
pub mod error;
pub mod package;
pub mod project;
pub mod selections;
pub mod store;
pub mod vars;

pub use action::{Action, PlacementScope};
pub use error::{ProjectError, Result};
pub use package::Package;
pub use project::Project;
pub use selections::{Selected, SelectedVersions, FILE_VERSION, SELECTIONS_FILE};
pub use store::PackageStore;
