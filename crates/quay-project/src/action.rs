//! Actions surfaced to the fetch layer
//!
//! The project model decides what should happen to a package; the
//! package manager's fetch layer carries the actions out. Nothing in
//! this crate consumes them.

use indexmap::IndexMap;
use quay_manifest::{DependencySpec, Version};
use serde::{Deserialize, Serialize};

/// Where a fetched package is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementScope {
    /// Next to the project that needs it.
    Local,
    /// The per-user package cache.
    UserWide,
    /// The machine-wide package cache.
    SystemWide,
}

/// A step the fetch layer should take for one package.
///
/// `issuers` maps the packages that caused the action to the
/// dependency specs they declared.
#[derive(Debug, Clone)]
pub enum Action {
    /// Fetch a package that is not installed (or not in a matching
    /// version). `installed` carries the version being replaced, if
    /// any.
    Fetch {
        name: String,
        scope: PlacementScope,
        spec: DependencySpec,
        issuers: IndexMap<String, DependencySpec>,
        installed: Option<Version>,
    },
    /// Remove an installed package.
    Remove {
        name: String,
        scope: PlacementScope,
        spec: DependencySpec,
        issuers: IndexMap<String, DependencySpec>,
        installed: Version,
    },
    /// The issuers' requirements cannot be satisfied together.
    Conflict {
        name: String,
        scope: PlacementScope,
        spec: DependencySpec,
        issuers: IndexMap<String, DependencySpec>,
    },
    /// The package could not be materialized at all.
    Failure {
        name: String,
        scope: PlacementScope,
        spec: DependencySpec,
        issuers: IndexMap<String, DependencySpec>,
    },
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Action::Fetch { name, .. }
            | Action::Remove { name, .. }
            | Action::Conflict { name, .. }
            | Action::Failure { name, .. } => name,
        }
    }

    pub fn scope(&self) -> PlacementScope {
        match self {
            Action::Fetch { scope, .. }
            | Action::Remove { scope, .. }
            | Action::Conflict { scope, .. }
            | Action::Failure { scope, .. } => *scope,
        }
    }

    pub fn spec(&self) -> &DependencySpec {
        match self {
            Action::Fetch { spec, .. }
            | Action::Remove { spec, .. }
            | Action::Conflict { spec, .. }
            | Action::Failure { spec, .. } => spec,
        }
    }
}
