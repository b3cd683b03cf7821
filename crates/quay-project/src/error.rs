//! Error types for the project model

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectError>;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] quay_manifest::ManifestError),

    #[error("No version selected for dependency '{0}'")]
    NotSelected(String),

    #[error("Unknown dependency: {0}")]
    UnknownDependency(String),

    #[error("Could not resolve configuration for package {0}")]
    Unresolvable(String),

    #[error("Root package has target type \"{target}\" which produces no build output")]
    EmptyTarget { target: String },

    #[error("Unknown variable: ${0}")]
    UnknownVariable(String),

    #[error("Selections file version {found} does not match the supported version {expected}")]
    FileVersionMismatch { expected: u32, found: u32 },

    #[error("Malformed selections file: {0}")]
    Malformed(String),
}
