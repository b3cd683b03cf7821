//! Error types for manifest parsing and validation

use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors that can occur during manifest operations
#[derive(Debug, Error)]
pub enum ManifestError {
    /// I/O error reading manifest file
    #[error("I/O error: {0}")]
    Io(String),

    /// TOML parsing error
    #[error("Failed to parse manifest: {0}")]
    Parse(String),

    /// Invalid package name
    #[error("Invalid package name: {0}")]
    InvalidPackageName(String),

    /// Invalid version
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Invalid dependency specification
    #[error("Invalid dependency specification for '{0}': {1}")]
    InvalidDependency(String, String),

    /// Invalid configuration declaration
    #[error("Invalid configuration '{0}': {1}")]
    InvalidConfiguration(String, String),

    /// Invalid platform specification string
    #[error("Invalid platform specification: {0}")]
    InvalidPlatformSpec(String),

    /// Invalid toolchain requirement
    #[error("Invalid toolchain requirement for '{0}': {1}")]
    InvalidToolchainRequirement(String, String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}
