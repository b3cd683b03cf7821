//! Package versions and dependency specification types

use crate::error::{ManifestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub use semver::VersionReq;

/// A package version in the ecosystem's version grammar.
///
/// Every version is either a release following semantic versioning
/// ("1.2.0") or a branch tag introduced by a tilde ("~main"). Branch
/// versions track a moving head and compare only by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Parse a version string, accepting releases and branch tags.
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if let Some(branch) = s.strip_prefix('~') {
            if branch.is_empty() {
                return Err(ManifestError::InvalidVersion(s));
            }
        } else if semver::Version::parse(&s).is_err() {
            return Err(ManifestError::InvalidVersion(s));
        }
        Ok(Self(s))
    }

    /// Whether this is a branch tag rather than a numbered release.
    pub fn is_branch(&self) -> bool {
        self.0.starts_with('~')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The semver view of a release version, `None` for branches.
    pub fn release(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.0).ok()
    }
}

impl TryFrom<String> for Version {
    type Error = ManifestError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> String {
        v.0
    }
}

impl std::str::FromStr for Version {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dependency specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Simple version requirement: "1.0"
    Simple(String),
    /// Detailed specification
    Detailed(Dependency),
}

/// Detailed dependency specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Version requirement
    #[serde(default)]
    pub version: Option<String>,

    /// Local path (for development)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Whether this dependency may be absent
    #[serde(default)]
    pub optional: bool,
}

/// A requirement is a branch pin when it is a tilde followed by a
/// non-digit ("~main"); a tilde followed by a digit is a semver range.
fn is_branch_requirement(req: &str) -> bool {
    match req.strip_prefix('~') {
        Some(rest) => !rest.chars().next().map_or(true, |c| c.is_ascii_digit()),
        None => false,
    }
}

fn requirement_matches(req: &str, version: &Version) -> bool {
    if is_branch_requirement(req) {
        return version.as_str() == req;
    }
    match (req.parse::<VersionReq>(), version.release()) {
        (Ok(r), Some(v)) => r.matches(&v),
        _ => false,
    }
}

fn validate_requirement(name: &str, req: &str) -> Result<()> {
    if is_branch_requirement(req) {
        return Ok(());
    }
    req.parse::<VersionReq>()
        .map(|_| ())
        .map_err(|e| ManifestError::InvalidDependency(name.to_string(), e.to_string()))
}

impl DependencySpec {
    /// Requirement matching exactly `version`.
    pub fn exact(version: &Version) -> Self {
        if version.is_branch() {
            DependencySpec::Simple(version.as_str().to_string())
        } else {
            DependencySpec::Simple(format!("={}", version))
        }
    }

    /// Validate the dependency specification
    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            DependencySpec::Simple(req) => validate_requirement(name, req),
            DependencySpec::Detailed(dep) => dep.validate(name),
        }
    }

    /// Check whether `version` satisfies this specification.
    ///
    /// A detailed specification without a version requirement accepts
    /// any version (the path pins the source instead).
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            DependencySpec::Simple(req) => requirement_matches(req, version),
            DependencySpec::Detailed(dep) => dep
                .version
                .as_deref()
                .map_or(true, |req| requirement_matches(req, version)),
        }
    }

    /// Get the version requirement if specified
    pub fn version_req(&self) -> Option<Result<VersionReq>> {
        let req = match self {
            DependencySpec::Simple(req) => Some(req.as_str()),
            DependencySpec::Detailed(dep) => dep.version.as_deref(),
        };
        req.filter(|r| !is_branch_requirement(r)).map(|r| {
            r.parse::<VersionReq>()
                .map_err(|e| ManifestError::InvalidVersion(e.to_string()))
        })
    }

    /// Whether the requirement pins a branch instead of a release range.
    pub fn references_branch(&self) -> bool {
        match self {
            DependencySpec::Simple(req) => is_branch_requirement(req),
            DependencySpec::Detailed(dep) => {
                dep.version.as_deref().map_or(false, is_branch_requirement)
            }
        }
    }

    /// Check if this is a path dependency
    pub fn is_path(&self) -> bool {
        matches!(self, DependencySpec::Detailed(dep) if dep.path.is_some())
    }

    /// The declared local path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DependencySpec::Simple(_) => None,
            DependencySpec::Detailed(dep) => dep.path.as_deref(),
        }
    }

    /// Check if this is an optional dependency
    pub fn is_optional(&self) -> bool {
        matches!(self, DependencySpec::Detailed(dep) if dep.optional)
    }
}

impl Dependency {
    /// Validate the dependency
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.version.is_none() && self.path.is_none() {
            return Err(ManifestError::InvalidDependency(
                name.to_string(),
                "Must specify a version or a path".to_string(),
            ));
        }

        if let Some(req) = &self.version {
            validate_requirement(name, req)?;
        }

        Ok(())
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencySpec::Simple(req) => write!(f, "{}", req),
            DependencySpec::Detailed(dep) => match (&dep.version, &dep.path) {
                (Some(req), Some(path)) => write!(f, "{} @ {}", req, path.display()),
                (Some(req), None) => write!(f, "{}", req),
                (None, Some(path)) => write!(f, "path: {}", path.display()),
                (None, None) => write!(f, "unspecified"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_version() {
        let v = Version::parse("1.2.0").unwrap();
        assert!(!v.is_branch());
        assert_eq!(v.release().unwrap(), semver::Version::new(1, 2, 0));
    }

    #[test]
    fn test_branch_version() {
        let v = Version::parse("~main").unwrap();
        assert!(v.is_branch());
        assert!(v.release().is_none());
    }

    #[test]
    fn test_invalid_versions() {
        assert!(Version::parse("not a version").is_err());
        assert!(Version::parse("~").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_simple_dependency() {
        let spec = DependencySpec::Simple("1.0".to_string());
        assert!(spec.validate("test").is_ok());

        let version = spec.version_req().unwrap().unwrap();
        assert_eq!(version.to_string(), "^1.0");
    }

    #[test]
    fn test_exact_requirement() {
        let v = Version::parse("1.2.3").unwrap();
        let spec = DependencySpec::exact(&v);
        assert!(spec.matches(&v));
        assert!(!spec.matches(&Version::parse("1.2.4").unwrap()));

        let branch = Version::parse("~main").unwrap();
        let spec = DependencySpec::exact(&branch);
        assert!(spec.matches(&branch));
        assert!(!spec.matches(&Version::parse("1.2.3").unwrap()));
    }

    #[test]
    fn test_branch_requirement() {
        let spec = DependencySpec::Simple("~main".to_string());
        assert!(spec.validate("test").is_ok());
        assert!(spec.references_branch());
        assert!(spec.matches(&Version::parse("~main").unwrap()));
        assert!(!spec.matches(&Version::parse("~other").unwrap()));
        assert!(!spec.matches(&Version::parse("1.0.0").unwrap()));

        // a tilde range is not a branch pin
        let spec = DependencySpec::Simple("~1.2".to_string());
        assert!(!spec.references_branch());
    }

    #[test]
    fn test_path_dependency() {
        let spec = DependencySpec::Detailed(Dependency {
            version: None,
            path: Some(PathBuf::from("../local-lib")),
            optional: false,
        });

        assert!(spec.validate("test").is_ok());
        assert!(spec.is_path());
        assert!(spec.matches(&Version::parse("0.1.0").unwrap()));
    }

    #[test]
    fn test_optional_dependency() {
        let spec = DependencySpec::Detailed(Dependency {
            version: Some("2.0".to_string()),
            path: None,
            optional: true,
        });

        assert!(spec.validate("test").is_ok());
        assert!(spec.is_optional());
    }

    #[test]
    fn test_invalid_no_source() {
        let spec = DependencySpec::Detailed(Dependency::default());
        assert!(spec.validate("test").is_err());
    }

    #[test]
    fn test_invalid_requirement() {
        let spec = DependencySpec::Simple("not a requirement".to_string());
        assert!(spec.validate("test").is_err());
    }
}
