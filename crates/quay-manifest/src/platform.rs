//! Build platform descriptors and platform specification matching

use serde::{Deserialize, Serialize};

/// The target a build runs on: operating system identifiers (most
/// specific first, e.g. `["linux", "posix"]`), architecture
/// identifiers and the compiler in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: Vec<String>,
    pub architecture: Vec<String>,
    pub compiler: String,
}

impl Platform {
    pub fn new(
        os: impl IntoIterator<Item = impl Into<String>>,
        architecture: impl IntoIterator<Item = impl Into<String>>,
        compiler: impl Into<String>,
    ) -> Self {
        Self {
            os: os.into_iter().map(Into::into).collect(),
            architecture: architecture.into_iter().map(Into::into).collect(),
            compiler: compiler.into(),
        }
    }

    /// Check whether this platform satisfies a dash-separated
    /// specification of the form `[os][-arch][-compiler]`.
    ///
    /// Components are matched in that order and any component may be
    /// omitted. The empty specification matches every platform. A
    /// leading dash is accepted, so `-windows-x86` and `windows-x86`
    /// are equivalent.
    pub fn matches_specification(&self, specification: &str) -> bool {
        let spec = specification.strip_prefix('-').unwrap_or(specification);
        if spec.is_empty() {
            return true;
        }

        let mut parts = spec.split('-').peekable();
        if matches!(parts.peek(), Some(&p) if self.os.iter().any(|o| o == p)) {
            parts.next();
        }
        if parts.peek().is_none() {
            return true;
        }
        if matches!(parts.peek(), Some(&p) if self.architecture.iter().any(|a| a == p)) {
            parts.next();
        }
        match parts.next() {
            None => true,
            Some(p) => p == self.compiler && parts.next().is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform::new(["linux", "posix"], ["x86_64"], "ldc")
    }

    #[test]
    fn test_empty_specification() {
        assert!(linux().matches_specification(""));
        assert!(linux().matches_specification("-"));
    }

    #[test]
    fn test_os_component() {
        assert!(linux().matches_specification("linux"));
        assert!(linux().matches_specification("posix"));
        assert!(!linux().matches_specification("windows"));
    }

    #[test]
    fn test_combined_components() {
        assert!(linux().matches_specification("linux-x86_64"));
        assert!(linux().matches_specification("posix-ldc"));
        assert!(linux().matches_specification("x86_64-ldc"));
        assert!(linux().matches_specification("linux-x86_64-ldc"));
        assert!(!linux().matches_specification("linux-arm64"));
        assert!(!linux().matches_specification("linux-x86_64-gdc"));
    }

    #[test]
    fn test_leading_dash() {
        assert!(linux().matches_specification("-linux-x86_64"));
        assert!(!linux().matches_specification("-windows"));
    }

    #[test]
    fn test_architecture_only() {
        assert!(linux().matches_specification("x86_64"));
        assert!(!linux().matches_specification("arm64"));
    }

    #[test]
    fn test_compiler_only() {
        assert!(linux().matches_specification("ldc"));
        assert!(!linux().matches_specification("gdc"));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(!linux().matches_specification("linux-x86_64-ldc-extra"));
    }
}
