//! Manifest structure definitions

use crate::dependency::{DependencySpec, Version};
use crate::error::{ManifestError, Result};
use crate::platform::Platform;
use crate::settings::BuildSettingsTemplate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Complete manifest for a quay package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    /// Package metadata
    pub package: PackageMeta,

    /// Dependencies shared by every configuration
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencySpec>,

    /// Build-settings template shared by every configuration
    #[serde(default)]
    pub build: BuildSettingsTemplate,

    /// Named build configurations, in declaration order
    #[serde(default)]
    pub configurations: Vec<ConfigurationSpec>,

    /// Toolchain requirements (informational, consumed upstream)
    #[serde(default)]
    pub toolchain: Option<ToolchainRequirements>,
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMeta {
    /// Package name (must be unique in registry)
    pub name: String,

    /// Package version
    pub version: Version,

    /// Package description
    #[serde(default)]
    pub description: Option<String>,

    /// Authors
    #[serde(default)]
    pub authors: Vec<String>,

    /// License identifier (SPDX)
    #[serde(default)]
    pub license: Option<String>,

    /// Homepage URL
    #[serde(default)]
    pub homepage: Option<String>,
}

/// A named variant of the package build.
///
/// A configuration activates the global dependencies plus its own, may
/// be restricted to a set of platforms and layers its build-settings
/// template over the global one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigurationSpec {
    /// Configuration name
    pub name: String,

    /// Platform specifications this configuration is restricted to.
    /// Empty means any platform.
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Dependencies activated only by this configuration
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencySpec>,

    /// Configuration-specific build settings
    #[serde(default)]
    pub build: BuildSettingsTemplate,
}

impl ConfigurationSpec {
    /// Whether this configuration is eligible on `platform`.
    pub fn matches_platform(&self, platform: &Platform) -> bool {
        self.platforms.is_empty()
            || self
                .platforms
                .iter()
                .any(|spec| platform.matches_specification(spec))
    }
}

/// Toolchain requirements.
///
/// `quay` and `frontend` take pipe-separated version requirement
/// lists; the flattened entries name compilers, where the literal
/// `"no"` means the compiler must not be used for this package. The
/// core records and validates these, upstream tooling consumes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolchainRequirements {
    /// Required quay version range
    #[serde(default)]
    pub quay: Option<String>,

    /// Required language front-end version range
    #[serde(default)]
    pub frontend: Option<String>,

    /// Per-compiler requirements
    #[serde(flatten)]
    pub compilers: IndexMap<String, String>,
}

impl ToolchainRequirements {
    /// Marker value banning a compiler.
    pub const NO: &'static str = "no";

    pub fn is_compiler_banned(&self, name: &str) -> bool {
        self.compilers.get(name).map(String::as_str) == Some(Self::NO)
    }

    /// Compilers with a requirement that does not ban them.
    pub fn supported_compilers(&self) -> impl Iterator<Item = &str> {
        self.compilers
            .iter()
            .filter(|(_, req)| req.as_str() != Self::NO)
            .map(|(name, _)| name.as_str())
    }

    fn validate(&self) -> Result<()> {
        if let Some(req) = &self.quay {
            validate_requirement_list("quay", req)?;
        }
        if let Some(req) = &self.frontend {
            validate_requirement_list("frontend", req)?;
        }
        for (name, req) in &self.compilers {
            if req != Self::NO {
                validate_requirement_list(name, req)?;
            }
        }
        Ok(())
    }
}

fn validate_requirement_list(key: &str, value: &str) -> Result<()> {
    for part in value.split('|') {
        part.trim().parse::<semver::VersionReq>().map_err(|e| {
            ManifestError::InvalidToolchainRequirement(key.to_string(), e.to_string())
        })?;
    }
    Ok(())
}

impl Manifest {
    /// Validate the manifest
    pub fn validate(&self) -> Result<()> {
        self.validate_package_name()?;
        self.validate_dependencies()?;
        self.validate_configurations()?;
        self.validate_sub_configurations()?;

        if let Some(toolchain) = &self.toolchain {
            toolchain.validate()?;
        }

        Ok(())
    }

    /// The configuration declared under `name`, if any.
    pub fn configuration(&self, name: &str) -> Option<&ConfigurationSpec> {
        self.configurations.iter().find(|c| c.name == name)
    }

    /// Whether `name` is declared as a dependency anywhere, globally or
    /// by some configuration.
    pub fn declares_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self
                .configurations
                .iter()
                .any(|c| c.dependencies.contains_key(name))
    }

    /// Validate package name follows naming conventions
    fn validate_package_name(&self) -> Result<()> {
        let name = &self.package.name;

        if name.is_empty() {
            return Err(ManifestError::InvalidPackageName(
                "Package name cannot be empty".to_string(),
            ));
        }

        if !name.chars().next().is_some_and(|c| c.is_alphabetic()) {
            return Err(ManifestError::InvalidPackageName(
                "Package name must start with a letter".to_string(),
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ManifestError::InvalidPackageName(
                "Package name can only contain letters, numbers, dashes, and underscores"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Validate dependency specifications
    fn validate_dependencies(&self) -> Result<()> {
        for (name, spec) in &self.dependencies {
            spec.validate(name)?;
        }

        for config in &self.configurations {
            for (name, spec) in &config.dependencies {
                spec.validate(name)?;
            }
        }

        Ok(())
    }

    /// Validate configuration declarations
    fn validate_configurations(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for config in &self.configurations {
            if config.name.is_empty() {
                return Err(ManifestError::InvalidConfiguration(
                    config.name.clone(),
                    "Configuration name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(&config.name) {
                return Err(ManifestError::InvalidConfiguration(
                    config.name.clone(),
                    "Duplicate configuration name".to_string(),
                ));
            }
            for spec in &config.platforms {
                validate_platform_spec(spec)?;
            }
        }
        Ok(())
    }

    /// Subconfiguration pins must reference declared dependencies.
    fn validate_sub_configurations(&self) -> Result<()> {
        for dep in self.build.sub_configurations.keys() {
            if !self.declares_dependency(dep) {
                return Err(ManifestError::Validation(format!(
                    "Subconfiguration pin references unknown dependency '{}'",
                    dep
                )));
            }
        }

        for config in &self.configurations {
            for dep in config.build.sub_configurations.keys() {
                if !self.dependencies.contains_key(dep)
                    && !config.dependencies.contains_key(dep)
                {
                    return Err(ManifestError::InvalidConfiguration(
                        config.name.clone(),
                        format!(
                            "Subconfiguration pin references unknown dependency '{}'",
                            dep
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn validate_platform_spec(spec: &str) -> Result<()> {
    let trimmed = spec.strip_prefix('-').unwrap_or(spec);
    if trimmed.is_empty() {
        return Err(ManifestError::InvalidPlatformSpec(spec.to_string()));
    }
    for component in trimmed.split('-') {
        if component.is_empty()
            || !component
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(ManifestError::InvalidPlatformSpec(spec.to_string()));
        }
    }
    Ok(())
}
