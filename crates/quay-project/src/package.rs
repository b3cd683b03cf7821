//! A materialized package and its metadata lens

use indexmap::IndexMap;
use quay_manifest::{
    BuildSettings, ConfigurationSpec, DependencySpec, Manifest, Platform, TargetType, Version,
};
use serde_json::json;
use std::path::{Path, PathBuf};

/// A package materialized on disk, with the query surface the project
/// model needs: its dependency map and, per configuration, platform
/// eligibility, subconfiguration pins and resolved build settings.
#[derive(Debug)]
pub struct Package {
    manifest: Manifest,
    path: PathBuf,
    version: Version,
    /// Union of global and per-configuration dependencies.
    dependencies: IndexMap<String, DependencySpec>,
    /// Declared configurations, with a synthetic default when the
    /// manifest declares none.
    configurations: Vec<ConfigurationSpec>,
}

impl Package {
    pub fn new(manifest: Manifest, path: impl Into<PathBuf>) -> Self {
        let version = manifest.package.version.clone();
        Self::with_version(manifest, path, version)
    }

    /// A package whose version is overridden, e.g. a temporary package
    /// wrapped from a local path and bound to a selected version.
    pub fn with_version(manifest: Manifest, path: impl Into<PathBuf>, version: Version) -> Self {
        let mut dependencies = manifest.dependencies.clone();
        for config in &manifest.configurations {
            for (name, spec) in &config.dependencies {
                dependencies
                    .entry(name.clone())
                    .or_insert_with(|| spec.clone());
            }
        }

        let configurations = if manifest.configurations.is_empty() {
            let name = match manifest.build.target_type.unwrap_or_default() {
                TargetType::Executable => "application",
                _ => "library",
            };
            vec![ConfigurationSpec {
                name: name.to_string(),
                platforms: Vec::new(),
                dependencies: IndexMap::new(),
                build: Default::default(),
            }]
        } else {
            manifest.configurations.clone()
        };

        Self {
            manifest,
            path: path.into(),
            version,
            dependencies,
            configurations,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.package.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// All dependencies this package can activate, in declaration
    /// order (global ones first).
    pub fn dependencies(&self) -> &IndexMap<String, DependencySpec> {
        &self.dependencies
    }

    /// Whether the dependency `name` is active when building under
    /// `config`. Without a configuration every declared dependency
    /// counts.
    pub fn has_dependency(&self, name: &str, config: Option<&str>) -> bool {
        if self.manifest.dependencies.contains_key(name) {
            return true;
        }
        match config {
            Some(config) => self
                .configurations
                .iter()
                .any(|c| c.name == config && c.dependencies.contains_key(name)),
            None => self.dependencies.contains_key(name),
        }
    }

    /// Declared configurations (never empty).
    pub fn configurations(&self) -> &[ConfigurationSpec] {
        &self.configurations
    }

    /// Names of the configurations eligible on `platform`, in
    /// declaration order. Executable configurations are skipped unless
    /// `include_non_library` is set.
    pub fn platform_configurations(
        &self,
        platform: &Platform,
        include_non_library: bool,
    ) -> Vec<String> {
        self.configurations
            .iter()
            .filter(|c| c.matches_platform(platform))
            .filter(|c| {
                include_non_library || self.configuration_target_type(c) != TargetType::Executable
            })
            .map(|c| c.name.clone())
            .collect()
    }

    /// The subconfiguration `config` pins for dependency `dep`. Pins
    /// on the configuration shadow the package-wide ones.
    pub fn sub_configuration(&self, config: &str, dep: &str) -> Option<&str> {
        if let Some(c) = self.configurations.iter().find(|c| c.name == config) {
            if let Some(pinned) = c.build.sub_configurations.get(dep) {
                return Some(pinned);
            }
        }
        self.manifest
            .build
            .sub_configurations
            .get(dep)
            .map(String::as_str)
    }

    /// Resolved build settings for one configuration on one platform:
    /// the global template, then the configuration's, then defaults
    /// for the target name and type.
    pub fn build_settings(&self, platform: &Platform, config: &str) -> BuildSettings {
        let mut settings = BuildSettings::default();
        self.manifest.build.apply_to(&mut settings, platform);
        if let Some(c) = self.configurations.iter().find(|c| c.name == config) {
            c.build.apply_to(&mut settings, platform);
        }

        if settings.target_name.is_empty() {
            settings.target_name = self.name().replace(':', "_");
        }
        if settings.target_type == TargetType::Autodetect {
            settings.target_type = TargetType::Library;
        }

        settings
    }

    /// JSON description of this package as built under `config`.
    pub fn describe(&self, platform: &Platform, config: &str) -> serde_json::Value {
        let settings = self.build_settings(platform, config);
        json!({
            "name": self.name(),
            "version": self.version.as_str(),
            "path": self.path.display().to_string(),
            "description": self.manifest.package.description,
            "license": self.manifest.package.license,
            "configuration": config,
            "targetType": settings.target_type,
            "targetName": settings.target_name,
            "dependencies": self.dependencies.keys().collect::<Vec<_>>(),
        })
    }

    fn configuration_target_type(&self, config: &ConfigurationSpec) -> TargetType {
        config
            .build
            .target_type
            .or(self.manifest.build.target_type)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_manifest::from_str;

    fn linux() -> Platform {
        Platform::new(["linux", "posix"], ["x86_64"], "ldc")
    }

    fn package(toml: &str) -> Package {
        Package::new(from_str(toml).unwrap(), "/pkg")
    }

    #[test]
    fn test_synthetic_default_configuration() {
        let pack = package(
            r#"
            [package]
            name = "plain"
            version = "1.0.0"
        "#,
        );
        assert_eq!(pack.platform_configurations(&linux(), false), ["library"]);

        let pack = package(
            r#"
            [package]
            name = "tool"
            version = "1.0.0"

            [build]
            target-type = "executable"
        "#,
        );
        assert_eq!(pack.platform_configurations(&linux(), true), ["application"]);
        assert!(pack.platform_configurations(&linux(), false).is_empty());
    }

    #[test]
    fn test_platform_filtered_configurations() {
        let pack = package(
            r#"
            [package]
            name = "multi"
            version = "1.0.0"

            [[configurations]]
            name = "winapi"
            platforms = ["windows"]

            [[configurations]]
            name = "portable"
        "#,
        );
        assert_eq!(pack.platform_configurations(&linux(), false), ["portable"]);
    }

    #[test]
    fn test_sub_configuration_shadowing() {
        let pack = package(
            r#"
            [package]
            name = "root"
            version = "1.0.0"

            [dependencies]
            codecs = "1.0"

            [build]
            sub-configurations = { codecs = "lite" }

            [[configurations]]
            name = "full"

            [configurations.build]
            sub-configurations = { codecs = "complete" }

            [[configurations]]
            name = "library"
        "#,
        );

        assert_eq!(pack.sub_configuration("full", "codecs"), Some("complete"));
        assert_eq!(pack.sub_configuration("library", "codecs"), Some("lite"));
        assert_eq!(pack.sub_configuration("full", "other"), None);
    }

    #[test]
    fn test_configuration_local_dependencies() {
        let pack = package(
            r#"
            [package]
            name = "root"
            version = "1.0.0"

            [dependencies]
            core = "1.0"

            [[configurations]]
            name = "library"

            [[configurations]]
            name = "tool"

            [configurations.dependencies]
            cli = "2.0"
        "#,
        );

        assert!(pack.dependencies().contains_key("core"));
        assert!(pack.dependencies().contains_key("cli"));

        assert!(pack.has_dependency("core", Some("library")));
        assert!(pack.has_dependency("cli", Some("tool")));
        assert!(!pack.has_dependency("cli", Some("library")));
        assert!(pack.has_dependency("cli", None));
    }

    #[test]
    fn test_build_settings_defaults() {
        let pack = package(
            r#"
            [package]
            name = "lib:sub"
            version = "1.0.0"
        "#,
        );
        let settings = pack.build_settings(&linux(), "library");
        assert_eq!(settings.target_name, "lib_sub");
        assert_eq!(settings.target_type, TargetType::Library);
    }

    #[test]
    fn test_build_settings_layering() {
        let pack = package(
            r#"
            [package]
            name = "layered"
            version = "1.0.0"

            [build]
            versions = ["Base"]
            import-paths = ["src"]

            [[configurations]]
            name = "extra"

            [configurations.build]
            versions = ["Extra"]
        "#,
        );

        let settings = pack.build_settings(&linux(), "extra");
        assert_eq!(settings.versions, vec!["Base", "Extra"]);
        assert_eq!(settings.import_paths, vec!["src"]);
    }
}
