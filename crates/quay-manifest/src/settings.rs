//! Build settings, their manifest templates and merge rules

use crate::platform::Platform;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What a package build produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    /// Decided from the configuration when not declared explicitly.
    #[default]
    Autodetect,
    /// The package contributes settings but no build output of its own.
    None,
    Executable,
    Library,
    /// Compiled into every dependee instead of producing an artifact.
    SourceLibrary,
    StaticLibrary,
    DynamicLibrary,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetType::Autodetect => "autodetect",
            TargetType::None => "none",
            TargetType::Executable => "executable",
            TargetType::Library => "library",
            TargetType::SourceLibrary => "source-library",
            TargetType::StaticLibrary => "static-library",
            TargetType::DynamicLibrary => "dynamic-library",
        };
        f.write_str(name)
    }
}

/// Requirements a package imposes on how it may be built.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BuildRequirement {
    AllowWarnings,
    SilenceWarnings,
    DisallowDeprecations,
    SilenceDeprecations,
    DisallowInlining,
    DisallowOptimization,
    RequireBoundsCheck,
    RequireContracts,
    NoDefaultFlags,
}

/// Option flags with dedicated switches on the compiler driver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BuildOption {
    DebugMode,
    ReleaseMode,
    Coverage,
    DebugInfo,
    Optimize,
    Inline,
    NoBoundsCheck,
    Profile,
    Unittests,
    Verbose,
    Warnings,
    WarningsAsErrors,
    IgnoreDeprecations,
    DeprecationWarnings,
    DeprecationErrors,
}

/// A flat build recipe.
///
/// List fields accumulate across packages; the single-valued target
/// fields are only ever written for the root package of a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BuildSettings {
    pub target_type: TargetType,
    pub target_path: String,
    pub target_name: String,
    pub working_directory: String,
    pub main_source_file: String,
    pub compiler_flags: Vec<String>,
    pub linker_flags: Vec<String>,
    pub libs: Vec<String>,
    pub source_files: Vec<String>,
    pub import_paths: Vec<String>,
    pub string_import_paths: Vec<String>,
    pub versions: Vec<String>,
    pub debug_versions: Vec<String>,
    pub pre_generate_commands: Vec<String>,
    pub post_generate_commands: Vec<String>,
    pub pre_build_commands: Vec<String>,
    pub post_build_commands: Vec<String>,
    pub requirements: BTreeSet<BuildRequirement>,
    pub options: BTreeSet<BuildOption>,
}

fn append_unique(dst: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !dst.contains(&item) {
            dst.push(item);
        }
    }
}

impl BuildSettings {
    pub fn add_compiler_flags(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.compiler_flags, items);
    }

    pub fn add_linker_flags(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.linker_flags, items);
    }

    pub fn add_libs(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.libs, items);
    }

    pub fn add_source_files(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.source_files, items);
    }

    pub fn add_import_paths(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.import_paths, items);
    }

    pub fn add_string_import_paths(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.string_import_paths, items);
    }

    pub fn add_versions(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.versions, items);
    }

    pub fn add_debug_versions(&mut self, items: impl IntoIterator<Item = String>) {
        append_unique(&mut self.debug_versions, items);
    }

    // Commands keep their relative order and may repeat.

    pub fn add_pre_generate_commands(&mut self, items: impl IntoIterator<Item = String>) {
        self.pre_generate_commands.extend(items);
    }

    pub fn add_post_generate_commands(&mut self, items: impl IntoIterator<Item = String>) {
        self.post_generate_commands.extend(items);
    }

    pub fn add_pre_build_commands(&mut self, items: impl IntoIterator<Item = String>) {
        self.pre_build_commands.extend(items);
    }

    pub fn add_post_build_commands(&mut self, items: impl IntoIterator<Item = String>) {
        self.post_build_commands.extend(items);
    }

    pub fn add_requirements(&mut self, items: impl IntoIterator<Item = BuildRequirement>) {
        self.requirements.extend(items);
    }

    pub fn add_options(&mut self, items: impl IntoIterator<Item = BuildOption>) {
        self.options.extend(items);
    }
}

/// The build-settings fragment of a manifest.
///
/// Applied on top of a `BuildSettings` accumulator; optional
/// single-valued fields only overwrite when declared. The `platform`
/// table holds overlays keyed by platform specification that apply
/// when the build platform matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BuildSettingsTemplate {
    pub target_type: Option<TargetType>,
    pub target_name: Option<String>,
    pub target_path: Option<String>,
    pub working_directory: Option<String>,
    pub main_source_file: Option<String>,
    /// Configuration pins for direct dependencies.
    pub sub_configurations: IndexMap<String, String>,
    pub compiler_flags: Vec<String>,
    pub linker_flags: Vec<String>,
    pub libs: Vec<String>,
    pub source_files: Vec<String>,
    pub import_paths: Vec<String>,
    pub string_import_paths: Vec<String>,
    pub versions: Vec<String>,
    pub debug_versions: Vec<String>,
    pub pre_generate_commands: Vec<String>,
    pub post_generate_commands: Vec<String>,
    pub pre_build_commands: Vec<String>,
    pub post_build_commands: Vec<String>,
    pub requirements: BTreeSet<BuildRequirement>,
    pub options: BTreeSet<BuildOption>,
    pub platform: IndexMap<String, BuildSettingsTemplate>,
}

impl BuildSettingsTemplate {
    /// Merge this template into `dst`, including any platform overlay
    /// whose specification matches.
    pub fn apply_to(&self, dst: &mut BuildSettings, platform: &Platform) {
        if let Some(tt) = self.target_type {
            dst.target_type = tt;
        }
        if let Some(name) = &self.target_name {
            dst.target_name = name.clone();
        }
        if let Some(path) = &self.target_path {
            dst.target_path = path.clone();
        }
        if let Some(dir) = &self.working_directory {
            dst.working_directory = dir.clone();
        }
        if let Some(file) = &self.main_source_file {
            dst.main_source_file = file.clone();
        }
        dst.add_compiler_flags(self.compiler_flags.iter().cloned());
        dst.add_linker_flags(self.linker_flags.iter().cloned());
        dst.add_libs(self.libs.iter().cloned());
        dst.add_source_files(self.source_files.iter().cloned());
        dst.add_import_paths(self.import_paths.iter().cloned());
        dst.add_string_import_paths(self.string_import_paths.iter().cloned());
        dst.add_versions(self.versions.iter().cloned());
        dst.add_debug_versions(self.debug_versions.iter().cloned());
        dst.add_pre_generate_commands(self.pre_generate_commands.iter().cloned());
        dst.add_post_generate_commands(self.post_generate_commands.iter().cloned());
        dst.add_pre_build_commands(self.pre_build_commands.iter().cloned());
        dst.add_post_build_commands(self.post_build_commands.iter().cloned());
        dst.add_requirements(self.requirements.iter().copied());
        dst.add_options(self.options.iter().copied());

        for (spec, overlay) in &self.platform {
            if platform.matches_specification(spec) {
                overlay.apply_to(dst, platform);
            }
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
    fn test_list_merge_deduplicates() {
        let mut settings = BuildSettings::default();
        settings.add_import_paths(["src".to_string(), "gen".to_string()]);
        settings.add_import_paths(["src".to_string()]);
        assert_eq!(settings.import_paths, vec!["src", "gen"]);
    }

    #[test]
    fn test_command_merge_keeps_duplicates() {
        let mut settings = BuildSettings::default();
        settings.add_pre_build_commands(["make gen".to_string()]);
        settings.add_pre_build_commands(["make gen".to_string()]);
        assert_eq!(settings.pre_build_commands.len(), 2);
    }

    #[test]
    fn test_template_apply() {
        let mut template = BuildSettingsTemplate::default();
        template.target_type = Some(TargetType::Executable);
        template.versions = vec!["FeatureA".to_string()];
        template.options.insert(BuildOption::DebugInfo);

        let mut settings = BuildSettings::default();
        template.apply_to(&mut settings, &linux());

        assert_eq!(settings.target_type, TargetType::Executable);
        assert_eq!(settings.versions, vec!["FeatureA"]);
        assert!(settings.options.contains(&BuildOption::DebugInfo));
    }

    #[test]
    fn test_platform_overlay() {
        let mut windows_only = BuildSettingsTemplate::default();
        windows_only.libs = vec!["ws2_32".to_string()];

        let mut posix_only = BuildSettingsTemplate::default();
        posix_only.libs = vec!["m".to_string()];

        let mut template = BuildSettingsTemplate::default();
        template.platform.insert("windows".to_string(), windows_only);
        template.platform.insert("posix".to_string(), posix_only);

        let mut settings = BuildSettings::default();
        template.apply_to(&mut settings, &linux());

        assert_eq!(settings.libs, vec!["m"]);
    }

    #[test]
    fn test_unset_fields_do_not_overwrite() {
        let mut settings = BuildSettings::default();
        settings.target_name = "app".to_string();

        BuildSettingsTemplate::default().apply_to(&mut settings, &linux());
        assert_eq!(settings.target_name, "app");
    }

    #[test]
    fn test_target_type_serialization() {
        let toml = "target-type = \"source-library\"\n";
        let template: BuildSettingsTemplate = toml::from_str(toml).unwrap();
        assert_eq!(template.target_type, Some(TargetType::SourceLibrary));
        assert_eq!(TargetType::SourceLibrary.to_string(), "source-library");
    }
}
