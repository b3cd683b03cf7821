//! The project model: dependency graph, traversal and aggregation
//!
//! A `Project` ties a root package to the dependency packages selected
//! for it. The graph is rebuilt by `reinit` from the declared
//! dependencies and the selections; everything else (traversal,
//! configuration resolution, settings aggregation) reads that graph.

use crate::error::{ProjectError, Result};
use crate::package::Package;
use crate::selections::{SelectedVersions, SELECTIONS_FILE};
use crate::store::PackageStore;
use crate::vars::{expand_vars, sanitize_ident};
use chrono::Utc;
use indexmap::IndexMap;
use quay_manifest::{BuildSettings, DependencySpec, Platform, TargetType};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scratch directory quay keeps next to the root package.
const SCRATCH_DIR: &str = ".quay";
/// Best-effort metadata document inside the scratch directory.
const SCRATCH_FILE: &str = "quay.json";

/// Compiler flags that shadow a build option and trip a lint.
const SPECIAL_COMPILER_FLAGS: &[(&str, &str)] = &[
    ("-g", "the debug-info build option"),
    ("-O", "the optimize build option"),
    ("-release", "the release-mode build option"),
    ("-debug", "the debug-mode build option"),
    ("-unittest", "the unittests build option"),
    ("-cov", "the coverage build option"),
    ("-profile", "the profile build option"),
    ("-w", "the warnings-as-errors build option"),
];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScratchDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_upgrade: Option<String>,
}

/// A root package plus the dependency packages materialized for it.
///
/// The dependency set holds every package reachable from the root
/// exactly once (identity by reference); the root itself is not in
/// the set. The project owns the selections store and is the only
/// thing that writes it to disk.
pub struct Project {
    root: Arc<Package>,
    dependencies: Vec<Arc<Package>>,
    dependees: IndexMap<String, Vec<Arc<Package>>>,
    selections: SelectedVersions,
    scratch: ScratchDocument,
}

impl Project {
    /// Open a project: load the selections next to the root package
    /// (continuing with an empty store when that fails) and build the
    /// dependency graph.
    pub fn open(root: Arc<Package>, store: &dyn PackageStore) -> Self {
        let selections_path = root.path().join(SELECTIONS_FILE);
        let selections = if selections_path.exists() {
            match SelectedVersions::load(&selections_path) {
                Ok(selections) => selections,
                Err(err) => {
                    warn!(
                        "failed to load {}: {}",
                        selections_path.display(),
                        err
                    );
                    SelectedVersions::new()
                }
            }
        } else {
            SelectedVersions::new()
        };
        Self::with_selections(root, selections, store)
    }

    /// Open a project with an explicit selections store.
    pub fn with_selections(
        root: Arc<Package>,
        selections: SelectedVersions,
        store: &dyn PackageStore,
    ) -> Self {
        let scratch = Self::load_scratch(root.path());
        let mut project = Self {
            root,
            dependencies: Vec::new(),
            dependees: IndexMap::new(),
            selections,
            scratch,
        };
        project.reinit(store);
        project
    }

    /// Rebuild the dependency graph from the declared dependencies and
    /// the current selections. Missing selections and packages the
    /// store cannot provide are logged and skipped; later stages treat
    /// them as absent.
    pub fn reinit(&mut self, store: &dyn PackageStore) {
        self.dependencies.clear();
        self.dependees.clear();

        let root = Arc::clone(&self.root);
        self.collect_dependencies(&root, store);
        self.lint();
    }

    fn collect_dependencies(&mut self, pack: &Arc<Package>, store: &dyn PackageStore) {
        debug!("collecting dependencies for {}", pack.name());
        for (name, spec) in pack.dependencies() {
            let selected = match self.selections.selected(name) {
                Ok(selected) => selected.clone(),
                Err(_) => {
                    warn!(
                        "version selection for dependency {} ({}) of {} is missing",
                        name,
                        spec,
                        pack.name()
                    );
                    continue;
                }
            };

            let resolved = match selected.path() {
                Some(path) => {
                    // relative selection paths are anchored at the
                    // declaring package
                    let path = if path.is_absolute() {
                        path.to_path_buf()
                    } else {
                        pack.path().join(path)
                    };
                    store.load_temporary(&path, selected.version())
                }
                None => store.best_match(name, &DependencySpec::exact(selected.version())),
            };

            let Some(dependency) = resolved else {
                warn!(
                    "selected package {} {} is not available",
                    name,
                    selected.version()
                );
                continue;
            };
            if dependency.name() != name {
                warn!(
                    "package at the selected location for {} names itself {}",
                    name,
                    dependency.name()
                );
                continue;
            }
            if Arc::ptr_eq(&dependency, &self.root) {
                debug!("dependency {} resolves to the root package", name);
                continue;
            }

            if !self.dependencies.iter().any(|d| Arc::ptr_eq(d, &dependency)) {
                debug!("found dependency {} {}", name, selected.version());
                self.dependencies.push(Arc::clone(&dependency));
                self.dependees
                    .entry(dependency.name().to_string())
                    .or_default()
                    .push(Arc::clone(pack));
                self.collect_dependencies(&dependency, store);
            }
        }
    }

    fn lint(&self) {
        let root_name = self.root.name();
        if root_name.chars().any(|c| c.is_uppercase()) {
            warn!("package names should be lowercase: {}", root_name);
        }

        for (name, spec) in self.root.dependencies() {
            if spec.references_branch() {
                warn!(
                    "dependency {} of {} is pinned to a branch; pin a numbered release instead",
                    name, root_name
                );
            }
        }

        self.lint_special_flags();
    }

    fn lint_special_flags(&self) {
        for pack in std::iter::once(&self.root).chain(self.dependencies.iter()) {
            let manifest = pack.manifest();
            let declared = manifest
                .build
                .compiler_flags
                .iter()
                .chain(
                    manifest
                        .configurations
                        .iter()
                        .flat_map(|c| c.build.compiler_flags.iter()),
                )
                .collect::<Vec<_>>();
            for (flag, replacement) in SPECIAL_COMPILER_FLAGS {
                if declared.iter().any(|f| f.as_str() == *flag) {
                    warn!(
                        "package {} sets the special compiler flag {}; use {} instead",
                        pack.name(),
                        flag,
                        replacement
                    );
                }
            }
        }
    }

    pub fn root_package(&self) -> &Arc<Package> {
        &self.root
    }

    /// Dependency packages in discovery order.
    pub fn dependencies(&self) -> &[Arc<Package>] {
        &self.dependencies
    }

    pub fn selections(&self) -> &SelectedVersions {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut SelectedVersions {
        &mut self.selections
    }

    /// Packages that depend on `pack`. Empty for packages that were
    /// never added to the graph.
    pub fn dependees(&self, pack: &Package) -> &[Arc<Package>] {
        self.dependees
            .get(pack.name())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn find_dependency(&self, name: &str) -> Option<&Arc<Package>> {
        self.dependencies.iter().find(|d| d.name() == name)
    }

    /// The dependency package called `name`.
    pub fn get_dependency(&self, name: &str) -> Result<&Arc<Package>> {
        self.find_dependency(name)
            .ok_or_else(|| ProjectError::UnknownDependency(name.to_string()))
    }

    /// Whether every non-optional declared dependency of every package
    /// in the graph has been materialized.
    pub fn has_all_dependencies(&self) -> bool {
        std::iter::once(&self.root)
            .chain(self.dependencies.iter())
            .all(|pack| {
                pack.dependencies().iter().all(|(name, spec)| {
                    spec.is_optional() || self.find_dependency(name).is_some()
                })
            })
    }

    /// Depth-first traversal over the dependency graph starting at
    /// `root` (the project root when `None`).
    ///
    /// With `children_first` every package is yielded after its
    /// transitive dependencies, otherwise before them. When `configs`
    /// is given, a dependency is only followed where its parent
    /// activates it under the parent's chosen configuration. The walk
    /// stops as soon as `f` breaks.
    pub fn for_each_dependency<F>(
        &self,
        children_first: bool,
        root: Option<&Arc<Package>>,
        configs: Option<&IndexMap<String, String>>,
        mut f: F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&Arc<Package>) -> ControlFlow<()>,
    {
        let start = root.unwrap_or(&self.root);
        let mut visited = HashSet::new();
        self.walk(start, children_first, configs, &mut visited, &mut f)
    }

    fn walk<F>(
        &self,
        pack: &Arc<Package>,
        children_first: bool,
        configs: Option<&IndexMap<String, String>>,
        visited: &mut HashSet<String>,
        f: &mut F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&Arc<Package>) -> ControlFlow<()>,
    {
        if !visited.insert(pack.name().to_string()) {
            return ControlFlow::Continue(());
        }

        if !children_first {
            f(pack)?;
        }

        let chosen = configs
            .and_then(|c| c.get(pack.name()))
            .map(String::as_str);
        for (name, _) in pack.dependencies() {
            if configs.is_some() && !pack.has_dependency(name, chosen) {
                continue;
            }
            let Some(dependency) = self.find_dependency(name) else {
                continue;
            };
            self.walk(dependency, children_first, configs, visited, f)?;
        }

        if children_first {
            f(pack)?;
        }

        ControlFlow::Continue(())
    }

    /// The packages of the graph in topological order.
    pub fn topological_packages(&self, children_first: bool) -> Vec<Arc<Package>> {
        let mut list = Vec::new();
        let _ = self.for_each_dependency(children_first, None, None, |pack| {
            list.push(Arc::clone(pack));
            ControlFlow::Continue(())
        });
        list
    }

    /// True when some other dependency of `pack` transitively depends
    /// on `dependency`, making the direct declaration redundant.
    pub fn is_redundant_dependency(&self, pack: &Package, dependency: &Arc<Package>) -> bool {
        for (name, _) in pack.dependencies() {
            let Some(other) = self.find_dependency(name) else {
                continue;
            };
            if Arc::ptr_eq(other, dependency) {
                continue;
            }
            let mut found = false;
            let _ = self.for_each_dependency(false, Some(other), None, |p| {
                if Arc::ptr_eq(p, dependency) {
                    found = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
            if found {
                return true;
            }
        }
        false
    }

    /// The configuration the resolver picks for the root package when
    /// none is forced.
    pub fn default_configuration(
        &self,
        platform: &Platform,
        allow_non_library: bool,
    ) -> Result<String> {
        let configs = self.package_configs(platform, None, allow_non_library)?;
        configs
            .get(self.root.name())
            .cloned()
            .ok_or_else(|| ProjectError::Unresolvable(self.root.name().to_string()))
    }

    /// Aggregate the build settings of every package active under the
    /// resolved configurations into `dst`.
    ///
    /// `config` forces the root configuration; `root_package` starts
    /// the traversal somewhere other than the project root; `shallow`
    /// strips dependency source files, keeping only their interface
    /// contributions.
    pub fn add_build_settings(
        &self,
        dst: &mut BuildSettings,
        platform: &Platform,
        config: Option<&str>,
        root_package: Option<&Arc<Package>>,
        shallow: bool,
    ) -> Result<()> {
        let configs = self.package_configs(platform, config, true)?;

        let mut list = Vec::new();
        let _ = self.for_each_dependency(false, root_package, Some(&configs), |pack| {
            list.push(Arc::clone(pack));
            ControlFlow::Continue(())
        });

        for pack in &list {
            dst.add_versions([format!("Have_{}", sanitize_ident(pack.name()))]);

            let Some(chosen) = configs.get(pack.name()) else {
                continue;
            };
            let mut settings = pack.build_settings(platform, chosen);
            let is_root = Arc::ptr_eq(pack, &self.root);

            if settings.target_type != TargetType::None {
                if shallow && !is_root {
                    settings.source_files.clear();
                }
                merge_package_settings(dst, &settings, pack)?;
                if settings.import_paths.is_empty() {
                    warn!(
                        "package {} (configuration \"{}\") defines no import paths",
                        pack.name(),
                        chosen
                    );
                }
                if is_root
                    && settings.target_type == TargetType::Executable
                    && settings.main_source_file.is_empty()
                {
                    warn!(
                        "executable configuration \"{}\" of package {} defines no main source file",
                        chosen,
                        pack.name()
                    );
                }
            }

            if is_root {
                if !shallow
                    && matches!(
                        settings.target_type,
                        TargetType::None | TargetType::SourceLibrary
                    )
                {
                    return Err(ProjectError::EmptyTarget {
                        target: settings.target_type.to_string(),
                    });
                }
                dst.target_type = settings.target_type;
                dst.target_name = expand_vars(&settings.target_name, pack.path(), false)?;
                if !settings.target_path.is_empty() {
                    dst.target_path = expand_vars(&settings.target_path, pack.path(), true)?;
                }
                if !settings.working_directory.is_empty() {
                    dst.working_directory =
                        expand_vars(&settings.working_directory, pack.path(), true)?;
                }
                if !settings.main_source_file.is_empty() {
                    dst.main_source_file =
                        expand_vars(&settings.main_source_file, pack.path(), true)?;
                }
            }
        }

        // second pass: version identifiers apply even where the target
        // type suppressed the package's other settings
        for pack in &list {
            let Some(chosen) = configs.get(pack.name()) else {
                continue;
            };
            let settings = pack.build_settings(platform, chosen);
            dst.add_versions(expand_list(&settings.versions, pack.path(), false)?);
            dst.add_debug_versions(expand_list(&settings.debug_versions, pack.path(), false)?);
        }

        Ok(())
    }

    /// JSON project description: the root first, then the dependencies
    /// in discovery order.
    pub fn describe(&self, platform: &Platform, config: Option<&str>) -> Result<serde_json::Value> {
        let configs = self.package_configs(platform, config, true)?;

        let mut packages = Vec::new();
        if let Some(chosen) = configs.get(self.root.name()) {
            packages.push(self.root.describe(platform, chosen));
        }
        for dependency in &self.dependencies {
            if let Some(chosen) = configs.get(dependency.name()) {
                packages.push(dependency.describe(platform, chosen));
            }
        }

        Ok(json!({
            "rootPackage": self.root.name(),
            // deprecated alias of rootPackage
            "mainPackage": self.root.name(),
            "packages": packages,
        }))
    }

    /// Persist the selections next to the root package when they have
    /// unsaved changes.
    pub fn save_selections(&mut self) -> Result<()> {
        if !self.selections.is_dirty() {
            return Ok(());
        }
        let path = self.root.path().join(SELECTIONS_FILE);
        self.selections.save(path)
    }

    fn load_scratch(root_path: &Path) -> ScratchDocument {
        let path = root_path.join(SCRATCH_DIR).join(SCRATCH_FILE);
        if !path.exists() {
            debug!("no {} present", path.display());
            return ScratchDocument::default();
        }
        let loaded = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|contents| serde_json::from_str(&contents).map_err(|e| e.to_string()));
        match loaded {
            Ok(scratch) => scratch,
            Err(err) => {
                warn!("failed to read {}: {}", path.display(), err);
                ScratchDocument::default()
            }
        }
    }

    /// Stamp and write the scratch document. Best effort: failures are
    /// logged, never propagated.
    pub fn write_scratch(&mut self) {
        self.scratch.last_upgrade = Some(Utc::now().to_rfc3339());
        if let Err(err) = self.try_write_scratch() {
            warn!("could not write {}/{}: {}", SCRATCH_DIR, SCRATCH_FILE, err);
        }
    }

    fn try_write_scratch(&self) -> Result<()> {
        let dir = self.root.path().join(SCRATCH_DIR);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(&self.scratch)?;
        fs::write(dir.join(SCRATCH_FILE), json)?;
        Ok(())
    }
}

/// Merge one package's settings into the accumulator, expanding
/// variables relative to the package.
fn merge_package_settings(
    dst: &mut BuildSettings,
    src: &BuildSettings,
    pack: &Package,
) -> Result<()> {
    let dir = pack.path();
    dst.add_compiler_flags(expand_list(&src.compiler_flags, dir, false)?);
    dst.add_linker_flags(expand_list(&src.linker_flags, dir, false)?);
    dst.add_libs(expand_list(&src.libs, dir, false)?);
    dst.add_source_files(expand_list(&src.source_files, dir, true)?);
    dst.add_import_paths(expand_list(&src.import_paths, dir, true)?);
    dst.add_string_import_paths(expand_list(&src.string_import_paths, dir, true)?);
    dst.add_versions(expand_list(&src.versions, dir, false)?);
    dst.add_debug_versions(expand_list(&src.debug_versions, dir, false)?);
    dst.add_pre_generate_commands(expand_list(&src.pre_generate_commands, dir, false)?);
    dst.add_post_generate_commands(expand_list(&src.post_generate_commands, dir, false)?);
    dst.add_pre_build_commands(expand_list(&src.pre_build_commands, dir, false)?);
    dst.add_post_build_commands(expand_list(&src.post_build_commands, dir, false)?);
    dst.add_requirements(src.requirements.iter().copied());
    dst.add_options(src.options.iter().copied());
    Ok(())
}

fn expand_list(items: &[String], dir: &Path, is_path: bool) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| expand_vars(item, dir, is_path))
        .collect()
}
