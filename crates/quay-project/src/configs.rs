//! Configuration resolution over the dependency graph
//!
//! Every package declares one or more named configurations; a parent's
//! configuration may pin the configuration of a dependency and the
//! platform filters which configurations are eligible at all. The
//! resolver picks exactly one configuration per reachable package by
//! building a graph of (package, configuration) vertices with edges
//! for every choice a parent configuration permits, then eliminating
//! vertices until the assignment is unique.

use crate::error::{ProjectError, Result};
use crate::package::Package;
use crate::project::Project;
use indexmap::IndexMap;
use quay_manifest::Platform;
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::debug;

/// A (package, configuration) pair in the resolution graph.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfigVertex {
    pack: String,
    config: String,
}

/// Directed edge: the parent configuration permits the child one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigEdge {
    from: usize,
    to: usize,
}

/// Vertex/edge store with tombstone removal. Vertices keep their
/// creation index for the lifetime of a resolution; tie-breaks always
/// go to the lowest surviving index, so earlier-created (and thus
/// earlier-declared) configurations win.
#[derive(Default)]
struct ConfigGraph {
    vertices: Vec<ConfigVertex>,
    removed: Vec<bool>,
    edges: Vec<ConfigEdge>,
}

impl ConfigGraph {
    /// Index of the vertex for (pack, config), creating it on demand.
    fn vertex(&mut self, pack: &str, config: &str) -> usize {
        if let Some(idx) = self.find_vertex(pack, config) {
            return idx;
        }
        self.vertices.push(ConfigVertex {
            pack: pack.to_string(),
            config: config.to_string(),
        });
        self.removed.push(false);
        self.vertices.len() - 1
    }

    fn find_vertex(&self, pack: &str, config: &str) -> Option<usize> {
        self.vertices
            .iter()
            .position(|v| v.pack == pack && v.config == config)
    }

    fn edge(&mut self, from: usize, to: usize) {
        let edge = ConfigEdge { from, to };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Tombstone a vertex and drop every edge touching it.
    fn remove_vertex(&mut self, idx: usize) {
        self.removed[idx] = true;
        self.edges.retain(|e| e.from != idx && e.to != idx);
    }

    /// Whether some surviving configuration of the parent package still
    /// permits vertex `idx`.
    fn reachable_from(&self, parent: &str, idx: usize) -> bool {
        self.edges
            .iter()
            .any(|e| e.to == idx && self.vertices[e.from].pack == parent)
    }

    /// Surviving vertex indices of `pack`, in creation order.
    fn surviving<'a>(&'a self, pack: &'a str) -> impl Iterator<Item = usize> + 'a {
        (0..self.vertices.len())
            .filter(move |&i| !self.removed[i] && self.vertices[i].pack == pack)
    }
}

impl Project {
    /// Resolve one configuration per reachable package.
    ///
    /// `root_config` forces the root package's configuration;
    /// `allow_non_library` lets the root pick executable
    /// configurations. Fails with [`ProjectError::Unresolvable`] when
    /// some reachable package ends up without a configuration that
    /// every dependee accepts.
    pub fn package_configs(
        &self,
        platform: &Platform,
        root_config: Option<&str>,
        allow_non_library: bool,
    ) -> Result<IndexMap<String, String>> {
        let root_name = self.root_package().name().to_string();
        let order = self.topological_packages(false);

        // parent package names per dependency, from the package graph
        let mut parents: IndexMap<String, Vec<String>> = IndexMap::new();
        for pack in &order {
            for (dep, _) in pack.dependencies() {
                if self.find_dependency(dep).is_some() {
                    parents
                        .entry(dep.clone())
                        .or_default()
                        .push(pack.name().to_string());
                }
            }
        }

        let mut graph = ConfigGraph::default();

        // a forced root configuration gets index 0 and thereby wins
        // every later tie-break
        if let Some(forced) = root_config {
            graph.vertex(&root_name, forced);
        }

        let mut visited = HashSet::new();
        self.determine_configs(
            self.root_package(),
            platform,
            allow_non_library,
            &mut graph,
            &mut visited,
        );

        // eliminate until at most one configuration per package is left
        loop {
            // prune: drop vertices some parent can no longer pick
            let mut changed = true;
            while changed {
                changed = false;
                for idx in 0..graph.vertices.len() {
                    if graph.removed[idx] || graph.vertices[idx].pack == root_name {
                        continue;
                    }
                    let Some(required) = parents.get(&graph.vertices[idx].pack) else {
                        continue;
                    };
                    if required.iter().any(|parent| !graph.reachable_from(parent, idx)) {
                        debug!(
                            "removing configuration {} of {} (not selectable by all dependees)",
                            graph.vertices[idx].config, graph.vertices[idx].pack
                        );
                        graph.remove_vertex(idx);
                        changed = true;
                    }
                }
            }

            // collapse: the first package with alternatives keeps its
            // earliest surviving configuration
            let mut collapsed = false;
            for pack in &order {
                let surviving: Vec<usize> = graph.surviving(pack.name()).collect();
                if surviving.len() > 1 {
                    for &idx in &surviving[1..] {
                        debug!(
                            "removing configuration {} of {} ({} preferred)",
                            graph.vertices[idx].config,
                            graph.vertices[idx].pack,
                            graph.vertices[surviving[0]].config
                        );
                        graph.remove_vertex(idx);
                    }
                    collapsed = true;
                    break;
                }
            }
            if !collapsed {
                break;
            }
        }

        // every reachable package must have ended up with exactly one
        // configuration
        let mut configs = IndexMap::new();
        let mut missing = None;
        let _ = self.for_each_dependency(false, None, None, |pack| {
            match graph.surviving(pack.name()).next() {
                Some(idx) => {
                    configs.insert(
                        pack.name().to_string(),
                        graph.vertices[idx].config.clone(),
                    );
                    ControlFlow::Continue(())
                }
                None => {
                    missing = Some(pack.name().to_string());
                    ControlFlow::Break(())
                }
            }
        });
        if let Some(name) = missing {
            return Err(ProjectError::Unresolvable(name));
        }

        Ok(configs)
    }

    /// Add the platform-admissible configuration vertices of `pack`
    /// and the edges to the child configurations each one permits.
    /// Dependencies are handled first so every candidate child vertex
    /// exists before edges are wired.
    fn determine_configs(
        &self,
        pack: &Arc<Package>,
        platform: &Platform,
        allow_non_library: bool,
        graph: &mut ConfigGraph,
        visited: &mut HashSet<String>,
    ) {
        if !visited.insert(pack.name().to_string()) {
            return;
        }

        for (dep, _) in pack.dependencies() {
            if let Some(dependency) = self.find_dependency(dep) {
                self.determine_configs(dependency, platform, allow_non_library, graph, visited);
            }
        }

        let is_root = Arc::ptr_eq(pack, self.root_package());
        'configs: for config in
            pack.platform_configurations(platform, is_root && allow_non_library)
        {
            // per dependency, the child configurations this
            // configuration can build against
            let mut dep_configs: Vec<(&str, Vec<String>)> = Vec::new();
            for (dep, _) in pack.dependencies() {
                let Some(dependency) = self.find_dependency(dep) else {
                    continue;
                };

                let mut candidates = match pack.sub_configuration(&config, dep) {
                    Some(pinned) => vec![pinned.to_string()],
                    None => dependency.platform_configurations(platform, false),
                };
                candidates.retain(|c| graph.find_vertex(dep, c).is_some());

                if candidates.is_empty() {
                    debug!(
                        "skipping configuration {} of {} (no usable configuration for {})",
                        config,
                        pack.name(),
                        dep
                    );
                    continue 'configs;
                }
                dep_configs.push((dep.as_str(), candidates));
            }

            let from = graph.vertex(pack.name(), &config);
            for (dep, candidates) in dep_configs {
                for candidate in candidates {
                    let to = graph.vertex(dep, &candidate);
                    graph.edge(from, to);
                }
            }
        }
    }
}
