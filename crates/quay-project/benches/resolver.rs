//! Configuration resolution benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quay_manifest::{DependencySpec, Platform, Version};
use quay_project::{Package, PackageStore, Project, SelectedVersions};
use std::path::Path;
use std::sync::Arc;

struct FixedStore {
    packages: Vec<Arc<Package>>,
}

impl PackageStore for FixedStore {
    fn best_match(&self, name: &str, spec: &DependencySpec) -> Option<Arc<Package>> {
        self.packages
            .iter()
            .find(|p| p.name() == name && spec.matches(p.version()))
            .cloned()
    }

    fn load_temporary(&self, _path: &Path, _version: &Version) -> Option<Arc<Package>> {
        None
    }
}

fn package(name: &str, deps: &[String]) -> Arc<Package> {
    let mut toml = format!("[package]\nname = \"{}\"\nversion = \"1.0.0\"\n\n", name);
    toml.push_str("[dependencies]\n");
    for dep in deps {
        toml.push_str(&format!("{} = \"1.0\"\n", dep));
    }
    toml.push_str("\n[[configurations]]\nname = \"library\"\n");
    toml.push_str("\n[[configurations]]\nname = \"slim\"\n");
    let manifest = quay_manifest::from_str(&toml).unwrap();
    Arc::new(Package::new(manifest, format!("/bench/{}", name)))
}

/// A project whose graph is a chain of `depth` packages, each with two
/// configurations.
fn chain_project(depth: usize) -> Project {
    let mut packages = Vec::new();
    for i in 0..depth {
        let deps: Vec<String> = if i + 1 < depth {
            vec![format!("pkg{}", i + 1)]
        } else {
            Vec::new()
        };
        packages.push(package(&format!("pkg{}", i), &deps));
    }

    let mut selections = SelectedVersions::new();
    for i in 1..depth {
        selections.select(format!("pkg{}", i), Version::parse("1.0.0").unwrap());
    }

    let root = Arc::clone(&packages[0]);
    let store = FixedStore { packages };
    Project::with_selections(root, selections, &store)
}

fn benchmark_resolution(c: &mut Criterion) {
    let platform = Platform::new(["linux", "posix"], ["x86_64"], "ldc");

    let mut group = c.benchmark_group("package_configs");
    for depth in [4usize, 16, 64] {
        let project = chain_project(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &project, |b, project| {
            b.iter(|| {
                let configs = project.package_configs(&platform, None, false).unwrap();
                black_box(configs.len())
            });
        });
    }
    group.finish();
}

fn benchmark_traversal(c: &mut Criterion) {
    let project = chain_project(64);

    c.bench_function("topological_packages", |b| {
        b.iter(|| black_box(project.topological_packages(true).len()));
    });
}

criterion_group!(benches, benchmark_resolution, benchmark_traversal);
criterion_main!(benches);
