//! The selected-versions store and its on-disk lockfile
//!
//! The lockfile (`quay.selections.json`) records the exact version
//! chosen for every dependency so repeated builds resolve the same
//! graph. The version-range solver writes it, the project model reads
//! it; this type is the only thing that touches it on disk.

use crate::error::{ProjectError, Result};
use indexmap::IndexMap;
use quay_manifest::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the lockfile, relative to the root package directory.
pub const SELECTIONS_FILE: &str = "quay.selections.json";

/// Supported lockfile format version.
pub const FILE_VERSION: u32 = 1;

/// A single selected dependency version.
///
/// A selection may carry a local path; the dependency is then loaded
/// from that path (relative to the declaring package) and merely
/// labeled with the recorded version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    version: Version,
    path: Option<PathBuf>,
}

impl Selected {
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// The set of dependency versions chosen for one project.
#[derive(Debug, Default)]
pub struct SelectedVersions {
    selections: IndexMap<String, Selected>,
    dirty: bool,
}

/// On-disk document shape.
#[derive(Serialize, Deserialize)]
struct SelectionsDocument {
    #[serde(rename = "fileVersion")]
    file_version: u32,
    versions: IndexMap<String, SelectionEntry>,
}

/// Version-only selections serialize as a bare string; selections with
/// a path serialize as an object so they survive a save/load cycle.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionEntry {
    Version(Version),
    Path { version: Version, path: PathBuf },
}

impl SelectedVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a selections document from disk.
    ///
    /// A `fileVersion` other than [`FILE_VERSION`] is a hard fault;
    /// any other schema problem reports as malformed. Either way the
    /// caller is left without selections and may continue write-only.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| ProjectError::Malformed(e.to_string()))?;

        let file_version = value
            .get("fileVersion")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ProjectError::Malformed("missing fileVersion".to_string()))?;
        if file_version != u64::from(FILE_VERSION) {
            return Err(ProjectError::FileVersionMismatch {
                expected: FILE_VERSION,
                found: file_version as u32,
            });
        }

        let document: SelectionsDocument = serde_json::from_value(value)
            .map_err(|e| ProjectError::Malformed(e.to_string()))?;

        let selections = document
            .versions
            .into_iter()
            .map(|(name, entry)| {
                let selected = match entry {
                    SelectionEntry::Version(version) => Selected {
                        version,
                        path: None,
                    },
                    SelectionEntry::Path { version, path } => Selected {
                        version,
                        path: Some(path),
                    },
                };
                (name, selected)
            })
            .collect();

        Ok(Self {
            selections,
            dirty: false,
        })
    }

    /// Write the selections document, replacing `path` atomically.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = SelectionsDocument {
            file_version: FILE_VERSION,
            versions: self
                .selections
                .iter()
                .map(|(name, selected)| {
                    let entry = match &selected.path {
                        None => SelectionEntry::Version(selected.version.clone()),
                        Some(p) => SelectionEntry::Path {
                            version: selected.version.clone(),
                            path: p.clone(),
                        },
                    };
                    (name.clone(), entry)
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&document)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut file = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| ProjectError::Io(e.error))?;

        self.dirty = false;
        Ok(())
    }

    /// Select a version for `name`.
    pub fn select(&mut self, name: impl Into<String>, version: Version) {
        self.selections.insert(
            name.into(),
            Selected {
                version,
                path: None,
            },
        );
        self.dirty = true;
    }

    /// Select a version for `name` that is loaded from a local path.
    pub fn select_path(&mut self, name: impl Into<String>, version: Version, path: PathBuf) {
        self.selections.insert(
            name.into(),
            Selected {
                version,
                path: Some(path),
            },
        );
        self.dirty = true;
    }

    /// Remove the selection for `name`, reporting whether one existed.
    pub fn deselect(&mut self, name: &str) -> bool {
        let removed = self.selections.shift_remove(name).is_some();
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn has_selected(&self, name: &str) -> bool {
        self.selections.contains_key(name)
    }

    /// The selection recorded for `name`.
    pub fn selected(&self, name: &str) -> Result<&Selected> {
        self.selections
            .get(name)
            .ok_or_else(|| ProjectError::NotSelected(name.to_string()))
    }

    /// The version recorded for `name`.
    pub fn selected_version(&self, name: &str) -> Result<&Version> {
        self.selected(name).map(Selected::version)
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.selections.clear();
        self.dirty = false;
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selected)> {
        self.selections.iter().map(|(name, s)| (name.as_str(), s))
    }
}
