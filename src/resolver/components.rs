//! Component resolver.
//!
//! Maps directive names to component module files. Two directories feed the
//! map: the default-component directory and the project component directory;
//! project entries shadow defaults. Matching is case- and hyphen-insensitive,
//! so `::RangeInput` and `::range-input` resolve to the same module.

use super::Resolve;
use crate::config::{INDEX_STEM, ProjectOptions};
use crate::paths::ProjectPaths;
use crate::pipeline::PipelineError;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A component listing entry: directive name and module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Enumerate the component modules in `dir`.
///
/// A missing directory yields an empty list. The reserved `index` stem is
/// excluded; only `.js` files count.
pub fn scan_components(dir: &Path) -> Vec<ComponentEntry> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut components: Vec<ComponentEntry> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let stem = path.file_stem()?.to_str()?;
            if path.extension().is_some_and(|ext| ext == "js") && stem != INDEX_STEM {
                Some(ComponentEntry {
                    name: stem.to_string(),
                    path,
                })
            } else {
                None
            }
        })
        .collect();

    components.sort_by(|a, b| a.name.cmp(&b.name));
    components
}

/// Resolver for the `"components"` registry slot.
pub struct ComponentResolver {
    dirs: Vec<PathBuf>,
    map: FxHashMap<String, PathBuf>,
    alias: BTreeMap<String, String>,
    input_dir: PathBuf,
}

impl ComponentResolver {
    pub fn new(options: &ProjectOptions, paths: &ProjectPaths) -> Result<Self, PipelineError> {
        let dirs = vec![
            paths.default_components_dir.clone(),
            paths.components_dir.clone(),
        ];

        let mut map = FxHashMap::default();
        for dir in &dirs {
            for entry in scan_components(dir) {
                // later directories shadow earlier ones
                map.insert(normalize(&entry.name), entry.path);
            }
        }

        Ok(Self {
            dirs,
            map,
            alias: options.alias.clone(),
            input_dir: paths.input_dir.clone(),
        })
    }

    /// Resolve a directive name to a module path.
    ///
    /// The alias map is consulted first; an alias target may be another
    /// component name or a module path relative to the input directory.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let target = self.alias.get(name).map(String::as_str).unwrap_or(name);

        if target.ends_with(".js") {
            let path = crate::utils::resolve_path(Path::new(target), &self.input_dir);
            return path.is_file().then_some(path);
        }

        self.map.get(&normalize(target)).cloned()
    }

    /// All resolvable entries: defaults first, then project components.
    pub fn entries(&self) -> Vec<ComponentEntry> {
        self.dirs.iter().flat_map(|dir| scan_components(dir)).collect()
    }
}

impl Resolve for ComponentResolver {
    fn directories(&self) -> Vec<PathBuf> {
        self.dirs.clone()
    }
}

/// Fold case and separators so directive spellings are interchangeable.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
