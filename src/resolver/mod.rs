//! Dependency resolvers.
//!
//! A resolver maps project configuration to (a) the directories a build
//! depends on and (b) resolved values injected into the build. The registry
//! holds exactly three variants, keyed `"components"`, `"css"` and `"data"`.
//!
//! Lifecycle: a fresh registry is created at the start of every build and
//! discarded with it; only its directory list outlives the build, retained by
//! the watch composer for the watch session.

mod components;
mod data;
mod styles;

pub use components::{ComponentEntry, ComponentResolver, scan_components};
pub use data::{DataResolver, DatasetEntry, scan_datasets};
pub use styles::StyleResolver;

use crate::config::ProjectOptions;
use crate::paths::ProjectPaths;
use crate::pipeline::PipelineError;
use std::path::PathBuf;

/// The capability shared by all resolver variants.
pub trait Resolve {
    /// Directories this resolver depends on. Side-effect free and callable
    /// repeatedly; directories may not exist yet.
    fn directories(&self) -> Vec<PathBuf>;
}

/// The per-build resolver set.
pub struct Registry {
    pub components: ComponentResolver,
    pub styles: StyleResolver,
    pub data: DataResolver,
}

impl Registry {
    /// Construct all three resolvers from the current configuration.
    ///
    /// Any individual failure aborts the whole build; there is no
    /// partial-registry state.
    pub fn create(options: &ProjectOptions, paths: &ProjectPaths) -> Result<Self, PipelineError> {
        Ok(Self {
            components: ComponentResolver::new(options, paths)?,
            styles: StyleResolver::new(options, paths)?,
            data: DataResolver::new(paths)?,
        })
    }

    /// Look a resolver up by its registry name.
    pub fn get(&self, name: &str) -> Option<&dyn Resolve> {
        match name {
            "components" => Some(&self.components),
            "css" => Some(&self.styles),
            "data" => Some(&self.data),
            _ => None,
        }
    }

    /// Union of every resolver's dependency directories, deduplicated,
    /// in registry order.
    pub fn watch_directories(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for resolver in [
            &self.components as &dyn Resolve,
            &self.styles,
            &self.data,
        ] {
            for dir in resolver.directories() {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::ProjectPaths;

    fn registry_in(root: &std::path::Path) -> Registry {
        let options = ProjectOptions::default();
        let paths = ProjectPaths::derive(&options, root);
        Registry::create(&options, &paths).unwrap()
    }

    #[test]
    fn test_registry_names() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(dir.path());
        assert!(registry.get("components").is_some());
        assert!(registry.get("css").is_some());
        assert!(registry.get("data").is_some());
        assert!(registry.get("fonts").is_none());
    }

    #[test]
    fn test_watch_directories_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(dir.path());
        let dirs = registry.watch_directories();
        let mut unique = dirs.clone();
        unique.dedup();
        assert_eq!(dirs, unique);
        // components (default + project) and data contribute directories
        assert!(dirs.len() >= 3);
    }
}
