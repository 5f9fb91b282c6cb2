//! Plugin resolution.
//!
//! Plugin references in the configuration resolve to loaded capabilities at
//! construction time: transform names against the built-in transform table,
//! post-processor names to executables (project input directory first, then
//! `PATH`). Each failure is reported individually and the plugin dropped;
//! failures never abort the build.

use crate::pipeline::transform::Transform;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A plugin reference that failed to resolve. Non-fatal by contract.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    #[error("unknown transform `{0}`")]
    UnknownTransform(String),

    #[error("post-processor `{0}` not found")]
    MissingExecutable(String, #[source] which::Error),
}

/// A post-processor resolved to a runnable program.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    pub name: String,
    pub program: PathBuf,
}

/// The plugin set resolved from a configuration, with per-plugin failures
/// aggregated instead of raised.
#[derive(Debug, Default)]
pub struct ResolvedPlugins {
    pub transforms: Vec<Transform>,
    pub post_processors: Vec<PostProcessor>,
    pub failures: Vec<PluginLoadError>,
}

impl ResolvedPlugins {
    /// Resolve every plugin reference in `options`.
    ///
    /// Failures are collected into `failures` and logged; resolution itself
    /// never fails.
    pub fn resolve(options: &super::ProjectOptions, input_dir: &Path) -> Self {
        let mut resolved = Self::default();

        for name in &options.transforms {
            match Transform::from_name(name) {
                Some(transform) => resolved.transforms.push(transform),
                None => resolved
                    .failures
                    .push(PluginLoadError::UnknownTransform(name.clone())),
            }
        }

        for name in &options.compiler.post_processors {
            match resolve_program(name, input_dir) {
                Ok(program) => resolved.post_processors.push(PostProcessor {
                    name: name.clone(),
                    program,
                }),
                Err(e) => resolved
                    .failures
                    .push(PluginLoadError::MissingExecutable(name.clone(), e)),
            }
        }

        for failure in &resolved.failures {
            crate::log!("plugin"; "skipped: {}", failure);
        }

        resolved
    }
}

/// Find a post-processor program: input-directory-relative first, then PATH.
fn resolve_program(name: &str, input_dir: &Path) -> Result<PathBuf, which::Error> {
    let local = input_dir.join(name);
    if local.is_file() {
        return Ok(local);
    }
    which::which(name)
}
