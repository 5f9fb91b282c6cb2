//! Command-line interface module.

mod args;
pub mod build;
pub mod init;
pub mod library;
pub mod serve;

pub use args::{BuildArgs, Cli, Commands, LibraryAction};

use crate::config::MANIFEST_NAME;
use std::path::PathBuf;

/// Locate the project root: an explicit `--root`, or the nearest ancestor of
/// the working directory containing a manifest, or the working directory.
pub fn find_project_root(explicit: Option<&PathBuf>) -> PathBuf {
    if let Some(root) = explicit {
        return crate::utils::normalize_path(root);
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut dir = cwd.as_path();
    loop {
        if dir.join(MANIFEST_NAME).is_file() {
            return dir.to_path_buf();
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return cwd,
        }
    }
}
