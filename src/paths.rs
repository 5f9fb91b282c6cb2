//! Project path derivation.
//!
//! Every directory and file this crate touches is derived here, once, from
//! the merged configuration. No other module computes its own paths.

use crate::config::{MANIFEST_NAME, ProjectOptions};
use crate::embed;
use crate::utils::normalize_path;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The fixed, absolute path record of a project.
///
/// The output, static-output and temp directories are exclusively owned by
/// one project instance for its lifetime; concurrent instances must not
/// share them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Project root (also the input directory)
    pub root: PathBuf,
    /// Input directory plugins and templates resolve against
    pub input_dir: PathBuf,
    /// Manifest file (`vellum.toml`)
    pub manifest_file: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,
    /// Static asset output (`<output>/static`)
    pub static_output_dir: PathBuf,
    /// Temp directory for intermediate artifacts
    pub temp_dir: PathBuf,

    /// Default-component directory (materialized embedded set unless
    /// overridden)
    pub default_components_dir: PathBuf,
    /// Project component directory
    pub components_dir: PathBuf,
    /// Dataset directory
    pub data_dir: PathBuf,
    /// Static asset source directory
    pub static_src_dir: PathBuf,

    /// Canonical input document
    pub input_file: PathBuf,
    /// Project stylesheet input
    pub stylesheet_input: PathBuf,

    /// Compiled script bundle
    pub script_output: PathBuf,
    /// Assembled stylesheet artifact
    pub stylesheet_output: PathBuf,
    /// Rendered page
    pub html_output: PathBuf,
}

impl ProjectPaths {
    /// Derive the full path record from configuration and a project root.
    pub fn derive(options: &ProjectOptions, root: &Path) -> Self {
        let root = normalize_path(root);
        let output_dir = if options.output.is_absolute() {
            options.output.clone()
        } else {
            root.join(&options.output)
        };
        let temp_dir = root.join(&options.temp_dir);

        let default_components_dir = options
            .default_components
            .as_ref()
            .map(|dir| crate::utils::resolve_path(dir, &root))
            .unwrap_or_else(|| temp_dir.join("components"));

        let input_file = options
            .input_file
            .as_ref()
            .map(|file| crate::utils::resolve_path(file, &root))
            .unwrap_or_else(|| root.join("index.vel"));

        Self {
            input_dir: root.clone(),
            manifest_file: root.join(MANIFEST_NAME),
            static_output_dir: output_dir.join("static"),
            script_output: output_dir.join(&options.output_js),
            stylesheet_output: output_dir.join(&options.output_css),
            html_output: output_dir.join("index.html"),
            components_dir: root.join(&options.components_dir),
            data_dir: root.join(&options.datasets_dir),
            static_src_dir: root.join(&options.static_dir),
            stylesheet_input: root.join("styles.css"),
            default_components_dir,
            input_file,
            output_dir,
            temp_dir,
            root,
        }
    }

    /// Create the output, static-output and temp directories and materialize
    /// the embedded default components.
    ///
    /// Idempotent: re-running against an existing project neither fails nor
    /// duplicates content.
    pub fn scaffold(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.static_output_dir, &self.temp_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        // Only the built-in location is materialized; an override points at
        // user-managed content.
        if self.default_components_dir.starts_with(&self.temp_dir) {
            embed::write_default_components(&self.default_components_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_shape() {
        let options = ProjectOptions::default();
        let paths = ProjectPaths::derive(&options, Path::new("/proj"));
        assert_eq!(paths.output_dir, PathBuf::from("/proj/build"));
        assert_eq!(paths.static_output_dir, PathBuf::from("/proj/build/static"));
        assert_eq!(paths.temp_dir, PathBuf::from("/proj/.vellum"));
        assert_eq!(paths.script_output, PathBuf::from("/proj/build/bundle.js"));
        assert_eq!(paths.input_file, PathBuf::from("/proj/index.vel"));
        assert_eq!(
            paths.default_components_dir,
            PathBuf::from("/proj/.vellum/components")
        );
        assert_eq!(paths.manifest_file, PathBuf::from("/proj/vellum.toml"));
    }

    #[test]
    fn test_derive_respects_overrides() {
        let mut options = ProjectOptions::default();
        options.output = PathBuf::from("dist");
        options.output_js = "app.js".into();
        options.input_file = Some(PathBuf::from("doc.vel"));
        let paths = ProjectPaths::derive(&options, Path::new("/proj"));
        assert_eq!(paths.script_output, PathBuf::from("/proj/dist/app.js"));
        assert_eq!(paths.input_file, PathBuf::from("/proj/doc.vel"));
    }

    #[test]
    fn test_scaffold_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::derive(&ProjectOptions::default(), root.path());
        paths.scaffold().unwrap();
        paths.scaffold().unwrap();
        assert!(paths.output_dir.is_dir());
        assert!(paths.static_output_dir.is_dir());
        assert!(paths.temp_dir.is_dir());
        assert!(paths.default_components_dir.join("range-input.js").is_file());
    }

    #[test]
    fn test_scaffold_skips_overridden_default_components() {
        let root = tempfile::tempdir().unwrap();
        let mut options = ProjectOptions::default();
        options.default_components = Some(PathBuf::from("my-defaults"));
        let paths = ProjectPaths::derive(&options, root.path());
        paths.scaffold().unwrap();
        assert!(!paths.default_components_dir.exists());
    }
}
