//! Project configuration management for `vellum.toml`.
//!
//! Merge precedence, highest first:
//!
//! 1. Caller overrides (CLI flags or embedding code)
//! 2. The `vellum.toml` manifest at the project root
//! 3. Built-in defaults
//!
//! The merged [`ProjectOptions`] record is computed once per
//! [`Project`](crate::project::Project) and never re-merged: a later
//! `build()` call always sees the same configuration.

mod error;
pub mod plugins;

pub use error::{ConfigDiagnostics, ConfigError};
pub use plugins::{PluginLoadError, PostProcessor, ResolvedPlugins};

use crate::embed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest file name at the project root.
pub const MANIFEST_NAME: &str = "vellum.toml";

/// Base name of the canonical input document, without extension.
/// Also the reserved component stem excluded from listings.
pub const INDEX_STEM: &str = "index";

// ============================================================================
// root configuration
// ============================================================================

/// Merged project configuration.
///
/// Immutable once computed; every field is read-only for the lifetime of the
/// owning `Project`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectOptions {
    /// Component alias mapping (directive name → component name or path)
    pub alias: BTreeMap<String, String>,

    /// Keep a watch session alive after a successful build
    pub watch: bool,

    /// Open the browser after the first successful serve build
    pub open: bool,

    /// Dataset directory name, relative to the project root
    pub datasets_dir: String,

    /// Project component directory name, relative to the project root
    pub components_dir: String,

    /// Static asset directory name, relative to the project root
    pub static_dir: String,

    /// Minify the script bundle and stylesheet
    pub minify: bool,

    /// Render the document body into the page at build time
    pub ssr: bool,

    /// Override the default-component directory (defaults to the
    /// materialized embedded set under the temp directory)
    pub default_components: Option<PathBuf>,

    /// Layout identifier (see `embed::LAYOUTS`)
    pub layout: String,

    /// Theme identifier (see `embed::THEMES`)
    pub theme: String,

    /// Output directory, relative to the project root
    pub output: PathBuf,

    /// Script bundle file name inside the output directory
    pub output_js: String,

    /// Stylesheet file name inside the output directory
    pub output_css: String,

    /// Development server port (0 picks an ephemeral port)
    pub port: u16,

    /// Temp directory name, relative to the project root
    pub temp_dir: String,

    /// Custom page template path (defaults to the embedded template)
    pub template: Option<PathBuf>,

    /// Ordered built-in transform names applied to the parsed document
    pub transforms: Vec<String>,

    /// Compiler settings (post-processors, evaluation context)
    pub compiler: CompilerOptions,

    /// Write-quiescence window for the script-output watcher, in milliseconds
    pub stability_ms: u64,

    /// Direct source override: build this string instead of the input file
    pub input_string: Option<String>,

    /// Direct source-file override (defaults to `<root>/index.vel`)
    pub input_file: Option<PathBuf>,
}

/// Compiler configuration: post-processing plugins and evaluation context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Ordered post-processor programs, resolved relative to the project
    /// input directory first, then on `PATH`
    pub post_processors: Vec<String>,

    /// Optional evaluation-context module bundled ahead of the components
    pub context: Option<PathBuf>,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            alias: BTreeMap::new(),
            watch: false,
            open: false,
            datasets_dir: "data".into(),
            components_dir: "components".into(),
            static_dir: "static".into(),
            minify: false,
            ssr: true,
            default_components: None,
            layout: "centered".into(),
            theme: "default".into(),
            output: PathBuf::from("build"),
            output_js: "bundle.js".into(),
            output_css: "styles.css".into(),
            port: 3000,
            temp_dir: ".vellum".into(),
            template: None,
            transforms: Vec::new(),
            compiler: CompilerOptions::default(),
            stability_ms: 500,
            input_string: None,
            input_file: None,
        }
    }
}

// ============================================================================
// caller overrides
// ============================================================================

/// Optional per-field overrides supplied by the caller (highest precedence).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub watch: Option<bool>,
    pub open: Option<bool>,
    pub minify: Option<bool>,
    pub ssr: Option<bool>,
    pub port: Option<u16>,
    pub output: Option<PathBuf>,
    pub layout: Option<String>,
    pub theme: Option<String>,
    pub input_file: Option<PathBuf>,
    pub input_string: Option<String>,
}

impl ProjectOptions {
    /// Load and merge configuration for a project rooted at `root`.
    ///
    /// Reads `<root>/vellum.toml` when present, applies `overrides`, then
    /// validates. All validation errors are collected and reported at once.
    pub fn load(root: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let manifest = root.join(MANIFEST_NAME);
        let mut options = if manifest.is_file() {
            let content = fs::read_to_string(&manifest)
                .map_err(|err| ConfigError::Io(manifest.clone(), err))?;
            let (options, ignored) = Self::parse_with_ignored(&content)?;
            if !ignored.is_empty() {
                crate::log!("warning"; "unknown fields in {}, ignoring:", MANIFEST_NAME);
                for field in &ignored {
                    eprintln!("- {field}");
                }
            }
            options
        } else {
            Self::default()
        };

        options.apply_overrides(overrides);
        options.expand_user_paths();
        options.validate()?;
        Ok(options)
    }

    /// Parse manifest content, collecting any unknown fields.
    pub fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let options = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((options, ignored))
    }

    /// Apply caller overrides on top of the manifest values.
    fn apply_overrides(&mut self, overrides: &Overrides) {
        Self::update_option(&mut self.watch, overrides.watch.as_ref());
        Self::update_option(&mut self.open, overrides.open.as_ref());
        Self::update_option(&mut self.minify, overrides.minify.as_ref());
        Self::update_option(&mut self.ssr, overrides.ssr.as_ref());
        Self::update_option(&mut self.port, overrides.port.as_ref());
        Self::update_option(&mut self.output, overrides.output.as_ref());
        Self::update_option(&mut self.layout, overrides.layout.as_ref());
        Self::update_option(&mut self.theme, overrides.theme.as_ref());

        if overrides.input_file.is_some() {
            self.input_file = overrides.input_file.clone();
        }
        if overrides.input_string.is_some() {
            self.input_string = overrides.input_string.clone();
        }
    }

    /// Update a field if a caller value is provided.
    fn update_option<T: Clone>(field: &mut T, value: Option<&T>) {
        if let Some(value) = value {
            *field = value.clone();
        }
    }

    /// Tilde-expand the user-supplied optional paths.
    fn expand_user_paths(&mut self) {
        for path in [
            &mut self.template,
            &mut self.default_components,
            &mut self.compiler.context,
            &mut self.input_file,
        ]
        .into_iter()
        .flatten()
        {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            *path = PathBuf::from(expanded);
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the merged configuration.
    ///
    /// Collects all validation errors and returns them at once.
    fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        if !embed::LAYOUTS.contains(&self.layout.as_str()) {
            diag.error_with_hint(
                "layout",
                format!("unknown layout `{}`", self.layout),
                format!("known layouts: {}", embed::LAYOUTS.join(", ")),
            );
        }
        if !embed::THEMES.contains(&self.theme.as_str()) {
            diag.error_with_hint(
                "theme",
                format!("unknown theme `{}`", self.theme),
                format!("known themes: {}", embed::THEMES.join(", ")),
            );
        }
        for (field, value) in [
            ("datasets_dir", &self.datasets_dir),
            ("components_dir", &self.components_dir),
            ("static_dir", &self.static_dir),
            ("temp_dir", &self.temp_dir),
            ("output_js", &self.output_js),
            ("output_css", &self.output_css),
        ] {
            if value.is_empty() {
                diag.error(field, "must not be empty");
            } else if Path::new(value).is_absolute() {
                diag.error(field, "must be a name relative to the project root");
            }
        }

        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse manifest content, panicking on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_options(content: &str) -> ProjectOptions {
    let (parsed, ignored) = ProjectOptions::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test manifest has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ProjectOptions::default();
        assert!(!options.watch);
        assert!(options.ssr);
        assert_eq!(options.port, 3000);
        assert_eq!(options.output, PathBuf::from("build"));
        assert_eq!(options.datasets_dir, "data");
        assert_eq!(options.stability_ms, 500);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_manifest_overrides_defaults() {
        let options = test_parse_options(
            "port = 8080\nminify = true\nlayout = \"wide\"\n[compiler]\npost_processors = [\"prettier\"]",
        );
        assert_eq!(options.port, 8080);
        assert!(options.minify);
        assert_eq!(options.layout, "wide");
        assert_eq!(options.compiler.post_processors, vec!["prettier"]);
        // untouched fields keep defaults
        assert_eq!(options.output_css, "styles.css");
    }

    #[test]
    fn test_caller_overrides_beat_manifest() {
        let mut options = test_parse_options("port = 8080\nwatch = false");
        options.apply_overrides(&Overrides {
            port: Some(4000),
            watch: Some(true),
            ..Overrides::default()
        });
        assert_eq!(options.port, 4000);
        assert!(options.watch);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let (_, ignored) =
            ProjectOptions::parse_with_ignored("port = 1234\nno_such_field = true").unwrap();
        assert_eq!(ignored, vec!["no_such_field"]);
    }

    #[test]
    fn test_invalid_toml() {
        let result = ProjectOptions::parse_with_ignored("[compiler\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut options = ProjectOptions::default();
        options.layout = "fancy".into();
        options.theme = "void".into();
        options.temp_dir = String::new();
        let err = options.validate().unwrap_err();
        match err {
            ConfigError::Diagnostics(diag) => assert_eq!(diag.errors().len(), 3),
            other => panic!("expected diagnostics, got {other}"),
        }
    }

    #[test]
    fn test_absolute_dir_name_rejected() {
        let mut options = ProjectOptions::default();
        options.static_dir = "/etc/static".into();
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_alias_mapping_parsed() {
        let options = test_parse_options("[alias]\nchart = \"data-table\"");
        assert_eq!(options.alias.get("chart").map(String::as_str), Some("data-table"));
    }
}
