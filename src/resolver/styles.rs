//! Stylesheet resolver.
//!
//! Resolves the layout and theme identifiers to their embedded stylesheets
//! and carries the project's own stylesheet path. Its directory list is
//! empty: the stylesheet input file has a dedicated watcher with the cheap
//! CSS-only reaction, so it must not also appear among the full-rebuild
//! directories.

use super::Resolve;
use crate::config::ProjectOptions;
use crate::embed;
use crate::paths::ProjectPaths;
use crate::pipeline::{PipelineError, styles};
use std::path::PathBuf;

/// Resolver for the `"css"` registry slot.
pub struct StyleResolver {
    layout: &'static str,
    theme: &'static str,
    custom_path: PathBuf,
}

impl StyleResolver {
    pub fn new(options: &ProjectOptions, paths: &ProjectPaths) -> Result<Self, PipelineError> {
        let layout = embed::layout_css(&options.layout).ok_or_else(|| {
            PipelineError::Resolve(format!("unknown layout `{}`", options.layout))
        })?;
        let theme = embed::theme_css(&options.theme).ok_or_else(|| {
            PipelineError::Resolve(format!("unknown theme `{}`", options.theme))
        })?;
        Ok(Self {
            layout,
            theme,
            custom_path: paths.stylesheet_input.clone(),
        })
    }

    /// Assemble the stylesheet artifact from layout + theme + project css.
    pub fn assemble(&self, minify: bool) -> Result<String, PipelineError> {
        let custom = if self.custom_path.is_file() {
            Some(std::fs::read_to_string(&self.custom_path)?)
        } else {
            None
        };
        Ok(styles::assemble(
            self.layout,
            self.theme,
            custom.as_deref(),
            minify,
        ))
    }
}

impl Resolve for StyleResolver {
    fn directories(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_in(root: &std::path::Path, options: &ProjectOptions) -> Result<StyleResolver, PipelineError> {
        let paths = ProjectPaths::derive(options, root);
        StyleResolver::new(options, &paths)
    }

    #[test]
    fn test_assemble_without_project_css() {
        let root = tempfile::tempdir().unwrap();
        let resolver = resolver_in(root.path(), &ProjectOptions::default()).unwrap();
        let css = resolver.assemble(false).unwrap();
        assert!(css.contains("#vellum-root"));
        assert!(css.contains("--vellum-bg"));
    }

    #[test]
    fn test_assemble_includes_project_css_last() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("styles.css"), ".mine { color: teal }").unwrap();
        let resolver = resolver_in(root.path(), &ProjectOptions::default()).unwrap();
        let css = resolver.assemble(false).unwrap();
        let custom = css.find(".mine").unwrap();
        let theme = css.find("--vellum-bg").unwrap();
        assert!(theme < custom);
    }

    #[test]
    fn test_unknown_layout_aborts_construction() {
        let root = tempfile::tempdir().unwrap();
        let mut options = ProjectOptions::default();
        options.layout = "postmodern".into();
        assert!(matches!(
            resolver_in(root.path(), &options),
            Err(PipelineError::Resolve(_))
        ));
    }

    #[test]
    fn test_no_watch_directories() {
        let root = tempfile::tempdir().unwrap();
        let resolver = resolver_in(root.path(), &ProjectOptions::default()).unwrap();
        assert!(resolver.directories().is_empty());
    }
}
