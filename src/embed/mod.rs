//! Embedded static resources.
//!
//! Everything a fresh project needs without network access ships inside the
//! binary: the page template, layout and theme stylesheets, the client
//! runtime, the live-reload client, and the default component set.
//!
//! # Usage
//!
//! ```ignore
//! use embed::{PAGE_HTML, PageVars};
//!
//! let html = PAGE_HTML.render(&PageVars { title: "Doc", .. });
//! ```

mod template;

pub use template::{Template, TemplateVars};

use anyhow::{Context, Result};
use std::path::Path;

// =============================================================================
// Page template
// =============================================================================

/// Variables for the page template.
pub struct PageVars<'a> {
    pub title: &'a str,
    pub styles_href: &'a str,
    pub script_src: &'a str,
    pub body: &'a str,
    pub ssr: bool,
    /// Extra markup before `</body>` (the reload client tag in dev mode).
    pub reload_tag: &'a str,
}

impl TemplateVars for PageVars<'_> {
    fn apply(&self, content: &str) -> String {
        content
            .replace("__TITLE__", self.title)
            .replace("__STYLES__", self.styles_href)
            .replace("__SCRIPT__", self.script_src)
            .replace("__SSR__", if self.ssr { "true" } else { "false" })
            .replace("__BODY__", self.body)
            .replace("__RELOAD__", self.reload_tag)
    }
}

/// Default page template.
pub const PAGE_HTML: Template<PageVars<'static>> =
    Template::new(include_str!("templates/default.html"));

// =============================================================================
// Layouts and themes
// =============================================================================

/// Known layout identifiers, in display order.
pub const LAYOUTS: &[&str] = &["centered", "wide"];

/// Known theme identifiers, in display order.
pub const THEMES: &[&str] = &["default", "night"];

/// Stylesheet for a layout identifier.
pub fn layout_css(name: &str) -> Option<&'static str> {
    match name {
        "centered" => Some(include_str!("css/layout-centered.css")),
        "wide" => Some(include_str!("css/layout-wide.css")),
        _ => None,
    }
}

/// Stylesheet for a theme identifier.
pub fn theme_css(name: &str) -> Option<&'static str> {
    match name {
        "default" => Some(include_str!("css/theme-default.css")),
        "night" => Some(include_str!("css/theme-night.css")),
        _ => None,
    }
}

// =============================================================================
// Client scripts
// =============================================================================

/// Client runtime, appended to every script bundle.
pub const RUNTIME_JS: &str = include_str!("js/runtime.js");

/// URL the development server serves the reload client under.
pub const RELOAD_CLIENT_URL: &str = "/__vellum/reload.js";

/// Variables for the reload client.
pub struct ReloadVars {
    pub ws_port: u16,
}

impl TemplateVars for ReloadVars {
    fn apply(&self, content: &str) -> String {
        content.replace("__VELLUM_WS_PORT__", &self.ws_port.to_string())
    }
}

/// Live-reload client with WebSocket port injection.
pub const RELOAD_JS: Template<ReloadVars> = Template::new(include_str!("js/reload.js"));

// =============================================================================
// Default components
// =============================================================================

/// Built-in component modules shipped with every project.
pub const DEFAULT_COMPONENTS: &[(&str, &str)] = &[
    ("text-display", include_str!("components/text-display.js")),
    ("range-input", include_str!("components/range-input.js")),
    ("data-table", include_str!("components/data-table.js")),
];

/// Materialize the default components into `dir` (usually `<temp>/components`)
/// so the resolver can enumerate them and the watch composer can watch them.
///
/// Idempotent: existing files are overwritten with the embedded content.
pub fn write_default_components(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for (name, source) in DEFAULT_COMPONENTS {
        let path = dir.join(format!("{name}.js"));
        std::fs::write(&path, source)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_template_substitution() {
        let html = PAGE_HTML.render(&PageVars {
            title: "My Doc",
            styles_href: "styles.css",
            script_src: "bundle.js",
            body: "<p>hi</p>",
            ssr: true,
            reload_tag: "",
        });
        assert!(html.contains("<title>My Doc</title>"));
        assert!(html.contains("data-vellum-ssr=\"true\""));
        assert!(html.contains("<p>hi</p>"));
        assert!(!html.contains("__TITLE__"));
        assert!(!html.contains("__RELOAD__"));
    }

    #[test]
    fn test_reload_client_port_injection() {
        let js = RELOAD_JS.render(&ReloadVars { ws_port: 35901 });
        assert!(js.contains("35901"));
        assert!(!js.contains("__VELLUM_WS_PORT__"));
    }

    #[test]
    fn test_every_layout_and_theme_has_css() {
        for name in LAYOUTS {
            assert!(layout_css(name).is_some(), "missing layout css: {name}");
        }
        for name in THEMES {
            assert!(theme_css(name).is_some(), "missing theme css: {name}");
        }
        assert!(layout_css("nope").is_none());
        assert!(theme_css("nope").is_none());
    }

    #[test]
    fn test_write_default_components() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("components");
        write_default_components(&target).unwrap();
        write_default_components(&target).unwrap(); // idempotent
        for (name, _) in DEFAULT_COMPONENTS {
            assert!(target.join(format!("{name}.js")).is_file());
        }
    }
}
