//! Stylesheet assembly and minification.
//!
//! The stylesheet artifact is layout css + theme css + the project's own
//! `styles.css`, in that order so project rules win. Minification uses
//! lightningcss.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

/// Assemble the stylesheet artifact from its three sources.
pub fn assemble(layout: &str, theme: &str, custom: Option<&str>, minify: bool) -> String {
    let mut css = String::with_capacity(layout.len() + theme.len());
    css.push_str(layout);
    css.push('\n');
    css.push_str(theme);
    if let Some(custom) = custom {
        css.push('\n');
        css.push_str(custom);
    }

    if minify {
        // Invalid custom css falls back to the readable concatenation
        minify_css(&css).unwrap_or(css)
    } else {
        css
    }
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}
