//! Server-side rendering of the document tree.
//!
//! Prose chunks are already HTML; component nodes render as placeholder
//! elements the client runtime mounts into. With `ssr` disabled the body is
//! left empty and the runtime builds it from the bundled tree instead.

use super::ast::{Document, Node};

/// Render the document body for the page template.
pub fn render_body(doc: &Document) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        match node {
            Node::Html { html } => out.push_str(html),
            Node::Component { name, slot, .. } => {
                out.push_str(&format!(
                    "<div class=\"vellum-component\" data-vellum-slot=\"{slot}\" data-component=\"{name}\"></div>"
                ));
            }
        }
    }
    out
}
