//! Built-in document transforms.
//!
//! Transforms are applied to the parsed node tree in configuration order,
//! between the parse and resolve stages. They operate on the compiled HTML
//! chunks; component nodes pass through untouched.

use super::ast::{Document, Node};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// A built-in transform, resolved by name at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Add slugified `id` attributes to headings.
    HeadingAnchors,
    /// Open external links in a new tab with `rel="noopener"`.
    ExternalLinks,
}

impl Transform {
    /// Look a transform up by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "heading-anchors" => Some(Self::HeadingAnchors),
            "external-links" => Some(Self::ExternalLinks),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::HeadingAnchors => "heading-anchors",
            Self::ExternalLinks => "external-links",
        }
    }

    /// Apply this transform to every HTML node of the document.
    pub fn apply(self, doc: &mut Document) {
        for node in &mut doc.nodes {
            if let Node::Html { html } = node {
                *html = match self {
                    Self::HeadingAnchors => add_heading_anchors(html),
                    Self::ExternalLinks => mark_external_links(html),
                };
            }
        }
    }
}

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h([1-6])>(.*?)</h[1-6]>").unwrap());

static EXTERNAL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href="(https?://[^"]*)">"#).unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

fn add_heading_anchors(html: &str) -> String {
    HEADING
        .replace_all(html, |captures: &Captures| {
            let level = &captures[1];
            let inner = &captures[2];
            let slug = slugify(&TAG.replace_all(inner, ""));
            format!("<h{level} id=\"{slug}\">{inner}</h{level}>")
        })
        .into_owned()
}

fn mark_external_links(html: &str) -> String {
    EXTERNAL_LINK
        .replace_all(html, |captures: &Captures| {
            format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener\">",
                &captures[1]
            )
        })
        .into_owned()
}

/// Lowercase ASCII slug: alphanumerics kept, runs of anything else collapse
/// to single hyphens.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_doc(html: &str) -> Document {
        Document {
            nodes: vec![Node::Html {
                html: html.to_string(),
            }],
        }
    }

    fn first_html(doc: &Document) -> &str {
        match &doc.nodes[0] {
            Node::Html { html } => html,
            other => panic!("expected html node, got {other:?}"),
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            Transform::from_name("heading-anchors"),
            Some(Transform::HeadingAnchors)
        );
        assert_eq!(
            Transform::from_name("external-links"),
            Some(Transform::ExternalLinks)
        );
        assert_eq!(Transform::from_name("smallcaps"), None);
    }

    #[test]
    fn test_heading_anchors() {
        let mut doc = html_doc("<h2>Getting Started!</h2><p>text</p>");
        Transform::HeadingAnchors.apply(&mut doc);
        assert_eq!(
            first_html(&doc),
            "<h2 id=\"getting-started\">Getting Started!</h2><p>text</p>"
        );
    }

    #[test]
    fn test_heading_anchor_strips_inner_tags() {
        let mut doc = html_doc("<h1>A <em>fine</em> title</h1>");
        Transform::HeadingAnchors.apply(&mut doc);
        assert!(first_html(&doc).contains("id=\"a-fine-title\""));
    }

    #[test]
    fn test_external_links() {
        let mut doc = html_doc(r#"<a href="https://example.com/a">x</a> <a href="/local">y</a>"#);
        Transform::ExternalLinks.apply(&mut doc);
        let html = first_html(&doc);
        assert!(html.contains(r#"<a href="https://example.com/a" target="_blank" rel="noopener">"#));
        assert!(html.contains(r#"<a href="/local">y</a>"#));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World"), "hello-world");
        assert_eq!(slugify("  spaces  "), "spaces");
        assert_eq!(slugify("a--b__c"), "a-b-c");
    }
}
