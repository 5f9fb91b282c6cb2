//! Document source parsing.
//!
//! A `.vel` document is Markdown with component directive lines:
//!
//! ```text
//! # Temperatures
//!
//! Drag the slider.
//!
//! ::range-input{min=0 max=100 value=30 label="Threshold"}
//! ::data-table{data=@temps}
//! ```
//!
//! Prose chunks between directives compile to HTML through pulldown-cmark;
//! each directive becomes a component node.

use super::PipelineError;
use super::ast::{Document, Node, PropValue};
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Matches a directive line: `::name` or `::name{props}`.
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^::([A-Za-z][A-Za-z0-9_-]*)\s*(?:\{(.*)\})?\s*$").unwrap()
});

/// Matches one `key=value` pair inside a directive's braces.
static PROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|([^\s"]+))"#).unwrap()
});

/// Parse a document source into its node tree.
pub fn parse(source: &str) -> Result<Document, PipelineError> {
    let mut nodes = Vec::new();
    let mut prose = String::new();

    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with("::") {
            prose.push_str(line);
            prose.push('\n');
            continue;
        }

        let Some(captures) = DIRECTIVE.captures(trimmed) else {
            return Err(PipelineError::Parse {
                line: index + 1,
                message: format!("malformed directive `{}`", trimmed.trim_end()),
            });
        };

        flush_prose(&mut prose, &mut nodes);

        let name = captures[1].to_string();
        let props = match captures.get(2) {
            Some(inner) => parse_props(inner.as_str(), index + 1)?,
            None => BTreeMap::new(),
        };
        nodes.push(Node::Component {
            name,
            props,
            slot: nodes.len(),
        });
    }

    flush_prose(&mut prose, &mut nodes);
    Ok(Document { nodes })
}

/// Compile accumulated prose into an HTML node, if non-blank.
fn flush_prose(prose: &mut String, nodes: &mut Vec<Node>) {
    if prose.trim().is_empty() {
        prose.clear();
        return;
    }
    let html = markdown_to_html(prose);
    prose.clear();
    nodes.push(Node::Html { html });
}

/// Render a Markdown chunk to HTML.
fn markdown_to_html(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Parse the `key=value` pairs of a directive body.
fn parse_props(inner: &str, line: usize) -> Result<BTreeMap<String, PropValue>, PipelineError> {
    let mut props = BTreeMap::new();

    for captures in PROP.captures_iter(inner) {
        let key = captures[1].to_string();
        let value = if let Some(quoted) = captures.get(2) {
            PropValue::String(quoted.as_str().to_string())
        } else {
            parse_bare_value(&captures[3])
        };
        props.insert(key, value);
    }

    // Anything besides matched pairs and whitespace is a syntax error.
    if !PROP.replace_all(inner, "").trim().is_empty() {
        return Err(PipelineError::Parse {
            line,
            message: format!("malformed directive props `{{{inner}}}`"),
        });
    }

    Ok(props)
}

/// Interpret an unquoted prop value.
fn parse_bare_value(raw: &str) -> PropValue {
    if let Some(name) = raw.strip_prefix('@') {
        return PropValue::DataRef(name.to_string());
    }
    match raw {
        "true" => PropValue::Bool(true),
        "false" => PropValue::Bool(false),
        _ => raw
            .parse::<f64>()
            .map(PropValue::Number)
            .unwrap_or_else(|_| PropValue::String(raw.to_string())),
    }
}
