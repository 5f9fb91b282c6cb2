//! Document tree types.
//!
//! The tree is deliberately coarse: prose compiles straight to HTML chunks,
//! and only component directives survive as structured nodes. This is the
//! exact shape the client runtime consumes (serialized into the bundle).

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A parsed document: an ordered node sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    /// Names of all component directives, in document order.
    pub fn component_names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Component { name, .. } => Some(name.clone()),
                Node::Html { .. } => None,
            })
            .collect()
    }

    /// All dataset references (`@name` prop values), deduplicated.
    pub fn data_refs(&self) -> Vec<String> {
        let mut refs = Vec::new();
        for node in &self.nodes {
            if let Node::Component { props, .. } = node {
                for value in props.values() {
                    if let PropValue::DataRef(name) = value
                        && !refs.contains(name)
                    {
                        refs.push(name.clone());
                    }
                }
            }
        }
        refs
    }
}

/// One document node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// A compiled prose chunk.
    Html { html: String },

    /// A component directive.
    ///
    /// `slot` is the node's index in the document sequence; the runtime and
    /// the SSR renderer use it to pair placeholders with tree entries.
    Component {
        name: String,
        props: BTreeMap<String, PropValue>,
        slot: usize,
    },
}

/// A directive property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Reference to a dataset by name (`@temps` in source).
    DataRef(String),
}

impl Serialize for PropValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            // The runtime resolves "@name" against the bundled datasets
            Self::DataRef(name) => serializer.serialize_str(&format!("@{name}")),
        }
    }
}
