//! Project scaffolding.

use crate::config::MANIFEST_NAME;
use crate::log;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

const STARTER_MANIFEST: &str = r#"# vellum project manifest
# every field is optional; these are the defaults worth changing

layout = "centered"
theme = "default"
transforms = ["heading-anchors", "external-links"]

# [alias]
# chart = "data-table"
"#;

const STARTER_DOCUMENT: &str = r#"# A vellum document

Prose is Markdown. Interactive pieces are directives:

::range-input{min=0 max=100 value=30 label="Threshold"}

Datasets in `data/` are referenced by name:

::data-table{data=@example}
"#;

const STARTER_STYLES: &str = r#"/* project styles, loaded after the layout and theme */
"#;

const STARTER_DATASET: &str = r#"[
  { "city": "Oslo", "temp": 4 },
  { "city": "Lisbon", "temp": 17 }
]
"#;

/// Scaffold a new project in `<cwd>/<name>` (or the working directory).
pub fn run(name: Option<&PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to get current working directory")?;
    let root = match name {
        Some(name) => cwd.join(name),
        None => cwd,
    };

    let manifest = root.join(MANIFEST_NAME);
    if manifest.exists() {
        bail!("`{}` already exists", manifest.display());
    }

    for dir in ["components", "data", "static"] {
        std::fs::create_dir_all(root.join(dir))
            .with_context(|| format!("failed to create {dir}/"))?;
    }

    write_new(&manifest, STARTER_MANIFEST)?;
    write_new(&root.join("index.vel"), STARTER_DOCUMENT)?;
    write_new(&root.join("styles.css"), STARTER_STYLES)?;
    write_new(&root.join("data/example.json"), STARTER_DATASET)?;

    log!("init"; "created project in {}", root.display());
    log!("init"; "next: vellum serve");
    Ok(())
}

/// Write a starter file, leaving any existing one untouched.
fn write_new(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        log!("init"; "kept existing {}", path.display());
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_manifest_parses() {
        let (options, ignored) =
            crate::config::ProjectOptions::parse_with_ignored(STARTER_MANIFEST).unwrap();
        assert!(ignored.is_empty(), "starter manifest has unknown fields");
        assert_eq!(options.layout, "centered");
        assert_eq!(options.transforms.len(), 2);
    }

    #[test]
    fn test_starter_document_parses() {
        let doc = crate::pipeline::parse::parse(STARTER_DOCUMENT).unwrap();
        let names = doc.component_names();
        assert!(names.contains(&"range-input".to_string()));
        assert!(names.contains(&"data-table".to_string()));
        assert_eq!(doc.data_refs(), vec!["example"]);
    }

    #[test]
    fn test_starter_dataset_is_valid_json() {
        let value: serde_json::Value = serde_json::from_str(STARTER_DATASET).unwrap();
        assert!(value.is_array());
    }
}
