//! Data resolver.
//!
//! Enumerates dataset files in the project data directory and loads them for
//! the bundle. JSON parses through serde_json; CSV gets a line-level reader
//! producing an array of uniform objects with numeric detection.

use super::Resolve;
use crate::paths::ProjectPaths;
use crate::pipeline::PipelineError;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};

/// A dataset listing entry.
///
/// `name` keeps the file extension and `extension` includes the dot,
/// mirroring the listing contract of the mutation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub name: String,
    pub path: PathBuf,
    pub extension: String,
}

impl DatasetEntry {
    /// The key the dataset is bundled under (`temps` for `temps.json`).
    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(&self.extension)
            .unwrap_or(&self.name)
    }
}

/// Enumerate dataset files in `dir`.
///
/// A missing directory is an error here; callers that want the tolerant
/// behavior check existence first.
pub fn scan_datasets(dir: &Path) -> io::Result<Vec<DatasetEntry>> {
    let mut datasets: Vec<DatasetEntry> = std::fs::read_dir(dir)?
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?.to_string();
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!(".{ext}"))
                .unwrap_or_default();
            path.is_file().then_some(DatasetEntry {
                name,
                path,
                extension,
            })
        })
        .collect();

    datasets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(datasets)
}

/// Resolver for the `"data"` registry slot.
pub struct DataResolver {
    dir: PathBuf,
    entries: Vec<DatasetEntry>,
}

impl DataResolver {
    pub fn new(paths: &ProjectPaths) -> Result<Self, PipelineError> {
        // Tolerant at build time: a fresh project without a data directory
        // still builds. The mutation API's listing keeps the strict contract.
        let entries = if paths.data_dir.is_dir() {
            scan_datasets(&paths.data_dir)?
        } else {
            Vec::new()
        };
        Ok(Self {
            dir: paths.data_dir.clone(),
            entries,
        })
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// Load every enumerated dataset, keyed by stem.
    pub fn load(&self) -> Result<Map<String, Value>, PipelineError> {
        let mut data = Map::new();
        for entry in &self.entries {
            let value = match entry.extension.as_str() {
                ".json" => {
                    let content = std::fs::read_to_string(&entry.path)?;
                    serde_json::from_str(&content).map_err(|e| {
                        PipelineError::Resolve(format!("dataset `{}`: {e}", entry.name))
                    })?
                }
                ".csv" => {
                    let content = std::fs::read_to_string(&entry.path)?;
                    parse_csv(&content)
                }
                _ => {
                    crate::debug!("data"; "skipping unsupported dataset: {}", entry.name);
                    continue;
                }
            };
            data.insert(entry.stem().to_string(), value);
        }
        Ok(data)
    }
}

impl Resolve for DataResolver {
    fn directories(&self) -> Vec<PathBuf> {
        vec![self.dir.clone()]
    }
}

/// Parse CSV content into an array of row objects.
///
/// First line is the header; numeric-looking cells become numbers.
fn parse_csv(content: &str) -> Value {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Value::Array(Vec::new());
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let rows = lines
        .map(|line| {
            let mut row = Map::new();
            for (column, cell) in columns.iter().zip(line.split(',').map(str::trim)) {
                let value = cell
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(cell.to_string()));
                row.insert((*column).to_string(), value);
            }
            Value::Object(row)
        })
        .collect();

    Value::Array(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectOptions;

    fn paths_in(root: &Path) -> ProjectPaths {
        ProjectPaths::derive(&ProjectOptions::default(), root)
    }

    #[test]
    fn test_scan_missing_dir_errors() {
        assert!(scan_datasets(Path::new("/no/such/dir")).is_err());
    }

    #[test]
    fn test_scan_entry_shape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("temps.json"), "[1,2]").unwrap();
        let entries = scan_datasets(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "temps.json");
        assert_eq!(entries[0].extension, ".json");
        assert_eq!(entries[0].stem(), "temps");
        assert_eq!(entries[0].path, dir.path().join("temps.json"));
    }

    #[test]
    fn test_resolver_tolerates_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let resolver = DataResolver::new(&paths_in(root.path())).unwrap();
        assert!(resolver.entries().is_empty());
        assert!(resolver.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_json_and_csv() {
        let root = tempfile::tempdir().unwrap();
        let paths = paths_in(root.path());
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        std::fs::write(paths.data_dir.join("temps.json"), r#"[{"c": 20}]"#).unwrap();
        std::fs::write(paths.data_dir.join("cities.csv"), "name,pop\noslo,700000\n").unwrap();

        let resolver = DataResolver::new(&paths).unwrap();
        let data = resolver.load().unwrap();

        assert_eq!(data["temps"][0]["c"], 20);
        assert_eq!(data["cities"][0]["name"], "oslo");
        assert_eq!(data["cities"][0]["pop"], 700000.0);
    }

    #[test]
    fn test_load_invalid_json_is_resolve_error() {
        let root = tempfile::tempdir().unwrap();
        let paths = paths_in(root.path());
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        std::fs::write(paths.data_dir.join("bad.json"), "{oops").unwrap();
        let resolver = DataResolver::new(&paths).unwrap();
        assert!(matches!(
            resolver.load(),
            Err(PipelineError::Resolve(_))
        ));
    }

    #[test]
    fn test_parse_csv_types() {
        let value = parse_csv("a,b\n1,x\n2.5,y\n");
        assert_eq!(value[0]["a"], 1.0);
        assert_eq!(value[0]["b"], "x");
        assert_eq!(value[1]["a"], 2.5);
    }

    #[test]
    fn test_parse_csv_empty() {
        assert_eq!(parse_csv(""), Value::Array(Vec::new()));
    }
}
