// src/storage/mod.rs
use crate::extractors::metabolites::{summarize, MetaboliteIndex};
use crate::extractors::metadata::MetadataIndex;
use crate::utils::error::StorageError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::{Path, PathBuf};

const METABOLITES_CSV_HEADER: [&str; 4] = ["metabolite_name", "num-studies", "num_analyses", "num_samples"];

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.as_os_str().is_empty() && !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes `key, value0, value1, ...` rows, values sorted, to `<stem>.csv`.
    pub fn save_metadata_csv(
        &self,
        stem: &str,
        extracted: &MetadataIndex,
        no_header: bool,
    ) -> Result<PathBuf, StorageError> {
        let mut out = String::new();

        if !no_header {
            let width = extracted.values().map(|values| values.len()).max().unwrap_or(0);
            let mut header = vec!["metadata".to_string()];
            header.extend((0..width).map(|i| format!("value{}", i)));
            push_csv_row(&mut out, &header);
        }
        for (key, values) in extracted {
            let row: Vec<&str> = std::iter::once(key.as_str())
                .chain(values.iter().map(String::as_str))
                .collect();
            push_csv_row(&mut out, &row);
        }

        self.write(stem, "csv", &out)
    }

    /// Writes one row of study/analysis/sample counts per metabolite to `<stem>.csv`.
    pub fn save_metabolites_csv(
        &self,
        stem: &str,
        extracted: &MetaboliteIndex,
        no_header: bool,
    ) -> Result<PathBuf, StorageError> {
        let mut out = String::new();

        if !no_header {
            push_csv_row(&mut out, &METABOLITES_CSV_HEADER);
        }
        for summary in summarize(extracted) {
            push_csv_row(
                &mut out,
                &[
                    summary.metabolite_name,
                    summary.num_studies.to_string(),
                    summary.num_analyses.to_string(),
                    summary.num_samples.to_string(),
                ],
            );
        }

        self.write(stem, "csv", &out)
    }

    /// Writes any serializable value as JSON (sorted maps, four-space indent) to `<stem>.json`.
    pub fn save_json<T: Serialize>(&self, stem: &str, value: &T) -> Result<PathBuf, StorageError> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        value
            .serialize(&mut serializer)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let json = String::from_utf8(buf)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        self.write(stem, "json", &json)
    }

    fn write(&self, stem: &str, extension: &str, contents: &str) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}.{}", stem, extension));

        // Stems may carry sub-directories
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(StorageError::IoError)?;
            }
        }

        fs::write(&file_path, contents)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved {} to {}", extension, file_path.display());

        Ok(file_path)
    }
}

/// Appends a row with every cell quoted, embedded quotes doubled.
fn push_csv_row<S: AsRef<str>>(out: &mut String, cells: &[S]) {
    let row: Vec<String> = cells
        .iter()
        .map(|cell| format!("\"{}\"", cell.as_ref().replace('"', "\"\"")))
        .collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};

    fn metadata() -> MetadataIndex {
        BTreeMap::from([
            (
                "SUBJECT_TYPE".to_string(),
                BTreeSet::from(["Plant".to_string(), "Human".to_string()]),
            ),
            ("MS_TYPE".to_string(), BTreeSet::from(["GC-MS".to_string()])),
        ])
    }

    fn metabolites() -> MetaboliteIndex {
        let samples = BTreeSet::from(["s1".to_string(), "s2".to_string()]);
        BTreeMap::from([(
            "1,2,4-benzenetriol".to_string(),
            BTreeMap::from([(
                "ST000001".to_string(),
                BTreeMap::from([("AN000001".to_string(), samples)]),
            )]),
        )])
    }

    #[test]
    fn test_metadata_csv() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();

        assert_eq!(storage.base_dir(), dir.path());
        let path = storage.save_metadata_csv("metadata", &metadata(), false).unwrap();
        assert_eq!(path, storage.base_dir().join("metadata.csv"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "\"metadata\",\"value0\",\"value1\"\n\"MS_TYPE\",\"GC-MS\"\n\"SUBJECT_TYPE\",\"Human\",\"Plant\"\n"
        );
    }

    #[test]
    fn test_metabolites_csv_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();

        let path = storage.save_metabolites_csv("metabolites", &metabolites(), true).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "\"1,2,4-benzenetriol\",\"1\",\"1\",\"2\"\n"
        );
    }

    #[test]
    fn test_metabolites_csv_header() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path()).unwrap();

        let path = storage.save_metabolites_csv("metabolites", &metabolites(), false).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("\"metabolite_name\",\"num-studies\",\"num_analyses\",\"num_samples\"\n"));
    }

    #[test]
    fn test_json_is_sorted_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out")).unwrap();

        let path = storage.save_json("nested/metadata", &metadata()).unwrap();
        let json = fs::read_to_string(&path).unwrap();
        assert!(json.starts_with("{\n    \"MS_TYPE\": [\n        \"GC-MS\"\n    ],"));

        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["SUBJECT_TYPE"], vec!["Human", "Plant"]);
    }

    #[test]
    fn test_csv_quotes_are_doubled() {
        let mut out = String::new();
        push_csv_row(&mut out, &["say \"hi\"", "x"]);
        assert_eq!(out, "\"say \"\"hi\"\"\",\"x\"\n");
    }
}
