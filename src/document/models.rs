// src/document/models.rs
use crate::tokenizer::SubjectSampleFactors;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Name of the section opened by the `#METABOLOMICS WORKBENCH` file header.
pub const HEADER_SECTION: &str = "METABOLOMICS WORKBENCH";
const SAMPLES_COLUMN: &str = "Samples";
const FACTORS_ROW: &str = "Factors";
pub const METABOLITE_NAME_COLUMN: &str = "metabolite_name";

/// Two-letter section codes used in item keys (`ST:STUDY_TITLE`) mapped to section names.
static SECTION_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("PR", "PROJECT"),
        ("ST", "STUDY"),
        ("SU", "SUBJECT"),
        ("CO", "COLLECTION"),
        ("TR", "TREATMENT"),
        ("SP", "SAMPLEPREP"),
        ("CH", "CHROMATOGRAPHY"),
        ("AN", "ANALYSIS"),
        ("MS", "MS"),
        ("NM", "NMR"),
    ])
});

/// Expands a two-letter section code, e.g. `ST` -> `STUDY`.
pub fn section_name(code: &str) -> Option<&'static str> {
    SECTION_CODES.get(code).copied()
}

/// A metadata item. `extra` holds the annotations of `*_RESULTS_FILE` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

/// Tabular data between a `NAME_START` and `NAME_END` line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataBlock {
    pub name: String,
    /// First row of the block, key column included.
    pub header: Vec<String>,
    /// `Factors` row following the header, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factors: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl DataBlock {
    /// Builds a block from its raw rows in file order.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let mut rows = rows.into_iter();
        let header = rows.next().unwrap_or_default();
        let mut rows: Vec<Vec<String>> = rows.collect();

        let has_factors = rows
            .first()
            .and_then(|row| row.first())
            .is_some_and(|key| key == FACTORS_ROW);
        let factors = has_factors.then(|| rows.remove(0));

        Self {
            name: name.into(),
            header,
            factors,
            rows,
        }
    }

    /// Column names; the key column of a `Samples` header is reported as `metabolite_name`.
    pub fn columns(&self) -> Vec<&str> {
        self.header
            .iter()
            .enumerate()
            .map(|(i, column)| {
                if i == 0 && column == SAMPLES_COLUMN {
                    METABOLITE_NAME_COLUMN
                } else {
                    column.as_str()
                }
            })
            .collect()
    }

    /// Sample columns of the header, without the key column.
    pub fn sample_names(&self) -> &[String] {
        self.header.get(1..).unwrap_or_default()
    }

    /// Rows as column name -> cell maps. Cells beyond the header are dropped.
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        let columns = self.columns();
        self.rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.to_string(), cell.clone()))
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<DataBlock>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<SubjectSampleFactors>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a field, appending to the existing value when the key repeats
    /// (multi-line items such as `PROJECT_SUMMARY`).
    pub fn push_field(&mut self, key: &str, value: &str, extra: Vec<(String, String)>) {
        match self.fields.iter_mut().find(|f| f.key == key) {
            Some(field) => {
                field.value.push(' ');
                field.value.push_str(value);
                field.extra.extend(extra);
            }
            None => self.fields.push(Field {
                key: key.to_string(),
                value: value.to_string(),
                extra,
            }),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.field(key).map(|f| f.value.as_str())
    }

    pub fn block(&self, name: &str) -> Option<&DataBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.blocks.is_empty() && self.samples.is_empty()
    }
}

/// A parsed mwTab file: its sections in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MwTabFile {
    pub sections: Vec<Section>,
}

impl MwTabFile {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    /// Looks up `CODE:KEY` items such as `SU:SUBJECT_TYPE`.
    pub fn lookup(&self, full_key: &str) -> Option<&str> {
        let (code, key) = full_key.split_once(':')?;
        self.get(section_name(code)?, key)
    }

    pub fn study_id(&self) -> Option<&str> {
        self.get(HEADER_SECTION, "STUDY_ID")
    }

    pub fn analysis_id(&self) -> Option<&str> {
        self.get(HEADER_SECTION, "ANALYSIS_ID")
    }

    /// Every data block of the file, across sections.
    pub fn blocks(&self) -> impl Iterator<Item = &DataBlock> {
        self.sections.iter().flat_map(|s| s.blocks.iter())
    }

    /// Every `SUBJECT_SAMPLE_FACTORS` record of the file.
    pub fn samples(&self) -> impl Iterator<Item = &SubjectSampleFactors> {
        self.sections.iter().flat_map(|s| s.samples.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_section_codes() {
        assert_eq!(section_name("ST"), Some("STUDY"));
        assert_eq!(section_name("NM"), Some("NMR"));
        assert_eq!(section_name("XX"), None);
    }

    #[test]
    fn test_repeated_field_is_appended() {
        let mut section = Section::new("PROJECT");
        section.push_field("PROJECT_SUMMARY", "First half", vec![]);
        section.push_field("PROJECT_SUMMARY", "second half", vec![]);
        assert_eq!(section.get("PROJECT_SUMMARY"), Some("First half second half"));
        assert_eq!(section.fields.len(), 1);
    }

    #[test]
    fn test_data_block_with_factors_row() {
        let block = DataBlock::from_rows(
            "MS_METABOLITE_DATA",
            vec![
                row(&["Samples", "s1", "s2"]),
                row(&["Factors", "Age:40", "Age:41"]),
                row(&["alanine", "1.5", "0"]),
            ],
        );
        assert_eq!(block.columns(), vec!["metabolite_name", "s1", "s2"]);
        assert_eq!(block.sample_names(), &["s1".to_string(), "s2".to_string()]);
        assert_eq!(block.factors, Some(row(&["Factors", "Age:40", "Age:41"])));
        assert_eq!(block.rows.len(), 1);
        let records = block.records();
        assert_eq!(records[0]["metabolite_name"], "alanine");
        assert_eq!(records[0]["s1"], "1.5");
    }

    #[test]
    fn test_empty_data_block() {
        let block = DataBlock::from_rows("NMR_BINNED_DATA", vec![]);
        assert!(block.header.is_empty());
        assert!(block.sample_names().is_empty());
        assert!(block.records().is_empty());
    }
}
