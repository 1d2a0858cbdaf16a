// src/extractors/metadata.rs
use crate::document::MwTabFile;
use std::collections::{BTreeMap, BTreeSet};

/// metadata key -> every distinct value observed for it.
pub type MetadataIndex = BTreeMap<String, BTreeSet<String>>;

/// Collects the values of the requested keys from every section of every document.
/// Keys are compared against the stored field name, without section code.
pub fn extract_metadata<'a, I>(documents: I, keys: &[String]) -> MetadataIndex
where
    I: IntoIterator<Item = &'a MwTabFile>,
{
    let mut extracted = MetadataIndex::new();

    for document in documents {
        let fields = document.sections.iter().flat_map(|s| s.fields.iter());
        for field in fields.filter(|f| keys.contains(&f.key)) {
            extracted
                .entry(field.key.clone())
                .or_default()
                .insert(field.value.clone());
        }
    }

    tracing::info!("Extracted values for {} of {} metadata keys", extracted.len(), keys.len());
    extracted
}
