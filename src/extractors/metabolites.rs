// src/extractors/metabolites.rs
use crate::document::{DataBlock, MwTabFile};
use crate::extractors::matcher::{matches_all, ItemMatcher};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// Blocks holding per-sample measurements, e.g. MS_METABOLITE_DATA, NMR_METABOLITE_DATA
const METABOLITE_DATA_SUFFIX: &str = "_METABOLITE_DATA";

/// metabolite name -> study id -> analysis id -> samples where the metabolite was measured.
pub type MetaboliteIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeSet<String>>>>;

/// Per-metabolite counts written to the metabolites CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaboliteSummary {
    pub metabolite_name: String,
    pub num_studies: usize,
    pub num_analyses: usize,
    pub num_samples: usize,
}

/// Collects, for every document accepted by all `matchers`, the samples in which each
/// metabolite has a measured value greater than zero.
pub fn extract_metabolites<'a, I>(documents: I, matchers: &[ItemMatcher]) -> MetaboliteIndex
where
    I: IntoIterator<Item = &'a MwTabFile>,
{
    let mut metabolites = MetaboliteIndex::new();

    for document in documents {
        if !matches_all(matchers, document) {
            continue;
        }
        let (Some(study_id), Some(analysis_id)) = (document.study_id(), document.analysis_id()) else {
            tracing::warn!("Skipping document without STUDY_ID/ANALYSIS_ID header");
            continue;
        };

        let data_blocks = document
            .blocks()
            .filter(|block| block.name.ends_with(METABOLITE_DATA_SUFFIX));
        for block in data_blocks {
            tracing::debug!("Collecting {} for {} {}", block.name, study_id, analysis_id);
            collect_block(block, study_id, analysis_id, &mut metabolites);
        }
    }

    tracing::info!("Extracted {} metabolites", metabolites.len());
    metabolites
}

fn collect_block(block: &DataBlock, study_id: &str, analysis_id: &str, metabolites: &mut MetaboliteIndex) {
    for row in &block.rows {
        let Some((name, cells)) = row.split_first() else {
            continue;
        };
        for (sample, cell) in block.sample_names().iter().zip(cells) {
            match cell.trim().parse::<f64>() {
                Ok(value) if value > 0.0 => {
                    metabolites
                        .entry(name.clone())
                        .or_default()
                        .entry(study_id.to_string())
                        .or_default()
                        .entry(analysis_id.to_string())
                        .or_default()
                        .insert(sample.clone());
                }
                Ok(_) => {}
                Err(_) => tracing::trace!("Skipping non-numeric cell {:?} ({} / {})", cell, name, sample),
            }
        }
    }
}

/// Counts studies, analyses and samples per metabolite.
pub fn summarize(metabolites: &MetaboliteIndex) -> Vec<MetaboliteSummary> {
    metabolites
        .iter()
        .map(|(name, studies)| MetaboliteSummary {
            metabolite_name: name.clone(),
            num_studies: studies.len(),
            num_analyses: studies.values().map(BTreeMap::len).sum(),
            num_samples: studies
                .values()
                .flat_map(BTreeMap::values)
                .map(BTreeSet::len)
                .sum(),
        })
        .collect()
}
