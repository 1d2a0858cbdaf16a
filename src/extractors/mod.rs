// src/extractors/mod.rs
pub mod matcher;
pub mod metabolites;
pub mod metadata;

// Re-export key extraction types for convenience
pub use matcher::{matches_all, ItemMatcher, ValueMatch};
pub use metabolites::{extract_metabolites, summarize, MetaboliteIndex, MetaboliteSummary};
pub use metadata::{extract_metadata, MetadataIndex};
