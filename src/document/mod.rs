// src/document/mod.rs
pub mod builder;
pub mod models;

// Re-export key document types for convenience
pub use models::{section_name, DataBlock, Field, MwTabFile, Section};
