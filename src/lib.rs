// src/lib.rs
//! Parser and extraction tools for the mwTab metabolomics data-exchange format.
//!
//! Text is tokenized line by line by [`tokenizer::Tokenizer`], folded into a
//! [`document::MwTabFile`], queried by [`extractors`] and written out by [`storage`].
pub mod document;
pub mod extractors;
pub mod input;
pub mod storage;
pub mod tokenizer;
pub mod utils;

pub use document::MwTabFile;
pub use tokenizer::{tokenize, Token, Tokenizer};
pub use utils::AppError;
