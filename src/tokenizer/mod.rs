// src/tokenizer/mod.rs
pub mod lexer;
pub mod token;

// Re-export key tokenizer types for convenience
pub use lexer::{tokenize, Tokenizer};
pub use token::{SubjectSampleFactors, Token, TokenValue};
