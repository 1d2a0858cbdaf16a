// src/tokenizer/token.rs
use serde::Serialize;
use std::collections::BTreeMap;

// --- Reserved keys ---
/// Closes the currently open section.
pub const END_SECTION: &str = "#ENDSECTION";
/// Terminal token, always the last one emitted.
pub const END_FILE: &str = "!#ENDFILE";
/// File header marker, opens the header section without closing anything.
pub const FILE_HEADER: &str = "#METABOLOMICS WORKBENCH";
/// Section marker emitted for the `#SUBJECT_SAMPLE_FACTORS:` header line.
pub const SUBJECT_SAMPLE_FACTORS_SECTION: &str = "#SUBJECT_SAMPLE_FACTORS";
/// Value carried by every marker token.
pub const MARKER_VALUE: &str = "\n";

pub const BLOCK_START_SUFFIX: &str = "_START";
pub const BLOCK_END_SUFFIX: &str = "_END";

/// Value of a `KeyValue` token: plain text, or every tab-split column of a data block row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TokenValue {
    Text(String),
    Fields(Vec<String>),
}

impl TokenValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TokenValue::Text(text) => Some(text),
            TokenValue::Fields(_) => None,
        }
    }

    pub fn as_fields(&self) -> Option<&[String]> {
        match self {
            TokenValue::Fields(fields) => Some(fields),
            TokenValue::Text(_) => None,
        }
    }
}

/// One `SUBJECT_SAMPLE_FACTORS` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectSampleFactors {
    pub key: String,
    pub subject_type: String,
    pub local_sample_id: String,
    pub factors: BTreeMap<String, String>,
    pub additional_sample_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Token {
    KeyValue {
        key: String,
        value: TokenValue,
    },
    KeyValueExtra {
        key: String,
        value: String,
        extra: Vec<(String, String)>,
    },
    SubjectSampleFactors(SubjectSampleFactors),
}

impl Token {
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Token::KeyValue {
            key: key.into(),
            value: TokenValue::Text(value.into()),
        }
    }

    /// A marker token: section open/close, block open/close, file header or end of file.
    pub fn marker(key: impl Into<String>) -> Self {
        Self::key_value(key, MARKER_VALUE)
    }

    pub fn row(fields: Vec<String>) -> Self {
        Token::KeyValue {
            key: fields.first().cloned().unwrap_or_default(),
            value: TokenValue::Fields(fields),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Token::KeyValue { key, .. } | Token::KeyValueExtra { key, .. } => key,
            Token::SubjectSampleFactors(ssf) => &ssf.key,
        }
    }

    pub fn is_end_section(&self) -> bool {
        matches!(self, Token::KeyValue { key, .. } if key == END_SECTION)
    }

    pub fn is_end_file(&self) -> bool {
        matches!(self, Token::KeyValue { key, .. } if key == END_FILE)
    }

    /// True for every `#`-keyed marker that opens a section (the file header included).
    pub fn is_section_open(&self) -> bool {
        matches!(self, Token::KeyValue { key, .. } if key.starts_with('#') && key != END_SECTION)
    }

    pub fn is_block_start(&self) -> bool {
        matches!(self, Token::KeyValue { key, value: TokenValue::Text(_) } if key.ends_with(BLOCK_START_SUFFIX))
    }

    pub fn is_block_end(&self) -> bool {
        matches!(self, Token::KeyValue { key, value: TokenValue::Text(_) } if key.ends_with(BLOCK_END_SUFFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_predicates() {
        assert!(Token::marker(END_SECTION).is_end_section());
        assert!(Token::marker(END_FILE).is_end_file());
        assert!(Token::marker("#PROJECT").is_section_open());
        assert!(!Token::marker(END_SECTION).is_section_open());
        assert!(Token::marker("MS_METABOLITE_DATA_START").is_block_start());
        assert!(Token::marker("MS_METABOLITE_DATA_END").is_block_end());
    }

    #[test]
    fn test_row_with_end_like_key_is_not_a_block_marker() {
        let row = Token::row(vec!["WEEKEND".to_string(), "1".to_string()]);
        assert_eq!(row.key(), "WEEKEND");
        assert!(!row.is_block_end());
    }

    #[test]
    fn test_token_value_accessors() {
        let text = TokenValue::Text("peak area".to_string());
        assert_eq!(text.as_text(), Some("peak area"));
        assert_eq!(text.as_fields(), None);

        let Token::KeyValue { value, .. } = Token::row(vec!["Samples".to_string(), "s1".to_string()]) else {
            panic!("Expected KeyValue row");
        };
        assert_eq!(value.as_fields(), Some(&["Samples".to_string(), "s1".to_string()][..]));
        assert_eq!(value.as_text(), None);
    }

    #[test]
    fn test_token_serializes_with_type_tag() {
        let json = serde_json::to_value(Token::key_value("STUDY_ID", "ST000001")).unwrap();
        assert_eq!(json["type"], "KeyValue");
        assert_eq!(json["key"], "STUDY_ID");
        assert_eq!(json["value"], "ST000001");
    }
}
