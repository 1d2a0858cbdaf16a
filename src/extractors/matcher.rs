// src/extractors/matcher.rs
use crate::document::{section_name, MwTabFile};
use crate::utils::error::ExtractError;
use regex::Regex;

/// How the stored value is compared.
#[derive(Debug, Clone)]
pub enum ValueMatch {
    Exact(String),
    /// Matches when the pattern is found anywhere in the value.
    Pattern(Regex),
}

/// Matches one `CODE:KEY` item of a document against an expected value.
#[derive(Debug, Clone)]
pub struct ItemMatcher {
    pub section: &'static str,
    pub key: String,
    pub value: ValueMatch,
}

impl ItemMatcher {
    pub fn exact(full_key: &str, value: &str) -> Result<Self, ExtractError> {
        Self::new(full_key, ValueMatch::Exact(value.to_string()))
    }

    pub fn regex(full_key: &str, pattern: &str) -> Result<Self, ExtractError> {
        Self::new(full_key, ValueMatch::Pattern(Regex::new(pattern)?))
    }

    /// Values written as `r'...'` are compiled as regular expressions, everything else
    /// is compared exactly.
    pub fn parse(full_key: &str, value: &str) -> Result<Self, ExtractError> {
        match value.strip_prefix("r'").and_then(|v| v.strip_suffix('\'')) {
            Some(pattern) => Self::regex(full_key, pattern),
            None => Self::exact(full_key, value),
        }
    }

    fn new(full_key: &str, value: ValueMatch) -> Result<Self, ExtractError> {
        let (code, key) = full_key
            .split_once(':')
            .ok_or_else(|| ExtractError::InvalidKey(full_key.to_string()))?;
        let section =
            section_name(code).ok_or_else(|| ExtractError::UnknownSection(code.to_string()))?;

        Ok(Self {
            section,
            key: key.to_string(),
            value,
        })
    }

    pub fn matches(&self, document: &MwTabFile) -> bool {
        let Some(stored) = document.get(self.section, &self.key) else {
            tracing::trace!("{}:{} not present in document", self.section, self.key);
            return false;
        };
        match &self.value {
            ValueMatch::Exact(expected) => stored == expected.as_str(),
            ValueMatch::Pattern(re) => re.is_match(stored),
        }
    }
}

/// True when every matcher accepts the document (vacuously true for no matchers).
pub fn matches_all(matchers: &[ItemMatcher], document: &MwTabFile) -> bool {
    matchers.iter().all(|m| m.matches(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> MwTabFile {
        MwTabFile::parse("#SUBJECT\nSU:SUBJECT_TYPE\tHuman\nSU:SUBJECT_SPECIES\tHomo sapiens\n").unwrap()
    }

    #[test]
    fn test_exact_match() {
        let doc = document();
        assert!(ItemMatcher::exact("SU:SUBJECT_TYPE", "Human").unwrap().matches(&doc));
        assert!(!ItemMatcher::exact("SU:SUBJECT_TYPE", "human").unwrap().matches(&doc));
    }

    #[test]
    fn test_regex_match_searches_value() {
        let doc = document();
        assert!(ItemMatcher::regex("SU:SUBJECT_SPECIES", "sapiens").unwrap().matches(&doc));
        assert!(ItemMatcher::parse("SU:SUBJECT_TYPE", "r'(?i)^hum'").unwrap().matches(&doc));
        assert!(!ItemMatcher::parse("SU:SUBJECT_TYPE", "r'^Plant'").unwrap().matches(&doc));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let doc = document();
        assert!(!ItemMatcher::exact("ST:STUDY_TITLE", "x").unwrap().matches(&doc));
    }

    #[test]
    fn test_invalid_keys_and_patterns() {
        assert!(matches!(ItemMatcher::exact("SUBJECT_TYPE", "x"), Err(ExtractError::InvalidKey(_))));
        assert!(matches!(
            ItemMatcher::exact("XX:SUBJECT_TYPE", "x"),
            Err(ExtractError::UnknownSection(code)) if code == "XX"
        ));
        assert!(matches!(ItemMatcher::regex("SU:SUBJECT_TYPE", "("), Err(ExtractError::InvalidPattern(_))));
    }

    #[test]
    fn test_matches_all() {
        let doc = document();
        let matchers = vec![
            ItemMatcher::exact("SU:SUBJECT_TYPE", "Human").unwrap(),
            ItemMatcher::regex("SU:SUBJECT_SPECIES", "Homo").unwrap(),
        ];
        assert!(matches_all(&matchers, &doc));
        assert!(matches_all(&[], &doc));
    }
}
