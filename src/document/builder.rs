// src/document/builder.rs
use crate::document::models::{DataBlock, MwTabFile, Section};
use crate::tokenizer::token::{BLOCK_START_SUFFIX, MARKER_VALUE};
use crate::tokenizer::{Token, Tokenizer};
use crate::utils::error::{DocumentError, TokenizeError};

const END_SECTION_NAME: &str = "END";

impl MwTabFile {
    /// Tokenizes and assembles mwTab text.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        Self::from_tokens(Tokenizer::new(text))
    }

    /// Folds a token stream into sections. Stops at `!#ENDFILE`.
    pub fn from_tokens<I>(tokens: I) -> Result<Self, DocumentError>
    where
        I: IntoIterator<Item = Result<Token, TokenizeError>>,
    {
        let mut tokens = tokens.into_iter();
        let mut document = MwTabFile::default();

        loop {
            let token = next_token(&mut tokens)?;
            if token.is_end_file() {
                break;
            }
            if token.is_end_section() {
                continue;
            }
            if !token.is_section_open() {
                tracing::debug!("Ignoring token {} outside of any section", token.key());
                continue;
            }

            let name = token.key().trim_start_matches('#').to_string();
            let section = build_section(name, &mut tokens)?;
            if section.name == END_SECTION_NAME && section.is_empty() {
                continue;
            }
            tracing::trace!("Built section {} with {} fields", section.name, section.fields.len());
            document.sections.push(section);
        }

        tracing::debug!("Assembled document with {} sections", document.sections.len());
        Ok(document)
    }
}

fn next_token<I>(tokens: &mut I) -> Result<Token, DocumentError>
where
    I: Iterator<Item = Result<Token, TokenizeError>>,
{
    match tokens.next() {
        Some(token) => Ok(token?),
        None => Err(DocumentError::UnexpectedEndOfStream),
    }
}

fn build_section<I>(name: String, tokens: &mut I) -> Result<Section, DocumentError>
where
    I: Iterator<Item = Result<Token, TokenizeError>>,
{
    let mut section = Section::new(name);

    loop {
        let token = next_token(tokens)?;
        if token.is_end_section() {
            return Ok(section);
        }
        if token.is_block_start() {
            let block = build_block(&token, tokens)?;
            section.blocks.push(block);
            continue;
        }

        match token {
            Token::SubjectSampleFactors(ssf) => section.samples.push(ssf),
            Token::KeyValue { key, value } => {
                let text = value
                    .as_text()
                    .ok_or_else(|| DocumentError::UnexpectedToken(key.clone()))?;
                section.push_field(&key, text, Vec::new());
            }
            Token::KeyValueExtra { key, value, extra } => section.push_field(&key, &value, extra),
        }
    }
}

fn build_block<I>(start: &Token, tokens: &mut I) -> Result<DataBlock, DocumentError>
where
    I: Iterator<Item = Result<Token, TokenizeError>>,
{
    let name = start
        .key()
        .trim()
        .strip_suffix(BLOCK_START_SUFFIX)
        .unwrap_or_default()
        .to_string();
    let mut rows = Vec::new();

    loop {
        let token = next_token(tokens)?;
        if token.is_block_end() {
            break;
        }
        if token.is_end_section() || token.is_end_file() {
            return Err(DocumentError::UnclosedBlock(name));
        }
        let row = match &token {
            Token::KeyValue { value, .. } => match (value.as_fields(), value.as_text()) {
                (Some(fields), _) => Some(fields.to_vec()),
                (None, Some(text)) if text != MARKER_VALUE => {
                    Some(vec![token.key().to_string(), text.to_string()])
                }
                _ => None,
            },
            _ => None,
        };
        match row {
            Some(row) => rows.push(row),
            None => return Err(DocumentError::UnexpectedToken(token.key().to_string())),
        }
    }

    tracing::trace!("Built data block {} with {} rows", name, rows.len());
    Ok(DataBlock::from_rows(name, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::models::HEADER_SECTION;
    use crate::tokenizer::token::{END_FILE, END_SECTION};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "#METABOLOMICS WORKBENCH STUDY_ID:ST000001 ANALYSIS_ID:AN000001
VERSION\t1
#PROJECT
PR:PROJECT_TITLE\tMy Study
PR:PROJECT_SUMMARY\tFirst half
PR:PROJECT_SUMMARY\tsecond half
#SUBJECT
SU:SUBJECT_TYPE\tHuman
#SUBJECT_SAMPLE_FACTORS:\tSUBJECT(optional)[tab]SAMPLE[tab]FACTORS[tab]Additional sample data
SUBJECT_SAMPLE_FACTORS\t-\ts1\tAge:40\tRAW_FILE=s1.raw
SUBJECT_SAMPLE_FACTORS\t-\ts2\tAge:41\t
#MS
MS:MS_RESULTS_FILE\tresults.txt\tUNITS:peak area
#MS_METABOLITE_DATA
MS_METABOLITE_DATA:UNITS\tpeak area
MS_METABOLITE_DATA_START
Samples\ts1\ts2
Factors\tAge:40\tAge:41
alanine\t10\t0
MS_METABOLITE_DATA_END
#END
";

    fn ok(tokens: Vec<Token>) -> Vec<Result<Token, TokenizeError>> {
        tokens.into_iter().map(Ok).collect()
    }

    #[test]
    fn test_build_sections_in_file_order() {
        let doc = MwTabFile::parse(SAMPLE).expect("sample should parse");
        let names: Vec<&str> = doc.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![HEADER_SECTION, "PROJECT", "SUBJECT", "SUBJECT_SAMPLE_FACTORS", "MS", "MS_METABOLITE_DATA"]
        );
    }

    #[test]
    fn test_header_ids_and_lookup() {
        let doc = MwTabFile::parse(SAMPLE).unwrap();
        assert_eq!(doc.study_id(), Some("ST000001"));
        assert_eq!(doc.analysis_id(), Some("AN000001"));
        assert_eq!(doc.get(HEADER_SECTION, "VERSION"), Some("1"));
        assert_eq!(doc.lookup("PR:PROJECT_TITLE"), Some("My Study"));
        assert_eq!(doc.lookup("SU:SUBJECT_TYPE"), Some("Human"));
        assert_eq!(doc.lookup("PR:PROJECT_SUMMARY"), Some("First half second half"));
        assert_eq!(doc.lookup("XX:PROJECT_TITLE"), None);
        assert_eq!(doc.lookup("PROJECT_TITLE"), None);
    }

    #[test]
    fn test_samples_results_file_and_blocks() {
        let doc = MwTabFile::parse(SAMPLE).unwrap();

        let samples: Vec<&str> = doc.samples().map(|s| s.local_sample_id.as_str()).collect();
        assert_eq!(samples, vec!["s1", "s2"]);

        let results = doc.section("MS").and_then(|s| s.field("MS_RESULTS_FILE")).unwrap();
        assert_eq!(results.value, "results.txt");
        assert_eq!(results.extra, vec![("UNITS".to_string(), "peak area".to_string())]);

        let data = doc.section("MS_METABOLITE_DATA").unwrap();
        assert_eq!(data.get("Units"), Some("peak area"));
        let block = data.block("MS_METABOLITE_DATA").unwrap();
        assert_eq!(block.sample_names(), &["s1".to_string(), "s2".to_string()]);
        assert!(block.factors.is_some());
        assert_eq!(block.rows, vec![vec!["alanine".to_string(), "10".to_string(), "0".to_string()]]);
    }

    #[test]
    fn test_tokenize_error_is_propagated() {
        let err = MwTabFile::parse("#PROJECT\nPR:PROJECT_TITLE no tab").unwrap_err();
        assert!(matches!(err, DocumentError::Tokenize(TokenizeError::MalformedLine { .. })));
    }

    #[test]
    fn test_stream_without_end_file_is_rejected() {
        let tokens = ok(vec![Token::marker("#PROJECT"), Token::marker(END_SECTION)]);
        let err = MwTabFile::from_tokens(tokens).unwrap_err();
        assert!(matches!(err, DocumentError::UnexpectedEndOfStream));
    }

    #[test]
    fn test_block_cut_by_end_section_is_rejected() {
        let tokens = ok(vec![
            Token::marker("#METABOLITES"),
            Token::marker("METABOLITES_START"),
            Token::row(vec!["metabolite_name".to_string()]),
            Token::marker(END_SECTION),
            Token::marker(END_FILE),
        ]);
        let err = MwTabFile::from_tokens(tokens).unwrap_err();
        assert!(matches!(err, DocumentError::UnclosedBlock(name) if name == "METABOLITES"));
    }

    #[test]
    fn test_row_outside_block_is_rejected() {
        let tokens = ok(vec![
            Token::marker("#PROJECT"),
            Token::row(vec!["alanine".to_string(), "1".to_string()]),
            Token::marker(END_SECTION),
            Token::marker(END_FILE),
        ]);
        let err = MwTabFile::from_tokens(tokens).unwrap_err();
        assert!(matches!(err, DocumentError::UnexpectedToken(key) if key == "alanine"));
    }

    #[test]
    fn test_empty_input_builds_empty_document() {
        let doc = MwTabFile::parse("").unwrap();
        assert!(doc.sections.is_empty());
        assert_eq!(doc.study_id(), None);
    }
}
