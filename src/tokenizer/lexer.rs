// src/tokenizer/lexer.rs

// --- Imports ---
use crate::tokenizer::token::{
    SubjectSampleFactors, Token, BLOCK_END_SUFFIX, BLOCK_START_SUFFIX, END_FILE, END_SECTION,
    FILE_HEADER, SUBJECT_SAMPLE_FACTORS_SECTION,
};
use crate::utils::error::TokenizeError;
use std::collections::{BTreeMap, VecDeque};
use std::iter::{Enumerate, FusedIterator};
use std::str::Lines;

// --- Line prefixes ---
const SUBJECT_SAMPLE_FACTORS_HEADER: &str = "#SUBJECT_SAMPLE_FACTORS:";
const SUBJECT_SAMPLE_FACTORS_ROW: &str = "SUBJECT_SAMPLE_FACTORS";
const RESULTS_FILE_MARKER: &str = "_RESULTS_FILE";
const METABOLITE_UNITS_SUFFIX: &str = "_METABOLITE_DATA:UNITS";
const UNITS_KEY: &str = "Units";
const SUBJECT_SAMPLE_FACTORS_FIELDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum LexState {
    /// Classifying ordinary lines.
    Lines,
    /// Between a `*_START` line and its `*_END` line.
    InsideDataBlock { name: String, opened_at: usize },
    /// End of input reached or an error was yielded; only buffered tokens remain.
    Finished,
}

/// Lexical analyzer for mwTab text.
///
/// Pull-based: every call to [`Iterator::next`] consumes at most one input line and
/// buffers the tokens produced by it. The first error is yielded once, after which
/// the iterator is exhausted. Re-tokenizing requires a fresh `Tokenizer`.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    lines: Enumerate<Lines<'a>>,
    state: LexState,
    pending: VecDeque<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            state: LexState::Lines,
            pending: VecDeque::new(),
        }
    }

    /// Advances by one input line, or emits the closing sentinels once input is exhausted.
    fn step(&mut self) -> Result<(), TokenizeError> {
        let Some((index, line)) = self.lines.next() else {
            return self.finish();
        };
        let line_number = index + 1;

        if matches!(self.state, LexState::InsideDataBlock { .. }) {
            self.block_line(line_number, line);
            Ok(())
        } else {
            self.classify_line(line_number, line)
        }
    }

    fn finish(&mut self) -> Result<(), TokenizeError> {
        match std::mem::replace(&mut self.state, LexState::Finished) {
            LexState::InsideDataBlock { name, opened_at } => {
                Err(TokenizeError::IncompleteBlock { block: name, opened_at })
            }
            LexState::Lines | LexState::Finished => {
                self.pending.push_back(Token::marker(END_SECTION));
                self.pending.push_back(Token::marker(END_FILE));
                Ok(())
            }
        }
    }

    fn classify_line(&mut self, line_number: usize, line: &str) -> Result<(), TokenizeError> {
        if line.starts_with(FILE_HEADER) {
            tracing::trace!("Line {}: file header", line_number);
            self.file_header(line_number, line)
        } else if line.starts_with(SUBJECT_SAMPLE_FACTORS_HEADER) {
            tracing::trace!("Line {}: SUBJECT_SAMPLE_FACTORS section header", line_number);
            self.pending.push_back(Token::marker(END_SECTION));
            self.pending.push_back(Token::marker(SUBJECT_SAMPLE_FACTORS_SECTION));
            Ok(())
        } else if line.starts_with('#') {
            tracing::trace!("Line {}: section header {}", line_number, line.trim());
            self.pending.push_back(Token::marker(END_SECTION));
            self.pending.push_back(Token::marker(line.trim()));
            Ok(())
        } else if line.starts_with(SUBJECT_SAMPLE_FACTORS_ROW) {
            let ssf = parse_subject_sample_factors(line_number, line)?;
            self.pending.push_back(Token::SubjectSampleFactors(ssf));
            Ok(())
        } else if line.ends_with(BLOCK_START_SUFFIX) {
            let name = line
                .trim()
                .strip_suffix(BLOCK_START_SUFFIX)
                .unwrap_or_default()
                .to_string();
            tracing::debug!("Line {}: opening data block {}", line_number, name);
            self.pending.push_back(Token::marker(line));
            self.state = LexState::InsideDataBlock {
                name,
                opened_at: line_number,
            };
            Ok(())
        } else {
            if let Some(token) = parse_item_line(line_number, line)? {
                self.pending.push_back(token);
            }
            Ok(())
        }
    }

    /// `#METABOLOMICS WORKBENCH STUDY_ID:ST000001 ANALYSIS_ID:AN000001 ...`
    fn file_header(&mut self, line_number: usize, line: &str) -> Result<(), TokenizeError> {
        let remainder = &line[FILE_HEADER.len()..];
        let mut identifiers = Vec::new();

        for identifier in remainder.split(' ').filter(|s| !s.trim().is_empty()) {
            let (key, value) = identifier.split_once(':').ok_or_else(|| {
                TokenizeError::malformed(
                    line_number,
                    line,
                    format!("header identifier '{}' is missing ':'", identifier),
                )
            })?;
            if value.contains(':') {
                return Err(TokenizeError::malformed(
                    line_number,
                    line,
                    format!("header identifier '{}' has more than one ':'", identifier),
                ));
            }
            identifiers.push(Token::key_value(key, value));
        }

        self.pending.push_back(Token::marker(FILE_HEADER));
        self.pending.extend(identifiers);
        Ok(())
    }

    fn block_line(&mut self, line_number: usize, line: &str) {
        if !line.ends_with(BLOCK_END_SUFFIX) {
            let fields = line.split('\t').map(str::to_string).collect();
            self.pending.push_back(Token::row(fields));
            return;
        }

        let closing = line.trim();
        if let LexState::InsideDataBlock { name, opened_at } = &self.state {
            if closing.strip_suffix(BLOCK_END_SUFFIX) != Some(name.as_str()) {
                tracing::warn!(
                    "Line {}: {} closes data block {} opened at line {}",
                    line_number,
                    closing,
                    name,
                    opened_at
                );
            }
            tracing::debug!("Line {}: closing data block {}", line_number, name);
        }
        self.pending.push_back(Token::marker(closing));
        self.state = LexState::Lines;
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.state == LexState::Finished {
                return None;
            }
            if let Err(e) = self.step() {
                tracing::debug!("Tokenization aborted: {}", e);
                self.state = LexState::Finished;
                self.pending.clear();
                return Some(Err(e));
            }
        }
    }
}

impl FusedIterator for Tokenizer<'_> {}

/// Tokenizes the whole text, failing on the first malformed line.
pub fn tokenize(text: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(text).collect()
}

// --- Line parsers ---

fn parse_subject_sample_factors(
    line_number: usize,
    line: &str,
) -> Result<SubjectSampleFactors, TokenizeError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let &[key, subject_type, local_sample_id, factors, additional_sample_data] = fields.as_slice()
    else {
        return Err(TokenizeError::malformed(
            line_number,
            line,
            format!(
                "expected {} tab-separated fields, found {}",
                SUBJECT_SAMPLE_FACTORS_FIELDS,
                fields.len()
            ),
        ));
    };

    let factors = parse_factors(factors)
        .map_err(|cause| TokenizeError::malformed(line_number, line, cause))?;
    let additional_sample_data = parse_additional_sample_data(additional_sample_data)
        .map_err(|cause| TokenizeError::malformed(line_number, line, cause))?;

    Ok(SubjectSampleFactors {
        key: key.trim().to_string(),
        subject_type: subject_type.to_string(),
        local_sample_id: local_sample_id.to_string(),
        factors,
        additional_sample_data,
    })
}

/// `Age:40 | Sex:M` -> {Age: 40, Sex: M}. Later duplicates overwrite earlier ones.
fn parse_factors(text: &str) -> Result<BTreeMap<String, String>, String> {
    let mut factors = BTreeMap::new();
    for segment in text.split('|').filter(|s| !s.trim().is_empty()) {
        let (name, value) = segment
            .split_once(':')
            .ok_or_else(|| format!("factor '{}' is missing ':'", segment.trim()))?;
        factors.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(factors)
}

/// `RAW_FILE=abc.raw; Note` -> {RAW_FILE: abc.raw}. Segments without '=' are ignored,
/// segments with more than one '=' are rejected.
fn parse_additional_sample_data(text: &str) -> Result<BTreeMap<String, String>, String> {
    let mut data = BTreeMap::new();
    for segment in text.split(';') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if value.contains('=') {
            return Err(format!("sample data '{}' has more than one '='", segment.trim()));
        }
        data.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(data)
}

fn parse_item_line(line_number: usize, line: &str) -> Result<Option<Token>, TokenizeError> {
    if line.is_empty() {
        return Ok(None);
    }

    if line.contains(RESULTS_FILE_MARKER) {
        let fields: Vec<&str> = line.split('\t').collect();
        let (key, value) = match fields.as_slice() {
            [key, value, ..] => (strip_section_code(key.trim()), *value),
            _ => {
                return Err(TokenizeError::malformed(
                    line_number,
                    line,
                    "results file line has no tab-separated value",
                ))
            }
        };
        if fields.len() == 2 {
            return Ok(Some(Token::key_value(key, value)));
        }
        let extra = fields[2..]
            .iter()
            .filter_map(|field| field.split_once(':'))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        return Ok(Some(Token::KeyValueExtra {
            key: key.to_string(),
            value: value.to_string(),
            extra,
        }));
    }

    let (key, value) = line
        .split_once('\t')
        .ok_or_else(|| TokenizeError::malformed(line_number, line, "item line has no tab separator"))?;

    let key = if !key.contains(':') {
        key.trim()
    } else if key.trim_end().ends_with(METABOLITE_UNITS_SUFFIX) {
        UNITS_KEY
    } else {
        strip_section_code(key.trim())
    };

    Ok(Some(Token::key_value(key, value)))
}

/// Drops the two-letter section code and its separator (`PR:PROJECT_TITLE` -> `PROJECT_TITLE`).
fn strip_section_code(key: &str) -> &str {
    key.char_indices().nth(3).map_or("", |(i, _)| &key[i..])
}
