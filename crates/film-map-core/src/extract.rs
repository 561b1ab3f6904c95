//! Record extraction from the raw filming-locations dataset.
//!
//! The dataset is a loosely tab-delimited text file. Each stage below is a
//! small function so the quirks of the format can be exercised on their own:
//!
//! ```text
//!  raw bytes ─► split_raw_lines ─► trim_boilerplate ─► decode_line
//!            ─► is_federal (drop) ─► strip_detail_block ─► dedup
//!            ─► tokenize ─► parse_record ─► FilmRecord
//! ```

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Lines of preamble at the top of the dataset.
pub const HEADER_LINES: usize = 14;
/// Lines of trailer at the bottom of the dataset.
pub const FOOTER_LINES: usize = 1;
/// Marker for entries that are not films.
pub const FEDERAL_MARKER: &str = "Federal";
/// Number of trailing comma-separated location segments kept as the region.
pub const REGION_SEGMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilmRecord {
    /// Title as written in the dataset, including its "(YYYY)" marker.
    pub title: String,
    /// Four ASCII digits.
    pub year: String,
    /// Last three comma-separated parts of the location field.
    pub region: String,
}

impl FilmRecord {
    pub fn year_value(&self) -> Option<u32> {
        self.year.parse().ok()
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct RecordExtractor;

impl RecordExtractor {
    /// Opens the dataset at `path` and extracts every well-formed record.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<FilmRecord>, ExtractError> {
        let file = File::open(path.as_ref())?;
        debug!("Opened dataset — path={}", path.as_ref().display());
        Self::parse(BufReader::new(file))
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Vec<FilmRecord>, ExtractError> {
        let raw = split_raw_lines(reader)?;
        let total = raw.len();

        let mut cleaned = Vec::with_capacity(total);
        let mut undecodable = 0usize;
        let mut federal = 0usize;

        for bytes in trim_boilerplate(&raw) {
            let Some(line) = decode_line(bytes) else {
                undecodable += 1;
                continue;
            };
            if is_federal(&line) {
                federal += 1;
                continue;
            }
            cleaned.push(strip_detail_block(&line));
        }

        let unique = dedup(cleaned);
        let unique_count = unique.len();
        let records: Vec<FilmRecord> = unique.iter().filter_map(|l| parse_record(l)).collect();

        info!(
            "Extracted film records — raw_lines={} undecodable={} federal={} unique={} records={}",
            total,
            undecodable,
            federal,
            unique_count,
            records.len()
        );
        Ok(records)
    }
}

/// Splits the input on `\n` without decoding, so bad bytes stay confined to their line.
pub fn split_raw_lines<R: BufRead>(reader: R) -> std::io::Result<Vec<Vec<u8>>> {
    reader.split(b'\n').collect()
}

/// Drops the fixed preamble and trailer, whatever they contain.
pub fn trim_boilerplate<T>(lines: &[T]) -> &[T] {
    if lines.len() <= HEADER_LINES + FOOTER_LINES {
        return &[];
    }
    &lines[HEADER_LINES..lines.len() - FOOTER_LINES]
}

/// UTF-8 decodes one raw line, dropping a trailing `\r`. `None` for invalid bytes.
pub fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    Some(text.strip_suffix('\r').unwrap_or(text).to_string())
}

pub fn is_federal(line: &str) -> bool {
    line.contains(FEDERAL_MARKER)
}

/// Removes the first `{...}` span. An unterminated `{` cuts the line there.
pub fn strip_detail_block(line: &str) -> String {
    let Some(open) = line.find('{') else {
        return line.to_string();
    };
    match line[open..].find('}') {
        Some(rel_close) => {
            let close = open + rel_close;
            let mut out = String::with_capacity(line.len());
            out.push_str(&line[..open]);
            out.push_str(&line[close + 1..]);
            out
        }
        None => line[..open].to_string(),
    }
}

/// Collapses duplicate lines, keeping the first occurrence's position.
pub fn dedup(lines: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(lines.len());
    lines
        .into_iter()
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

/// Trims the line and splits it on tabs, discarding empty fields.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.trim().split('\t').filter(|t| !t.is_empty()).collect()
}

fn year_regex() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"\((\d{4})\)").unwrap())
}

/// First parenthesised four-digit year in `title`, without the parentheses.
pub fn parse_year(title: &str) -> Option<&str> {
    year_regex()
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Keeps the last three comma-separated segments of a location field.
pub fn region_of(location: &str) -> String {
    let parts: Vec<&str> = location.split(',').collect();
    let start = parts.len().saturating_sub(REGION_SEGMENTS);
    parts[start..].join(",")
}

/// Builds a record from one cleaned line, or `None` when the line is malformed.
pub fn parse_record(line: &str) -> Option<FilmRecord> {
    let tokens = tokenize(line);
    let title = *tokens.first()?;
    let Some(year) = parse_year(title) else {
        debug!("Skipping line without year marker — line={:?}", line);
        return None;
    };
    let Some(location) = tokens.get(1) else {
        debug!("Skipping line without location — line={:?}", line);
        return None;
    };

    let region = region_of(location);
    if region.trim().is_empty() {
        return None;
    }

    Some(FilmRecord {
        title: title.to_string(),
        year: year.to_string(),
        region,
    })
}
