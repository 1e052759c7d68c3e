//! Stage 1: record extraction from plain text and rich documents.
//!
//! Rich extraction scans paragraphs strictly between the section heading
//! and the disclaimer sentence. A paragraph opening with a year starts a
//! record; following non-blank paragraphs fold into it as continuations;
//! blank and heading-styled paragraphs close it. Red character runs mark
//! the record's label as emphasized.

use crate::docmodel::{Paragraph, RichDocument};
use crate::error::{ParseWarning, StageError};
use crate::record::{bare_year, parse_record_line, starts_with_year, StudyRecord};
use crate::util::collapse_ws;

/// What the extractor found between the anchors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedStudies {
    Records(Vec<StudyRecord>),
    /// No records, only a bare year under the heading: the CV has no
    /// studies yet, and the classifier auto-populates everything newer.
    BaselineYear(i32),
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub studies: ExtractedStudies,
    pub warnings: Vec<ParseWarning>,
}

/// Locate the anchor span: the first paragraph whose text contains the
/// start marker, then the first later paragraph equal to the end marker.
/// Comparison is case-insensitive over collapsed whitespace.
pub fn section_bounds(
    paragraphs: &[Paragraph],
    start: &str,
    end: &str,
) -> Result<(usize, usize), String> {
    let start_norm = collapse_ws(&start.to_lowercase());
    let end_norm = collapse_ws(&end.to_lowercase());

    let start_idx = paragraphs
        .iter()
        .position(|para| para.normalized_text().contains(&start_norm))
        .ok_or_else(|| format!("section start {:?} not found", start))?;

    let end_idx = paragraphs
        .iter()
        .enumerate()
        .skip(start_idx + 1)
        .find(|(_, para)| para.normalized_text() == end_norm)
        .map(|(idx, _)| idx)
        .ok_or_else(|| "section end (disclaimer sentence) not found after heading".to_string())?;

    Ok((start_idx, end_idx))
}

/// Extract records from the section of a host document.
pub fn extract_from_document(
    doc: &RichDocument,
    section_start: &str,
    section_end: &str,
) -> Result<Extraction, StageError> {
    let (start_idx, end_idx) = section_bounds(&doc.paragraphs, section_start, section_end)
        .map_err(StageError::extraction)?;

    let mut records: Vec<StudyRecord> = Vec::new();
    let mut warnings = Vec::new();
    let mut baseline_years: Vec<(usize, i32)> = Vec::new();
    let mut current: Option<(usize, String, bool)> = None;

    let flush = |current: &mut Option<(usize, String, bool)>,
                 records: &mut Vec<StudyRecord>,
                 warnings: &mut Vec<ParseWarning>,
                 baseline_years: &mut Vec<(usize, i32)>| {
        let Some((line, text, emphasized)) = current.take() else {
            return;
        };
        if let Some(year) = bare_year(&text) {
            baseline_years.push((line, year));
            return;
        }
        match parse_record_line(&text) {
            Some(mut record) => {
                record.emphasized = emphasized;
                record.source_rank = records.len();
                records.push(record);
            }
            None => warnings.push(ParseWarning::new(
                "cv",
                line,
                format!("malformed study block: {:?}", collapse_ws(&text)),
            )),
        }
    };

    for (offset, para) in doc.paragraphs[start_idx + 1..end_idx].iter().enumerate() {
        let line = start_idx + 2 + offset;
        let text = para.text();
        if text.trim().is_empty() {
            flush(&mut current, &mut records, &mut warnings, &mut baseline_years);
            continue;
        }
        // category headers close the open record and carry no study text
        if para.heading_depth().is_some() {
            flush(&mut current, &mut records, &mut warnings, &mut baseline_years);
            continue;
        }
        if starts_with_year(text.trim_start()) {
            flush(&mut current, &mut records, &mut warnings, &mut baseline_years);
            current = Some((line, text.trim().to_string(), !para.red_text().is_empty()));
            continue;
        }
        match current.as_mut() {
            Some((_, block, emphasized)) => {
                block.push(' ');
                block.push_str(text.trim());
                *emphasized = *emphasized || !para.red_text().is_empty();
            }
            None => warnings.push(ParseWarning::new(
                "cv",
                line,
                format!("paragraph outside any record skipped: {:?}", collapse_ws(&text)),
            )),
        }
    }
    flush(&mut current, &mut records, &mut warnings, &mut baseline_years);

    let studies = if records.is_empty() && baseline_years.len() == 1 {
        ExtractedStudies::BaselineYear(baseline_years[0].1)
    } else {
        for (line, year) in baseline_years {
            warnings.push(ParseWarning::new(
                "cv",
                line,
                format!("bare year {} skipped", year),
            ));
        }
        ExtractedStudies::Records(records)
    };

    Ok(Extraction { studies, warnings })
}

/// Extract records from the plain delimited format: one record per
/// non-blank line, blank lines ignored, malformed lines reported.
pub fn extract_from_text(text: &str, source: &str) -> (Vec<StudyRecord>, Vec<ParseWarning>) {
    let mut records: Vec<StudyRecord> = Vec::new();
    let mut warnings = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record_line(line) {
            Some(mut record) => {
                record.source_rank = records.len();
                records.push(record);
            }
            None => warnings.push(ParseWarning::new(
                source,
                idx + 1,
                format!("malformed record line: {:?}", collapse_ws(line)),
            )),
        }
    }
    (records, warnings)
}

/// Parse a staged unsorted file. A file holding exactly one non-blank
/// line with a bare year carries the baseline signal; anything else goes
/// through the line grammar.
pub fn parse_unsorted(text: &str, source: &str) -> (ExtractedStudies, Vec<ParseWarning>) {
    let mut non_blank = text.lines().filter(|line| !line.trim().is_empty());
    if let (Some(first), None) = (non_blank.next(), non_blank.next()) {
        if let Some(year) = bare_year(first.trim()) {
            return (ExtractedStudies::BaselineYear(year), Vec::new());
        }
    }
    let (records, warnings) = extract_from_text(text, source);
    (ExtractedStudies::Records(records), warnings)
}

/// Serialize records back into the plain delimited format.
pub fn render_unsorted(records: &[StudyRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.render_line());
        out.push('\n');
    }
    out
}
