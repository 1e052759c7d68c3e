//! Study records and the shared record-line grammar.
//!
//! One record per line: `YEAR <TAB> LABEL ":" SP DESCRIPTION`. The label is
//! the protocol/treatment span before the first colon and may carry the
//! emphasis (red) rendering flag. Matching and duplicate detection use a
//! normalized form of the text after the year.

use crate::util::collapse_ws;
use regex::Regex;

/// A single study entry with year, label, description, and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyRecord {
    pub year: i32,
    /// Protocol/treatment span before the first colon, if present.
    pub label: Option<String>,
    /// Whether the label renders in the emphasis color.
    pub emphasized: bool,
    /// Free text after the label.
    pub description: String,
    /// Category path in the master taxonomy; empty while unclassified.
    pub category_path: Vec<String>,
    /// Stable insertion index from the record's origin, used as a tie-break.
    pub source_rank: usize,
}

impl StudyRecord {
    pub fn new(year: i32, label: Option<String>, description: String) -> Self {
        Self {
            year,
            label,
            emphasized: false,
            description,
            category_path: Vec::new(),
            source_rank: 0,
        }
    }

    /// Render back into the plain-text record grammar.
    pub fn render_line(&self) -> String {
        match &self.label {
            Some(label) if self.description.is_empty() => format!("{}\t{}:", self.year, label),
            Some(label) => format!("{}\t{}: {}", self.year, label, self.description),
            None => format!("{}\t{}", self.year, self.description),
        }
    }

    /// Text compared against other records: the description, or the label
    /// when the description is empty. Label spellings vary too much across
    /// sources to take part in similarity or identity.
    pub fn match_text(&self) -> String {
        if self.description.is_empty() {
            self.label.clone().unwrap_or_default()
        } else {
            self.description.clone()
        }
    }

    /// Normalized description used for similarity and identity.
    pub fn normalized_text(&self) -> String {
        normalize_match_text(&self.match_text())
    }

    /// Duplicate-detection key within one category path.
    pub fn identity(&self) -> (i32, String) {
        (self.year, self.normalized_text())
    }
}

fn year_regex() -> Regex {
    Regex::new(r"^\s*(\d{4})\b").expect("regex for leading record year")
}

/// Whether the line opens a record (leading four-digit year).
pub fn starts_with_year(line: &str) -> bool {
    year_regex().is_match(line)
}

/// A line consisting of a bare year and nothing else.
pub fn bare_year(line: &str) -> Option<i32> {
    let trimmed = line.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return trimmed.parse().ok();
    }
    None
}

/// Parse one line of the record grammar. Returns `None` when the line does
/// not open with a year or carries no text after it; the caller reports a
/// parse warning.
pub fn parse_record_line(line: &str) -> Option<StudyRecord> {
    let re = year_regex();
    let caps = re.captures(line)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let rest = line[caps.get(1)?.end()..].trim_start_matches([' ', '\t']);
    let rest = collapse_ws(rest);
    if rest.is_empty() {
        return None;
    }
    let (label, description) = match rest.split_once(':') {
        Some((before, after)) => {
            let label = before.trim();
            let description = after.trim().to_string();
            if label.is_empty() {
                (None, description)
            } else {
                (Some(label.to_string()), description)
            }
        }
        None => (None, rest.clone()),
    };
    if label.is_none() && description.is_empty() {
        return None;
    }
    Some(StudyRecord::new(year, label, description))
}

/// Lower-case, strip blinded protocol placeholders (runs of three or more
/// x's), drop punctuation, and collapse whitespace.
pub fn normalize_match_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let unblinded = strip_blinded_runs(&lowered);
    let cleaned: String = unblinded
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch.is_whitespace() {
                ch
            } else {
                ' '
            }
        })
        .collect();
    collapse_ws(&cleaned)
}

fn strip_blinded_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == 'x' {
            run += 1;
            continue;
        }
        if run > 0 && run < 3 {
            out.push_str(&"x".repeat(run));
        }
        run = 0;
        out.push(ch);
    }
    if run > 0 && run < 3 {
        out.push_str(&"x".repeat(run));
    }
    out
}
