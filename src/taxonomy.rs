//! Master taxonomy: ordered categories and the plain master grammar.
//!
//! Category order is fixed by first appearance in the master source and is
//! the canonical output order; it is never re-derived from content. Header
//! lines (anything not matching the record grammar) open categories, with
//! nesting depth given by leading TAB characters. The assembler emits the
//! same convention, which keeps re-extraction idempotent.

use crate::docmodel::RichDocument;
use crate::error::ParseWarning;
use crate::record::{parse_record_line, starts_with_year, StudyRecord};
use crate::util::collapse_ws;

/// Synthetic category holding records that fail to match above threshold.
pub const UNCLASSIFIED: &str = "Unclassified";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub path: Vec<String>,
    pub records: Vec<StudyRecord>,
}

/// Ordered mapping from category path to records, years descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterTaxonomy {
    categories: Vec<Category>,
}

impl MasterTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the plain master format. Malformed record lines are skipped
    /// and reported; they never abort the parse.
    pub fn parse(text: &str, source: &str) -> (Self, Vec<ParseWarning>) {
        let mut taxonomy = Self::new();
        let mut warnings = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut rank = 0usize;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            if line.trim().is_empty() {
                continue;
            }

            if starts_with_year(line.trim_start()) {
                match parse_record_line(line) {
                    Some(mut record) => {
                        if path.is_empty() {
                            path.push(UNCLASSIFIED.to_string());
                        }
                        record.category_path = path.clone();
                        record.source_rank = rank;
                        rank += 1;
                        taxonomy.upsert_record(record);
                    }
                    None => warnings.push(ParseWarning::new(
                        source,
                        idx + 1,
                        format!("malformed record line: {:?}", collapse_ws(line)),
                    )),
                }
                continue;
            }

            // Header line: leading tabs give the nesting depth.
            let depth = raw.chars().take_while(|ch| *ch == '\t').count();
            let name = line.trim().trim_end_matches(':').trim();
            if name.is_empty() {
                continue;
            }
            let depth = depth.min(path.len());
            path.truncate(depth);
            path.push(collapse_ws(name));
            taxonomy.ensure_category(&path);
        }

        (taxonomy, warnings)
    }

    /// Read a taxonomy back out of a rendered rich document. Headers are
    /// recognized by their `HeadingN` style; a styleless non-record
    /// paragraph falls back to a nested category under the current
    /// top-level header, matching how hand-edited documents tend to look.
    pub fn from_document(doc: &RichDocument, source: &str) -> (Self, Vec<ParseWarning>) {
        let mut taxonomy = Self::new();
        let mut warnings = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut rank = 0usize;

        for (idx, para) in doc.paragraphs.iter().enumerate() {
            let text = para.text();
            if text.trim().is_empty() {
                continue;
            }

            if starts_with_year(text.trim_start()) {
                match parse_record_line(&text) {
                    Some(mut record) => {
                        if path.is_empty() {
                            path.push(UNCLASSIFIED.to_string());
                        }
                        record.category_path = path.clone();
                        record.source_rank = rank;
                        record.emphasized = !para.red_text().is_empty();
                        rank += 1;
                        taxonomy.upsert_record(record);
                    }
                    None => warnings.push(ParseWarning::new(
                        source,
                        idx + 1,
                        format!("malformed record paragraph: {:?}", collapse_ws(&text)),
                    )),
                }
                continue;
            }

            let name = text.trim().trim_end_matches(':').trim().to_string();
            if name.is_empty() {
                continue;
            }
            let depth = para
                .heading_depth()
                .unwrap_or_else(|| usize::from(!path.is_empty()));
            let depth = depth.min(path.len());
            path.truncate(depth);
            path.push(collapse_ws(&name));
            taxonomy.ensure_category(&path);
        }

        (taxonomy, warnings)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|cat| cat.records.is_empty())
    }

    pub fn category(&self, path: &[String]) -> Option<&Category> {
        self.categories.iter().find(|cat| cat.path == path)
    }

    /// Category order of self with no records; the classifier fills it in.
    pub fn skeleton(&self) -> Self {
        Self {
            categories: self
                .categories
                .iter()
                .map(|cat| Category {
                    path: cat.path.clone(),
                    records: Vec::new(),
                })
                .collect(),
        }
    }

    /// All records in taxonomy order.
    pub fn iter_records(&self) -> impl Iterator<Item = &StudyRecord> {
        self.categories.iter().flat_map(|cat| cat.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.categories.iter().map(|cat| cat.records.len()).sum()
    }

    pub fn max_year(&self, path: &[String]) -> Option<i32> {
        self.category(path)?
            .records
            .iter()
            .map(|record| record.year)
            .max()
    }

    /// Find or append the category for `path`, creating parents as needed
    /// so a deep first appearance still yields a well-formed hierarchy.
    pub fn ensure_category(&mut self, path: &[String]) -> &mut Category {
        for depth in 1..path.len() {
            if self.category(&path[..depth]).is_none() {
                self.categories.push(Category {
                    path: path[..depth].to_vec(),
                    records: Vec::new(),
                });
            }
        }
        if let Some(idx) = self.categories.iter().position(|cat| cat.path == path) {
            return &mut self.categories[idx];
        }
        self.categories.push(Category {
            path: path.to_vec(),
            records: Vec::new(),
        });
        self.categories.last_mut().expect("category just appended")
    }

    /// Insert or replace by `(year, normalized text)` identity within the
    /// record's category. Last seen wins.
    pub fn upsert_record(&mut self, record: StudyRecord) {
        let path = record.category_path.clone();
        let identity = record.identity();
        let category = self.ensure_category(&path);
        if let Some(existing) = category
            .records
            .iter_mut()
            .find(|candidate| candidate.identity() == identity)
        {
            *existing = record;
        } else {
            category.records.push(record);
        }
    }

    /// Insert keeping descending-year order: after every record with an
    /// equal or greater year, before the first strictly older one.
    pub fn insert_sorted(&mut self, record: StudyRecord) {
        let path = record.category_path.clone();
        let category = self.ensure_category(&path);
        let position = category
            .records
            .iter()
            .position(|existing| existing.year < record.year)
            .unwrap_or(category.records.len());
        category.records.insert(position, record);
    }

    /// Sort every category: year descending, source rank ascending.
    pub fn sort_records(&mut self) {
        for category in &mut self.categories {
            category.records.sort_by(|a, b| {
                b.year
                    .cmp(&a.year)
                    .then(a.source_rank.cmp(&b.source_rank))
            });
        }
    }
}
