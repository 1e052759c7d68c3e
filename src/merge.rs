//! Stage 4: merge the sorted list with the red-label master.
//!
//! Matching here is exact identity over `(category path, year, normalized
//! text)`, never fuzzy: records were already categorized upstream and
//! this stage only looks for a presence/absence delta. When a record
//! exists on both sides the red master wins outright, so edits to the red
//! master's formatting propagate without re-running the full pipeline.

use std::collections::HashMap;

use crate::docmodel::RichDocument;
use crate::error::{ParseWarning, StageError};
use crate::record::{parse_record_line, starts_with_year, StudyRecord};
use crate::taxonomy::MasterTaxonomy;
use crate::util::collapse_ws;

/// Emphasized label spans from the red master, keyed by record identity.
/// Consulted only to decide which characters render emphasized.
#[derive(Debug, Clone, Default)]
pub struct RedLabelIndex {
    spans: HashMap<(i32, String), String>,
}

impl RedLabelIndex {
    /// Collect the red run text of every record paragraph in a document.
    pub fn from_document(doc: &RichDocument) -> Self {
        let mut index = Self::default();
        for para in &doc.paragraphs {
            let text = para.text();
            if !starts_with_year(text.trim_start()) {
                continue;
            }
            let Some(record) = parse_record_line(&text) else {
                continue;
            };
            let red = collapse_ws(para.red_text().trim_end_matches(':'));
            if !red.is_empty() {
                index.spans.insert(record.identity(), red);
            }
        }
        index
    }

    pub fn contains(&self, record: &StudyRecord) -> bool {
        self.spans.contains_key(&record.identity())
    }

    /// The emphasized span for a record, if the red master marks one.
    pub fn label(&self, record: &StudyRecord) -> Option<&str> {
        self.spans.get(&record.identity()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub taxonomy: MasterTaxonomy,
    pub red_index: RedLabelIndex,
    /// Records newly inserted from the red master.
    pub inserted: usize,
    pub warnings: Vec<ParseWarning>,
}

/// Merge the assembled taxonomy with the red-label master document.
///
/// Every sorted record is kept. A red-master record already present (by
/// identity within its category) replaces the sorted copy; one whose year
/// exceeds the maximum currently in its category is inserted preserving
/// descending-year order. A red master with no recognizable records at
/// all is a [`StageError::Merge`], which callers recover from by keeping
/// the un-merged taxonomy.
pub fn merge_with_red_master(
    sorted: &MasterTaxonomy,
    red_doc: &RichDocument,
) -> Result<MergeOutcome, StageError> {
    let (red_taxonomy, warnings) = MasterTaxonomy::from_document(red_doc, "red-master");
    if red_taxonomy.record_count() == 0 {
        return Err(StageError::merge(
            "red master contains no recognizable study records",
        ));
    }
    let red_index = RedLabelIndex::from_document(red_doc);

    let mut merged = sorted.clone();
    let mut inserted = 0usize;
    for record in red_taxonomy.iter_records() {
        let exists = merged
            .category(&record.category_path)
            .is_some_and(|category| {
                category
                    .records
                    .iter()
                    .any(|existing| existing.identity() == record.identity())
            });
        if exists {
            // Red master wins: replaces in place, position unchanged.
            merged.upsert_record(record.clone());
            continue;
        }
        let newest = merged.max_year(&record.category_path);
        if newest.is_none_or(|max| record.year > max) {
            merged.insert_sorted(record.clone());
            inserted += 1;
        }
    }

    tracing::debug!(inserted, "red-label merge complete");
    Ok(MergeOutcome {
        taxonomy: merged,
        red_index,
        inserted,
        warnings,
    })
}
