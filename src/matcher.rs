//! Stage 2: fuzzy classification against the master taxonomy.
//!
//! Each unsorted record is scored against every master record, year
//! independent. The similarity is a weighted blend of edit-distance
//! similarity and token-set overlap over the normalized description; it
//! is symmetric and deterministic. The best candidate at or above the
//! threshold wins and contributes its canonical text and category path.

use std::collections::HashSet;

use crate::config::{RunConfig, TieBreak};
use crate::extract::ExtractedStudies;
use crate::record::StudyRecord;
use crate::taxonomy::{MasterTaxonomy, UNCLASSIFIED};
use crate::util::truncate_string;

const EXCERPT_MAX_BYTES: usize = 64;

const SEQUENCE_WEIGHT: f64 = 0.7;
const TOKEN_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    Matched,
    Unmatched,
}

/// One classification outcome, immutable once appended to the audit trail.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub excerpt: String,
    pub matched_path: Option<Vec<String>>,
    pub matched_excerpt: Option<String>,
    pub score: f64,
    pub decision: MatchDecision,
}

#[derive(Debug, Clone)]
pub struct Classified {
    pub taxonomy: MasterTaxonomy,
    pub audit: Vec<MatchResult>,
}

/// Blend of edit-distance similarity and token Jaccard overlap. The edit
/// distance is normalized over the summed lengths so that one text
/// containing the other still scores high.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let total = (a.chars().count() + b.chars().count()) as f64;
    let sequence = 1.0 - strsim::levenshtein(a, b) as f64 / total;
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    let union = tokens_a.union(&tokens_b).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        tokens_a.intersection(&tokens_b).count() as f64 / union as f64
    };
    SEQUENCE_WEIGHT * sequence + TOKEN_WEIGHT * jaccard
}

/// Classify every unsorted record into the master's category order. A
/// baseline-year signal expands into all master records newer than the
/// baseline, so a CV without studies auto-populates.
pub fn classify(
    master: &MasterTaxonomy,
    extracted: &ExtractedStudies,
    cfg: &RunConfig,
) -> Classified {
    let unsorted: Vec<StudyRecord> = match extracted {
        ExtractedStudies::Records(records) => records.clone(),
        ExtractedStudies::BaselineYear(baseline) => {
            let populated: Vec<StudyRecord> = master
                .iter_records()
                .filter(|record| record.year > *baseline)
                .cloned()
                .collect();
            tracing::info!(
                baseline,
                count = populated.len(),
                "auto-populating from baseline year"
            );
            populated
        }
    };

    let candidates: Vec<&StudyRecord> = master.iter_records().collect();
    let mut taxonomy = master.skeleton();
    let mut audit = Vec::with_capacity(unsorted.len());

    for record in &unsorted {
        let normalized = record.normalized_text();
        let excerpt = truncate_string(&record.match_text(), EXCERPT_MAX_BYTES);

        let mut best: Option<(f64, &StudyRecord)> = None;
        for candidate in &candidates {
            let score = similarity(&normalized, &candidate.normalized_text());
            let better = match best {
                None => true,
                Some((best_score, incumbent)) => {
                    score > best_score
                        || (score == best_score
                            && tie_break_prefers(cfg.tie_break, candidate, incumbent))
                }
            };
            if better {
                best = Some((score, candidate));
            }
        }

        match best {
            Some((score, matched)) if score >= cfg.threshold => {
                let mut canonical = matched.clone();
                canonical.emphasized = canonical.emphasized || record.emphasized;
                taxonomy.upsert_record(canonical);
                audit.push(MatchResult {
                    excerpt,
                    matched_path: Some(matched.category_path.clone()),
                    matched_excerpt: Some(truncate_string(
                        &matched.match_text(),
                        EXCERPT_MAX_BYTES,
                    )),
                    score,
                    decision: MatchDecision::Matched,
                });
            }
            best => {
                let score = best.map(|(score, _)| score).unwrap_or(0.0);
                let mut unmatched = record.clone();
                unmatched.category_path = vec![UNCLASSIFIED.to_string()];
                taxonomy.upsert_record(unmatched);
                audit.push(MatchResult {
                    excerpt,
                    matched_path: None,
                    matched_excerpt: None,
                    score,
                    decision: MatchDecision::Unmatched,
                });
            }
        }
    }

    Classified { taxonomy, audit }
}

fn tie_break_prefers(policy: TieBreak, challenger: &StudyRecord, incumbent: &StudyRecord) -> bool {
    match policy {
        TieBreak::DepthThenRank => (challenger.category_path.len(), challenger.source_rank)
            < (incumbent.category_path.len(), incumbent.source_rank),
        TieBreak::RankOnly => challenger.source_rank < incumbent.source_rank,
    }
}
