//! Run artifacts: the human-readable match audit and the JSON summary.
//!
//! Both are fully determined by the inputs. The summary carries no
//! timestamps so reruns over unchanged inputs stay byte-identical.

use serde::{Deserialize, Serialize};

use crate::error::ParseWarning;
use crate::matcher::{MatchDecision, MatchResult};

pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// One audit line per classified record, in input order, with every
/// parse warning enumerated after.
pub fn render_audit(results: &[MatchResult], warnings: &[ParseWarning]) -> String {
    let mut out = String::new();
    for result in results {
        match result.decision {
            MatchDecision::Matched => {
                let path = result
                    .matched_path
                    .as_deref()
                    .unwrap_or_default()
                    .join(" / ");
                out.push_str(&format!(
                    "{} -> {} score={:.3}\n",
                    result.excerpt, path, result.score
                ));
            }
            MatchDecision::Unmatched => {
                out.push_str(&format!(
                    "{} -> UNMATCHED score={:.3}\n",
                    result.excerpt, result.score
                ));
            }
        }
    }
    if !warnings.is_empty() {
        out.push('\n');
        for warning in warnings {
            out.push_str(&format!("warning: {}\n", warning));
        }
    }
    out
}

/// Machine-readable account of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub extracted: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub sorted: usize,
    pub inserted_from_red_master: usize,
    pub warnings: usize,
    pub merge_degraded: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        RunSummary {
            schema_version: SUMMARY_SCHEMA_VERSION,
            extracted: 0,
            matched: 0,
            unmatched: 0,
            sorted: 0,
            inserted_from_red_master: 0,
            warnings: 0,
            merge_degraded: false,
        }
    }

    pub fn tally_matches(&mut self, results: &[MatchResult]) {
        for result in results {
            match result.decision {
                MatchDecision::Matched => self.matched += 1,
                MatchDecision::Unmatched => self.unmatched += 1,
            }
        }
    }

    pub fn to_json(&self) -> anyhow::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
