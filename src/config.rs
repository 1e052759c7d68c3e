//! Immutable per-run configuration.
//!
//! Supplied by the CLI layer and treated as read-only by every stage; the
//! core performs no prompting of its own.

use clap::ValueEnum;

pub const DEFAULT_THRESHOLD: f64 = 0.80;
pub const DEFAULT_DOC_INDENT: f32 = 0.5;

/// Heading that opens the studies section of a host document.
pub const DEFAULT_SECTION_START: &str = "Research Experience";
/// Fixed disclaimer sentence that terminates the studies section.
pub const DEFAULT_SECTION_END: &str = "By signing this form, I confirm that the information \
provided is accurate and reflects my current qualifications.";

/// Policy for breaking ties between master records with equal similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TieBreak {
    /// Shallower category path first, then lower source rank.
    DepthThenRank,
    /// Lower source rank only.
    RankOnly,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Inclusive lower bound for a fuzzy match.
    pub threshold: f64,
    pub tie_break: TieBreak,
    /// Render protocol/treatment labels in bold.
    pub emphasis: bool,
    /// Spaces prepended to record lines in the plain-text render.
    pub indent_size: usize,
    /// Hanging indent, in inches, for record paragraphs in the rich render.
    pub doc_indent: f32,
    pub section_start: String,
    pub section_end: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            tie_break: TieBreak::DepthThenRank,
            emphasis: true,
            indent_size: 0,
            doc_indent: DEFAULT_DOC_INDENT,
            section_start: DEFAULT_SECTION_START.to_string(),
            section_end: DEFAULT_SECTION_END.to_string(),
        }
    }
}
