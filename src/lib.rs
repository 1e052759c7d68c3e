//! Study-record reconciliation pipeline for clinical CVs.
//!
//! Five synchronous stages: extract records from the anchored section of a
//! host document, classify them against a master taxonomy with fuzzy
//! matching, assemble a sorted rendering, merge a red-label master's
//! emphasized additions, and inject the result back between the anchors.

pub mod assemble;
pub mod audit;
pub mod cli;
pub mod config;
pub mod docmodel;
pub mod error;
pub mod extract;
pub mod inject;
pub mod matcher;
pub mod merge;
pub mod pipeline;
pub mod record;
pub mod taxonomy;
pub mod util;
