//! Stage error taxonomy for the reconciliation pipeline.
//!
//! Fatal conditions (missing anchors) abort a run with no partial write of
//! the final document. Recoverable conditions are carried as data: a
//! malformed record becomes a [`ParseWarning`], an unreadable red master
//! degrades the merge. Nothing is silently swallowed; every skipped record
//! surfaces in the audit report.

use std::fmt;
use std::path::PathBuf;

/// Errors raised by individual pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Section anchors could not be located while reading a source
    /// document. Fatal: nothing downstream can proceed without anchors.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// The red-label master could not be parsed. Recoverable: the pipeline
    /// degrades to the un-merged sorted output.
    #[error("merge error: {message}")]
    Merge { message: String },

    /// Section anchors are missing in the host document. Fatal: the
    /// injector never guesses a fallback location.
    #[error("injection error: {message}")]
    Injection { message: String },

    /// Filesystem failure while reading or writing an artifact.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StageError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    pub fn merge(msg: impl Into<String>) -> Self {
        Self::Merge {
            message: msg.into(),
        }
    }

    pub fn injection(msg: impl Into<String>) -> Self {
        Self::Injection {
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A single malformed record, skipped and reported rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Short name of the source the line came from (file stem or stage).
    pub source: String,
    /// One-based line or paragraph index within the source.
    pub line: usize,
    pub message: String,
}

impl ParseWarning {
    pub fn new(source: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.line, self.message)
    }
}
