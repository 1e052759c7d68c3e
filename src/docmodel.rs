//! Paragraph/run model for rich documents.
//!
//! The pipeline reads and writes paragraph-structured documents as JSON:
//! a document is an ordered list of paragraphs, each with an optional
//! paragraph style and a list of character runs carrying bold/color flags.
//! Emphasis is plain span data carried through every stage; only the final
//! render turns it back into formatting. Conversion to and from external
//! word-processor formats is an outside collaborator.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DOC_SCHEMA_VERSION: u32 = 1;

/// Emphasis color for protocol/treatment labels.
pub const COLOR_RED: &str = "FF0000";
/// Color for top-level category headers.
pub const COLOR_GREEN: &str = "00B050";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichDocument {
    pub schema_version: u32,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParagraphStyle>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

/// Named style plus the indentation fields the injector must preserve.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParagraphStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Left indent in inches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<f32>,
    /// Hanging first line (wraps align under the record title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hanging: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            color: None,
        }
    }

    pub fn is_red(&self) -> bool {
        self.color
            .as_deref()
            .is_some_and(|color| color.eq_ignore_ascii_case(COLOR_RED))
    }
}

impl Paragraph {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            style: None,
            runs: vec![Run::plain(text)],
        }
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Lower-cased, whitespace-collapsed text for anchor comparison.
    pub fn normalized_text(&self) -> String {
        crate::util::collapse_ws(&self.text().to_lowercase())
    }

    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }

    /// Concatenated text of red runs; the emphasized label span, if any.
    pub fn red_text(&self) -> String {
        self.runs
            .iter()
            .filter(|run| run.is_red())
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Heading depth from the paragraph style: `Heading1` -> 0, `Heading 2`
    /// -> 1, and so on.
    pub fn heading_depth(&self) -> Option<usize> {
        let name = self.style.as_ref()?.name.as_deref()?;
        let rest = name
            .strip_prefix("Heading")
            .or_else(|| name.strip_prefix("heading"))?;
        let level: usize = rest.trim().parse().ok()?;
        level.checked_sub(1)
    }
}

impl RichDocument {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            schema_version: DOC_SCHEMA_VERSION,
            paragraphs,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("read document {}", path.display()))?;
        let doc: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse document {}", path.display()))?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self).context("serialize document")?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Style name for a category header paragraph at the given path depth.
pub fn heading_style(depth: usize) -> ParagraphStyle {
    ParagraphStyle {
        name: Some(format!("Heading{}", depth + 1)),
        indent: None,
        hanging: None,
    }
}
