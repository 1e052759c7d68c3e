//! End-to-end pipeline: extract, classify, assemble, merge, inject.
//!
//! Single-threaded and synchronous. Every intermediate artifact is staged
//! under the output directory before the final document is published, and
//! the final write is atomic, so a failed run never leaves the output path
//! half-written.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::assemble::{render_document, render_text};
use crate::audit::{render_audit, RunSummary};
use crate::config::RunConfig;
use crate::docmodel::RichDocument;
use crate::error::{ParseWarning, StageError};
use crate::extract::{extract_from_document, render_unsorted, ExtractedStudies};
use crate::inject::{inject, write_document_atomic};
use crate::matcher::classify;
use crate::merge::{merge_with_red_master, MergeOutcome, RedLabelIndex};
use crate::taxonomy::MasterTaxonomy;

/// Input and output locations for one run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Host CV document (rich-document JSON).
    pub cv: PathBuf,
    /// Master taxonomy, plain delimited text.
    pub master: PathBuf,
    /// Optional red-label master document.
    pub red_master: Option<PathBuf>,
    /// Directory for staged artifacts.
    pub out_dir: PathBuf,
    /// Final updated CV document.
    pub output: PathBuf,
}

pub fn run(paths: &RunPaths, cfg: &RunConfig) -> Result<RunSummary> {
    let mut summary = RunSummary::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();

    let host = RichDocument::load(&paths.cv)?;
    let extraction = extract_from_document(&host, &cfg.section_start, &cfg.section_end)?;
    warnings.extend(extraction.warnings.iter().cloned());
    summary.extracted = match &extraction.studies {
        ExtractedStudies::Records(records) => records.len(),
        ExtractedStudies::BaselineYear(_) => 0,
    };

    fs::create_dir_all(&paths.out_dir)
        .map_err(|err| StageError::io(&paths.out_dir, err))?;
    stage_artifact(
        &paths.out_dir.join("unsorted.txt"),
        render_extracted(&extraction.studies).into_bytes(),
    )?;

    let master_text =
        fs::read_to_string(&paths.master).map_err(|err| StageError::io(&paths.master, err))?;
    let (master, master_warnings) = MasterTaxonomy::parse(&master_text, "master");
    warnings.extend(master_warnings);

    let classified = classify(&master, &extraction.studies, cfg);
    summary.tally_matches(&classified.audit);

    let mut sorted = classified.taxonomy;
    sorted.sort_records();
    summary.sorted = sorted.record_count();

    stage_artifact(
        &paths.out_dir.join("sorted.txt"),
        render_text(&sorted, cfg).into_bytes(),
    )?;
    stage_artifact(
        &paths.out_dir.join("sorted.doc.json"),
        render_document(&sorted, &RedLabelIndex::default(), cfg).to_json()?,
    )?;

    let mut red_index = RedLabelIndex::default();
    if let Some(red_path) = &paths.red_master {
        match apply_red_master(&sorted, red_path) {
            Ok(outcome) => {
                sorted = outcome.taxonomy;
                red_index = outcome.red_index;
                summary.inserted_from_red_master = outcome.inserted;
                warnings.extend(outcome.warnings);
                stage_artifact(
                    &paths.out_dir.join("merged.doc.json"),
                    render_document(&sorted, &red_index, cfg).to_json()?,
                )?;
            }
            Err(StageError::Merge { message }) => {
                tracing::warn!(%message, "red master unusable, continuing without merge");
                summary.merge_degraded = true;
                // a merged artifact from an earlier run must not outlive
                // the merge that produced it
                let stale = paths.out_dir.join("merged.doc.json");
                if stale.exists() {
                    fs::remove_file(&stale).map_err(|err| StageError::io(&stale, err))?;
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    let block = render_document(&sorted, &red_index, cfg);
    let updated = inject(&host, &block.paragraphs, &cfg.section_start, &cfg.section_end)?;

    summary.warnings = warnings.len();
    stage_artifact(
        &paths.out_dir.join("audit.txt"),
        render_audit(&classified.audit, &warnings).into_bytes(),
    )?;
    stage_artifact(&paths.out_dir.join("summary.json"), summary.to_json()?)?;

    write_document_atomic(&updated, &paths.output)?;
    tracing::info!(
        extracted = summary.extracted,
        matched = summary.matched,
        unmatched = summary.unmatched,
        output = %paths.output.display(),
        "run complete"
    );
    Ok(summary)
}

/// Plain-text form of the extraction stage output.
pub fn render_extracted(studies: &ExtractedStudies) -> String {
    match studies {
        ExtractedStudies::Records(records) => render_unsorted(records),
        ExtractedStudies::BaselineYear(year) => format!("{year}\n"),
    }
}

fn apply_red_master(
    sorted: &MasterTaxonomy,
    red_path: &Path,
) -> Result<MergeOutcome, StageError> {
    let red_doc = RichDocument::load(red_path)
        .map_err(|err| StageError::merge(format!("{err:#}")))?;
    merge_with_red_master(sorted, &red_doc)
}

fn stage_artifact(path: &Path, bytes: Vec<u8>) -> Result<(), StageError> {
    fs::write(path, bytes).map_err(|err| StageError::io(path, err))
}
