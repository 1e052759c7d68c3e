//! CLI argument parsing for the study-record pipeline.
//!
//! The CLI is intentionally thin: it builds a `RunConfig` and file paths,
//! then hands off to the stage functions, so the same core logic can be
//! driven without a terminal.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_SECTION_END, DEFAULT_SECTION_START, DEFAULT_THRESHOLD, TieBreak};

/// Root CLI entrypoint for the reconciliation pipeline.
///
/// Keeping a single `RootArgs` type makes command routing obvious and avoids
/// hidden defaults in subcommand constructors.
#[derive(Parser, Debug)]
#[command(
    name = "studysort",
    version,
    about = "Reconcile, sort, and re-inject the study list of a clinical CV",
    after_help = "Commands:\n  extract --cv <doc.json> --out <txt>        Pull study records out of the CV section\n  sort --master <txt> --unsorted <txt>       Classify against the master and sort\n  merge --sorted <doc.json> --red-master <doc.json>  Fold in red-label master additions\n  inject --cv <doc.json> --studies <doc>     Replace the CV section with a studies doc\n  run --cv <doc.json> --master <txt>         Full pipeline with staged artifacts\n\nExamples:\n  studysort extract --cv cv.doc.json --out unsorted.txt\n  studysort sort --master master.txt --unsorted unsorted.txt --out-dir work/\n  studysort run --cv cv.doc.json --master master.txt --red-master red.doc.json \\\n      --out-dir work/ --output cv.updated.doc.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline stages exposed as commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Extract(ExtractArgs),
    Sort(SortArgs),
    Merge(MergeArgs),
    Inject(InjectArgs),
    Run(RunArgs),
}

/// Stage 1: host document to unsorted records text.
#[derive(Parser, Debug)]
#[command(about = "Extract study records from the anchored CV section")]
pub struct ExtractArgs {
    /// Host CV document (rich-document JSON)
    #[arg(long, value_name = "FILE")]
    pub cv: PathBuf,

    /// Output path for the unsorted records text
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    #[command(flatten)]
    pub anchors: AnchorArgs,
}

/// Stages 2+3: classify unsorted records and render the sorted forms.
#[derive(Parser, Debug)]
#[command(about = "Classify records against the master taxonomy and sort")]
pub struct SortArgs {
    /// Master taxonomy, plain delimited text
    #[arg(long, value_name = "FILE")]
    pub master: PathBuf,

    /// Unsorted records text (output of extract)
    #[arg(long, value_name = "FILE")]
    pub unsorted: PathBuf,

    /// Directory for sorted.txt, sorted.doc.json, and audit.txt
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Stage 4: fold a red-label master into a sorted studies document.
#[derive(Parser, Debug)]
#[command(about = "Merge red-label master additions into a sorted document")]
pub struct MergeArgs {
    /// Sorted studies document (rich-document JSON)
    #[arg(long, value_name = "FILE")]
    pub sorted: PathBuf,

    /// Red-label master document (rich-document JSON)
    #[arg(long, value_name = "FILE")]
    pub red_master: PathBuf,

    /// Output path for the merged document
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,
}

/// Stage 5: replace the CV section with a studies document.
#[derive(Parser, Debug)]
#[command(about = "Inject a studies document between the CV anchors")]
pub struct InjectArgs {
    /// Host CV document (rich-document JSON)
    #[arg(long, value_name = "FILE")]
    pub cv: PathBuf,

    /// Studies document whose paragraphs replace the section
    #[arg(long, value_name = "FILE")]
    pub studies: PathBuf,

    /// Output path for the updated CV document
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    #[command(flatten)]
    pub anchors: AnchorArgs,
}

/// Full pipeline with staged artifacts and an atomic final write.
#[derive(Parser, Debug)]
#[command(about = "Run the full pipeline end to end")]
pub struct RunArgs {
    /// Host CV document (rich-document JSON)
    #[arg(long, value_name = "FILE")]
    pub cv: PathBuf,

    /// Master taxonomy, plain delimited text
    #[arg(long, value_name = "FILE")]
    pub master: PathBuf,

    /// Optional red-label master document
    #[arg(long, value_name = "FILE")]
    pub red_master: Option<PathBuf>,

    /// Directory for staged artifacts
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Output path for the updated CV document
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    #[command(flatten)]
    pub anchors: AnchorArgs,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Section anchor overrides, shared by the stages that scan a host CV.
#[derive(Parser, Debug)]
pub struct AnchorArgs {
    /// Heading that opens the studies section
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_SECTION_START)]
    pub section_start: String,

    /// Disclaimer sentence that terminates the studies section
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_SECTION_END)]
    pub section_end: String,
}

/// Matching and rendering knobs, shared by sort and run.
#[derive(Parser, Debug)]
pub struct TuningArgs {
    /// Inclusive similarity threshold for a fuzzy match
    #[arg(long, value_name = "SCORE", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Policy for breaking equal-similarity ties
    #[arg(long, value_enum, default_value = "depth-then-rank")]
    pub tie_break: TieBreak,

    /// Render protocol labels without bold emphasis
    #[arg(long)]
    pub no_emphasis: bool,

    /// Spaces prepended to record lines in the plain-text render
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub indent: usize,
}
