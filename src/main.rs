use std::fs;

use anyhow::{Context, Result};
use clap::Parser;

use studysort::assemble::{render_document, render_text};
use studysort::audit::render_audit;
use studysort::cli::{
    Command, ExtractArgs, InjectArgs, MergeArgs, RootArgs, RunArgs, SortArgs, TuningArgs,
};
use studysort::config::RunConfig;
use studysort::docmodel::RichDocument;
use studysort::extract::{extract_from_document, parse_unsorted};
use studysort::inject::{inject, write_document_atomic};
use studysort::matcher::classify;
use studysort::merge::{merge_with_red_master, RedLabelIndex};
use studysort::pipeline::{render_extracted, run, RunPaths};
use studysort::taxonomy::MasterTaxonomy;

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Extract(args) => cmd_extract(args),
        Command::Sort(args) => cmd_sort(args),
        Command::Merge(args) => cmd_merge(args),
        Command::Inject(args) => cmd_inject(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn cmd_extract(args: ExtractArgs) -> Result<()> {
    let host = RichDocument::load(&args.cv)?;
    let extraction =
        extract_from_document(&host, &args.anchors.section_start, &args.anchors.section_end)?;
    for warning in &extraction.warnings {
        tracing::warn!(%warning, "extraction warning");
    }
    fs::write(&args.out, render_extracted(&extraction.studies))
        .with_context(|| format!("write {}", args.out.display()))?;
    Ok(())
}

fn cmd_sort(args: SortArgs) -> Result<()> {
    let cfg = tuning_config(&args.tuning);
    let master_text = fs::read_to_string(&args.master)
        .with_context(|| format!("read {}", args.master.display()))?;
    let (master, mut warnings) = MasterTaxonomy::parse(&master_text, "master");

    let unsorted_text = fs::read_to_string(&args.unsorted)
        .with_context(|| format!("read {}", args.unsorted.display()))?;
    let (studies, unsorted_warnings) = parse_unsorted(&unsorted_text, "unsorted");
    warnings.extend(unsorted_warnings);

    let classified = classify(&master, &studies, &cfg);
    let mut sorted = classified.taxonomy;
    sorted.sort_records();

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create {}", args.out_dir.display()))?;
    let write = |name: &str, bytes: Vec<u8>| -> Result<()> {
        let path = args.out_dir.join(name);
        fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
    };
    write("sorted.txt", render_text(&sorted, &cfg).into_bytes())?;
    write(
        "sorted.doc.json",
        render_document(&sorted, &RedLabelIndex::default(), &cfg).to_json()?,
    )?;
    write(
        "audit.txt",
        render_audit(&classified.audit, &warnings).into_bytes(),
    )?;
    Ok(())
}

fn cmd_merge(args: MergeArgs) -> Result<()> {
    let sorted_doc = RichDocument::load(&args.sorted)?;
    let (sorted, warnings) = MasterTaxonomy::from_document(&sorted_doc, "sorted");
    for warning in &warnings {
        tracing::warn!(%warning, "merge input warning");
    }
    let red_doc = RichDocument::load(&args.red_master)?;
    let outcome = merge_with_red_master(&sorted, &red_doc)?;
    for warning in &outcome.warnings {
        tracing::warn!(%warning, "red master warning");
    }
    let cfg = RunConfig::default();
    let merged = render_document(&outcome.taxonomy, &outcome.red_index, &cfg);
    fs::write(&args.out, merged.to_json()?)
        .with_context(|| format!("write {}", args.out.display()))?;
    tracing::info!(inserted = outcome.inserted, "merge complete");
    Ok(())
}

fn cmd_inject(args: InjectArgs) -> Result<()> {
    let host = RichDocument::load(&args.cv)?;
    let studies = RichDocument::load(&args.studies)?;
    let updated = inject(
        &host,
        &studies.paragraphs,
        &args.anchors.section_start,
        &args.anchors.section_end,
    )?;
    write_document_atomic(&updated, &args.output)
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let mut cfg = tuning_config(&args.tuning);
    cfg.section_start = args.anchors.section_start;
    cfg.section_end = args.anchors.section_end;
    let paths = RunPaths {
        cv: args.cv,
        master: args.master,
        red_master: args.red_master,
        out_dir: args.out_dir,
        output: args.output,
    };
    let summary = run(&paths, &cfg)?;
    print!("{}", String::from_utf8_lossy(&summary.to_json()?));
    Ok(())
}

fn tuning_config(tuning: &TuningArgs) -> RunConfig {
    RunConfig {
        threshold: tuning.threshold,
        tie_break: tuning.tie_break,
        emphasis: !tuning.no_emphasis,
        indent_size: tuning.indent,
        ..RunConfig::default()
    }
}
