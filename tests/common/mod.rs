//! Shared fixture for pipeline integration tests.
//!
//! Builds a small CV document, master taxonomy, and red-label master in a
//! temp directory so each test runs the real pipeline end to end.

use std::fs;
use std::path::Path;

use anyhow::Result;
use studysort::config::DEFAULT_SECTION_END;
use studysort::docmodel::{heading_style, Paragraph, RichDocument, Run, COLOR_RED};
use studysort::pipeline::RunPaths;
use tempfile::TempDir;

pub const MASTER: &str = "\
Phase I
\tHealthy Adults
2022\tABBVIE: Phase 1 single ascending dose study in healthy adults
2021\tBMS: Phase 1 drug interaction study
\tSpecial Populations
2020\tMODERNA: Renal impairment pharmacokinetics study
Phase II-IV
2019\tPFIZER: Phase 3 vaccine efficacy study
";

pub struct PipelineFixture {
    // Owns the directory for the lifetime of the test.
    pub temp: TempDir,
    pub paths: RunPaths,
}

impl PipelineFixture {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path();

        let cv = root.join("cv.doc.json");
        write_doc(&cv, &cv_document())?;
        let master = root.join("master.txt");
        fs::write(&master, MASTER)?;

        let paths = RunPaths {
            cv,
            master,
            red_master: None,
            out_dir: root.join("work"),
            output: root.join("cv.updated.doc.json"),
        };
        Ok(Self { temp, paths })
    }

    pub fn with_red_master(mut self) -> Result<Self> {
        let path = self.temp.path().join("red.doc.json");
        write_doc(&path, &red_master_document())?;
        self.paths.red_master = Some(path);
        Ok(self)
    }

    pub fn output_doc(&self) -> Result<RichDocument> {
        RichDocument::load(&self.paths.output)
    }

    pub fn artifact(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.paths.out_dir.join(name))?)
    }
}

pub fn write_doc(path: &Path, doc: &RichDocument) -> Result<()> {
    fs::write(path, doc.to_json()?)?;
    Ok(())
}

pub fn heading(text: &str, depth: usize) -> Paragraph {
    Paragraph {
        style: Some(heading_style(depth)),
        runs: vec![Run {
            text: text.to_string(),
            bold: true,
            color: None,
        }],
    }
}

/// Record paragraph whose label run is red, the way additions are flagged
/// in a red-label master.
pub fn red_record(year: i32, label: &str, description: &str) -> Paragraph {
    Paragraph {
        style: None,
        runs: vec![
            Run::plain(format!("{year}\t")),
            Run {
                text: label.to_string(),
                bold: true,
                color: Some(COLOR_RED.to_string()),
            },
            Run::plain(format!(": {description}")),
        ],
    }
}

/// Host CV: two records that fuzzily match the master, one that does not.
pub fn cv_document() -> RichDocument {
    RichDocument::new(vec![
        Paragraph::from_text("Jane Doe, MD"),
        Paragraph::from_text("Board certified in internal medicine."),
        Paragraph::from_text("Research Experience"),
        Paragraph::from_text(
            "2022\tABBVIE CORP: Phase 1 single ascending dose study among healthy adults",
        ),
        Paragraph::from_text(""),
        Paragraph::from_text("2019\tPFIZER: Phase 3 vaccine efficacy study"),
        Paragraph::from_text(""),
        Paragraph::from_text("2018\tACME: Gene therapy twin study"),
        Paragraph::from_text(DEFAULT_SECTION_END),
        Paragraph::from_text("Signature: ________"),
    ])
}

/// Red-label master: the sorted list plus one new red-flagged 2024 study.
pub fn red_master_document() -> RichDocument {
    RichDocument::new(vec![
        heading("Phase I", 0),
        heading("Healthy Adults", 1),
        Paragraph::from_text(
            "2022\tABBVIE: Phase 1 single ascending dose study in healthy adults",
        ),
        heading("Phase II-IV", 0),
        red_record(2024, "PFIZER", "New oncology vaccine study"),
        Paragraph::from_text("2019\tPFIZER: Phase 3 vaccine efficacy study"),
    ])
}
