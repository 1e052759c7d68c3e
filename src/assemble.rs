//! Stage 3: ordering and the plain-text / rich-document renders.
//!
//! Categories appear in the taxonomy's fixed order; within a category the
//! primary key is year descending, secondary source rank ascending. Both
//! renders share one traversal so the two forms cannot drift apart, and
//! the plain-text form re-parses under the master grammar, which is what
//! makes assembly idempotent.

use crate::config::RunConfig;
use crate::docmodel::{
    heading_style, Paragraph, ParagraphStyle, RichDocument, Run, COLOR_GREEN, COLOR_RED,
};
use crate::merge::RedLabelIndex;
use crate::record::StudyRecord;
use crate::taxonomy::MasterTaxonomy;

/// Render the assembled taxonomy to the plain delimited format: headers
/// indented with one TAB per depth level, records in the line grammar.
pub fn render_text(taxonomy: &MasterTaxonomy, cfg: &RunConfig) -> String {
    let mut out = String::new();
    let mut emitted: Vec<String> = Vec::new();
    let record_indent = " ".repeat(cfg.indent_size);

    for category in taxonomy.categories() {
        for depth in divergence(&emitted, &category.path)..category.path.len() {
            out.push_str(&"\t".repeat(depth));
            out.push_str(&category.path[depth]);
            out.push('\n');
        }
        emitted = category.path.clone();

        if category.records.is_empty() {
            continue;
        }
        for record in &category.records {
            out.push_str(&record_indent);
            out.push_str(&record.render_line());
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Render the assembled taxonomy to the rich-document model. Top-level
/// headers are bold green, nested headers bold; record labels carry the
/// emphasis color when the record or the red-label index marks them.
pub fn render_document(
    taxonomy: &MasterTaxonomy,
    red_index: &RedLabelIndex,
    cfg: &RunConfig,
) -> RichDocument {
    let mut paragraphs = Vec::new();
    let mut emitted: Vec<String> = Vec::new();

    for category in taxonomy.categories() {
        for depth in divergence(&emitted, &category.path)..category.path.len() {
            paragraphs.push(Paragraph {
                style: Some(heading_style(depth)),
                runs: vec![Run {
                    text: category.path[depth].clone(),
                    bold: true,
                    color: (depth == 0).then(|| COLOR_GREEN.to_string()),
                }],
            });
        }
        emitted = category.path.clone();

        for record in &category.records {
            paragraphs.push(record_paragraph(record, red_index, cfg));
        }
    }

    RichDocument::new(paragraphs)
}

fn record_paragraph(record: &StudyRecord, red_index: &RedLabelIndex, cfg: &RunConfig) -> Paragraph {
    let emphasized = record.emphasized || red_index.contains(record);
    let mut runs = vec![Run::plain(record.year.to_string()), Run::plain("\t")];
    match &record.label {
        Some(label) => {
            runs.push(Run {
                text: label.clone(),
                bold: cfg.emphasis,
                color: emphasized.then(|| COLOR_RED.to_string()),
            });
            runs.push(Run::plain(":"));
            if !record.description.is_empty() {
                runs.push(Run::plain(format!(" {}", record.description)));
            }
        }
        None => runs.push(Run::plain(record.description.clone())),
    }
    Paragraph {
        style: Some(ParagraphStyle {
            name: None,
            indent: Some(cfg.doc_indent),
            hanging: Some(true),
        }),
        runs,
    }
}

/// First index at which two category paths diverge.
fn divergence(previous: &[String], next: &[String]) -> usize {
    previous
        .iter()
        .zip(next.iter())
        .take_while(|(a, b)| a == b)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::MasterTaxonomy;

    const MASTER: &str = "\
Phase I
\tHealthy Adults
2021\tBMS: Phase 1 drug interaction study
2022\tABBVIE: Phase 1 ascending dose study
\tSpecial Populations
2020\tMODERNA: Renal impairment study
Phase II-IV
2019\tPFIZER: Phase 3 vaccine efficacy study
";

    fn assembled() -> MasterTaxonomy {
        let (mut taxonomy, warnings) = MasterTaxonomy::parse(MASTER, "master");
        assert!(warnings.is_empty());
        taxonomy.sort_records();
        taxonomy
    }

    #[test]
    fn years_descend_within_every_category() {
        let taxonomy = assembled();
        for category in taxonomy.categories() {
            for pair in category.records.windows(2) {
                assert!(pair[0].year >= pair[1].year);
            }
        }
        let healthy = taxonomy
            .category(&["Phase I".to_string(), "Healthy Adults".to_string()])
            .unwrap();
        assert_eq!(healthy.records[0].year, 2022);
    }

    #[test]
    fn equal_years_keep_source_order() {
        let text = "Phase I\n2020\tB: second in source\n2020\tA: first in source\n";
        let (mut taxonomy, _) = MasterTaxonomy::parse(text, "master");
        taxonomy.sort_records();
        let labels: Vec<_> = taxonomy
            .iter_records()
            .map(|record| record.label.clone().unwrap())
            .collect();
        assert_eq!(labels, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn text_render_reparses_to_the_same_taxonomy() {
        let taxonomy = assembled();
        let rendered = render_text(&taxonomy, &RunConfig::default());
        let (reparsed, warnings) = MasterTaxonomy::parse(&rendered, "sorted");
        assert!(warnings.is_empty());
        // idempotence: a second render is byte-identical
        assert_eq!(render_text(&reparsed, &RunConfig::default()), rendered);
        let original: Vec<_> = taxonomy.iter_records().map(|r| r.render_line()).collect();
        let roundtrip: Vec<_> = reparsed.iter_records().map(|r| r.render_line()).collect();
        assert_eq!(original, roundtrip);
    }

    #[test]
    fn shared_header_prefix_is_emitted_once() {
        let rendered = render_text(&assembled(), &RunConfig::default());
        assert_eq!(rendered.matches("Phase I\n").count(), 1);
        assert!(rendered.contains("\tHealthy Adults\n"));
        assert!(rendered.contains("\tSpecial Populations\n"));
    }

    #[test]
    fn document_render_marks_headers_and_emphasis() {
        let cfg = RunConfig::default();
        let doc = render_document(&assembled(), &RedLabelIndex::default(), &cfg);
        let top = &doc.paragraphs[0];
        assert_eq!(top.text(), "Phase I");
        assert_eq!(top.heading_depth(), Some(0));
        assert_eq!(top.runs[0].color.as_deref(), Some(COLOR_GREEN));

        let record = doc
            .paragraphs
            .iter()
            .find(|para| para.text().starts_with("2022"))
            .unwrap();
        assert_eq!(record.text(), "2022\tABBVIE: Phase 1 ascending dose study");
        assert!(record.runs[2].bold);
        assert_eq!(record.runs[2].color, None);
        assert_eq!(record.style.as_ref().unwrap().indent, Some(cfg.doc_indent));
    }
}
