//! Stage 5: anchored injection into the host document.
//!
//! Everything strictly between the section heading and the disclaimer is
//! replaced by the rendered block; every paragraph outside the span is
//! carried over untouched. The block inherits the style of the first
//! paragraph originally inside the region instead of hard-coded styling.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::docmodel::{Paragraph, RichDocument};
use crate::error::StageError;
use crate::extract::section_bounds;
use crate::record::starts_with_year;

/// Replace the anchored span of `host` with `block`.
pub fn inject(
    host: &RichDocument,
    block: &[Paragraph],
    section_start: &str,
    section_end: &str,
) -> Result<RichDocument, StageError> {
    let (start_idx, end_idx) = section_bounds(&host.paragraphs, section_start, section_end)
        .map_err(StageError::injection)?;

    let base_style = host.paragraphs[start_idx + 1..end_idx]
        .iter()
        .find(|para| !para.is_blank())
        .and_then(|para| para.style.clone());

    let mut paragraphs = Vec::with_capacity(host.paragraphs.len() + block.len());
    paragraphs.extend_from_slice(&host.paragraphs[..=start_idx]);
    for para in block {
        let mut para = para.clone();
        match (&mut para.style, &base_style) {
            (None, Some(base)) => para.style = Some(base.clone()),
            (Some(style), Some(base)) if style.name.is_none() => {
                style.name.clone_from(&base.name);
            }
            _ => {}
        }
        paragraphs.push(para);
    }
    // spacer between the block and the disclaimer
    paragraphs.push(Paragraph::default());
    paragraphs.extend_from_slice(&host.paragraphs[end_idx..]);

    let mut doc = RichDocument {
        schema_version: host.schema_version,
        paragraphs,
    };
    prune_empty_categories(&mut doc, section_start, section_end)?;
    Ok(doc)
}

/// Drop category headers in the injected span whose whole subtree holds
/// no study. A header's subtree runs until the next header at the same
/// or a shallower depth, so a populated subcategory keeps its parent.
/// Top-level headers are always kept.
fn prune_empty_categories(
    doc: &mut RichDocument,
    section_start: &str,
    section_end: &str,
) -> Result<(), StageError> {
    let (start_idx, end_idx) = section_bounds(&doc.paragraphs, section_start, section_end)
        .map_err(StageError::injection)?;

    let region = &doc.paragraphs[start_idx + 1..end_idx];
    let header_offsets: Vec<usize> = region
        .iter()
        .enumerate()
        .filter(|(_, para)| para.heading_depth().is_some())
        .map(|(offset, _)| offset)
        .collect();

    let mut doomed: Vec<usize> = Vec::new();
    for (pos, &offset) in header_offsets.iter().enumerate() {
        let depth = region[offset].heading_depth();
        if depth == Some(0) {
            continue;
        }
        let scan_to = header_offsets[pos + 1..]
            .iter()
            .copied()
            .find(|&next| region[next].heading_depth() <= depth)
            .unwrap_or(region.len());
        let has_study = region[offset + 1..scan_to]
            .iter()
            .any(|para| starts_with_year(para.text().trim_start()));
        if !has_study {
            doomed.push(start_idx + 1 + offset);
        }
    }

    for idx in doomed.into_iter().rev() {
        doc.paragraphs.remove(idx);
    }
    Ok(())
}

/// Publish a document via temp file plus rename so a failed run never
/// leaves a partial final output.
pub fn write_document_atomic(doc: &RichDocument, path: &Path) -> Result<()> {
    let bytes = doc.to_json()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("stage temp file in {}", dir.display()))?;
    staged
        .write_all(&bytes)
        .with_context(|| format!("write {}", path.display()))?;
    staged
        .persist(path)
        .with_context(|| format!("publish {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::render_document;
    use crate::config::{RunConfig, DEFAULT_SECTION_END, DEFAULT_SECTION_START};
    use crate::docmodel::{heading_style, ParagraphStyle, Run};
    use crate::extract::{extract_from_document, ExtractedStudies};
    use crate::merge::RedLabelIndex;
    use crate::taxonomy::MasterTaxonomy;

    fn host() -> RichDocument {
        RichDocument::new(vec![
            Paragraph::from_text("Jane Doe, MD"),
            Paragraph::from_text("Education: somewhere"),
            Paragraph::from_text("Research Experience"),
            Paragraph {
                style: Some(ParagraphStyle {
                    name: Some("BodyText".to_string()),
                    indent: Some(0.25),
                    hanging: None,
                }),
                runs: vec![Run::plain("2015\tOLD: stale entry")],
            },
            Paragraph::from_text(DEFAULT_SECTION_END),
            Paragraph::from_text("Signature: ____"),
        ])
    }

    fn study_block() -> Vec<Paragraph> {
        vec![
            Paragraph {
                style: Some(heading_style(0)),
                runs: vec![Run::plain("Phase I")],
            },
            Paragraph::from_text("2022\tABBVIE: Phase 1 ascending dose study"),
        ]
    }

    #[test]
    fn content_outside_anchors_is_untouched() {
        let host = host();
        let injected = inject(
            &host,
            &study_block(),
            DEFAULT_SECTION_START,
            DEFAULT_SECTION_END,
        )
        .unwrap();
        assert_eq!(injected.paragraphs[..3], host.paragraphs[..3]);
        let tail = &injected.paragraphs[injected.paragraphs.len() - 2..];
        assert_eq!(tail, &host.paragraphs[4..]);
    }

    #[test]
    fn styleless_block_paragraphs_inherit_the_region_style() {
        let injected = inject(
            &host(),
            &study_block(),
            DEFAULT_SECTION_START,
            DEFAULT_SECTION_END,
        )
        .unwrap();
        let record = injected
            .paragraphs
            .iter()
            .find(|para| para.text().starts_with("2022"))
            .unwrap();
        assert_eq!(
            record.style.as_ref().unwrap().name.as_deref(),
            Some("BodyText")
        );
    }

    #[test]
    fn missing_anchor_is_fatal() {
        let doc = RichDocument::new(vec![Paragraph::from_text("no anchors")]);
        let err = inject(
            &doc,
            &study_block(),
            DEFAULT_SECTION_START,
            DEFAULT_SECTION_END,
        )
        .unwrap_err();
        assert!(matches!(err, StageError::Injection { .. }));
    }

    #[test]
    fn empty_nested_categories_are_pruned_top_level_kept() {
        let block = vec![
            Paragraph {
                style: Some(heading_style(0)),
                runs: vec![Run::plain("Phase I")],
            },
            Paragraph {
                style: Some(heading_style(1)),
                runs: vec![Run::plain("Healthy Adults")],
            },
            Paragraph::from_text("2022\tABBVIE: Phase 1 ascending dose study"),
            Paragraph {
                style: Some(heading_style(1)),
                runs: vec![Run::plain("Special Populations")],
            },
            Paragraph {
                style: Some(heading_style(0)),
                runs: vec![Run::plain("Phase II-IV")],
            },
        ];
        let injected = inject(&host(), &block, DEFAULT_SECTION_START, DEFAULT_SECTION_END)
            .unwrap();
        let texts: Vec<String> = injected
            .paragraphs
            .iter()
            .map(|para| para.text())
            .collect();
        assert!(!texts.contains(&"Special Populations".to_string()));
        assert!(texts.contains(&"Phase I".to_string()));
        assert!(texts.contains(&"Phase II-IV".to_string()));
    }

    #[test]
    fn intermediate_headers_keep_records_held_by_a_subcategory() {
        let block = vec![
            Paragraph {
                style: Some(heading_style(0)),
                runs: vec![Run::plain("Phase I")],
            },
            Paragraph {
                style: Some(heading_style(1)),
                runs: vec![Run::plain("Special Populations")],
            },
            Paragraph {
                style: Some(heading_style(2)),
                runs: vec![Run::plain("Renal Subgroup")],
            },
            Paragraph::from_text("2021\tBMS: Renal impairment study"),
        ];
        let injected = inject(&host(), &block, DEFAULT_SECTION_START, DEFAULT_SECTION_END)
            .unwrap();
        let texts: Vec<String> = injected
            .paragraphs
            .iter()
            .map(|para| para.text())
            .collect();
        assert!(texts.contains(&"Special Populations".to_string()));
        assert!(texts.contains(&"Renal Subgroup".to_string()));
        assert!(texts.contains(&"2021\tBMS: Renal impairment study".to_string()));
    }

    #[test]
    fn depth_three_block_survives_an_inject_then_reparse_round_trip() {
        let master = "\
Phase I
\tSpecial Populations
\t\tRenal Subgroup
2021\tBMS: Renal impairment study
\tHealthy Adults
2022\tABBVIE: Phase 1 ascending dose study
";
        let (mut taxonomy, warnings) = MasterTaxonomy::parse(master, "master");
        assert!(warnings.is_empty());
        taxonomy.sort_records();

        let cfg = RunConfig::default();
        let block = render_document(&taxonomy, &RedLabelIndex::default(), &cfg);
        let injected = inject(
            &host(),
            &block.paragraphs,
            DEFAULT_SECTION_START,
            DEFAULT_SECTION_END,
        )
        .unwrap();

        let (start_idx, end_idx) =
            section_bounds(&injected.paragraphs, DEFAULT_SECTION_START, DEFAULT_SECTION_END)
                .unwrap();
        let region = RichDocument::new(injected.paragraphs[start_idx + 1..end_idx].to_vec());
        let (reparsed, warnings) = MasterTaxonomy::from_document(&region, "injected");
        assert!(warnings.is_empty());

        let renal = vec![
            "Phase I".to_string(),
            "Special Populations".to_string(),
            "Renal Subgroup".to_string(),
        ];
        assert_eq!(
            reparsed.category(&renal).unwrap().records[0].render_line(),
            "2021\tBMS: Renal impairment study"
        );
        let original: Vec<_> = taxonomy.iter_records().map(|r| r.render_line()).collect();
        let roundtrip: Vec<_> = reparsed.iter_records().map(|r| r.render_line()).collect();
        assert_eq!(original, roundtrip);
    }

    #[test]
    fn injecting_then_extracting_reproduces_the_block_records() {
        let injected = inject(
            &host(),
            &study_block(),
            DEFAULT_SECTION_START,
            DEFAULT_SECTION_END,
        )
        .unwrap();
        let extraction =
            extract_from_document(&injected, DEFAULT_SECTION_START, DEFAULT_SECTION_END).unwrap();
        assert!(extraction.warnings.is_empty());
        let ExtractedStudies::Records(records) = extraction.studies else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].render_line(),
            "2022\tABBVIE: Phase 1 ascending dose study"
        );
    }
}
