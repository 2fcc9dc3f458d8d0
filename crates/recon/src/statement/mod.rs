//! Statement side: turns a bank statement document into per-key balances.
//!
//! Each page goes through [`page::read_page`] to obtain text (digital first,
//! OCR as fallback), is filtered by heading and exclusion markers, and then
//! its qualifying lines are parsed into [`StatementRecord`]s.

pub mod lines;
pub mod page;

use std::collections::BTreeMap;

use crate::config::StatementConfig;
use crate::error::ReconError;
use crate::model::{
    PageNote, PagePath, PageReport, StatementAggregate, StatementExtraction, StatementRecord,
    TextSource,
};

pub use lines::{fold_text, parse_line, CurrencyPattern};
pub use page::{read_page, PageOutcome, PageState, PageText};

// ---------------------------------------------------------------------------
// Document seams
// ---------------------------------------------------------------------------

/// A rasterized page, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub png: Vec<u8>,
}

/// Read access to a paged document. Page numbers are 1-based.
pub trait PageSource {
    /// Human-readable name for log lines and warnings.
    fn name(&self) -> &str;
    fn page_count(&self) -> Result<usize, ReconError>;
    /// Embedded text of one page. An empty string means no text layer.
    fn page_text(&self, page: usize) -> Result<String, ReconError>;
    fn render_page(&self, page: usize, dpi: u32) -> Result<PageImage, ReconError>;
}

/// Optical recognition over rendered pages.
pub trait OcrEngine {
    /// Clockwise rotation (0, 90, 180 or 270) that makes the page upright.
    fn detect_rotation(&self, image: &PageImage) -> Result<u16, ReconError>;
    fn rotate(&self, image: &PageImage, degrees: u16) -> Result<PageImage, ReconError>;
    fn recognize(&self, image: &PageImage, language: &str) -> Result<String, ReconError>;
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Extract every balance line of a document and aggregate by key.
///
/// Never fails: unreadable pages become [`PageNote`]s and contribute zero
/// records. A document whose page count cannot be read yields an empty
/// extraction with one document-level note.
pub fn parse(
    document: &dyn PageSource,
    ocr: Option<&dyn OcrEngine>,
    config: &StatementConfig,
) -> StatementExtraction {
    let mut out = StatementExtraction::default();

    let page_count = match document.page_count() {
        Ok(n) => n,
        Err(e) => {
            log::warn!("{}: {e}", document.name());
            out.notes.push(PageNote { page: None, message: e.to_string() });
            return out;
        }
    };
    log::debug!("{}: {page_count} page(s)", document.name());

    let heading = fold_text(&config.heading);
    let markers: Vec<String> = config.exclusion_markers.iter().map(|m| fold_text(m)).collect();

    for page in 1..=page_count {
        let outcome = read_page(document, ocr, page, config);
        for message in outcome.notes {
            out.notes.push(PageNote { page: Some(page), message });
        }

        let Some(text) = outcome.text else {
            out.pages.push(PageReport { page, path: outcome.path, accepted: false, records: 0 });
            continue;
        };

        let accepted = accepts_page(&text.text, &heading, &markers);
        let mut records = 0;
        if accepted {
            let pattern = match text.source {
                TextSource::Digital => CurrencyPattern::Strict,
                TextSource::Ocr => CurrencyPattern::Loose,
            };
            for line in text.text.lines() {
                if let Some((group_key, value)) = parse_line(line, pattern) {
                    out.records.push(StatementRecord { page, group_key, value, source: text.source });
                    records += 1;
                }
            }
        }
        log::debug!(
            "{} p.{page}: {} accepted={accepted} records={records}",
            document.name(),
            outcome.path
        );
        out.pages.push(PageReport { page, path: outcome.path, accepted, records });
    }

    out.aggregates = aggregate(&out.records);
    out
}

/// A page qualifies when it carries the heading and none of the markers.
/// Both arguments must already be folded with [`fold_text`].
fn accepts_page(text: &str, heading: &str, markers: &[String]) -> bool {
    let folded = fold_text(text);
    folded.contains(heading) && !markers.iter().any(|m| folded.contains(m.as_str()))
}

/// Sum records per key, ascending key order.
pub fn aggregate(records: &[StatementRecord]) -> Vec<StatementAggregate> {
    let mut groups: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for r in records {
        let entry = groups.entry(r.group_key).or_insert((0.0, 0));
        entry.0 += r.value;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(group_key, (sum_value, record_count))| StatementAggregate {
            group_key,
            sum_value,
            record_count,
        })
        .collect()
}

/// Pages that ended in [`PagePath::Failed`].
pub fn failed_pages(extraction: &StatementExtraction) -> impl Iterator<Item = &PageReport> {
    extraction
        .pages
        .iter()
        .filter(|p| matches!(p.path, PagePath::Failed { .. }))
}
