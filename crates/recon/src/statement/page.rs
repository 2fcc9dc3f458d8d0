//! Per-page text acquisition.
//!
//! ```text
//! TryText ──usable──────────────────────────────▶ Done(digital)
//!    │ unusable / error
//!    ▼
//! NeedsOcr ──render + detect orientation──▶ Rotated ──recognize──▶ Done(ocr)
//!    │ render error / no engine                 │ recognize error
//!    ▼                                          ▼
//! Failed ◀──────────────────────────────────────┘
//! ```
//!
//! Orientation detection and rotation are best effort: if either fails the
//! page is recognized as rendered and a note is recorded.

use crate::config::StatementConfig;
use crate::model::{PagePath, TextSource};

use super::lines::has_currency_token;
use super::{OcrEngine, PageImage, PageSource};

#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub text: String,
    pub source: TextSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    TryText,
    NeedsOcr,
    Rotated { image: PageImage, degrees: u16 },
    Done(PageText, PagePath),
    Failed(String),
}

impl PageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(..) | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub path: PagePath,
    /// `None` when the page failed.
    pub text: Option<PageText>,
    pub notes: Vec<String>,
}

/// Drive one page through the state machine until it settles.
pub fn read_page(
    document: &dyn PageSource,
    ocr: Option<&dyn OcrEngine>,
    page: usize,
    config: &StatementConfig,
) -> PageOutcome {
    let mut notes = Vec::new();
    let mut state = PageState::TryText;
    while !state.is_terminal() {
        state = step(state, document, ocr, page, config, &mut notes);
    }
    match state {
        PageState::Done(text, path) => PageOutcome { path, text: Some(text), notes },
        PageState::Failed(reason) => {
            log::warn!("{} p.{page}: {reason}", document.name());
            notes.push(reason.clone());
            PageOutcome { path: PagePath::Failed { reason }, text: None, notes }
        }
        // loop exits only on terminal states
        _ => PageOutcome {
            path: PagePath::Failed { reason: "page did not settle".into() },
            text: None,
            notes,
        },
    }
}

fn step(
    state: PageState,
    document: &dyn PageSource,
    ocr: Option<&dyn OcrEngine>,
    page: usize,
    config: &StatementConfig,
    notes: &mut Vec<String>,
) -> PageState {
    match state {
        PageState::TryText => match document.page_text(page) {
            Ok(text) if is_usable(&text, config.min_text_chars) => {
                PageState::Done(PageText { text, source: TextSource::Digital }, PagePath::Digital)
            }
            Ok(_) => {
                log::debug!("{} p.{page}: no usable text layer, falling back to OCR", document.name());
                PageState::NeedsOcr
            }
            Err(e) => {
                log::debug!("{} p.{page}: text extraction failed ({e}), falling back to OCR", document.name());
                PageState::NeedsOcr
            }
        },

        PageState::NeedsOcr => {
            let Some(engine) = ocr else {
                return PageState::Failed("no usable text and no OCR engine available".into());
            };
            let image = match document.render_page(page, config.render_dpi) {
                Ok(image) => image,
                Err(e) => return PageState::Failed(format!("render failed: {e}")),
            };
            let degrees = match engine.detect_rotation(&image) {
                Ok(d) => d % 360,
                Err(e) => {
                    notes.push(format!("orientation detection failed, assuming upright: {e}"));
                    0
                }
            };
            if degrees == 0 {
                return PageState::Rotated { image, degrees: 0 };
            }
            match engine.rotate(&image, degrees) {
                Ok(rotated) => PageState::Rotated { image: rotated, degrees },
                Err(e) => {
                    notes.push(format!("rotation by {degrees}° failed, using page as rendered: {e}"));
                    PageState::Rotated { image, degrees: 0 }
                }
            }
        }

        PageState::Rotated { image, degrees } => {
            let Some(engine) = ocr else {
                return PageState::Failed("no OCR engine available".into());
            };
            match engine.recognize(&image, &config.ocr_language) {
                Ok(text) => {
                    let path = if degrees == 0 {
                        PagePath::Ocr
                    } else {
                        PagePath::RotatedOcr { degrees }
                    };
                    PageState::Done(PageText { text, source: TextSource::Ocr }, path)
                }
                Err(e) => PageState::Failed(format!("OCR failed: {e}")),
            }
        }

        terminal => terminal,
    }
}

/// Digital text is usable when it is long enough and carries at least one
/// amount. Scanned PDFs often have a stub text layer with neither.
fn is_usable(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() >= min_chars && has_currency_token(text)
}
