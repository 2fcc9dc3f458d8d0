// OCR through the tesseract command-line tool

use std::io::Write;
use std::sync::OnceLock;

use image::ImageOutputFormat;
use regex::Regex;

use assetrecon_recon::{OcrEngine, PageImage, ReconError};

use crate::tools::TESSERACT;

/// Shells out to `tesseract`. Images are handed over through temp files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TesseractOcr;

impl TesseractOcr {
    /// `None` when tesseract is not on `PATH`.
    pub fn detect() -> Option<Self> {
        if TESSERACT.is_available() {
            Some(Self)
        } else {
            log::warn!("tesseract not found; scanned statement pages will be skipped");
            None
        }
    }

    fn with_image_file<T>(
        &self,
        image: &PageImage,
        f: impl FnOnce(&str) -> Result<T, ReconError>,
    ) -> Result<T, ReconError> {
        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| ReconError::Ocr(format!("cannot create temp image: {e}")))?;
        file.write_all(&image.png)
            .map_err(|e| ReconError::Ocr(format!("cannot write temp image: {e}")))?;
        let path = file
            .path()
            .to_str()
            .ok_or_else(|| ReconError::Ocr("temp image path is not UTF-8".into()))?
            .to_string();
        f(&path)
    }
}

impl OcrEngine for TesseractOcr {
    /// Orientation and script detection (`--psm 0`). Needs the `osd`
    /// traineddata; without it this fails and the page is read as rendered.
    fn detect_rotation(&self, image: &PageImage) -> Result<u16, ReconError> {
        let out = self.with_image_file(image, |path| {
            TESSERACT
                .run(&[path, "stdout", "--psm", "0"])
                .map_err(|e| ReconError::Ocr(e.to_string()))
        })?;
        let report = String::from_utf8_lossy(&out);
        parse_rotate(&report)
            .ok_or_else(|| ReconError::Ocr("orientation report has no Rotate line".into()))
    }

    /// Clockwise rotation in quarter turns.
    fn rotate(&self, image: &PageImage, degrees: u16) -> Result<PageImage, ReconError> {
        let decoded = image::load_from_memory(&image.png)
            .map_err(|e| ReconError::Ocr(format!("cannot decode page image: {e}")))?;
        let rotated = match degrees % 360 {
            0 => return Ok(image.clone()),
            90 => decoded.rotate90(),
            180 => decoded.rotate180(),
            270 => decoded.rotate270(),
            other => {
                return Err(ReconError::Ocr(format!("unsupported rotation {other}°")));
            }
        };
        let mut png = Vec::new();
        rotated
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| ReconError::Ocr(format!("cannot encode rotated image: {e}")))?;
        Ok(PageImage { png })
    }

    fn recognize(&self, image: &PageImage, language: &str) -> Result<String, ReconError> {
        let out = self.with_image_file(image, |path| {
            TESSERACT
                .run(&[path, "stdout", "-l", language, "--psm", "6"])
                .map_err(|e| ReconError::Ocr(e.to_string()))
        })?;
        Ok(String::from_utf8_lossy(&out).to_string())
    }
}

fn rotate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Rotate:\s*(\d+)\s*$").expect("rotate pattern"))
}

/// `Rotate: 90` line of a tesseract OSD report.
fn parse_rotate(report: &str) -> Option<u16> {
    rotate_re()
        .captures(report)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .map(|d| d % 360)
}
