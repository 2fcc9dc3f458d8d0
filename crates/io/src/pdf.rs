// Statement PDFs through the poppler command-line tools

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use assetrecon_recon::{PageImage, PageSource, ReconError};

use crate::tools::{PDFINFO, PDFTOPPM, PDFTOTEXT};

/// A PDF on disk. Page count is read once with `pdfinfo` and cached.
pub struct PdfDocument {
    path: PathBuf,
    name: String,
    pages: OnceCell<usize>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, ReconError> {
        if !path.is_file() {
            return Err(ReconError::Io(format!("{}: no such file", path.display())));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { path: path.to_path_buf(), name, pages: OnceCell::new() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> Result<&str, ReconError> {
        self.path
            .to_str()
            .ok_or_else(|| ReconError::Io(format!("invalid file path: {}", self.path.display())))
    }

    fn check_page(&self, page: usize) -> Result<(), ReconError> {
        let count = self.page_count()?;
        if page == 0 || page > count {
            return Err(ReconError::PageParse {
                page,
                message: format!("out of range ({} has {count} pages)", self.name),
            });
        }
        Ok(())
    }
}

impl PageSource for PdfDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> Result<usize, ReconError> {
        if let Some(n) = self.pages.get() {
            return Ok(*n);
        }
        let out = PDFINFO.run(&[self.path_str()?])?;
        let info = String::from_utf8_lossy(&out);
        let n = parse_page_count(&info)
            .ok_or_else(|| ReconError::Io(format!("{}: pdfinfo reported no page count", self.name)))?;
        let _ = self.pages.set(n);
        Ok(n)
    }

    fn page_text(&self, page: usize) -> Result<String, ReconError> {
        self.check_page(page)?;
        let n = page.to_string();
        let out = PDFTOTEXT
            .run(&["-layout", "-f", &n, "-l", &n, self.path_str()?, "-"])
            .map_err(|e| ReconError::PageParse { page, message: e.to_string() })?;
        Ok(String::from_utf8_lossy(&out).to_string())
    }

    fn render_page(&self, page: usize, dpi: u32) -> Result<PageImage, ReconError> {
        self.check_page(page)?;
        let dir = tempfile::tempdir()
            .map_err(|e| ReconError::Io(format!("cannot create temp dir: {e}")))?;
        let prefix = dir.path().join("page");
        let prefix_str = prefix
            .to_str()
            .ok_or_else(|| ReconError::Io(format!("invalid temp path: {}", prefix.display())))?;

        let n = page.to_string();
        let r = dpi.to_string();
        PDFTOPPM
            .run(&["-r", &r, "-png", "-singlefile", "-f", &n, "-l", &n, self.path_str()?, prefix_str])
            .map_err(|e| ReconError::PageParse { page, message: e.to_string() })?;

        let png_path = prefix.with_extension("png");
        let png = fs::read(&png_path).map_err(|e| ReconError::PageParse {
            page,
            message: format!("cannot read rendered page {}: {e}", png_path.display()),
        })?;
        Ok(PageImage { png })
    }
}

/// `Pages:          12` line of `pdfinfo` output.
fn parse_page_count(info: &str) -> Option<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}
