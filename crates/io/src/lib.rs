// File I/O: workbooks, CSV, statement PDFs, OCR, report writers

pub mod annotated;
pub mod csv;
pub mod json;
pub mod ocr;
pub mod pdf;
pub mod tools;
pub mod xlsx;

pub use annotated::{write_annotated_ledger, AnnotatedSummary};
pub use json::write_report_json;
pub use ocr::TesseractOcr;
pub use pdf::PdfDocument;
