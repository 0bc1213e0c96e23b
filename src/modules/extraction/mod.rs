//! Text extraction module
//!
//! Turns a staged document into plain text.

mod pdf_extractor;

pub use pdf_extractor::{ExtractionError, PdfTextExtractor, TextExtractor};
