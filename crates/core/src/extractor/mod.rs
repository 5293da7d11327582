pub mod ooxml;
pub mod pdf;
pub mod text;
pub mod xlsx;

pub use ooxml::{extract_docx, extract_pptx};
pub use pdf::{extract_pdf, LopdfExtractor, PageText, PdfExtractor};
pub use text::extract_txt;
pub use xlsx::extract_xlsx;

use crate::error::ExtractionError;
use crate::models::FileFormat;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Extracts plain text from `bytes` declared as `tag`.
///
/// Unknown tags fail with [`ExtractionError::Unsupported`]. Parser faults, including panics
/// raised inside the third-party parsers, come back as [`ExtractionError::Malformed`].
pub fn extract(bytes: &[u8], tag: &str) -> Result<String, ExtractionError> {
    let format =
        FileFormat::from_tag(tag).ok_or_else(|| ExtractionError::Unsupported(tag.to_string()))?;
    extract_format(bytes, format)
}

pub fn extract_file(path: &Path, tag: &str) -> Result<String, ExtractionError> {
    let format =
        FileFormat::from_tag(tag).ok_or_else(|| ExtractionError::Unsupported(tag.to_string()))?;
    let bytes = std::fs::read(path)?;
    extract_format(&bytes, format)
}

pub fn extract_format(bytes: &[u8], format: FileFormat) -> Result<String, ExtractionError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match format {
        FileFormat::Pdf => extract_pdf(bytes),
        FileFormat::Docx => extract_docx(bytes),
        FileFormat::Txt => Ok(extract_txt(bytes)),
        FileFormat::Xlsx => extract_xlsx(bytes),
        FileFormat::Pptx => extract_pptx(bytes),
    }));

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(ExtractionError::malformed(
            format,
            format!("parser panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
