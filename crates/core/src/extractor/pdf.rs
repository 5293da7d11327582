use crate::error::ExtractionError;
use crate::models::FileFormat;
use lopdf::Document;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    /// Pages that carry text, in page order. Unreadable or blank pages are left out.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let document = Document::load_mem(bytes)
            .map_err(|error| ExtractionError::malformed(FileFormat::Pdf, error))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    debug!(page = page_no, %error, "skipping unreadable pdf page");
                    continue;
                }
            };

            let text = text.trim();
            if !text.is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text: text.to_string(),
                });
            }
        }

        Ok(pages)
    }
}

pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = LopdfExtractor.extract_pages(bytes)?;
    Ok(pages
        .into_iter()
        .map(|page| page.text)
        .collect::<Vec<_>>()
        .join("\n"))
}
