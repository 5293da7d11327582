use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_MAX_CONTEXT_DOCUMENTS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Docx,
    Txt,
    Xlsx,
    Pptx,
}

impl FileFormat {
    pub const ALL: [FileFormat; 5] = [
        FileFormat::Pdf,
        FileFormat::Docx,
        FileFormat::Txt,
        FileFormat::Xlsx,
        FileFormat::Pptx,
    ];

    /// Exact format tag, ignoring ASCII case. Padding or a leading `.` is not a tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.tag().eq_ignore_ascii_case(tag))
    }

    /// Format implied by the text after the last `.` of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Docx => "docx",
            FileFormat::Txt => "txt",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Pptx => "pptx",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub size: usize,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            size: content.len(),
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub format: FileFormat,
    pub raw_bytes: usize,
    pub extracted_bytes: usize,
    pub checksum: String,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub context_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub max_upload_bytes: usize,
    pub max_context_documents: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_context_documents: DEFAULT_MAX_CONTEXT_DOCUMENTS,
        }
    }
}
