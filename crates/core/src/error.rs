use crate::models::FileFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {format} document: {details}")]
    Malformed { format: FileFormat, details: String },
}

impl ExtractionError {
    pub(crate) fn malformed(format: FileFormat, details: impl ToString) -> Self {
        Self::Malformed {
            format,
            details: details.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("invalid document id: {0:?}")]
    InvalidId(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("inference service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("invalid inference config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("user {username} may not {action}")]
    Forbidden { username: String, action: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("file is {size} bytes, limit is {limit} bytes")]
    UploadTooLarge { size: usize, limit: usize },

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("model error: {0}")]
    Inference(#[from] InferenceError),

    #[error("question is empty")]
    EmptyQuestion,

    #[error("no documents available")]
    NoDocuments,
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
