pub mod auth;
pub mod context;
pub mod error;
pub mod extractor;
pub mod inference;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod store;

pub use auth::{Action, CredentialStore, Role, Session};
pub use context::{ContextAssembler, ContextBundle, ContextEntry};
pub use error::{AccessError, ExtractionError, InferenceError, ServiceError, StorageError};
pub use extractor::{extract, extract_file, extract_format, LopdfExtractor, PageText, PdfExtractor};
pub use inference::{HuggingFaceEndpoint, InferenceConfig, InferenceService, QaGateway};
pub use models::{
    Answer, FileFormat, ServiceOptions, StoredDocument, UploadReceipt, DEFAULT_MAX_CONTEXT_DOCUMENTS,
    DEFAULT_MAX_UPLOAD_BYTES,
};
pub use orchestrator::{digest_bytes, QaCoordinator};
pub use prompt::{build_prompt, Prompt, ANSWER_NOT_FOUND};
pub use store::{DocumentStore, FsDocumentStore, IncomingArea, MemoryDocumentStore};
