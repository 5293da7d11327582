use crate::auth::{Action, Session};
use crate::context::ContextAssembler;
use crate::error::{ExtractionError, Result, ServiceError};
use crate::extractor::extract_format;
use crate::inference::{InferenceService, QaGateway};
use crate::models::{Answer, FileFormat, ServiceOptions, UploadReceipt};
use crate::prompt::build_prompt;
use crate::store::{validate_id, DocumentStore, IncomingArea};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Wires upload, listing, deletion and question answering behind per-session access checks.
pub struct QaCoordinator<S, I>
where
    S: DocumentStore,
    I: InferenceService,
{
    store: S,
    incoming: Option<IncomingArea>,
    assembler: ContextAssembler,
    gateway: QaGateway<I>,
    options: ServiceOptions,
}

impl<S, I> QaCoordinator<S, I>
where
    S: DocumentStore + Send + Sync,
    I: InferenceService + Send + Sync,
{
    pub fn new(store: S, gateway: QaGateway<I>, options: ServiceOptions) -> Self {
        Self {
            store,
            incoming: None,
            assembler: ContextAssembler::new(options.max_context_documents),
            gateway,
            options,
        }
    }

    /// Keeps a copy of every raw upload in `incoming` before extraction.
    pub fn with_incoming(mut self, incoming: IncomingArea) -> Self {
        self.incoming = Some(incoming);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn upload(&self, session: &Session, file_name: &str, bytes: &[u8]) -> Result<UploadReceipt> {
        session.authorize(Action::Upload)?;

        if bytes.len() > self.options.max_upload_bytes {
            return Err(ServiceError::UploadTooLarge {
                size: bytes.len(),
                limit: self.options.max_upload_bytes,
            });
        }

        validate_id(file_name)?;
        let format = FileFormat::from_file_name(file_name)
            .ok_or_else(|| ExtractionError::Unsupported(extension_of(file_name).to_string()))?;

        if let Some(incoming) = &self.incoming {
            incoming.save(file_name, bytes)?;
        }

        let text = extract_format(bytes, format)?;
        self.store.put(file_name, &text)?;

        let receipt = UploadReceipt {
            id: file_name.to_string(),
            format,
            raw_bytes: bytes.len(),
            extracted_bytes: text.len(),
            checksum: digest_bytes(bytes),
            stored_at: Utc::now(),
        };

        info!(
            document = %receipt.id,
            format = %receipt.format,
            raw_bytes = receipt.raw_bytes,
            extracted_bytes = receipt.extracted_bytes,
            user = %session.username,
            "document uploaded"
        );
        Ok(receipt)
    }

    pub async fn ask(&self, session: &Session, question: &str) -> Result<Answer> {
        session.authorize(Action::Query)?;

        if question.trim().is_empty() {
            return Err(ServiceError::EmptyQuestion);
        }

        let bundle = self.assembler.assemble(&self.store);
        if bundle.is_empty() {
            return Err(ServiceError::NoDocuments);
        }

        let prompt = build_prompt(bundle.render(), question);
        let text = self.gateway.ask(&prompt).await.map_err(|error| {
            warn!(%error, user = %session.username, "question failed");
            ServiceError::from(error)
        })?;

        Ok(Answer {
            text,
            context_ids: bundle.ids(),
        })
    }

    pub fn documents(&self, session: &Session) -> Result<Vec<String>> {
        session.authorize(Action::List)?;
        Ok(self.store.list()?)
    }

    pub fn delete(&self, session: &Session, id: &str) -> Result<()> {
        session.authorize(Action::Delete)?;
        self.store.delete(id)?;
        info!(document = %id, user = %session.username, "document deleted");
        Ok(())
    }
}

fn extension_of(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .unwrap_or(file_name)
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
