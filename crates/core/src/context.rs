use crate::models::DEFAULT_MAX_CONTEXT_DOCUMENTS;
use crate::store::DocumentStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Separator placed between documents in the rendered context.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextEntry {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextBundle {
    pub entries: Vec<ContextEntry>,
}

impl ContextBundle {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR)
    }
}

/// Takes the first `max_documents` ids in store order and concatenates their text. There is no
/// ranking; the cap only bounds how much text reaches the model.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_documents: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_DOCUMENTS)
    }
}

impl ContextAssembler {
    pub fn new(max_documents: usize) -> Self {
        Self { max_documents }
    }

    pub fn max_documents(&self) -> usize {
        self.max_documents
    }

    pub fn assemble<S>(&self, store: &S) -> ContextBundle
    where
        S: DocumentStore + ?Sized,
    {
        let ids = match store.list() {
            Ok(ids) => ids,
            Err(error) => {
                warn!(%error, "could not list documents; using empty context");
                return ContextBundle::default();
            }
        };

        let entries = ids
            .into_iter()
            .take(self.max_documents)
            .filter_map(|id| match store.get(&id) {
                Ok(text) => Some(ContextEntry { id, text }),
                Err(error) => {
                    warn!(document = %id, %error, "skipping unreadable document");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(documents = entries.len(), "assembled context");
        ContextBundle { entries }
    }
}
