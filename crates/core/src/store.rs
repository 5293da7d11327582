use crate::error::StorageError;
use crate::models::StoredDocument;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use walkdir::WalkDir;

/// Suffix appended to a document id to form its blob file name.
pub const PROCESSED_SUFFIX: &str = ".txt";

pub trait DocumentStore {
    /// Stores `text` under `id`, replacing any previous content.
    fn put(&self, id: &str, text: &str) -> Result<(), StorageError>;

    fn get(&self, id: &str) -> Result<String, StorageError>;

    /// Ids in the store's enumeration order.
    fn list(&self) -> Result<Vec<String>, StorageError>;

    fn delete(&self, id: &str) -> Result<(), StorageError>;

    fn fetch(&self, id: &str) -> Result<StoredDocument, StorageError> {
        let content = self.get(id)?;
        Ok(StoredDocument::new(id, content))
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn put(&self, id: &str, text: &str) -> Result<(), StorageError> {
        (**self).put(id, text)
    }

    fn get(&self, id: &str) -> Result<String, StorageError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        (**self).list()
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        (**self).delete(id)
    }
}

/// Document ids are original file names; anything that could escape the storage directory is
/// rejected.
pub fn validate_id(id: &str) -> Result<(), StorageError> {
    let invalid = id.trim().is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);

    if invalid {
        Err(StorageError::InvalidId(id.to_string()))
    } else {
        Ok(())
    }
}

fn map_io(id: &str, error: io::Error) -> StorageError {
    match error.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(id.to_string()),
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(id.to_string()),
        _ => StorageError::Io(error),
    }
}

/// One extracted-text blob per document in a directory, read and written on every call.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        validate_id(id)?;
        Ok(self.root.join(format!("{id}{PROCESSED_SUFFIX}")))
    }
}

impl DocumentStore for FsDocumentStore {
    fn put(&self, id: &str, text: &str) -> Result<(), StorageError> {
        let path = self.blob_path(id)?;
        fs::write(path, text).map_err(|error| map_io(id, error))
    }

    fn get(&self, id: &str) -> Result<String, StorageError> {
        let path = self.blob_path(id)?;
        fs::read_to_string(path).map_err(|error| map_io(id, error))
    }

    /// Ids sorted by blob file name.
    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let id = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(PROCESSED_SUFFIX))
                .filter(|id| !id.is_empty());

            if let Some(id) = id {
                ids.push(id.to_string());
            }
        }

        Ok(ids)
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = self.blob_path(id)?;
        fs::remove_file(path).map_err(|error| map_io(id, error))
    }
}

/// Insertion-ordered in-memory store; overwriting keeps the original position.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    entries: RwLock<Vec<(String, String)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn put(&self, id: &str, text: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        let mut entries = self.entries.write().unwrap_or_else(|poison| poison.into_inner());
        match entries.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, content)) => *content = text.to_string(),
            None => entries.push((id.to_string(), text.to_string())),
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<String, StorageError> {
        let entries = self.entries.read().unwrap_or_else(|poison| poison.into_inner());
        entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(|poison| poison.into_inner());
        Ok(entries.iter().map(|(id, _)| id.clone()).collect())
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(|poison| poison.into_inner());
        let position = entries
            .iter()
            .position(|(existing, _)| existing == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        entries.remove(position);
        Ok(())
    }
}

/// Scratch directory receiving raw uploaded bytes under their original file name.
#[derive(Debug, Clone)]
pub struct IncomingArea {
    root: PathBuf,
}

impl IncomingArea {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        validate_id(file_name)?;
        let path = self.root.join(file_name);
        fs::write(&path, bytes).map_err(|error| map_io(file_name, error))?;
        Ok(path)
    }
}
