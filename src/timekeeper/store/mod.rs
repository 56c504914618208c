//! Durable JSON document storage.
//!
//! Each persisted aggregate lives in one JSON file that is loaded once at
//! startup. The in-process copy is authoritative afterwards: handlers never
//! read the file back mid-operation. All mutating access is serialized by a
//! single lock, and the full document is flushed to disk before the lock is
//! released, so a second writer waits instead of silently overwriting the
//! first one's update.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur while loading or flushing a document.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write the document file
    #[error("Cannot access document file")]
    Io(#[from] std::io::Error),
    /// The document contents could not be encoded or decoded
    #[error("Cannot encode or decode document")]
    Serde(#[from] serde_json::Error),
}

/// A whole-document JSON store for a single aggregate.
pub struct JsonStore<T> {
    path: Option<PathBuf>,
    document: Mutex<T>,
}

impl<T: Serialize + DeserializeOwned + Default> JsonStore<T> {
    /// Opens the document at `path`, starting from an empty document when the
    /// file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// Creates a store that never touches the filesystem.
    #[cfg(test)]
    pub fn in_memory(document: T) -> Self {
        Self {
            path: None,
            document: Mutex::new(document),
        }
    }

    /// Runs a closure against the current document.
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let document = self.document.lock().await;
        f(&document)
    }

    /// Runs a closure against the document and flushes the whole document to
    /// disk before releasing the lock.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, Error> {
        let mut document = self.document.lock().await;
        let result = f(&mut document);
        if let Some(path) = &self.path {
            let encoded = serde_json::to_string_pretty(&*document)?;
            tokio::fs::write(path, encoded).await?;
        }
        Ok(result)
    }
}
