//! Local document storage
//!
//! This module provides small JSON documents kept in the application's data
//! directory. Writes go through a temporary sibling file and a rename, so a
//! crash never leaves a half-written document behind.

use crate::temp::temp_sibling;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Failed to determine data directory location
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create or access the data directory
    #[error("Failed to create data directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a stored document
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a document
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize a stored document
    #[error("Failed to deserialize {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for storage
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Returns the platform data directory of the application
pub fn default_data_dir() -> Result<PathBuf, PersistenceError> {
    directories::ProjectDirs::from("io", "showshelf", "showshelf")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(PersistenceError::DataDirectoryNotFound)
}

/// A JSON document of type `T` stored in a single file
///
/// The document is identified by a name; the file is `<dir>/<name>.json`.
pub(crate) struct JsonDocument<T> {
    /// Location of the document file
    path: PathBuf,
    /// Restrict the file to the current user
    private: bool,
    /// Phantom data for the generic type
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonDocument<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            private: self.private,
            _phantom: PhantomData,
        }
    }
}

impl<T> JsonDocument<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Opens the document with the given name inside `dir`
    ///
    /// The directory is created if it doesn't exist. The name will be
    /// sanitized (lowercased, non-alphanumeric characters replaced with
    /// underscores). Opening does not read the file yet.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let favorites: JsonDocument<Vec<ShowId>> = JsonDocument::open(&data_dir, "favorites")?;
    /// ```
    pub fn open(dir: &Path, name: &str) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: dir.join(format!("{}.json", sanitize_name(name))),
            private: false,
            _phantom: PhantomData,
        })
    }

    /// Like [`JsonDocument::open`], but writes are readable by the owner only
    pub fn open_private(dir: &Path, name: &str) -> Result<Self, PersistenceError> {
        let mut document = Self::open(dir, name)?;
        document.private = true;
        Ok(document)
    }

    /// Loads the document
    ///
    /// Returns `None` if the document has never been stored, and an error
    /// if it exists but cannot be read or deserialized.
    pub fn load(&self) -> Result<Option<T>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| PersistenceError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        let data =
            serde_json::from_str(&content).map_err(|e| PersistenceError::DeserializationFailed {
                path: self.path.clone(),
                source: e,
            })?;

        Ok(Some(data))
    }

    /// Replaces the stored document with `data`
    pub fn store(&self, data: &T) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(data)?;

        let write_failed = |source| PersistenceError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let (mut file, guard) = temp_sibling(&self.path, self.private).map_err(write_failed)?;
        file.write_all(content.as_bytes()).map_err(write_failed)?;
        file.sync_all().map_err(write_failed)?;
        drop(file);

        guard.persist(&self.path).map_err(write_failed)
    }

    /// Returns the path of the document file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
