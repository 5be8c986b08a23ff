//! # contract: storage interface and domain types
//!
//! This module defines the single trait (`ObjectStore`) that the rest of the
//! crate talks to when it needs object storage, plus the plain data types that
//! flow between the watcher, the handler and the service loop.
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStore`] to plug in a storage backend (S3, MinIO, a test double).
//! - All methods are async and return [`StorageError`] on failure.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests (including tests of
//!   dependent crates, via the `test-export-mocks` feature) get `MockObjectStore`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;

/// Failure reported by an [`ObjectStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage endpoint rejected the request or could not be reached.
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
    /// The local source file could not be read.
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        StorageError::Request {
            operation,
            message: message.into(),
        }
    }
}

/// A "created" notification for a direct child of the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationEvent {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl CreationEvent {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }
}

/// One file to upload. Lives only for the duration of a single put call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Path of the file on local disk.
    pub source: PathBuf,
    /// Object key, the base name of `source`.
    pub key: String,
    /// Target bucket, fixed at startup.
    pub bucket: String,
}

/// Result of a single upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded { key: String },
    Failed { key: String, reason: String },
}

impl UploadOutcome {
    pub fn key(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { key } | UploadOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

/// What bucket initialization had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInit {
    AlreadyExists,
    Created,
}

/// Trait for the object-storage operations this program needs.
///
/// The trait is `Send` + `Sync`: a single instance is shared by every
/// concurrently running upload.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `bucket` exists.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;

    /// Create `bucket`.
    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Store the contents of the local file `source` under `key` in `bucket`,
    /// overwriting any existing object with that key.
    async fn put_file(&self, bucket: &str, key: &str, source: &Path)
        -> Result<(), StorageError>;
}
