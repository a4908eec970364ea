// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage error type shared by the namespace, ingest and catalog layers.

use std::io;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Directory creation, read or write failed. Retryable by the client.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] io::Error),

    /// A path segment tried to leave its namespace or is not a plain name.
    #[error("invalid path segment: {0:?}")]
    PathEscape(String),

    /// The requested file or directory does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller asked for another identity's namespace.
    #[error("access to namespace {owner} denied for {identity}")]
    Forbidden { identity: String, owner: String },

    /// A form field the upload workflow requires is absent or empty.
    #[error("missing field: {0}")]
    MissingField(String),

    /// The upload carried no file part or an empty one.
    #[error("no file was uploaded")]
    NoPayload,

    /// Moving a staged upload to its final name failed.
    #[error("failed to place uploaded file: {0}")]
    RenameFailed(#[source] io::Error),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Unavailable(e)
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: StorageError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn other_io_errors_are_unavailable() {
        let err: StorageError = io::Error::new(io::ErrorKind::PermissionDenied, "ro").into();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
