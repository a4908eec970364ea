// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-identity directory namespaces.
//!
//! Every identity owns `videos/{identity}/` and at most one nested level of
//! collection directories. All paths handed to the ingest, catalog and
//! streaming layers are built here, so a segment that could climb out of the
//! namespace is rejected before it ever reaches the filesystem.

use std::path::{Component, Path, PathBuf};

use tokio::fs;

use super::{StorageError, StoragePaths, StorageResult};

/// Maximum number of segments below an identity root (`collection/file`).
const MAX_DEPTH: usize = 2;

/// Validate a single path segment supplied by a client or derived from one.
///
/// Rejects empty names, `.` and `..`, separators, NUL bytes, names with a
/// leading dot (reserved for staged uploads) and anything that does not
/// parse as exactly one normal path component.
pub fn validate_segment(segment: &str) -> StorageResult<&str> {
    let reject = || StorageError::PathEscape(segment.to_string());

    if segment.is_empty()
        || segment.starts_with('.')
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(reject());
    }

    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == segment => Ok(segment),
        _ => Err(reject()),
    }
}

/// Maps identities onto isolated directory subtrees.
#[derive(Debug, Clone)]
pub struct UserNamespace {
    paths: StoragePaths,
}

impl UserNamespace {
    /// Create a namespace manager over the given layout.
    pub fn new(paths: StoragePaths) -> Self {
        Self { paths }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Create the identity's root directory if absent and return it.
    ///
    /// Idempotent and safe when several requests race to create the same
    /// directory.
    pub async fn ensure(&self, identity: &str) -> StorageResult<PathBuf> {
        let dir = self.resolve(identity, &[])?;
        fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::Unavailable)?;
        Ok(dir)
    }

    /// Create a collection directory under the identity root if absent.
    pub async fn ensure_collection(&self, identity: &str, collection: &str) -> StorageResult<PathBuf> {
        let dir = self.resolve(identity, &[collection])?;
        fs::create_dir_all(&dir)
            .await
            .map_err(StorageError::Unavailable)?;
        Ok(dir)
    }

    /// Build a path strictly confined under the identity's root.
    pub fn resolve(&self, identity: &str, segments: &[&str]) -> StorageResult<PathBuf> {
        validate_segment(identity)?;
        if segments.len() > MAX_DEPTH {
            return Err(StorageError::PathEscape(segments.join("/")));
        }

        let mut path = self.paths.user_dir(identity);
        for segment in segments {
            path.push(validate_segment(segment)?);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, UserNamespace) {
        let temp = TempDir::new().unwrap();
        let namespace = UserNamespace::new(StoragePaths::new(temp.path()));
        (temp, namespace)
    }

    #[test]
    fn plain_segments_are_accepted() {
        for ok in ["alice", "loft", "loft_morning.mp4", "a-b.c", "Clip 1.mp4"] {
            assert_eq!(validate_segment(ok).unwrap(), ok);
        }
    }

    #[test]
    fn traversal_and_absolute_segments_are_rejected() {
        for bad in [
            "", ".", "..", "../bob", "a/b", "/etc", "a\\b", "..\\x", ".hidden", "nul\0byte",
        ] {
            assert!(
                matches!(validate_segment(bad), Err(StorageError::PathEscape(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn resolve_stays_under_identity_root() {
        let (temp, ns) = setup();
        let path = ns.resolve("alice", &["loft", "loft_morning.mp4"]).unwrap();
        assert_eq!(
            path,
            temp.path().join("videos/alice/loft/loft_morning.mp4")
        );
        assert!(path.starts_with(ns.paths().user_dir("alice")));
    }

    #[test]
    fn resolve_rejects_escape_attempts() {
        let (_temp, ns) = setup();
        assert!(matches!(
            ns.resolve("alice", &["..", "bob.mp4"]),
            Err(StorageError::PathEscape(_))
        ));
        assert!(matches!(
            ns.resolve("..", &["x.mp4"]),
            Err(StorageError::PathEscape(_))
        ));
        assert!(matches!(
            ns.resolve("alice", &["a", "b", "c.mp4"]),
            Err(StorageError::PathEscape(_))
        ));
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let (_temp, ns) = setup();
        let first = ns.ensure("alice").await.unwrap();
        let second = ns.ensure("alice").await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[tokio::test]
    async fn concurrent_first_writers_all_succeed() {
        let (_temp, ns) = setup();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ns = ns.clone();
            handles.push(tokio::spawn(async move {
                ns.ensure_collection("alice", "loft").await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(ns.paths().collection_dir("alice", "loft").is_dir());
    }
}
