// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listing of a user's stored videos.
//!
//! The paths returned here are the streaming URLs clients request next, so
//! they are built by [`video_url`], the same function the ingest layer uses,
//! and every segment in them passes the namespace segment validation the
//! streaming route applies.

use std::io;
use std::path::Path;

use tokio::fs;

use super::namespace::validate_segment;
use super::ownership::{NamespaceOwner, OwnershipEnforcer};
use super::{StorageError, StorageResult, UserNamespace};
use crate::auth::AuthenticatedUser;

/// Streaming URL of a stored file.
pub fn video_url(identity: &str, collection: Option<&str>, file_name: &str) -> String {
    match collection {
        Some(collection) => format!("/videos/{identity}/{collection}/{file_name}"),
        None => format!("/videos/{identity}/{file_name}"),
    }
}

/// Enumerates stored files per identity.
#[derive(Debug, Clone)]
pub struct CatalogLister {
    namespace: UserNamespace,
}

impl CatalogLister {
    pub fn new(namespace: UserNamespace) -> Self {
        Self { namespace }
    }

    /// List an identity's files, flat files and collection files alike,
    /// sorted. A namespace that does not exist yet lists as empty.
    pub async fn list(&self, identity: &str) -> StorageResult<Vec<String>> {
        let root = self.namespace.resolve(identity, &[])?;
        let mut urls = Vec::new();

        for (name, is_dir) in read_entries(&root).await? {
            if is_dir {
                for (file, nested_dir) in read_entries(&root.join(&name)).await? {
                    if !nested_dir {
                        urls.push(video_url(identity, Some(&name), &file));
                    }
                }
            } else {
                urls.push(video_url(identity, None, &name));
            }
        }

        urls.sort();
        Ok(urls)
    }

    /// List the files of `owner` on behalf of `user`.
    ///
    /// There is no administrative override: anyone but the owner is refused.
    pub async fn list_for(&self, user: &AuthenticatedUser, owner: &str) -> StorageResult<Vec<String>> {
        NamespaceOwner(owner).verify_ownership(user)?;
        self.list(owner).await
    }
}

/// Addressable regular files and directories in `dir` as `(name, is_dir)`.
///
/// Symlinks, staged uploads and names that fail segment validation are
/// skipped.
async fn read_entries(dir: &Path) -> StorageResult<Vec<(String, bool)>> {
    let mut reader = match fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::Unavailable(e)),
    };

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(StorageError::Unavailable)? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if validate_segment(&name).is_err() {
            continue;
        }
        let file_type = entry.file_type().await.map_err(StorageError::Unavailable)?;
        if file_type.is_dir() {
            entries.push((name, true));
        } else if file_type.is_file() {
            entries.push((name, false));
        }
    }
    Ok(entries)
}
