// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent storage.
pub const DATA_ROOT: &str = "./data";

/// Prefix of staged (not yet committed) upload files.
pub const STAGING_PREFIX: &str = ".upload-";

/// Suffix of staged upload files.
pub const STAGING_SUFFIX: &str = ".part";

/// Storage path utilities.
///
/// ```text
/// {root}/
///   users.json                      # credential records
///   jwt-secret                      # generated signing secret (if not configured)
///   videos/{identity}/
///     .upload-{uuid}.part           # staged uploads
///     {file}                        # flat files
///     {collection}/{file}           # files grouped by collection
/// ```
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default location of the credential file.
    pub fn credentials_file(&self) -> PathBuf {
        self.root.join("users.json")
    }

    /// Location of the generated token signing secret.
    pub fn jwt_secret_file(&self) -> PathBuf {
        self.root.join("jwt-secret")
    }

    // ========== Video Paths ==========

    /// Directory containing every user namespace.
    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    /// Namespace root of one identity.
    ///
    /// The identity is joined as-is; callers go through
    /// [`UserNamespace`](super::UserNamespace) to validate it first.
    pub fn user_dir(&self, identity: &str) -> PathBuf {
        self.videos_dir().join(identity)
    }

    /// Collection directory nested under an identity.
    pub fn collection_dir(&self, identity: &str, collection: &str) -> PathBuf {
        self.user_dir(identity).join(collection)
    }

    /// Path of a staged upload inside an identity root.
    pub fn staged_upload(&self, identity: &str, upload_id: &str) -> PathBuf {
        self.user_dir(identity)
            .join(format!("{STAGING_PREFIX}{upload_id}{STAGING_SUFFIX}"))
    }
}

/// Whether a file name denotes a staged upload.
pub fn is_staged_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}
