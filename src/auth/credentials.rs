// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential records and their stores.
//!
//! The authenticator only sees the [`CredentialStore`] trait. Production
//! uses [`FileCredentialStore`], a JSON file written atomically (temp file +
//! rename); tests use [`InMemoryCredentialStore`]. Records are created once
//! and never updated or deleted.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
///
/// Field names on disk follow the legacy `users.json` layout
/// (`username`, `email`, `password`), so existing files load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "username")]
    pub identity: String,
    /// bcrypt hash, never the plaintext
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Error type for credential stores.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("identity already exists: {0}")]
    Duplicate(String),
    #[error("credential storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistence of user records keyed by identity.
pub trait CredentialStore: Send + Sync {
    /// Look up a record.
    fn get(&self, identity: &str) -> Result<Option<UserRecord>, CredentialStoreError>;

    /// Insert a new record, failing with `Duplicate` if the identity exists.
    /// The existence check and the insert are atomic.
    fn insert(&self, record: UserRecord) -> Result<(), CredentialStoreError>;
}

/// Volatile store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, identity: &str) -> Result<Option<UserRecord>, CredentialStoreError> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(identity).cloned())
    }

    fn insert(&self, record: UserRecord) -> Result<(), CredentialStoreError> {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        if users.contains_key(&record.identity) {
            return Err(CredentialStoreError::Duplicate(record.identity));
        }
        users.insert(record.identity.clone(), record);
        Ok(())
    }
}

/// JSON-file store. The file holds an array of [`UserRecord`]s.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl FileCredentialStore {
    /// Open the store, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CredentialStoreError> {
        let path = path.as_ref().to_path_buf();
        let users = match File::open(&path) {
            Ok(file) => {
                let records: Vec<UserRecord> = serde_json::from_reader(BufReader::new(file))?;
                records
                    .into_iter()
                    .map(|r| (r.identity.clone(), r))
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), users = users.len(), "Credential store opened");

        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, users: &HashMap<String, UserRecord>) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut records: Vec<&UserRecord> = users.values().collect();
        records.sort_by(|a, b| a.identity.cmp(&b.identity));

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &records)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, identity: &str) -> Result<Option<UserRecord>, CredentialStoreError> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(identity).cloned())
    }

    fn insert(&self, record: UserRecord) -> Result<(), CredentialStoreError> {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        if users.contains_key(&record.identity) {
            return Err(CredentialStoreError::Duplicate(record.identity));
        }

        let mut next = users.clone();
        next.insert(record.identity.clone(), record);
        self.persist(&next)?;
        *users = next;
        Ok(())
    }
}
