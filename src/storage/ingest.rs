// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload ingestion: stage the payload, then atomically place it.
//!
//! An upload is streamed into `.upload-{uuid}.part` inside the owner's
//! namespace root. Only when the payload and the descriptive form fields are
//! complete is it renamed to its final name, so a file is never visible under
//! its final name while partially written. Staging inside the namespace keeps
//! the rename on one filesystem. Concurrent uploads to the same slot each
//! rename a complete file; the last rename wins.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use utoipa::ToSchema;

use super::catalog::video_url;
use super::naming::{derive_file_name, sanitize_segment, NameParts};
use super::{StorageError, StorageResult, UserNamespace};

/// Multipart field names of the upload form and which ones are mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFields {
    /// Field carrying the file bytes.
    pub file: String,
    /// Field carrying a suggested final name.
    pub name: String,
    /// Field carrying the collection.
    pub collection: String,
    /// Field carrying the slot label.
    pub label: String,
    pub require_collection: bool,
    pub require_label: bool,
}

impl Default for UploadFields {
    fn default() -> Self {
        Self {
            file: "file".to_string(),
            name: "fileName".to_string(),
            collection: "apartmentName".to_string(),
            label: "timeOfDay".to_string(),
            require_collection: true,
            require_label: true,
        }
    }
}

/// Descriptive fields that accompany an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadDescriptor {
    pub original_name: Option<String>,
    pub suggested_name: Option<String>,
    pub collection: Option<String>,
    pub label: Option<String>,
}

/// A committed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StoredFileRef {
    /// Owning identity.
    pub owner: String,
    /// Collection directory, if the file is grouped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Final file name.
    pub file_name: String,
    /// Streaming URL, identical to what the catalog lists.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(skip)]
    pub path: PathBuf,
}

/// An upload being written to its staging file.
#[derive(Debug)]
pub struct StagedUpload {
    identity: String,
    path: PathBuf,
    writer: BufWriter<File>,
    bytes: u64,
}

impl StagedUpload {
    /// Append a chunk of the payload.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<()> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(StorageError::Unavailable)?;
        self.bytes += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Staging file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Abandon the upload and remove its staging file.
    pub async fn discard(self) {
        let path = self.path.clone();
        drop(self.writer);
        remove_staged(&path).await;
    }
}

async fn remove_staged(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Stages and places uploads inside user namespaces.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    namespace: UserNamespace,
    fields: UploadFields,
}

impl IngestPipeline {
    pub fn new(namespace: UserNamespace, fields: UploadFields) -> Self {
        Self { namespace, fields }
    }

    /// Form field configuration.
    pub fn fields(&self) -> &UploadFields {
        &self.fields
    }

    /// Open a fresh staging file in the identity's namespace root.
    pub async fn stage(&self, identity: &str) -> StorageResult<StagedUpload> {
        self.namespace.ensure(identity).await?;
        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.namespace.paths().staged_upload(identity, &upload_id);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(StorageError::Unavailable)?;

        tracing::debug!(identity, path = %path.display(), "Upload staging started");

        Ok(StagedUpload {
            identity: identity.to_string(),
            path,
            writer: BufWriter::new(file),
            bytes: 0,
        })
    }

    /// Validate the descriptor, derive the final name and rename the staged
    /// payload into place. The staging file is removed on every failure.
    pub async fn commit(
        &self,
        mut staged: StagedUpload,
        descriptor: &UploadDescriptor,
    ) -> StorageResult<StoredFileRef> {
        let outcome = self.place(&mut staged, descriptor).await;
        if outcome.is_err() {
            remove_staged(&staged.path).await;
        }
        outcome
    }

    /// Stage and commit an in-memory payload in one step.
    pub async fn ingest(
        &self,
        identity: &str,
        descriptor: &UploadDescriptor,
        payload: &[u8],
    ) -> StorageResult<StoredFileRef> {
        let mut staged = self.stage(identity).await?;
        if let Err(e) = staged.write_chunk(payload).await {
            staged.discard().await;
            return Err(e);
        }
        self.commit(staged, descriptor).await
    }

    async fn place(
        &self,
        staged: &mut StagedUpload,
        descriptor: &UploadDescriptor,
    ) -> StorageResult<StoredFileRef> {
        staged
            .writer
            .flush()
            .await
            .map_err(StorageError::Unavailable)?;
        staged
            .writer
            .get_ref()
            .sync_all()
            .await
            .map_err(StorageError::Unavailable)?;

        if staged.bytes == 0 {
            return Err(StorageError::NoPayload);
        }

        let collection = present(descriptor.collection.as_deref());
        let label = present(descriptor.label.as_deref());
        if self.fields.require_collection && collection.is_none() {
            return Err(StorageError::MissingField(self.fields.collection.clone()));
        }
        if self.fields.require_label && label.is_none() {
            return Err(StorageError::MissingField(self.fields.label.clone()));
        }

        let collection_dir = match collection {
            Some(raw) => {
                let name = sanitize_segment(raw);
                if name.is_empty() {
                    return Err(StorageError::PathEscape(raw.to_string()));
                }
                Some(name)
            }
            None => None,
        };

        let file_name = derive_file_name(
            NameParts {
                suggested: present(descriptor.suggested_name.as_deref()),
                original: present(descriptor.original_name.as_deref()),
                collection,
                label,
            },
            Utc::now().timestamp_millis(),
        );

        let identity = staged.identity.as_str();
        let final_path = match collection_dir.as_deref() {
            Some(dir) => {
                self.namespace.ensure_collection(identity, dir).await?;
                self.namespace.resolve(identity, &[dir, &file_name])?
            }
            None => self.namespace.resolve(identity, &[&file_name])?,
        };

        if let Err(e) = fs::rename(&staged.path, &final_path).await {
            tracing::warn!(
                identity,
                path = %final_path.display(),
                error = %e,
                "Failed to rename staged upload"
            );
            return Err(StorageError::RenameFailed(e));
        }

        tracing::info!(
            identity,
            file = %file_name,
            collection = collection_dir.as_deref().unwrap_or(""),
            size = staged.bytes,
            "Upload committed"
        );

        Ok(StoredFileRef {
            owner: identity.to_string(),
            url: video_url(identity, collection_dir.as_deref(), &file_name),
            collection: collection_dir,
            file_name,
            size: staged.bytes,
            path: final_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn pipeline(fields: UploadFields) -> (TempDir, IngestPipeline) {
        let temp = TempDir::new().unwrap();
        let namespace = UserNamespace::new(StoragePaths::new(temp.path()));
        (temp, IngestPipeline::new(namespace, fields))
    }

    fn optional_fields() -> UploadFields {
        UploadFields {
            require_collection: false,
            require_label: false,
            ..UploadFields::default()
        }
    }

    fn apartment(collection: &str, label: &str) -> UploadDescriptor {
        UploadDescriptor {
            original_name: Some("IMG_0042.mp4".to_string()),
            suggested_name: None,
            collection: Some(collection.to_string()),
            label: Some(label.to_string()),
        }
    }

    fn staged_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|n| crate::storage::paths::is_staged_name(n))
            .collect()
    }

    #[tokio::test]
    async fn ingest_places_file_in_collection_slot() {
        let (_temp, pipeline) = pipeline(UploadFields::default());

        let stored = pipeline
            .ingest("alice", &apartment("Loft 3", "morning"), b"frames")
            .await
            .unwrap();

        assert_eq!(stored.file_name, "Loft_3_morning.mp4");
        assert_eq!(stored.collection.as_deref(), Some("Loft_3"));
        assert_eq!(stored.url, "/videos/alice/Loft_3/Loft_3_morning.mp4");
        assert_eq!(stored.size, 6);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"frames");
    }

    #[tokio::test]
    async fn flat_upload_uses_suggested_name() {
        let (_temp, pipeline) = pipeline(optional_fields());
        let descriptor = UploadDescriptor {
            original_name: Some("raw.webm".to_string()),
            suggested_name: Some("beach day".to_string()),
            ..Default::default()
        };

        let stored = pipeline.ingest("alice", &descriptor, b"x").await.unwrap();
        assert_eq!(stored.url, "/videos/alice/beach_day.webm");
        assert!(stored.path.is_file());
    }

    #[tokio::test]
    async fn missing_required_field_is_rejected_and_staging_removed() {
        let (_temp, pipeline) = pipeline(UploadFields::default());
        let descriptor = UploadDescriptor {
            original_name: Some("a.mp4".to_string()),
            collection: Some("loft".to_string()),
            label: Some("   ".to_string()),
            ..Default::default()
        };

        let err = pipeline.ingest("alice", &descriptor, b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::MissingField(ref f) if f == "timeOfDay"));

        let root = pipeline.namespace.paths().user_dir("alice");
        assert!(staged_files(&root).is_empty());
    }

    #[tokio::test]
    async fn empty_payload_is_no_payload() {
        let (_temp, pipeline) = pipeline(optional_fields());
        let staged = pipeline.stage("alice").await.unwrap();
        let staged_path = staged.path().to_path_buf();

        let err = pipeline
            .commit(staged, &UploadDescriptor::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NoPayload));
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn staged_upload_is_invisible_until_commit() {
        let (_temp, pipeline) = pipeline(UploadFields::default());
        let mut staged = pipeline.stage("alice").await.unwrap();
        staged.write_chunk(b"partial").await.unwrap();

        let final_path = pipeline
            .namespace
            .resolve("alice", &["loft", "loft_evening.mp4"])
            .unwrap();
        assert!(!final_path.exists());

        let stored = pipeline
            .commit(staged, &apartment("loft", "evening"))
            .await
            .unwrap();
        assert_eq!(stored.path, final_path);
        assert!(final_path.exists());
    }

    #[tokio::test]
    async fn concurrent_ingests_to_same_slot_leave_one_complete_file() {
        let (_temp, pipeline) = pipeline(UploadFields::default());
        let first = vec![b'a'; 256 * 1024];
        let second = vec![b'b'; 128 * 1024];

        let slot = apartment("loft", "noon");

        let (a, b) = tokio::join!(
            pipeline.ingest("alice", &slot, &first),
            pipeline.ingest("alice", &slot, &second),
        );
        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.path, b.path);

        let on_disk = std::fs::read(&a.path).unwrap();
        assert!(on_disk == first || on_disk == second);

        let root = pipeline.namespace.paths().user_dir("alice");
        assert!(staged_files(&root).is_empty());
    }

    #[tokio::test]
    async fn unusable_collection_is_rejected() {
        let (_temp, pipeline) = pipeline(UploadFields::default());
        let err = pipeline
            .ingest("alice", &apartment("../..", "noon"), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PathEscape(_)));
    }

    #[tokio::test]
    async fn invalid_identity_cannot_stage() {
        let (_temp, pipeline) = pipeline(optional_fields());
        let err = pipeline.stage("../bob").await.unwrap_err();
        assert!(matches!(err, StorageError::PathEscape(_)));
    }
}
