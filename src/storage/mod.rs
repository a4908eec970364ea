// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Video Storage Module
//!
//! Per-user video storage on the local filesystem.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   users.json                      # credential records
//!   videos/{identity}/
//!     .upload-{uuid}.part           # staged uploads (never listed or served)
//!     {file}                        # flat uploads
//!     {collection}/{file}           # grouped uploads
//! ```
//!
//! ## Invariants
//!
//! - Every path is built through [`UserNamespace::resolve`], which rejects
//!   traversal and absolute segments.
//! - A file appears under its final name only once fully written
//!   (stage, then rename).
//! - The catalog and the streaming route agree on URL layout through
//!   [`video_url`].

pub mod catalog;
pub mod error;
pub mod ingest;
pub mod namespace;
pub mod naming;
pub mod ownership;
pub mod paths;
pub mod sweeper;

pub use catalog::{video_url, CatalogLister};
pub use error::{StorageError, StorageResult};
pub use ingest::{IngestPipeline, StagedUpload, StoredFileRef, UploadDescriptor, UploadFields};
pub use namespace::{validate_segment, UserNamespace};
pub use ownership::{NamespaceOwner, OwnedResource, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use sweeper::StagingSweeper;
