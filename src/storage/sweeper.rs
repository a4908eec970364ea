// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Staged Upload Sweeper
//!
//! Background task that removes orphaned staging files. An upload whose
//! connection dropped, or whose rename failed after the cleanup attempt
//! itself failed, leaves a `.upload-{uuid}.part` file behind in its owner's
//! namespace. Every `interval` the sweeper walks the namespace tree (identity
//! roots and their collection directories) and deletes staging files older
//! than `max_age`.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::paths::is_staged_name;
use super::StoragePaths;

/// Default age after which a staging file is considered orphaned.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Background sweeper for orphaned staged uploads.
pub struct StagingSweeper {
    paths: StoragePaths,
    max_age: Duration,
    interval: Duration,
}

impl StagingSweeper {
    /// Create a new sweeper over the given storage layout.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            max_age: DEFAULT_MAX_AGE,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "Staging sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Staging sweeper shutting down");
                return;
            }

            match self.sweep_once().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Removed orphaned staged uploads"),
                Err(e) => warn!(error = %e, "Staging sweep failed, will retry"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Staging sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep and return the number of files removed.
    pub async fn sweep_once(&self) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for identity_dir in subdirectories(&self.paths.videos_dir()).await? {
            removed += self.sweep_dir(&identity_dir, now).await?;
            for collection_dir in subdirectories(&identity_dir).await? {
                removed += self.sweep_dir(&collection_dir, now).await?;
            }
        }

        Ok(removed)
    }

    async fn sweep_dir(&self, dir: &Path, now: SystemTime) -> io::Result<usize> {
        let mut reader = match fs::read_dir(dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = reader.next_entry().await? {
            let is_staged = entry.file_name().to_str().is_some_and(is_staged_name);
            if !is_staged {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    info!(path = %path.display(), "Removed stale staged upload");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged upload"),
            }
        }
        Ok(removed)
    }
}

async fn subdirectories(dir: &Path) -> io::Result<Vec<std::path::PathBuf>> {
    let mut reader = match fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}
