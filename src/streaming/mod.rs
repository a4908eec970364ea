// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Video Streaming
//!
//! Serves stored files with `200 OK` or, when a `Range` header is present,
//! `206 Partial Content`. The body is a [`ReaderStream`] over the open file,
//! so at most one read buffer is held per response and a client that
//! disconnects drops the stream and with it the file handle.

pub mod range;

use std::io::SeekFrom;
use std::path::Path;

use axum::{
    body::Body,
    http::{
        header::{self, InvalidHeaderValue},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::storage::{StorageError, UserNamespace};

pub use range::{parse_range, ByteRange, RangeError};

/// Media type used when the extension is not a known video container.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Media type for a stored file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("m4v") => "video/x-m4v",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("ogv") => "video/ogg",
        Some("avi") => "video/x-msvideo",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Error type for streaming.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("failed to build response header: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Status, headers and body stream of a media response.
#[derive(Debug)]
pub struct MediaResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl IntoResponse for MediaResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Serve the regular file at `path`, honouring an optional `Range` header.
pub async fn serve(path: &Path, range: Option<&HeaderValue>) -> Result<MediaResponse, StreamError> {
    let not_found = || StorageError::NotFound(path.display().to_string());

    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found().into()),
        Err(e) => return Err(StorageError::Unavailable(e).into()),
    };
    if !metadata.is_file() {
        return Err(not_found().into());
    }
    let size = metadata.len();

    let requested = parse_range(range, size).inspect_err(|e| {
        info!(path = %path.display(), size, error = %e, "Range rejected");
    })?;

    let mut file = File::open(path).await.map_err(StorageError::from)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(path)),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    match requested {
        Some(byte_range) => {
            debug!(
                path = %path.display(),
                start = byte_range.start,
                end = byte_range.end,
                size,
                "Range accepted"
            );
            file.seek(SeekFrom::Start(byte_range.start))
                .await
                .map_err(StorageError::Unavailable)?;
            headers.insert(
                header::CONTENT_RANGE,
                HeaderValue::from_str(&byte_range.content_range(size))?,
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_range.length()));
            Ok(MediaResponse {
                status: StatusCode::PARTIAL_CONTENT,
                headers,
                body: Body::from_stream(ReaderStream::new(file.take(byte_range.length()))),
            })
        }
        None => {
            debug!(path = %path.display(), size, "Serving full file");
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
            Ok(MediaResponse {
                status: StatusCode::OK,
                headers,
                body: Body::from_stream(ReaderStream::new(file)),
            })
        }
    }
}

/// Resolves streaming URLs inside a namespace and serves the files.
#[derive(Debug, Clone)]
pub struct RangeStreamer {
    namespace: UserNamespace,
}

impl RangeStreamer {
    pub fn new(namespace: UserNamespace) -> Self {
        Self { namespace }
    }

    /// Serve `identity/[collection/]file_name`.
    pub async fn stream(
        &self,
        identity: &str,
        collection: Option<&str>,
        file_name: &str,
        range: Option<&HeaderValue>,
    ) -> Result<MediaResponse, StreamError> {
        let path = match collection {
            Some(collection) => self.namespace.resolve(identity, &[collection, file_name])?,
            None => self.namespace.resolve(identity, &[file_name])?,
        };
        serve(&path, range).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use axum::body::to_bytes;
    use tempfile::TempDir;

    fn payload() -> Vec<u8> {
        (0..1000u32).map(|i| (i % 251) as u8).collect()
    }

    async fn setup() -> (TempDir, RangeStreamer) {
        let temp = TempDir::new().unwrap();
        let namespace = UserNamespace::new(StoragePaths::new(temp.path()));
        let dir = namespace.ensure_collection("alice", "loft").await.unwrap();
        tokio::fs::write(dir.join("loft_morning.mp4"), payload()).await.unwrap();
        (temp, RangeStreamer::new(namespace))
    }

    fn range(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    async fn body_bytes(response: MediaResponse) -> Vec<u8> {
        to_bytes(response.body, usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn full_file_without_range() {
        let (_temp, streamer) = setup().await;
        let response = streamer
            .stream("alice", Some("loft"), "loft_morning.mp4", None)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers[header::CONTENT_LENGTH], "1000");
        assert_eq!(response.headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(response.headers[header::ACCEPT_RANGES], "bytes");
        assert!(response.headers.get(header::CONTENT_RANGE).is_none());
        assert_eq!(body_bytes(response).await, payload());
    }

    #[tokio::test]
    async fn partial_content_for_range() {
        let (_temp, streamer) = setup().await;
        let header = range("bytes=0-99");
        let response = streamer
            .stream("alice", Some("loft"), "loft_morning.mp4", Some(&header))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers[header::CONTENT_LENGTH], "100");
        assert_eq!(response.headers[header::CONTENT_RANGE], "bytes 0-99/1000");
        assert_eq!(body_bytes(response).await, payload()[..100]);
    }

    #[tokio::test]
    async fn range_in_the_middle_is_positioned() {
        let (_temp, streamer) = setup().await;
        let header = range("bytes=500-");
        let response = streamer
            .stream("alice", Some("loft"), "loft_morning.mp4", Some(&header))
            .await
            .unwrap();

        assert_eq!(response.headers[header::CONTENT_RANGE], "bytes 500-999/1000");
        assert_eq!(body_bytes(response).await, payload()[500..]);
    }

    #[tokio::test]
    async fn out_of_bounds_range_is_rejected() {
        let (_temp, streamer) = setup().await;
        let header = range("bytes=2000-2100");
        let err = streamer
            .stream("alice", Some("loft"), "loft_morning.mp4", Some(&header))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Range(RangeError::Unsatisfiable { size: 1000 })));
    }

    #[tokio::test]
    async fn missing_file_and_directory_are_not_found() {
        let (_temp, streamer) = setup().await;
        for (collection, file) in [(Some("loft"), "nope.mp4"), (None, "loft"), (Some("other"), "x.mp4")] {
            let err = streamer.stream("alice", collection, file, None).await.unwrap_err();
            assert!(
                matches!(err, StreamError::Storage(StorageError::NotFound(_))),
                "{collection:?}/{file}"
            );
        }
    }

    #[tokio::test]
    async fn traversal_never_reaches_the_filesystem() {
        let (_temp, streamer) = setup().await;
        let err = streamer.stream("alice", Some(".."), "users.json", None).await.unwrap_err();
        assert!(matches!(err, StreamError::Storage(StorageError::PathEscape(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_not_served() {
        let (temp, streamer) = setup().await;
        let secret = temp.path().join("secret.txt");
        tokio::fs::write(&secret, b"secret").await.unwrap();
        std::os::unix::fs::symlink(&secret, temp.path().join("videos/alice/link.mp4")).unwrap();

        let err = streamer.stream("alice", None, "link.mp4", None).await.unwrap_err();
        assert!(matches!(err, StreamError::Storage(StorageError::NotFound(_))));
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(content_type_for(Path::new("a.mov")), "video/quicktime");
        assert_eq!(content_type_for(Path::new("noext")), DEFAULT_CONTENT_TYPE);
    }
}
