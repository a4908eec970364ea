// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::debug;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{UploadForm, UploadResponse},
    state::AppState,
    storage::{StagedUpload, StorageError, UploadDescriptor},
};

/// Upload a video into the caller's namespace.
///
/// The file part is streamed to a staging file as it arrives; the stored
/// name is derived once every field has been read.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    tag = "Videos",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, description = "No file or a required field is missing"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn upload(
    Auth(user): Auth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut descriptor = UploadDescriptor::default();
    let mut staged: Option<StagedUpload> = None;

    if let Err(err) = read_form(&state, &user.identity, &mut multipart, &mut descriptor, &mut staged).await {
        if let Some(staged) = staged {
            staged.discard().await;
        }
        return Err(err);
    }

    let staged = staged.ok_or(StorageError::NoPayload)?;
    let stored = state.ingest.commit(staged, &descriptor).await?;

    Ok(Json(UploadResponse {
        message: "Video uploaded".to_string(),
        url: stored.url,
    }))
}

async fn read_form(
    state: &AppState,
    identity: &str,
    multipart: &mut Multipart,
    descriptor: &mut UploadDescriptor,
    staged: &mut Option<StagedUpload>,
) -> Result<(), ApiError> {
    let fields = state.ingest.fields();

    while let Some(mut field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == fields.file {
            if staged.is_some() {
                return Err(ApiError::bad_request(format!(
                    "Only one `{}` part is accepted",
                    fields.file
                )));
            }
            descriptor.original_name = field.file_name().map(str::to_string);
            let upload = staged.insert(state.ingest.stage(identity).await?);
            while let Some(chunk) = field.chunk().await? {
                upload.write_chunk(&chunk).await?;
            }
            debug!(identity, bytes = upload.bytes_written(), "Upload payload received");
        } else if name == fields.name {
            descriptor.suggested_name = Some(field.text().await?);
        } else if name == fields.collection {
            descriptor.collection = Some(field.text().await?);
        } else if name == fields.label {
            descriptor.label = Some(field.text().await?);
        } else {
            debug!(identity, field = %name, "Ignoring unknown upload field");
        }
    }

    Ok(())
}
