// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};

use crate::{
    auth::{authenticate, Auth},
    error::ApiError,
    state::AppState,
    storage::{NamespaceOwner, OwnershipEnforcer},
    streaming::MediaResponse,
};

/// List the caller's videos as streaming URLs.
#[utoipa::path(
    get,
    path = "/videos",
    tag = "Videos",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [String]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_own(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.catalog.list(&user.identity).await?))
}

/// List the videos of a named user. Only that user may ask.
#[utoipa::path(
    get,
    path = "/videos/{identity}",
    params(
        ("identity" = String, Path, description = "Owner of the namespace")
    ),
    tag = "Videos",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [String]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token identity differs from the path")
    )
)]
pub async fn list_owner(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.catalog.list_for(&user, &identity).await?))
}

/// Stream a video stored outside any collection.
#[utoipa::path(
    get,
    path = "/videos/{identity}/{filename}",
    params(
        ("identity" = String, Path, description = "Owner of the namespace"),
        ("filename" = String, Path, description = "Stored file name"),
        ("Range" = Option<String>, Header, description = "Single `bytes=start-end` range")
    ),
    tag = "Videos",
    responses(
        (status = 200, description = "Full file", content_type = "video/mp4"),
        (status = 206, description = "Requested byte range", content_type = "video/mp4"),
        (status = 404, description = "No such file"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn stream_flat(
    State(state): State<AppState>,
    Path((identity, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<MediaResponse, ApiError> {
    stream(&state, &headers, &identity, None, &filename).await
}

/// Stream a video stored in a collection.
#[utoipa::path(
    get,
    path = "/videos/{identity}/{collection}/{filename}",
    params(
        ("identity" = String, Path, description = "Owner of the namespace"),
        ("collection" = String, Path, description = "Collection directory"),
        ("filename" = String, Path, description = "Stored file name"),
        ("Range" = Option<String>, Header, description = "Single `bytes=start-end` range")
    ),
    tag = "Videos",
    responses(
        (status = 200, description = "Full file", content_type = "video/mp4"),
        (status = 206, description = "Requested byte range", content_type = "video/mp4"),
        (status = 404, description = "No such file"),
        (status = 416, description = "Range not satisfiable")
    )
)]
pub async fn stream_collection(
    State(state): State<AppState>,
    Path((identity, collection, filename)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<MediaResponse, ApiError> {
    stream(&state, &headers, &identity, Some(&collection), &filename).await
}

async fn stream(
    state: &AppState,
    headers: &HeaderMap,
    identity: &str,
    collection: Option<&str>,
    file_name: &str,
) -> Result<MediaResponse, ApiError> {
    if state.config.stream_requires_auth {
        let user = authenticate(headers, &state.authenticator)?;
        NamespaceOwner(identity).verify_ownership(&user)?;
    }

    Ok(state
        .streamer
        .stream(identity, collection, file_name, headers.get(header::RANGE))
        .await?)
}
