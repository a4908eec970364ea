// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, AuthenticatedUser, Authenticator};
use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Returns `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;
    Ok(Some(token.trim()))
}

/// Authenticate a request from its headers.
pub fn authenticate(
    headers: &HeaderMap,
    authenticator: &Authenticator,
) -> Result<AuthenticatedUser, AuthError> {
    authenticator.verify(bearer_token(headers)?)
}

/// Extractor for authenticated users.
///
/// Rejects with [`AuthError`] (401) when the bearer token is missing,
/// malformed, badly signed, expired or revoked.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_videos(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<String>>, ApiError> {
///     // user.identity is the token subject
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(&parts.headers, &state.authenticator)?;
        tracing::Span::current().record("identity", user.identity.as_str());
        Ok(Auth(user))
    }
}
