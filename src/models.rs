// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Accounts**: registration and login
//! - **Uploads**: the multipart upload form and its result

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Account Models
// =============================================================================

/// Request body for `POST /register`.
///
/// Missing fields deserialize as empty strings and are rejected by the
/// authenticator, so every validation failure produces the same JSON error
/// shape.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Unique identity; 1-64 characters of letters, digits, `_`, `.`, `-`.
    #[serde(default, alias = "identity")]
    pub username: String,
    #[serde(default, alias = "secret")]
    pub password: String,
    /// Optional contact address kept with the account.
    #[serde(default)]
    pub email: Option<String>,
}

/// Request body for `POST /login`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default, alias = "identity")]
    pub username: String,
    #[serde(default, alias = "secret")]
    pub password: String,
}

/// Successful registration or login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthResponse {
    pub message: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
}

// =============================================================================
// Upload Models
// =============================================================================

/// Multipart form accepted by `POST /upload` (default field names).
///
/// Field names are configurable; see `UPLOAD_*_FIELD`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    /// The video file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Collection the video is grouped under.
    pub apartment_name: Option<String>,
    /// Slot label; with the collection it names the stored file.
    pub time_of_day: Option<String>,
    /// Suggested file name, used when no slot applies.
    pub file_name: Option<String>,
}

/// Successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UploadResponse {
    pub message: String,
    /// Streaming URL of the stored file, as listed by `GET /videos`.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_legacy_and_alias_field_names() {
        let legacy: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","password":"pw","email":"a@example.com"}"#,
        )
        .unwrap();
        assert_eq!(legacy.username, "alice");
        assert_eq!(legacy.email.as_deref(), Some("a@example.com"));

        let aliased: RegisterRequest =
            serde_json::from_str(r#"{"identity":"bob","secret":"pw"}"#).unwrap();
        assert_eq!(aliased.username, "bob");
        assert_eq!(aliased.password, "pw");
        assert!(aliased.email.is_none());
    }

    #[test]
    fn missing_login_fields_default_to_empty() {
        let request: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(request.username.is_empty());
        assert!(request.password.is_empty());
    }
}
