// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Local username/password accounts with stateless bearer tokens.
//!
//! ## Auth Flow
//!
//! 1. Client registers (`POST /register`) or logs in (`POST /login`)
//! 2. Server verifies the bcrypt hash held by the [`CredentialStore`] and
//!    returns an HS256 token whose `sub` is the identity
//! 3. Client sends `Authorization: Bearer <token>` on protected routes
//! 4. The [`Auth`] extractor verifies signature and expiry and binds the
//!    request to the identity
//!
//! ## Security
//!
//! - Secrets are only ever persisted as bcrypt hashes
//! - Unknown identity and wrong secret are indistinguishable to the caller
//! - Token verification never touches the credential store
//! - A token is rejected as soon as its `exp` has passed

pub mod claims;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod password;
pub mod service;
pub mod tokens;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use credentials::{
    CredentialStore, CredentialStoreError, FileCredentialStore, InMemoryCredentialStore,
    UserRecord,
};
pub use error::AuthError;
pub use extractor::{authenticate, bearer_token, Auth};
pub use password::DEFAULT_BCRYPT_COST;
pub use service::{validate_identity, Authenticator};
pub use tokens::{resolve_signing_secret, NoRevocation, RevocationList, TokenIssuer, DEFAULT_TOKEN_TTL};
