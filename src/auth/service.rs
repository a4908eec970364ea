// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and token verification.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::credentials::{CredentialStore, CredentialStoreError, UserRecord};
use super::password::{hash_password, verify_password};
use super::tokens::{NoRevocation, RevocationList, TokenIssuer};
use super::{AuthError, AuthenticatedUser};
use crate::storage::UserNamespace;

/// Maximum identity length.
const MAX_IDENTITY_LEN: usize = 64;

/// Verified against when the identity is unknown, so that both login
/// failure cases cost one bcrypt verification.
const DUMMY_SECRET: &str = "video-vault-dummy-secret";

/// Check that an identity is usable as a namespace directory and URL segment.
pub fn validate_identity(identity: &str) -> Result<(), AuthError> {
    let valid_chars = identity
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if identity.is_empty()
        || identity.len() > MAX_IDENTITY_LEN
        || identity.starts_with('.')
        || !valid_chars
    {
        return Err(AuthError::InvalidInput(format!(
            "username must be 1-{MAX_IDENTITY_LEN} characters of letters, digits, '_', '.', '-' and not start with '.'"
        )));
    }
    Ok(())
}

/// Run a CPU- or disk-bound auth step off the async executor threads.
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::InternalError(format!("blocking task failed: {e}")))?
}

fn store_error(e: CredentialStoreError) -> AuthError {
    match e {
        CredentialStoreError::Duplicate(_) => AuthError::DuplicateIdentity,
        other => AuthError::InternalError(other.to_string()),
    }
}

/// Verifies credentials, issues tokens and gates protected requests.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
    namespace: UserNamespace,
    revocation: Arc<dyn RevocationList>,
    hash_cost: u32,
    dummy_hash: Arc<str>,
}

impl Authenticator {
    /// Create an authenticator. Fails if `hash_cost` is not a valid bcrypt
    /// cost.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenIssuer,
        namespace: UserNamespace,
        hash_cost: u32,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hash_password(DUMMY_SECRET, hash_cost)?;
        Ok(Self {
            store,
            tokens,
            namespace,
            revocation: Arc::new(NoRevocation),
            hash_cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Replace the revocation list consulted by [`Authenticator::verify`].
    pub fn with_revocation(mut self, revocation: Arc<dyn RevocationList>) -> Self {
        self.revocation = revocation;
        self
    }

    /// Token issuer in use.
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a new identity and return a fresh token.
    ///
    /// Persists a salted hash of `secret` and creates the identity's empty
    /// namespace directory.
    pub async fn register(
        &self,
        identity: &str,
        secret: &str,
        email: Option<String>,
    ) -> Result<String, AuthError> {
        validate_identity(identity)?;
        if secret.is_empty() {
            return Err(AuthError::InvalidInput("password is required".to_string()));
        }

        // Namespace first: a failed registration must not leave a record.
        self.namespace
            .ensure(identity)
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let store = Arc::clone(&self.store);
        let cost = self.hash_cost;
        let record_identity = identity.to_string();
        let secret = secret.to_string();
        run_blocking(move || {
            if store.get(&record_identity).map_err(store_error)?.is_some() {
                return Err(AuthError::DuplicateIdentity);
            }
            let password_hash = hash_password(&secret, cost)?;
            store
                .insert(UserRecord {
                    identity: record_identity,
                    password_hash,
                    email,
                    created_at: Some(Utc::now()),
                })
                .map_err(store_error)
        })
        .await?;

        info!(identity, "User registered");
        self.tokens.issue(identity)
    }

    /// Check credentials and return a fresh token.
    ///
    /// Unknown identities and wrong secrets both yield
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, identity: &str, secret: &str) -> Result<String, AuthError> {
        if identity.is_empty() || secret.is_empty() {
            return Err(AuthError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let store = Arc::clone(&self.store);
        let dummy_hash = Arc::clone(&self.dummy_hash);
        let lookup = identity.to_string();
        let secret = secret.to_string();
        let matches = run_blocking(move || match store.get(&lookup).map_err(store_error)? {
            Some(record) => verify_password(&secret, &record.password_hash),
            None => verify_password(&secret, &dummy_hash).map(|_| false),
        })
        .await?;

        if !matches {
            warn!(identity, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        info!(identity, "Login succeeded");
        self.tokens.issue(identity)
    }

    /// Verify a presented token and bind the request to its identity.
    pub fn verify(&self, token: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let token = token.ok_or(AuthError::MissingAuthHeader)?;
        let claims = self.tokens.verify(token)?;
        if self.revocation.is_revoked(&claims) {
            return Err(AuthError::TokenRevoked);
        }
        Ok(AuthenticatedUser::from_claims(claims))
    }
}
