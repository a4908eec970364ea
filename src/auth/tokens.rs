// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuing and verification (HS256 JWT).
//!
//! Tokens are stateless: validity depends only on the signature and the
//! `exp` claim. A token cannot be withdrawn before it expires unless a
//! [`RevocationList`] says so; the default list revokes nothing, so a leaked
//! token stays usable for at most one TTL.

use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, TokenClaims};

/// Default token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Hook consulted after a token's signature and expiry check out.
pub trait RevocationList: Send + Sync {
    /// Whether the token carrying these claims has been revoked.
    fn is_revoked(&self, claims: &TokenClaims) -> bool;
}

/// Revokes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocation;

impl RevocationList for NoRevocation {
    fn is_revoked(&self, _claims: &TokenClaims) -> bool {
        false
    }
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer for the given secret and token lifetime.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Mint a token for `identity`, valid from now for one TTL.
    pub fn issue(&self, identity: &str) -> Result<String, AuthError> {
        self.issue_at(identity, Utc::now())
    }

    /// Mint a token as if issued at `now`.
    pub fn issue_at(&self, identity: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let claims = TokenClaims {
            sub: identity.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(format!("jwt encode: {e}")))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })
    }
}

/// Resolve the token signing secret.
///
/// A configured secret wins. Otherwise the secret persisted at
/// `secret_file` is reused, or a new random one is generated and written
/// there so tokens survive restarts.
pub fn resolve_signing_secret(configured: Option<&str>, secret_file: &Path) -> io::Result<String> {
    if let Some(secret) = configured.filter(|s| !s.is_empty()) {
        return Ok(secret.to_string());
    }

    match std::fs::read_to_string(secret_file) {
        Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let secret = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    if let Some(parent) = secret_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_secret_file(secret_file, &secret)?;
    tracing::info!(path = %secret_file.display(), "Generated new token signing secret");
    Ok(secret)
}

/// Write the secret readable by the owner only.
fn write_secret_file(path: &Path, secret: &str) -> io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(secret.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let issuer = issuer();
        let token = issuer.issue("alice").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let issued = Utc::now() - chrono::Duration::hours(2);
        let token = issuer.issue_at("alice", issued).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn token_expired_seconds_ago_is_rejected() {
        let issuer = issuer();
        let issued = Utc::now() - chrono::Duration::seconds(3600 + 5);
        let token = issuer.issue_at("alice", issued).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn token_close_to_expiry_is_still_accepted() {
        let issuer = issuer();
        let issued = Utc::now() - chrono::Duration::seconds(3600 - 30);
        let token = issuer.issue_at("alice", issued).unwrap();
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn token_from_other_secret_has_invalid_signature() {
        let other = TokenIssuer::new(b"other-secret", Duration::from_secs(3600));
        let token = other.issue("alice").unwrap();
        assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let issuer = issuer();
        let token = issuer.issue("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"bob","iat":0,"exp":9999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

        assert!(matches!(issuer.verify(&forged), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(issuer().verify("not.a.jwt"), Err(AuthError::MalformedToken)));
        assert!(matches!(issuer().verify(""), Err(AuthError::MalformedToken)));
    }

    #[test]
    fn configured_secret_wins() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("jwt-secret");
        let secret = resolve_signing_secret(Some("configured"), &file).unwrap();
        assert_eq!(secret, "configured");
        assert!(!file.exists());
    }

    #[test]
    fn generated_secret_is_persisted_and_reused() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("nested").join("jwt-secret");
        let first = resolve_signing_secret(None, &file).unwrap();
        let second = resolve_signing_secret(Some(""), &file).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn generated_secret_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("jwt-secret");
        resolve_signing_secret(None, &file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
