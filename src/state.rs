// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{
    resolve_signing_secret, AuthError, Authenticator, CredentialStore, CredentialStoreError,
    FileCredentialStore, TokenIssuer,
};
use crate::config::ServerConfig;
use crate::storage::{CatalogLister, IngestPipeline, StoragePaths, UserNamespace};
use crate::streaming::RangeStreamer;

/// Error type for building the application state at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to resolve token signing secret: {0}")]
    Secret(#[source] std::io::Error),
    #[error("failed to open credential store: {0}")]
    Credentials(#[from] CredentialStoreError),
    #[error("failed to initialise authenticator: {0}")]
    Auth(#[from] AuthError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub authenticator: Arc<Authenticator>,
    pub namespace: UserNamespace,
    pub ingest: IngestPipeline,
    pub catalog: CatalogLister,
    pub streamer: RangeStreamer,
}

impl AppState {
    /// Wire the components over one storage root and credential store.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn CredentialStore>,
        signing_secret: &[u8],
    ) -> Result<Self, AuthError> {
        let namespace = UserNamespace::new(StoragePaths::new(&config.data_dir));
        let tokens = TokenIssuer::new(signing_secret, config.token_ttl);
        let authenticator =
            Authenticator::new(store, tokens, namespace.clone(), config.bcrypt_cost)?;

        Ok(Self {
            ingest: IngestPipeline::new(namespace.clone(), config.upload_fields.clone()),
            catalog: CatalogLister::new(namespace.clone()),
            streamer: RangeStreamer::new(namespace.clone()),
            authenticator: Arc::new(authenticator),
            namespace,
            config: Arc::new(config),
        })
    }

    /// Build the production state: file-backed credentials and a persisted
    /// or configured signing secret.
    pub fn from_config(config: ServerConfig) -> Result<Self, StartupError> {
        let paths = StoragePaths::new(&config.data_dir);
        let secret = resolve_signing_secret(config.jwt_secret.as_deref(), &paths.jwt_secret_file())
            .map_err(StartupError::Secret)?;
        let credentials_file = config
            .credentials_file
            .clone()
            .unwrap_or_else(|| paths.credentials_file());
        let store = FileCredentialStore::open(credentials_file)?;

        Ok(Self::new(config, Arc::new(store), secret.as_bytes())?)
    }

    /// In-memory credentials, a fixed secret and the cheapest bcrypt cost.
    #[cfg(test)]
    pub fn for_tests(mut config: ServerConfig) -> Result<Self, AuthError> {
        config.bcrypt_cost = 4;
        Self::new(
            config,
            Arc::new(crate::auth::InMemoryCredentialStore::new()),
            b"test-signing-secret",
        )
    }
}
