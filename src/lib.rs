// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Video Vault - Authenticated Per-User Video Storage
//!
//! Users register and log in for a bearer token, upload videos into a
//! private namespace on the local filesystem, list them, and stream them
//! back with HTTP byte-range support.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Accounts, bcrypt hashing and bearer tokens (HS256 JWT)
//! - `storage` - Per-user namespaces, upload ingestion and listing
//! - `streaming` - Range-aware file responses

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod streaming;
