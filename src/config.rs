// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded once from the environment at startup into a
//! [`ServerConfig`]. Every variable is optional.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Storage root (videos under `DATA_DIR/videos`) | `./data` |
//! | `CREDENTIALS_FILE` | JSON credential file | `DATA_DIR/users.json` |
//! | `JWT_SECRET` | Token signing secret | read from or generated into `DATA_DIR/jwt-secret` |
//! | `TOKEN_TTL_SECS` | Token lifetime | `86400` |
//! | `BCRYPT_COST` | bcrypt cost factor (4-31) | `10` |
//! | `MAX_UPLOAD_BYTES` | Request body limit on `/upload` | `1073741824` |
//! | `UPLOAD_FILE_FIELD` | Multipart field with the file | `file` |
//! | `UPLOAD_NAME_FIELD` | Multipart field with a suggested name | `fileName` |
//! | `UPLOAD_COLLECTION_FIELD` | Multipart field with the collection | `apartmentName` |
//! | `UPLOAD_LABEL_FIELD` | Multipart field with the slot label | `timeOfDay` |
//! | `UPLOAD_REQUIRE_COLLECTION` | Collection field is mandatory | `true` |
//! | `UPLOAD_REQUIRE_LABEL` | Label field is mandatory | `true` |
//! | `STREAM_REQUIRE_AUTH` | Streaming needs the owner's bearer token | `false` |
//! | `STAGING_MAX_AGE_SECS` | Age at which a staged upload is swept | `3600` |
//! | `SWEEP_INTERVAL_SECS` | Interval between staging sweeps | `600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{DEFAULT_BCRYPT_COST, DEFAULT_TOKEN_TTL};
use crate::storage::paths::DATA_ROOT;
use crate::storage::sweeper::{DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};
use crate::storage::UploadFields;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
/// Environment variable name for the storage root.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const CREDENTIALS_FILE_ENV: &str = "CREDENTIALS_FILE";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const UPLOAD_FILE_FIELD_ENV: &str = "UPLOAD_FILE_FIELD";
pub const UPLOAD_NAME_FIELD_ENV: &str = "UPLOAD_NAME_FIELD";
pub const UPLOAD_COLLECTION_FIELD_ENV: &str = "UPLOAD_COLLECTION_FIELD";
pub const UPLOAD_LABEL_FIELD_ENV: &str = "UPLOAD_LABEL_FIELD";
pub const UPLOAD_REQUIRE_COLLECTION_ENV: &str = "UPLOAD_REQUIRE_COLLECTION";
pub const UPLOAD_REQUIRE_LABEL_ENV: &str = "UPLOAD_REQUIRE_LABEL";
pub const STREAM_REQUIRE_AUTH_ENV: &str = "STREAM_REQUIRE_AUTH";
pub const STAGING_MAX_AGE_ENV: &str = "STAGING_MAX_AGE_SECS";
pub const SWEEP_INTERVAL_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_PORT: u16 = 3000;

/// 1 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("expected `json` or `pretty`, got `{other}`")),
        }
    }
}

/// Certificate and key PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Overrides `DATA_DIR/users.json`.
    pub credentials_file: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub max_upload_bytes: usize,
    pub upload_fields: UploadFields,
    pub stream_requires_auth: bool,
    pub staging_max_age: Duration,
    pub sweep_interval: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DATA_ROOT),
            credentials_file: None,
            jwt_secret: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_fields: UploadFields::default(),
            stream_requires_auth: false,
            staging_max_age: DEFAULT_MAX_AGE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            tls: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let mut upload_fields = defaults.upload_fields.clone();
        if let Some(field) = get(UPLOAD_FILE_FIELD_ENV) {
            upload_fields.file = field;
        }
        if let Some(field) = get(UPLOAD_NAME_FIELD_ENV) {
            upload_fields.name = field;
        }
        if let Some(field) = get(UPLOAD_COLLECTION_FIELD_ENV) {
            upload_fields.collection = field;
        }
        if let Some(field) = get(UPLOAD_LABEL_FIELD_ENV) {
            upload_fields.label = field;
        }
        upload_fields.require_collection = parse_or(
            UPLOAD_REQUIRE_COLLECTION_ENV,
            get(UPLOAD_REQUIRE_COLLECTION_ENV),
            upload_fields.require_collection,
        )?;
        upload_fields.require_label = parse_or(
            UPLOAD_REQUIRE_LABEL_ENV,
            get(UPLOAD_REQUIRE_LABEL_ENV),
            upload_fields.require_label,
        )?;

        let bcrypt_cost = parse_or(BCRYPT_COST_ENV, get(BCRYPT_COST_ENV), defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: BCRYPT_COST_ENV,
                value: bcrypt_cost.to_string(),
                reason: "must be between 4 and 31".to_string(),
            });
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            host: parse_or(HOST_ENV, get(HOST_ENV), defaults.host)?,
            port: parse_or(PORT_ENV, get(PORT_ENV), defaults.port)?,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from).unwrap_or(defaults.data_dir),
            credentials_file: get(CREDENTIALS_FILE_ENV).map(PathBuf::from),
            jwt_secret: get(JWT_SECRET_ENV),
            token_ttl: secs_or(TOKEN_TTL_ENV, get(TOKEN_TTL_ENV), defaults.token_ttl)?,
            bcrypt_cost,
            max_upload_bytes: parse_or(
                MAX_UPLOAD_BYTES_ENV,
                get(MAX_UPLOAD_BYTES_ENV),
                defaults.max_upload_bytes,
            )?,
            upload_fields,
            stream_requires_auth: parse_or(
                STREAM_REQUIRE_AUTH_ENV,
                get(STREAM_REQUIRE_AUTH_ENV),
                defaults.stream_requires_auth,
            )?,
            staging_max_age: secs_or(
                STAGING_MAX_AGE_ENV,
                get(STAGING_MAX_AGE_ENV),
                defaults.staging_max_age,
            )?,
            sweep_interval: secs_or(
                SWEEP_INTERVAL_ENV,
                get(SWEEP_INTERVAL_ENV),
                defaults.sweep_interval,
            )?,
            tls,
            log_format: parse_or(LOG_FORMAT_ENV, get(LOG_FORMAT_ENV), defaults.log_format)?,
        })
    }

    /// Defaults with a different storage root.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn secs_or(var: &'static str, value: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    let secs = parse_or(var, value, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.upload_fields, UploadFields::default());
        assert!(!config.stream_requires_auth);
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn variables_override_defaults() {
        let config = load(&[
            ("PORT", "4000"),
            ("DATA_DIR", "/srv/videos"),
            ("TOKEN_TTL_SECS", "7200"),
            ("UPLOAD_FILE_FIELD", "video"),
            ("UPLOAD_REQUIRE_LABEL", "false"),
            ("STREAM_REQUIRE_AUTH", "true"),
            ("LOG_FORMAT", "JSON"),
            ("TLS_CERT_PATH", "cert.pem"),
            ("TLS_KEY_PATH", "key.pem"),
        ])
        .unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.token_ttl, Duration::from_secs(7200));
        assert_eq!(config.upload_fields.file, "video");
        assert!(!config.upload_fields.require_label);
        assert!(config.upload_fields.require_collection);
        assert!(config.stream_requires_auth);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.tls.unwrap().cert, PathBuf::from("cert.pem"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("PORT", "  "), ("JWT_SECRET", "")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.jwt_secret.is_none());
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("BCRYPT_COST", "3")]),
            Err(ConfigError::Invalid { var: "BCRYPT_COST", .. })
        ));
        assert!(matches!(
            load(&[("SWEEP_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn tls_needs_both_files() {
        assert!(matches!(
            load(&[("TLS_CERT_PATH", "cert.pem")]),
            Err(ConfigError::IncompleteTls)
        ));
    }
}
