//! Configuration loading.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, then
//! `--database` / `IDIR_DATABASE`.
//!
//! ```toml
//! [store]
//! database_path = "/var/lib/idir/idir.db"
//! max_connections = 4
//! acquire_timeout_ms = 5000
//!
//! [identity]
//! email_hash_key_env = "IDIR_EMAIL_HASH_KEY"
//! ```

use idir_canonical::{IdentityHasher, KeyedIdentityHasher, Sha256IdentityHasher};
use idir_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// File read when no `--config` is given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "idir.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("environment variable {var} must hold a hex-encoded key: {reason}")]
    InvalidKey { var: String, reason: String },
}

/// How student emails are turned into snapshot digests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Environment variable holding a hex HMAC key. Unset means unsalted SHA-256.
    #[serde(default)]
    pub email_hash_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdirConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl IdirConfig {
    /// Loads `path`, or `./idir.toml` if present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: IdirConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Builds the identity hasher the configuration asks for.
    pub fn hasher(&self) -> Result<Arc<dyn IdentityHasher>, ConfigError> {
        let Some(var) = &self.identity.email_hash_key_env else {
            return Ok(Arc::new(Sha256IdentityHasher));
        };
        match std::env::var(var) {
            Ok(value) => {
                let key = hex::decode(value.trim()).map_err(|e| ConfigError::InvalidKey {
                    var: var.clone(),
                    reason: e.to_string(),
                })?;
                if key.is_empty() {
                    return Err(ConfigError::InvalidKey {
                        var: var.clone(),
                        reason: "key is empty".to_string(),
                    });
                }
                Ok(Arc::new(KeyedIdentityHasher::new(key)))
            }
            Err(_) => {
                tracing::warn!(var = %var, "email hash key not set; using unsalted sha256");
                Ok(Arc::new(Sha256IdentityHasher))
            }
        }
    }
}
