//! Subcommand implementations.

pub mod canonicalize;
pub mod history;
pub mod import;
pub mod init;
pub mod issue;
pub mod reissue;
pub mod revoke;
pub mod verify;

use idir_core::Actor;
use idir_issuance::IssuanceService;
use idir_store::Store;
use std::error::Error;
use std::path::PathBuf;

use crate::config::IdirConfig;

/// Resolved configuration shared by the storage-backed commands.
pub struct Context {
    pub config: IdirConfig,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>, database: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let mut config = IdirConfig::load(config_path.as_deref())?;
        if let Some(path) = database {
            config.store.database_path = path;
        }
        Ok(Self { config })
    }

    pub fn open_store(&self) -> Result<Store, Box<dyn Error>> {
        Ok(Store::open(&self.config.store)?)
    }

    pub fn service(&self) -> Result<IssuanceService, Box<dyn Error>> {
        let hasher = self.config.hasher()?;
        tracing::debug!(hasher = hasher.name(), "identity hasher selected");
        Ok(IssuanceService::new(self.open_store()?).with_hasher(hasher))
    }
}

/// Operator running the command.
pub fn manual_actor(email: Option<String>) -> Actor {
    Actor::manual(email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()))
}
