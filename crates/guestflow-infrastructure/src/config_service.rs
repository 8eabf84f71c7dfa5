//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the application
//! configuration from `config.toml` (by default `~/.config/guestflow/config.toml`).

use guestflow_core::config::AppConfig;
use guestflow_core::error::{GuestflowError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::paths::GuestflowPaths;
use crate::storage::AtomicTomlFile;

/// Configuration service that loads and caches the application configuration.
///
/// A missing file is created with the defaults on first load so there is
/// always a file to edit.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service for the config file of the given paths.
    pub fn for_paths(paths: &GuestflowPaths) -> Self {
        Self::new(paths.config_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file exists but cannot be read or parsed.
    pub fn get_config(&self) -> Result<AppConfig> {
        {
            let cached = self.config.read().map_err(|_| lock_poisoned())?;
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load_config()?;
        *self.config.write().map_err(|_| lock_poisoned())? = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) -> Result<()> {
        *self.config.write().map_err(|_| lock_poisoned())? = None;
        Ok(())
    }

    fn load_config(&self) -> Result<AppConfig> {
        let file = AtomicTomlFile::<AppConfig>::new(self.path.clone());

        let loaded = file.load().map_err(|e| {
            GuestflowError::config(format!("Failed to load {}: {}", self.path.display(), e))
        })?;

        match loaded {
            Some(config) => {
                tracing::debug!("[ConfigService] Loaded {}", self.path.display());
                Ok(config)
            }
            None => {
                let config = AppConfig::default();
                if let Err(e) = file.save(&config) {
                    // A read-only config dir must not stop the runtime.
                    tracing::warn!("[ConfigService] Could not write default config: {}", e);
                } else {
                    tracing::info!("[ConfigService] Created default {}", self.path.display());
                }
                Ok(config)
            }
        }
    }
}

fn lock_poisoned() -> GuestflowError {
    GuestflowError::internal("config cache lock poisoned")
}
