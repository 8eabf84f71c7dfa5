use anyhow::{Context, Result};
use guestflow_core::config::AppConfig;
use guestflow_core::error::GuestflowError;
use guestflow_infrastructure::{ConfigService, GuestflowPaths};
use std::path::{Path, PathBuf};

/// Resolved storage locations and configuration for one CLI invocation.
pub struct Workspace {
    pub paths: GuestflowPaths,
    pub config: AppConfig,
}

impl Workspace {
    /// Resolves paths under `data_dir` when given, otherwise at the platform
    /// defaults, and loads `config_file` or the `config.toml` found there.
    pub fn resolve(data_dir: Option<&Path>, config_file: Option<&Path>) -> Result<Self> {
        let paths = GuestflowPaths::new(data_dir).context("Failed to resolve storage paths")?;
        let service = match config_file {
            Some(path) => ConfigService::new(path),
            None => ConfigService::for_paths(&paths),
        };
        let config = service
            .get_config()
            .with_context(|| format!("Failed to load {}", service.path().display()))?;

        tracing::debug!(
            "[Workspace] config={} data={}",
            paths.config_dir().display(),
            paths.data_dir().display()
        );
        Ok(Self { paths, config })
    }

    /// Root of the session document store.
    ///
    /// `storage.data_dir` from the config file wins over the platform data dir.
    pub fn session_root(&self) -> PathBuf {
        self.config
            .storage
            .data_dir
            .clone()
            .unwrap_or_else(|| self.paths.data_dir().to_path_buf())
    }

    pub fn experiences_dir(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.experiences_dir())
    }
}

/// Short message for a runtime error, without the variant prefix where the
/// reason alone reads better.
pub fn describe(err: &GuestflowError) -> String {
    match err {
        GuestflowError::IllegalOperation { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
