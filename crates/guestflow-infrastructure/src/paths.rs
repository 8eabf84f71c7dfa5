//! Path management for Guestflow configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/guestflow/             # Config directory
//! └── config.toml                  # Application configuration
//!
//! ~/.local/share/guestflow/        # Data directory (default storage root)
//! ├── experiences/                 # Published experience definitions
//! │   └── <experience_id>.toml
//! └── projects/
//!     └── <project_id>/
//!         └── sessions/            # Session documents
//!             └── <session_id>.toml
//! ```
//!
//! A base override places both trees under one directory, which is what
//! tests and `--data-dir` use.

use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "guestflow";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// The platform config or data directory could not be determined.
    #[error("Cannot determine the platform {0} directory")]
    PlatformDirNotFound(&'static str),
}

/// Resolved config and data roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestflowPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl GuestflowPaths {
    /// Resolves paths, under `base` when given, otherwise at the platform
    /// defaults (XDG on Linux, the equivalent elsewhere).
    pub fn new(base: Option<&Path>) -> Result<Self, PathError> {
        match base {
            Some(base) => Ok(Self::with_base(base)),
            None => Self::platform(),
        }
    }

    /// Places config and data under a single directory.
    pub fn with_base(base: &Path) -> Self {
        Self {
            config_dir: base.to_path_buf(),
            data_dir: base.to_path_buf(),
        }
    }

    fn platform() -> Result<Self, PathError> {
        let config_dir = dirs::config_dir()
            .ok_or(PathError::PlatformDirNotFound("config"))?
            .join(APP_DIR);
        let data_dir = dirs::data_dir()
            .ok_or(PathError::PlatformDirNotFound("data"))?
            .join(APP_DIR);
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn experiences_dir(&self) -> PathBuf {
        self.data_dir.join("experiences")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_override_layout() {
        let paths = GuestflowPaths::new(Some(Path::new("/srv/guestflow"))).unwrap();

        assert_eq!(paths.config_file(), PathBuf::from("/srv/guestflow/config.toml"));
        assert_eq!(paths.data_dir(), Path::new("/srv/guestflow"));
        assert_eq!(
            paths.experiences_dir(),
            PathBuf::from("/srv/guestflow/experiences")
        );
    }

    #[test]
    fn test_platform_dirs_end_with_app_name() {
        // Platform resolution depends on the environment; only check the shape.
        if let Ok(paths) = GuestflowPaths::new(None) {
            assert!(paths.config_dir().ends_with(APP_DIR));
            assert!(paths.data_dir().ends_with(APP_DIR));
            assert!(paths.config_file().starts_with(paths.config_dir()));
        }
    }
}
