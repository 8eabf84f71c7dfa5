//! TOML-based ExperienceRepository implementation.
//!
//! Reads published experience definitions, one per file:
//!
//! ```toml
//! id = "welcome"
//! projectId = "demo"
//! name = "Welcome survey"
//!
//! [[steps]]
//! id = "rating"
//! type = "input.scale"
//! config = { prompt = "How was your visit?", min = 1, max = 5, required = true }
//! ```

use async_trait::async_trait;
use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::experience::{Experience, ExperienceRepository};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::storage::AtomicTomlFile;

/// Loads experiences from `<dir>/<experience_id>.toml`.
pub struct TomlExperienceRepository {
    dir: PathBuf,
}

impl TomlExperienceRepository {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Loads a single experience file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist or is empty
    /// - `Serialization` if it is not a valid experience document
    pub fn load_file(path: &Path) -> Result<Experience> {
        AtomicTomlFile::<Experience>::new(path.to_path_buf())
            .load()?
            .ok_or_else(|| GuestflowError::not_found("Experience file", path.display().to_string()))
    }

    fn find_sync(dir: &Path, experience_id: &str) -> Result<Option<Experience>> {
        if experience_id.is_empty() || experience_id.contains(['/', '\\']) || experience_id.starts_with('.') {
            return Ok(None);
        }

        let path = dir.join(format!("{}.toml", experience_id));
        let Some(experience) = AtomicTomlFile::<Experience>::new(path.clone()).load()? else {
            return Ok(None);
        };

        if experience.id != experience_id {
            return Err(GuestflowError::data_access(format!(
                "{} declares id '{}', expected '{}'",
                path.display(),
                experience.id,
                experience_id
            )));
        }
        Ok(Some(experience))
    }

    fn list_sync(dir: &Path) -> Result<Vec<Experience>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut experiences = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match Self::load_file(&path) {
                Ok(experience) => experiences.push(experience),
                Err(e) => tracing::warn!(
                    "[TomlExperienceRepository] Skipping {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        experiences.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(experiences)
    }
}

#[async_trait]
impl ExperienceRepository for TomlExperienceRepository {
    async fn find_by_id(&self, experience_id: &str) -> Result<Option<Experience>> {
        let dir = self.dir.clone();
        let experience_id = experience_id.to_string();

        task::spawn_blocking(move || Self::find_sync(&dir, &experience_id))
            .await
            .map_err(|e| GuestflowError::io(format!("Failed to spawn blocking task: {}", e)))?
    }

    async fn list_all(&self) -> Result<Vec<Experience>> {
        let dir = self.dir.clone();

        task::spawn_blocking(move || Self::list_sync(&dir))
            .await
            .map_err(|e| GuestflowError::io(format!("Failed to spawn blocking task: {}", e)))?
    }
}
