//! Experience repository trait.

use async_trait::async_trait;

use super::model::Experience;
use crate::error::Result;

/// Read access to published experience definitions.
///
/// Authoring (create/rename/delete) happens in the admin application; the
/// runtime only needs to look definitions up.
#[async_trait]
pub trait ExperienceRepository: Send + Sync {
    /// Finds an experience by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Experience))`: Experience found
    /// - `Ok(None)`: Experience not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, experience_id: &str) -> Result<Option<Experience>>;

    /// Lists all available experiences.
    async fn list_all(&self) -> Result<Vec<Experience>>;
}
