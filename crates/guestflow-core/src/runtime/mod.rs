//! Runtime state of an attached guest run.
//!
//! # Module Structure
//!
//! - `store`: The state machine over the step cursor (`RuntimeStore`)
//! - `state`: Read-side views (`RuntimeState`, `RuntimeSnapshot`, `RuntimePhase`)

mod state;
mod store;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{GuestflowError, Result};

pub use state::{RuntimePhase, RuntimeSnapshot, RuntimeState};
pub use store::RuntimeStore;

/// Store handle shared by the façade and the sync orchestrator.
///
/// Guards are never held across an `.await`.
pub type SharedRuntimeStore = Arc<RwLock<RuntimeStore>>;

/// Acquires a read guard, mapping lock poisoning to an internal error.
pub fn read_store(store: &SharedRuntimeStore) -> Result<RwLockReadGuard<'_, RuntimeStore>> {
    store
        .read()
        .map_err(|_| GuestflowError::internal("runtime store lock poisoned"))
}

/// Acquires a write guard, mapping lock poisoning to an internal error.
pub fn write_store(store: &SharedRuntimeStore) -> Result<RwLockWriteGuard<'_, RuntimeStore>> {
    store
        .write()
        .map_err(|_| GuestflowError::internal("runtime store lock poisoned"))
}
