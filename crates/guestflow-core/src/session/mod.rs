//! Session domain module.
//!
//! This module contains the session document model, the partial progress
//! write applied by the runtime, and the repository interface for the
//! external document store.
//!
//! # Module Structure
//!
//! - `model`: Session document (`SessionSnapshot`, `SessionKey`, `SessionStatus`)
//! - `progress`: Partial writes (`ProgressUpdate`) and their causes (`SyncTrigger`)
//! - `repository`: Repository trait for session persistence

mod model;
mod progress;
mod repository;

pub use model::{SessionKey, SessionSnapshot, SessionStatus};
pub use progress::{ProgressUpdate, SyncTrigger};
pub use repository::SessionRepository;
