pub mod config;
pub mod error;
pub mod experience;
pub mod runtime;
pub mod session;
pub mod validation;

// Re-export common error type
pub use error::{GuestflowError, Result};
