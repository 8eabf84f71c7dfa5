//! The façade rendering code drives a guest run through.

mod facade;

pub use facade::{ExperienceRuntime, NextOutcome};
