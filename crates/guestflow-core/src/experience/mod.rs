//! Experience domain module.
//!
//! # Module Structure
//!
//! - `step`: Step definitions (`Step`, `StepKind` and per-type configs)
//! - `response`: Collected input (`Response`, `ResponseValue`, `CapturedMedia`)
//! - `model`: The published experience (`Experience`)
//! - `repository`: Repository trait for experience lookup

mod model;
mod repository;
mod response;
mod step;

pub use model::Experience;
pub use repository::ExperienceRepository;
pub use response::{upsert_by_step, CapturedMedia, MediaAsset, Response, ResponseValue, StepKeyed};
pub use step::{
    CaptureConfig, CaptureMedia, InfoConfig, MultiSelectConfig, ScaleConfig, Step, StepKind,
    TextConfig, YesNoConfig, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN, DEFAULT_TEXT_MAX_LENGTH,
};
