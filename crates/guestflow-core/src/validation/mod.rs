//! Response validation for input steps.

mod validator;

pub use validator::{validate, StepValidator, ValidationResult};
