//! Step validation.
//!
//! Validation is a pure, total function of `(step, value)`: no I/O, no
//! panics, and every failure is returned as a [`ValidationResult`] carrying a
//! guest-facing message.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::UnknownStepPolicy;
use crate::experience::{
    MultiSelectConfig, ResponseValue, ScaleConfig, Step, StepKind, TextConfig, YesNoConfig,
};

/// Outcome of validating one step's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

/// Validates responses against step definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepValidator {
    unknown_step_policy: UnknownStepPolicy,
}

impl StepValidator {
    pub fn new(unknown_step_policy: UnknownStepPolicy) -> Self {
        Self {
            unknown_step_policy,
        }
    }

    pub fn unknown_step_policy(&self) -> UnknownStepPolicy {
        self.unknown_step_policy
    }

    /// Validates `value` (the current response, if any) for `step`.
    pub fn validate(&self, step: &Step, value: Option<&ResponseValue>) -> ValidationResult {
        match &step.kind {
            StepKind::Info(_) => ValidationResult::valid(),
            StepKind::Scale(config) => validate_scale(config, value),
            StepKind::YesNo(config) => validate_yes_no(config, value),
            StepKind::MultiSelect(config) => validate_multi_select(config, value),
            StepKind::ShortText(config) | StepKind::LongText(config) => {
                validate_text(config, value)
            }
            // Proceeding past a capture is gated on captured media, which is
            // not a response.
            StepKind::Capture { .. } => ValidationResult::valid(),
            StepKind::Unknown { type_name, .. } => match self.unknown_step_policy {
                UnknownStepPolicy::Allow => ValidationResult::valid(),
                UnknownStepPolicy::Block => ValidationResult::invalid(format!(
                    "This step ({}) is not supported yet",
                    type_name
                )),
            },
        }
    }
}

/// Validates with the default (permissive) unknown-step policy.
pub fn validate(step: &Step, value: Option<&ResponseValue>) -> ValidationResult {
    StepValidator::default().validate(step, value)
}

fn validate_scale(config: &ScaleConfig, value: Option<&ResponseValue>) -> ValidationResult {
    let Some(value) = value else {
        return if config.required {
            ValidationResult::invalid("Please select a value")
        } else {
            ValidationResult::valid()
        };
    };

    let ResponseValue::Number(number) = value else {
        return ValidationResult::invalid("Please select a valid number");
    };
    if !number.is_finite() {
        return ValidationResult::invalid("Please select a valid number");
    }
    if number.fract() != 0.0 {
        return ValidationResult::invalid("Please select a whole number");
    }

    let (min, max) = config.bounds();
    if *number < min as f64 || *number > max as f64 {
        return ValidationResult::invalid(format!(
            "Please select a value between {} and {}",
            min, max
        ));
    }

    ValidationResult::valid()
}

fn validate_yes_no(config: &YesNoConfig, value: Option<&ResponseValue>) -> ValidationResult {
    match value {
        None => {
            if config.required {
                ValidationResult::invalid("Please select Yes or No")
            } else {
                ValidationResult::valid()
            }
        }
        Some(ResponseValue::Boolean(_)) => ValidationResult::valid(),
        Some(ResponseValue::Text(text)) if text == "yes" || text == "no" => {
            ValidationResult::valid()
        }
        Some(_) => ValidationResult::invalid("Please answer Yes or No"),
    }
}

fn validate_multi_select(
    config: &MultiSelectConfig,
    value: Option<&ResponseValue>,
) -> ValidationResult {
    let selected: &[String] = match value {
        None => &[],
        Some(ResponseValue::Selection(values)) => values,
        Some(_) => return ValidationResult::invalid("Please choose from the listed options"),
    };

    if selected.is_empty() {
        return if config.required {
            ValidationResult::invalid("Please select at least one option")
        } else {
            ValidationResult::valid()
        };
    }

    let allowed: HashSet<&str> = config.options.iter().map(String::as_str).collect();
    if let Some(unknown) = selected.iter().find(|v| !allowed.contains(v.as_str())) {
        return ValidationResult::invalid(format!("'{}' is not one of the options", unknown));
    }

    let distinct: HashSet<&str> = selected.iter().map(String::as_str).collect();
    if distinct.len() != selected.len() {
        return ValidationResult::invalid("Each option can only be selected once");
    }

    if !config.multi_select && selected.len() != 1 {
        return ValidationResult::invalid("Please select exactly one option");
    }

    ValidationResult::valid()
}

fn validate_text(config: &TextConfig, value: Option<&ResponseValue>) -> ValidationResult {
    let text = match value {
        None => "",
        Some(ResponseValue::Text(text)) => text.as_str(),
        Some(_) => return ValidationResult::invalid("Please enter text"),
    };

    if text.trim().is_empty() {
        return if config.required {
            ValidationResult::invalid("This field is required")
        } else {
            ValidationResult::valid()
        };
    }

    let max = config.max_length();
    if text.chars().count() > max {
        return ValidationResult::invalid(format!(
            "Please keep your answer under {} characters",
            max
        ));
    }

    ValidationResult::valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experience::{CaptureConfig, CaptureMedia};

    fn scale(min: Option<i64>, max: Option<i64>, required: bool) -> Step {
        Step::new(
            "rate",
            StepKind::Scale(ScaleConfig {
                min,
                max,
                required,
                ..Default::default()
            }),
        )
    }

    fn select(options: &[&str], multi_select: bool, required: bool) -> Step {
        Step::new(
            "pick",
            StepKind::MultiSelect(MultiSelectConfig {
                options: options.iter().map(|o| o.to_string()).collect(),
                multi_select,
                required,
                ..Default::default()
            }),
        )
    }

    fn short_text(max_length: Option<usize>, required: bool) -> Step {
        Step::new(
            "name",
            StepKind::ShortText(TextConfig {
                max_length,
                required,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_info_is_always_valid() {
        let step = Step::new("intro", StepKind::Info(Default::default()));
        assert!(validate(&step, None).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Boolean(false))).is_valid);
    }

    #[test]
    fn test_scale_required_missing() {
        let result = validate(&scale(None, None, true), None);
        assert_eq!(result, ValidationResult::invalid("Please select a value"));
    }

    #[test]
    fn test_scale_optional_missing_is_valid() {
        assert!(validate(&scale(None, None, false), None).is_valid);
    }

    #[test]
    fn test_scale_bounds_and_integrality() {
        let step = scale(Some(1), Some(5), true);

        assert!(validate(&step, Some(&ResponseValue::Number(3.0))).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Number(1.0))).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Number(5.0))).is_valid);

        let out_of_range = validate(&step, Some(&ResponseValue::Number(6.0)));
        assert_eq!(
            out_of_range.error.as_deref(),
            Some("Please select a value between 1 and 5")
        );

        let fractional = validate(&step, Some(&ResponseValue::Number(2.5)));
        assert_eq!(fractional.error.as_deref(), Some("Please select a whole number"));

        let not_a_number = validate(&step, Some(&ResponseValue::Text("3".to_string())));
        assert!(!not_a_number.is_valid);

        let nan = validate(&step, Some(&ResponseValue::Number(f64::NAN)));
        assert!(!nan.is_valid);
    }

    #[test]
    fn test_scale_default_bounds() {
        let step = scale(None, None, false);
        assert!(!validate(&step, Some(&ResponseValue::Number(0.0))).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Number(5.0))).is_valid);
    }

    #[test]
    fn test_yes_no_sentinels() {
        let step = Step::new(
            "agree",
            StepKind::YesNo(YesNoConfig {
                required: true,
                ..Default::default()
            }),
        );

        assert!(!validate(&step, None).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Boolean(false))).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Text("yes".to_string()))).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Text("no".to_string()))).is_valid);
        assert!(!validate(&step, Some(&ResponseValue::Text("ye".to_string()))).is_valid);
        assert!(!validate(&step, Some(&ResponseValue::Text("Yes please".to_string()))).is_valid);
        assert!(!validate(&step, Some(&ResponseValue::Number(1.0))).is_valid);
    }

    #[test]
    fn test_single_select_scenario() {
        let step = select(&["a", "b", "c"], false, true);

        let two = validate(&step, Some(&ResponseValue::from(vec!["a", "b"])));
        assert_eq!(two.error.as_deref(), Some("Please select exactly one option"));

        let unknown = validate(&step, Some(&ResponseValue::from(vec!["z"])));
        assert_eq!(unknown.error.as_deref(), Some("'z' is not one of the options"));

        assert!(validate(&step, Some(&ResponseValue::from(vec!["b"]))).is_valid);
    }

    #[test]
    fn test_multi_select_rules() {
        let step = select(&["a", "b", "c"], true, false);

        assert!(validate(&step, None).is_valid);
        assert!(validate(&step, Some(&ResponseValue::Selection(vec![]))).is_valid);
        assert!(validate(&step, Some(&ResponseValue::from(vec!["a", "c"]))).is_valid);
        assert!(!validate(&step, Some(&ResponseValue::from(vec!["a", "q"]))).is_valid);
        assert!(!validate(&step, Some(&ResponseValue::from(vec!["a", "a"]))).is_valid);

        let required = select(&["a"], true, true);
        let empty = validate(&required, Some(&ResponseValue::Selection(vec![])));
        assert_eq!(empty.error.as_deref(), Some("Please select at least one option"));
    }

    #[test]
    fn test_text_required_whitespace() {
        let required = short_text(None, true);
        assert_eq!(
            validate(&required, Some(&ResponseValue::Text("   \n".to_string()))).error.as_deref(),
            Some("This field is required")
        );
        assert!(validate(&required, Some(&ResponseValue::Text(" hi ".to_string()))).is_valid);

        let optional = short_text(None, false);
        assert!(validate(&optional, Some(&ResponseValue::Text("  ".to_string()))).is_valid);
        assert!(validate(&optional, None).is_valid);
    }

    #[test]
    fn test_text_max_length_counts_characters() {
        let step = short_text(Some(3), false);

        assert!(validate(&step, Some(&ResponseValue::Text("äöü".to_string()))).is_valid);
        let too_long = validate(&step, Some(&ResponseValue::Text("abcd".to_string())));
        assert_eq!(
            too_long.error.as_deref(),
            Some("Please keep your answer under 3 characters")
        );

        let default_limit = short_text(None, false);
        let long = "x".repeat(1001);
        assert!(!validate(&default_limit, Some(&ResponseValue::Text(long))).is_valid);
    }

    #[test]
    fn test_capture_always_valid() {
        let step = Step::new(
            "cam",
            StepKind::Capture {
                media: CaptureMedia::Photo,
                config: CaptureConfig::default(),
            },
        );
        assert!(validate(&step, None).is_valid);
    }

    #[test]
    fn test_unknown_step_policy() {
        let step = Step::new(
            "sig",
            StepKind::Unknown {
                type_name: "input.signature".to_string(),
                config: serde_json::json!({}),
            },
        );

        assert!(validate(&step, None).is_valid);

        let blocking = StepValidator::new(UnknownStepPolicy::Block);
        let result = blocking.validate(&step, None);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("input.signature"));
    }
}
