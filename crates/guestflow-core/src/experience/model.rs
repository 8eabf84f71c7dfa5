//! Experience definition model.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::step::{Step, StepKind};
use crate::error::{GuestflowError, Result};

/// A named, ordered sequence of steps as published by the editor.
///
/// The runtime only reads experiences; steps are never mutated or reordered
/// once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Experience {
    /// Checks structural rules the runtime relies on.
    ///
    /// Collects every problem instead of stopping at the first one so an
    /// author can fix a definition in a single pass.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDefinition` listing all violations.
    pub fn validate_definition(&self) -> Result<()> {
        let problems = self.definition_problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(GuestflowError::InvalidDefinition(problems.join("; ")))
        }
    }

    /// Lists structural problems in the step list.
    pub fn definition_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for (index, step) in self.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                problems.push(format!("step #{} has an empty id", index));
            } else if !seen.insert(step.id.as_str()) {
                problems.push(format!("duplicate step id '{}'", step.id));
            }

            match &step.kind {
                StepKind::Scale(config) => {
                    let (min, max) = config.bounds();
                    if min > max {
                        problems.push(format!(
                            "step '{}': scale min {} is greater than max {}",
                            step.id, min, max
                        ));
                    }
                }
                StepKind::MultiSelect(config) => {
                    if config.options.is_empty() {
                        problems.push(format!("step '{}': no options configured", step.id));
                    }
                    let mut options = HashSet::new();
                    for option in &config.options {
                        if !options.insert(option.as_str()) {
                            problems.push(format!(
                                "step '{}': duplicate option '{}'",
                                step.id, option
                            ));
                        }
                    }
                }
                StepKind::ShortText(config) | StepKind::LongText(config) => {
                    if config.max_length == Some(0) {
                        problems.push(format!("step '{}': maxLength must be positive", step.id));
                    }
                }
                StepKind::Info(_)
                | StepKind::YesNo(_)
                | StepKind::Capture { .. }
                | StepKind::Unknown { .. } => {}
            }
        }

        problems
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experience::step::{MultiSelectConfig, ScaleConfig, YesNoConfig};

    fn experience(steps: Vec<Step>) -> Experience {
        Experience {
            id: "exp-1".to_string(),
            project_id: "proj-1".to_string(),
            name: "Feedback".to_string(),
            steps,
        }
    }

    #[test]
    fn test_valid_definition() {
        let exp = experience(vec![
            Step::new("intro", StepKind::Info(Default::default())),
            Step::new("rate", StepKind::Scale(ScaleConfig::default())),
        ]);

        assert!(exp.validate_definition().is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let exp = experience(vec![
            Step::new("a", StepKind::Info(Default::default())),
            Step::new("a", StepKind::Info(Default::default())),
            Step::new(
                "rate",
                StepKind::Scale(ScaleConfig {
                    min: Some(10),
                    max: Some(2),
                    ..Default::default()
                }),
            ),
            Step::new(
                "pick",
                StepKind::MultiSelect(MultiSelectConfig {
                    options: vec!["x".to_string(), "x".to_string()],
                    ..Default::default()
                }),
            ),
        ]);

        let problems = exp.definition_problems();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("duplicate step id 'a'"));
        assert!(problems[1].contains("greater than max"));
        assert!(problems[2].contains("duplicate option 'x'"));
        assert!(matches!(
            exp.validate_definition(),
            Err(GuestflowError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_yes_no_step_has_no_config_rules() {
        let exp = experience(vec![
            Step::new("consent", StepKind::YesNo(YesNoConfig::default())),
            Step::new("consent", StepKind::YesNo(YesNoConfig::default())),
        ]);

        let problems = exp.definition_problems();
        assert_eq!(problems, vec!["duplicate step id 'consent'".to_string()]);
    }
}
