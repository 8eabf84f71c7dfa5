use anyhow::{Result, bail};
use colored::Colorize;
use guestflow_core::experience::{Experience, StepKind};
use guestflow_infrastructure::TomlExperienceRepository;
use std::path::Path;

/// Loads an experience definition and reports structural problems.
///
/// Unknown step types are only reported as notes: the runtime accepts them
/// under the default policy.
pub fn execute(file: &Path) -> Result<()> {
    let experience = TomlExperienceRepository::load_file(file)?;
    let report = CheckReport::of(&experience);

    println!(
        "{} {} ({}), {} steps",
        "Experience".bold(),
        experience.id,
        experience.name,
        experience.steps.len()
    );
    for note in &report.notes {
        println!("  {}", format!("note: {}", note).bright_black());
    }
    for problem in &report.problems {
        println!("  {}", format!("error: {}", problem).red());
    }

    if !report.problems.is_empty() {
        bail!(
            "{} has {} definition problem(s)",
            file.display(),
            report.problems.len()
        );
    }

    println!("{}", "✓ Definition is valid".green());
    Ok(())
}

struct CheckReport {
    problems: Vec<String>,
    notes: Vec<String>,
}

impl CheckReport {
    fn of(experience: &Experience) -> Self {
        let notes = experience
            .steps
            .iter()
            .filter_map(|step| match &step.kind {
                StepKind::Unknown { type_name, .. } => Some(format!(
                    "step '{}' has unsupported type '{}'",
                    step.id, type_name
                )),
                _ => None,
            })
            .collect();

        Self {
            problems: experience.definition_problems(),
            notes,
        }
    }
}
