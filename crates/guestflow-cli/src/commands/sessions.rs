use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use guestflow_core::error::GuestflowError;
use guestflow_core::session::{SessionKey, SessionRepository, SessionSnapshot, SessionStatus};
use guestflow_infrastructure::TomlSessionRepository;
use std::path::Path;

use super::utils::Workspace;

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List a project's sessions, most recently updated first
    List {
        #[arg(long)]
        project: String,
        /// Print the full session documents as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Print one session document as JSON
    Show {
        #[arg(long)]
        project: String,
        session_id: String,
    },
}

pub async fn execute(
    action: SessionsAction,
    data_dir: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<()> {
    let workspace = Workspace::resolve(data_dir, config_file)?;
    let repository = TomlSessionRepository::new(workspace.session_root());

    match action {
        SessionsAction::List { project, json } => {
            let sessions = repository.list_by_project(&project).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("{}", format!("No sessions in project '{}'", project).bright_black());
            } else {
                for session in &sessions {
                    println!("{}", summary_line(session));
                }
            }
        }
        SessionsAction::Show {
            project,
            session_id,
        } => {
            let key = SessionKey::new(project, session_id);
            let session = repository
                .find_by_id(&key)
                .await?
                .ok_or_else(|| GuestflowError::not_found("Session", key.to_string()))?;
            let json = serde_json::to_string_pretty(&session)
                .with_context(|| format!("Failed to render session {}", key))?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn summary_line(session: &SessionSnapshot) -> String {
    let status = match session.status {
        SessionStatus::Completed => "completed".green(),
        SessionStatus::InProgress => "in progress".yellow(),
    };
    format!(
        "{}  {:<11}  {}  {}/{} answered  {}",
        session.session_id.bold(),
        status,
        session.experience_id,
        session.responses.len(),
        session.steps.iter().filter(|s| s.kind.collects_response()).count(),
        session.updated_at.format("%Y-%m-%d %H:%M")
    )
}
