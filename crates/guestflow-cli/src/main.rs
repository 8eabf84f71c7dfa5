use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::sessions::SessionsAction;

#[derive(Parser)]
#[command(name = "guestflow")]
#[command(about = "Guestflow CLI - run and inspect guest experiences", long_about = None)]
#[command(version)]
struct Cli {
    /// Storage root for config and sessions (defaults to the platform dirs)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of `config.toml` in the config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an experience as a guest in the terminal
    Run {
        /// Id of the published experience
        experience_id: String,
        /// Project the session belongs to
        #[arg(long, default_value = "default")]
        project: String,
        /// Resume this session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        /// Directory holding `<experience_id>.toml` definitions
        #[arg(long)]
        experiences: Option<PathBuf>,
        /// Keep the session in memory only
        #[arg(long)]
        ephemeral: bool,
    },
    /// Check an experience definition file
    Check {
        /// Path to the experience TOML file
        file: PathBuf,
    },
    /// Inspect stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

/// Logs go to stderr so they never interleave with prompts on stdout.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("GUESTFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let data_dir = cli.data_dir.as_deref();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            experience_id,
            project,
            session,
            experiences,
            ephemeral,
        } => {
            commands::run::execute(commands::run::RunArgs {
                experience_id,
                project,
                session,
                experiences,
                data_dir: data_dir.map(PathBuf::from),
                config: config.map(PathBuf::from),
                ephemeral,
            })
            .await?
        }
        Commands::Check { file } => commands::check::execute(&file)?,
        Commands::Sessions { action } => commands::sessions::execute(action, data_dir, config).await?,
    }

    Ok(())
}
