//! Interactive guest run in the terminal.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use guestflow_application::{ExperienceRuntime, NextOutcome, SessionUseCase, SyncFailure};
use guestflow_core::error::GuestflowError;
use guestflow_core::experience::{CaptureMedia, MediaAsset, ResponseValue, Step, StepKind};
use guestflow_core::session::{SessionKey, SessionRepository};
use guestflow_infrastructure::{
    InMemorySessionRepository, TomlExperienceRepository, TomlSessionRepository,
};

use super::utils::{Workspace, describe};

const COMMANDS: [&str; 4] = [":back", ":goto", ":help", ":quit"];

pub struct RunArgs {
    pub experience_id: String,
    pub project: String,
    pub session: Option<String>,
    pub experiences: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub ephemeral: bool,
}

/// rustyline helper: completes and highlights the `:` commands.
#[derive(Clone)]
struct CommandHelper;

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with(':') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with(':') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with(':') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for CommandHelper {}

type GuestEditor = Editor<CommandHelper, DefaultHistory>;

/// One line of guest input.
#[derive(Debug, PartialEq)]
enum Command {
    Quit,
    Help,
    Back,
    /// 1-based step number as shown on screen
    GoTo(usize),
    Answer(String),
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if !line.starts_with(':') {
            return Command::Answer(line.to_string());
        }

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(":quit" | ":q"), None) => Command::Quit,
            (Some(":help" | ":h"), None) => Command::Help,
            (Some(":back" | ":b"), None) => Command::Back,
            (Some(":goto" | ":g"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::GoTo(n),
                _ => Command::Unknown(line.to_string()),
            },
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let workspace = Workspace::resolve(args.data_dir.as_deref(), args.config.as_deref())?;
    let experiences_dir = workspace.experiences_dir(args.experiences.as_deref());
    let sessions: Arc<dyn SessionRepository> = if args.ephemeral {
        Arc::new(InMemorySessionRepository::new())
    } else {
        Arc::new(TomlSessionRepository::new(workspace.session_root()))
    };

    let usecase = SessionUseCase::new(
        Arc::new(TomlExperienceRepository::new(&experiences_dir)),
        sessions,
        workspace.config.runtime.clone(),
    )
    .with_sync_error_callback(Arc::new(|failure: &SyncFailure| {
        eprintln!(
            "{}",
            format!("⚠ Not saved yet: {}", failure.error).yellow()
        );
    }))
    .with_completion_callback(Arc::new(|key: &SessionKey| {
        println!("{}", format!("✓ Session {} saved as completed", key).green());
    }));

    let session = match &args.session {
        Some(session_id) => {
            let session = usecase
                .resume_session(&SessionKey::new(&args.project, session_id))
                .await?;
            if session.experience_id != args.experience_id {
                bail!(
                    "session {} belongs to experience '{}', not '{}'",
                    session.key(),
                    session.experience_id,
                    args.experience_id
                );
            }
            session
        }
        None => {
            usecase
                .start_session(&args.project, &args.experience_id)
                .await?
        }
    };

    println!(
        "{} {}",
        "Session".bold(),
        session.key().to_string().bright_cyan()
    );
    println!("{}", "Type :help for commands.".bright_black());

    let runtime = usecase.open_runtime(&session).await?;

    let mut editor: GuestEditor = Editor::new()?;
    editor.set_helper(Some(CommandHelper));

    let outcome = drive(&runtime, &mut editor).await;
    runtime.detach().await?;
    outcome
}

/// Prompts step by step until the run is durably complete or the guest quits.
async fn drive(runtime: &ExperienceRuntime, editor: &mut GuestEditor) -> Result<()> {
    loop {
        let snapshot = runtime.state()?;
        if snapshot.state.is_complete {
            if snapshot.completion_persisted {
                print_summary(runtime)?;
                return Ok(());
            }

            let prompt = "Completion was not saved. Enter to retry, :quit to leave > ";
            match read_line(editor, prompt)?.map(|line| Command::parse(&line)) {
                None | Some(Command::Quit) => return Ok(()),
                Some(_) => {
                    if let Err(e) = runtime.retry_completion().await {
                        eprintln!("{}", describe(&e).red());
                    }
                    continue;
                }
            }
        }

        let Some((index, step)) = runtime.current_step()? else {
            return Ok(());
        };
        render_step(runtime, index, snapshot.step_count, &step)?;

        let Some(line) = read_line(editor, "> ")? else {
            return Ok(());
        };

        match Command::parse(&line) {
            Command::Quit => return Ok(()),
            Command::Help => print_help(),
            Command::Back => {
                if let Err(e) = runtime.back() {
                    eprintln!("{}", describe(&e).red());
                }
            }
            Command::GoTo(number) => {
                if let Err(e) = runtime.go_to_step(number - 1) {
                    eprintln!("{}", describe(&e).red());
                }
            }
            Command::Unknown(command) => {
                eprintln!("{}", format!("Unknown command {}", command).red());
            }
            Command::Answer(text) => {
                if let Err(e) = record_answer(runtime, &step, &text).await {
                    eprintln!("{}", describe(&e).red());
                    continue;
                }
                advance(runtime).await;
            }
        }
    }
}

/// Empty input keeps the current answer.
///
/// A capture step cannot be confirmed until media has been captured for it;
/// the validator passes capture steps, so the shell holds the guest here.
async fn record_answer(
    runtime: &ExperienceRuntime,
    step: &Step,
    text: &str,
) -> guestflow_core::Result<()> {
    match &step.kind {
        _ if text.is_empty() => {}
        StepKind::Info(_) => {}
        StepKind::Capture { .. } => {
            runtime.set_media(&step.id, capture_asset(text)).await?;
        }
        kind => runtime.set_response(&step.id, parse_answer(kind, text))?,
    }

    if let StepKind::Capture { media, .. } = &step.kind {
        if !runtime.has_captured_media(&step.id)? {
            return Err(GuestflowError::illegal(
                "next",
                format!("Please capture a {} first", capture_noun(*media)),
            ));
        }
    }
    Ok(())
}

async fn advance(runtime: &ExperienceRuntime) {
    match runtime.next().await {
        Ok(NextOutcome::Advanced { synced: false, .. }) => {
            println!("{}", "Progress is kept locally for now.".bright_black());
        }
        Ok(_) => {}
        Err(e) if e.is_sync() => {
            eprintln!("{}", "Your answers are complete but could not be saved.".red());
        }
        Err(e) => eprintln!("{}", describe(&e).red()),
    }
}

fn read_line(editor: &mut GuestEditor, prompt: &str) -> Result<Option<String>> {
    // Blocking read; scheduled writes keep running on the other workers.
    match tokio::task::block_in_place(|| editor.readline(prompt)) {
        Ok(line) => {
            let _ = editor.add_history_entry(line.as_str());
            Ok(Some(line.trim().to_string()))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Maps terminal input to the value shape each step kind expects.
///
/// Input that does not fit is passed through as text so the validator can
/// explain what is wrong.
fn parse_answer(kind: &StepKind, text: &str) -> ResponseValue {
    match kind {
        StepKind::Scale(_) => text
            .parse::<f64>()
            .map(ResponseValue::Number)
            .unwrap_or_else(|_| ResponseValue::Text(text.to_string())),
        StepKind::YesNo(_) => match text.to_ascii_lowercase().as_str() {
            "y" | "yes" => ResponseValue::Boolean(true),
            "n" | "no" => ResponseValue::Boolean(false),
            _ => ResponseValue::Text(text.to_string()),
        },
        StepKind::MultiSelect(config) => ResponseValue::Selection(
            text.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| match part.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= config.options.len() => config.options[n - 1].clone(),
                    _ => part.to_string(),
                })
                .collect(),
        ),
        _ => ResponseValue::Text(text.to_string()),
    }
}

/// Uses the file name as asset id, so `./shots/me.jpg` becomes `me.jpg`.
fn capture_asset(location: &str) -> MediaAsset {
    let asset_id = Path::new(location)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_string());
    MediaAsset::new(asset_id, location)
}

fn render_step(runtime: &ExperienceRuntime, index: usize, total: usize, step: &Step) -> Result<()> {
    println!();
    println!(
        "{}",
        format!("Step {}/{} · {}", index + 1, total, step.type_name()).bright_black()
    );

    let prompt = step.kind.prompt().unwrap_or(step.id.as_str());
    match &step.kind {
        StepKind::Info(config) => {
            println!("{}", prompt.bold());
            if let Some(body) = &config.body {
                println!("{}", body);
            }
            println!("{}", "Press Enter to continue.".bright_black());
        }
        StepKind::Scale(config) => {
            let (min, max) = config.bounds();
            println!("{}{}", prompt.bold(), required_mark(config.required));
            println!(
                "  {} {} … {} {}",
                min,
                config.min_label.as_deref().unwrap_or(""),
                max,
                config.max_label.as_deref().unwrap_or("")
            );
        }
        StepKind::YesNo(config) => {
            println!("{}{} (y/n)", prompt.bold(), required_mark(config.required));
        }
        StepKind::MultiSelect(config) => {
            println!("{}{}", prompt.bold(), required_mark(config.required));
            for (i, option) in config.options.iter().enumerate() {
                println!("  {}) {}", i + 1, option);
            }
            let hint = if config.multi_select {
                "Numbers or names, comma-separated."
            } else {
                "Pick one number or name."
            };
            println!("{}", hint.bright_black());
        }
        StepKind::ShortText(config) | StepKind::LongText(config) => {
            println!("{}{}", prompt.bold(), required_mark(config.required));
            if let Some(placeholder) = &config.placeholder {
                println!("{}", placeholder.bright_black());
            }
        }
        StepKind::Capture { media, .. } => {
            println!("{}", prompt.bold());
            println!(
                "{}",
                format!("Enter the path or URL of the {}.", capture_noun(*media)).bright_black()
            );
            if runtime.has_captured_media(&step.id)? {
                println!("{}", "  (already captured)".bright_black());
            }
        }
        StepKind::Unknown { type_name, .. } => {
            println!(
                "{}",
                format!("This terminal cannot show '{}' steps.", type_name).yellow()
            );
        }
    }

    if let Some(response) = runtime.response(&step.id)? {
        println!(
            "{}",
            format!("  current: {}", response.value.display()).bright_black()
        );
    }
    Ok(())
}

fn capture_noun(media: CaptureMedia) -> &'static str {
    match media {
        CaptureMedia::Photo => "photo",
        CaptureMedia::Gif => "GIF",
        CaptureMedia::Video => "video",
    }
}

fn required_mark(required: bool) -> &'static str {
    if required { " *" } else { "" }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  :back      previous step");
    println!("  :goto N    jump back to step N");
    println!("  :quit      save and leave");
    println!("  Enter      keep the current answer and continue");
}

fn print_summary(runtime: &ExperienceRuntime) -> Result<()> {
    let answers = runtime.response_values()?;
    println!();
    println!("{}", "Thanks! Your answers:".bold());
    for step in runtime.steps()? {
        if let Some(value) = answers.get(&step.id) {
            println!("  {}: {}", step.id.bright_cyan(), value.display());
        }
    }
    Ok(())
}
