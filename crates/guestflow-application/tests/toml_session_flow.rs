//! End-to-end guest runs against the file-backed stores.

use guestflow_application::{NextOutcome, SessionUseCase};
use guestflow_core::config::RuntimeConfig;
use guestflow_core::experience::{MediaAsset, ResponseValue};
use guestflow_core::session::{SessionKey, SessionRepository, SessionStatus};
use guestflow_infrastructure::{TomlExperienceRepository, TomlSessionRepository};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const FEEDBACK: &str = r#"
id = "feedback"
projectId = "demo"
name = "Visitor feedback"

[[steps]]
id = "welcome"
type = "info"
config = { title = "Thanks for visiting" }

[[steps]]
id = "rating"
type = "input.scale"
config = { min = 1, max = 5, required = true }

[[steps]]
id = "topics"
type = "input.multiSelect"
config = { options = ["food", "music", "venue"], multiSelect = true }

[[steps]]
id = "selfie"
type = "capture.photo"
"#;

struct Fixture {
    _temp_dir: TempDir,
    sessions: Arc<TomlSessionRepository>,
    usecase: SessionUseCase,
    completions: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let experiences_dir = temp_dir.path().join("experiences");
    fs::create_dir_all(&experiences_dir).unwrap();
    fs::write(experiences_dir.join("feedback.toml"), FEEDBACK).unwrap();

    let sessions = Arc::new(TomlSessionRepository::new(temp_dir.path()));
    let completions = Arc::new(AtomicUsize::new(0));
    let sink = completions.clone();
    let usecase = SessionUseCase::new(
        Arc::new(TomlExperienceRepository::new(&experiences_dir)),
        sessions.clone(),
        RuntimeConfig::default(),
    )
    .with_completion_callback(Arc::new(move |_key: &SessionKey| {
        sink.fetch_add(1, Ordering::SeqCst);
    }));

    Fixture {
        _temp_dir: temp_dir,
        sessions,
        usecase,
        completions,
    }
}

#[tokio::test]
async fn test_full_run_is_persisted_and_completed() {
    let f = fixture();
    let session = f.usecase.start_session("demo", "feedback").await.unwrap();
    let runtime = f.usecase.open_runtime(&session).await.unwrap();

    runtime.next().await.unwrap();
    runtime.set_response("rating", 4_i64).unwrap();
    assert_eq!(
        runtime.next().await.unwrap(),
        NextOutcome::Advanced {
            step_index: 2,
            synced: true
        }
    );
    runtime.set_response("topics", vec!["food", "venue"]).unwrap();
    runtime.next().await.unwrap();

    assert!(runtime
        .set_media("selfie", MediaAsset::new("img-1", "file:///tmp/selfie.jpg"))
        .await
        .unwrap());
    assert_eq!(runtime.next().await.unwrap(), NextOutcome::Completed);

    let stored = f.sessions.find_by_id(&session.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.responses.len(), 2);
    assert_eq!(stored.captured_media.len(), 1);
    assert_eq!(f.completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reload_resumes_at_first_unanswered_step() {
    let f = fixture();
    let session = f.usecase.start_session("demo", "feedback").await.unwrap();

    {
        let runtime = f.usecase.open_runtime(&session).await.unwrap();
        runtime.next().await.unwrap();
        runtime.set_response("rating", 5_i64).unwrap();
        runtime.next().await.unwrap();
        runtime.detach().await.unwrap();
    }

    let reloaded = f.usecase.resume_session(&session.key()).await.unwrap();
    let runtime = f.usecase.open_runtime(&reloaded).await.unwrap();

    // "welcome" is an info step and never gets a response.
    let (index, step) = runtime.current_step().unwrap().unwrap();
    assert_eq!((index, step.id.as_str()), (0, "welcome"));
    assert_eq!(
        runtime.response("rating").unwrap().map(|r| r.value),
        Some(ResponseValue::Number(5.0))
    );
}

#[tokio::test]
async fn test_detach_persists_pending_edit() {
    let f = fixture();
    let session = f.usecase.start_session("demo", "feedback").await.unwrap();
    let runtime = f.usecase.open_runtime(&session).await.unwrap();

    runtime.next().await.unwrap();
    runtime.set_response("rating", 2_i64).unwrap();
    runtime.detach().await.unwrap();

    let stored = f.sessions.find_by_id(&session.key()).await.unwrap().unwrap();
    assert_eq!(stored.responses.len(), 1);
    assert_eq!(stored.status, SessionStatus::InProgress);
}
