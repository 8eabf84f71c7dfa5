//! Runtime state store.
//!
//! Owns the working copy of one guest run: the step cursor, the collected
//! responses and captured media, and sync bookkeeping. All mutations are
//! synchronous; persistence is driven from outside by the sync orchestrator,
//! which reads full-state payloads via [`RuntimeStore::progress_update`].
//!
//! ```text
//! Uninitialized --init_from_session--> Ready --complete--> Complete
//!       ^                                                    |
//!       +-------------------------reset----------------------+
//! ```

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::state::{RuntimePhase, RuntimeSnapshot, RuntimeState};
use crate::error::{GuestflowError, Result};
use crate::experience::{
    upsert_by_step, CapturedMedia, MediaAsset, Response, ResponseValue, Step, StepKind,
};
use crate::session::{ProgressUpdate, SessionKey, SessionSnapshot};
use crate::validation::{StepValidator, ValidationResult};

/// In-memory state of one session attachment.
#[derive(Debug, Default)]
pub struct RuntimeStore {
    validator: StepValidator,
    session: Option<SessionKey>,
    steps: Vec<Step>,
    responses: Vec<Response>,
    captured_media: Vec<CapturedMedia>,
    current_step_index: usize,
    is_complete: bool,
    completion_persisted: bool,
    in_flight: usize,
    last_synced_at: Option<DateTime<Utc>>,
    /// Bumped on every init and reset so late writes can be told apart
    attachment: u64,
}

impl RuntimeStore {
    pub fn new(validator: StepValidator) -> Self {
        Self {
            validator,
            ..Default::default()
        }
    }

    /// Seeds the store from a session document and its step list.
    ///
    /// The cursor starts at the first step without a recorded response, or
    /// at `steps.len()` when every step has one. An empty step list is
    /// complete immediately.
    pub fn init_from_session(&mut self, snapshot: &SessionSnapshot, steps: Vec<Step>) {
        let attachment = self.attachment.wrapping_add(1);
        *self = Self {
            validator: self.validator,
            attachment,
            ..Default::default()
        };

        for step in &steps {
            if let StepKind::Unknown { type_name, .. } = &step.kind {
                tracing::warn!(
                    "[RuntimeStore] Step '{}' has unrecognised type '{}' (policy: {:?})",
                    step.id,
                    type_name,
                    self.validator.unknown_step_policy()
                );
            }
        }

        // Keep only entries for steps in this list, one per step id.
        for response in &snapshot.responses {
            if steps.iter().any(|s| s.id == response.step_id) {
                upsert_by_step(&mut self.responses, response.clone());
            }
        }
        for media in &snapshot.captured_media {
            if steps.iter().any(|s| s.id == media.step_id) {
                upsert_by_step(&mut self.captured_media, media.clone());
            }
        }

        self.current_step_index = steps
            .iter()
            .position(|step| !self.responses.iter().any(|r| r.step_id == step.id))
            .unwrap_or(steps.len());
        self.is_complete = steps.is_empty() || snapshot.is_completed();
        self.completion_persisted = snapshot.is_completed();
        self.session = Some(snapshot.key());
        self.steps = steps;

        tracing::debug!(
            "[RuntimeStore] Attached session {} at step {}/{} (complete: {})",
            snapshot.key(),
            self.current_step_index,
            self.steps.len(),
            self.is_complete
        );
    }

    /// Returns all fields to their pre-init defaults.
    pub fn reset(&mut self) {
        let attachment = self.attachment.wrapping_add(1);
        *self = Self {
            validator: self.validator,
            attachment,
            ..Default::default()
        };
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Records the value for a step, replacing any earlier one.
    ///
    /// The response type comes from the step definition. Neither validation
    /// nor persistence happens here.
    pub fn set_response(&mut self, step_id: &str, value: ResponseValue) -> Result<()> {
        self.ensure_writable("set_response")?;
        let step_type = self.step_by_id(step_id)?.type_name().to_string();

        upsert_by_step(
            &mut self.responses,
            Response {
                step_id: step_id.to_string(),
                step_type,
                value,
                answered_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Records the media captured for a step, replacing any earlier capture.
    pub fn set_captured_media(&mut self, step_id: &str, asset: MediaAsset) -> Result<()> {
        self.ensure_writable("set_captured_media")?;
        self.step_by_id(step_id)?;

        upsert_by_step(
            &mut self.captured_media,
            CapturedMedia {
                step_id: step_id.to_string(),
                asset,
                captured_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Advances the cursor by one. Returns `false` without mutating when the
    /// cursor is on the last step, the current step does not validate, or
    /// the run is complete.
    pub fn next_step(&mut self) -> bool {
        if self.is_complete || self.is_last_step() || !self.can_proceed() {
            return false;
        }
        self.current_step_index += 1;
        true
    }

    /// Moves the cursor back by one.
    pub fn previous_step(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.current_step_index -= 1;
        true
    }

    /// Jumps to a step at or before the cursor. Forward jumps are ignored.
    pub fn go_to_step(&mut self, index: usize) -> bool {
        if self.session.is_none() || self.is_complete || index > self.current_step_index {
            return false;
        }
        self.current_step_index = index;
        true
    }

    /// Marks the run complete. Returns `true` on the first transition only.
    pub fn complete(&mut self) -> bool {
        if self.session.is_none() || self.is_complete {
            return false;
        }
        self.is_complete = true;
        true
    }

    /// Records that the durable completion marker was written and moves the
    /// cursor past the last step.
    pub fn settle_completion(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.is_complete = true;
        self.completion_persisted = true;
        self.current_step_index = self.steps.len();
    }

    // ------------------------------------------------------------------
    // Sync bookkeeping
    // ------------------------------------------------------------------

    /// Registers an outstanding write and returns the attachment it belongs to.
    pub fn begin_sync(&mut self) -> u64 {
        self.in_flight += 1;
        self.attachment
    }

    /// Settles a write started with [`begin_sync`](Self::begin_sync).
    ///
    /// `succeeded_at` is `None` for a failed write. Writes that belong to an
    /// earlier attachment are ignored.
    pub fn finish_sync(&mut self, attachment: u64, succeeded_at: Option<DateTime<Utc>>) {
        if attachment != self.attachment {
            return;
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Some(at) = succeeded_at {
            self.last_synced_at = Some(at);
        }
    }

    /// Builds a full-state payload of the requested collections.
    pub fn progress_update(&self, include_responses: bool, include_media: bool) -> ProgressUpdate {
        ProgressUpdate {
            responses: include_responses.then(|| self.responses.clone()),
            captured_media: include_media.then(|| self.captured_media.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn phase(&self) -> RuntimePhase {
        match (&self.session, self.is_complete) {
            (None, _) => RuntimePhase::Uninitialized,
            (Some(_), false) => RuntimePhase::Ready,
            (Some(_), true) => RuntimePhase::Complete,
        }
    }

    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session.as_ref()
    }

    pub fn attachment(&self) -> u64 {
        self.attachment
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn captured_media(&self) -> &[CapturedMedia] {
        &self.captured_media
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index)
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight > 0
    }

    pub fn completion_persisted(&self) -> bool {
        self.completion_persisted
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    pub fn is_last_step(&self) -> bool {
        !self.steps.is_empty() && self.current_step_index == self.steps.len() - 1
    }

    /// Response recorded for a step. Unknown ids read as `None`.
    pub fn response(&self, step_id: &str) -> Option<&Response> {
        self.responses.iter().find(|r| r.step_id == step_id)
    }

    pub fn has_captured_media(&self, step_id: &str) -> bool {
        self.captured_media.iter().any(|m| m.step_id == step_id)
    }

    /// Responses keyed by step id.
    pub fn responses_by_step(&self) -> BTreeMap<String, Response> {
        self.responses
            .iter()
            .map(|r| (r.step_id.clone(), r.clone()))
            .collect()
    }

    /// Response values keyed by step id.
    pub fn response_values(&self) -> BTreeMap<String, ResponseValue> {
        self.responses
            .iter()
            .map(|r| (r.step_id.clone(), r.value.clone()))
            .collect()
    }

    /// Validation result of the current step, `None` past the end.
    pub fn validation(&self) -> Option<ValidationResult> {
        let step = self.current_step()?;
        let value = self.response(&step.id).map(|r| &r.value);
        Some(self.validator.validate(step, value))
    }

    pub fn can_proceed(&self) -> bool {
        self.validation().is_some_and(|result| result.is_valid)
    }

    pub fn can_go_back(&self) -> bool {
        self.session.is_some() && !self.is_complete && self.current_step_index > 0
    }

    pub fn state(&self) -> RuntimeState {
        RuntimeState {
            current_step_index: self.current_step_index,
            is_complete: self.is_complete,
            is_syncing: self.is_syncing(),
            last_synced_at: self.last_synced_at,
        }
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            session: self.session.clone(),
            phase: self.phase(),
            state: self.state(),
            step_count: self.steps.len(),
            responses: self.responses.clone(),
            captured_media: self.captured_media.clone(),
            completion_persisted: self.completion_persisted,
        }
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        if self.session.is_none() {
            return Err(GuestflowError::illegal(operation, "no session is attached"));
        }
        if self.completion_persisted {
            return Err(GuestflowError::illegal(operation, "the session is already completed"));
        }
        Ok(())
    }

    fn step_by_id(&self, step_id: &str) -> Result<&Step> {
        self.steps
            .iter()
            .find(|s| s.id == step_id)
            .ok_or_else(|| GuestflowError::step_not_found(step_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownStepPolicy;
    use crate::experience::{InfoConfig, MultiSelectConfig, ScaleConfig, TextConfig};
    use crate::session::SessionStatus;

    fn info(id: &str) -> Step {
        Step::new(id, StepKind::Info(InfoConfig::default()))
    }

    fn required_scale(id: &str) -> Step {
        Step::new(
            id,
            StepKind::Scale(ScaleConfig {
                min: Some(1),
                max: Some(5),
                required: true,
                ..Default::default()
            }),
        )
    }

    fn optional_text(id: &str) -> Step {
        Step::new(id, StepKind::ShortText(TextConfig::default()))
    }

    fn session(steps: &[Step]) -> SessionSnapshot {
        SessionSnapshot::new(SessionKey::new("p1", "s1"), "exp-1", steps.to_vec())
    }

    fn attached(steps: Vec<Step>) -> RuntimeStore {
        let mut store = RuntimeStore::default();
        store.init_from_session(&session(&steps), steps);
        store
    }

    fn recorded(step_id: &str, value: ResponseValue) -> Response {
        Response {
            step_id: step_id.to_string(),
            step_type: "input.shortText".to_string(),
            value,
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn test_uninitialized_store() {
        let mut store = RuntimeStore::default();

        assert_eq!(store.phase(), RuntimePhase::Uninitialized);
        assert!(!store.can_proceed());
        assert!(!store.can_go_back());
        assert!(!store.next_step());
        assert!(!store.complete());

        let err = store.set_response("s1", ResponseValue::from("x")).unwrap_err();
        assert!(err.is_illegal_operation());
    }

    #[test]
    fn test_resume_starts_at_first_unanswered_step() {
        let steps = vec![optional_text("s1"), optional_text("s2"), optional_text("s3")];
        let mut snapshot = session(&steps);
        snapshot.responses.push(recorded("s1", ResponseValue::from("hello")));

        let mut store = RuntimeStore::default();
        store.init_from_session(&snapshot, steps);

        assert_eq!(store.current_step_index(), 1);
        assert_eq!(store.phase(), RuntimePhase::Ready);
        assert!(store.can_go_back());
    }

    #[test]
    fn test_resume_with_every_step_answered_is_past_the_end() {
        let steps = vec![optional_text("s1"), optional_text("s2")];
        let mut snapshot = session(&steps);
        snapshot.responses.push(recorded("s2", ResponseValue::from("b")));
        snapshot.responses.push(recorded("s1", ResponseValue::from("a")));

        let mut store = RuntimeStore::default();
        store.init_from_session(&snapshot, steps);

        assert_eq!(store.current_step_index(), 2);
        assert!(store.current_step().is_none());
        assert!(!store.can_proceed());
    }

    #[test]
    fn test_init_drops_responses_for_foreign_steps() {
        let steps = vec![optional_text("s1")];
        let mut snapshot = session(&steps);
        snapshot.responses.push(recorded("gone", ResponseValue::from("x")));

        let mut store = RuntimeStore::default();
        store.init_from_session(&snapshot, steps);

        assert!(store.responses().is_empty());
        assert_eq!(store.current_step_index(), 0);
    }

    #[test]
    fn test_completed_snapshot_attaches_complete() {
        let steps = vec![optional_text("s1")];
        let mut snapshot = session(&steps);
        snapshot.status = SessionStatus::Completed;

        let mut store = RuntimeStore::default();
        store.init_from_session(&snapshot, steps);

        assert_eq!(store.phase(), RuntimePhase::Complete);
        assert!(store.completion_persisted());
        assert!(!store.next_step());
    }

    #[test]
    fn test_empty_step_list_is_complete_immediately() {
        let mut store = attached(vec![]);

        assert!(store.is_complete());
        assert_eq!(store.current_step_index(), 0);
        assert_eq!(store.phase(), RuntimePhase::Complete);
        assert!(!store.can_proceed());
        assert!(!store.next_step());
        assert!(!store.go_to_step(0));
    }

    #[test]
    fn test_next_step_is_gated_by_validation() {
        let mut store = attached(vec![info("intro"), required_scale("rate"), info("bye")]);

        assert!(store.next_step());
        assert_eq!(store.current_step_index(), 1);

        assert!(!store.can_proceed());
        assert!(!store.next_step());
        assert_eq!(store.current_step_index(), 1);

        store.set_response("rate", ResponseValue::from(9_i64)).unwrap();
        assert!(!store.next_step());
        assert_eq!(
            store.validation().and_then(|v| v.error),
            Some("Please select a value between 1 and 5".to_string())
        );

        store.set_response("rate", ResponseValue::from(3_i64)).unwrap();
        assert!(store.next_step());
        assert_eq!(store.current_step_index(), 2);
    }

    #[test]
    fn test_next_step_stops_at_last_index() {
        let mut store = attached(vec![info("a"), info("b")]);

        assert!(store.next_step());
        assert!(store.is_last_step());
        assert!(!store.next_step());
        assert_eq!(store.current_step_index(), 1);
    }

    #[test]
    fn test_previous_step() {
        let mut store = attached(vec![info("a"), info("b")]);

        assert!(!store.previous_step());
        store.next_step();
        assert!(store.previous_step());
        assert_eq!(store.current_step_index(), 0);
    }

    #[test]
    fn test_go_to_step_never_jumps_forward() {
        let mut store = attached(vec![info("a"), info("b"), info("c"), info("d")]);
        store.next_step();
        store.next_step();

        assert!(!store.go_to_step(3));
        assert_eq!(store.current_step_index(), 2);

        assert!(store.go_to_step(0));
        assert_eq!(store.current_step_index(), 0);

        // The cursor is the bound, not the furthest step ever visited.
        assert!(!store.go_to_step(2));
        assert_eq!(store.current_step_index(), 0);
    }

    #[test]
    fn test_response_uniqueness() {
        let mut store = attached(vec![optional_text("a"), optional_text("b")]);

        store.set_response("a", ResponseValue::from("one")).unwrap();
        store.set_response("b", ResponseValue::from("two")).unwrap();
        store.set_response("a", ResponseValue::from("three")).unwrap();

        assert_eq!(store.responses().len(), 2);
        assert_eq!(
            store.response("a").map(|r| r.value.clone()),
            Some(ResponseValue::from("three"))
        );
        assert_eq!(store.response("a").map(|r| r.step_type.as_str()), Some("input.shortText"));
        assert_eq!(store.response_values().len(), 2);
    }

    #[test]
    fn test_set_response_for_unknown_step_fails() {
        let mut store = attached(vec![optional_text("a")]);

        let err = store.set_response("nope", ResponseValue::from("x")).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.response("nope").is_none());
    }

    #[test]
    fn test_captured_media_upsert() {
        let mut store = attached(vec![Step::new(
            "cam",
            StepKind::Capture {
                media: crate::experience::CaptureMedia::Photo,
                config: Default::default(),
            },
        )]);

        store
            .set_captured_media("cam", MediaAsset::new("a1", "https://cdn/a1.jpg"))
            .unwrap();
        store
            .set_captured_media("cam", MediaAsset::new("a2", "https://cdn/a2.jpg"))
            .unwrap();

        assert_eq!(store.captured_media().len(), 1);
        assert_eq!(store.captured_media()[0].asset.asset_id, "a2");
        assert!(store.has_captured_media("cam"));
        assert!(store.responses().is_empty());
    }

    #[test]
    fn test_complete_and_settle() {
        let mut store = attached(vec![info("a"), info("b")]);
        store.next_step();

        assert!(store.complete());
        assert!(!store.complete());
        assert_eq!(store.phase(), RuntimePhase::Complete);
        assert_eq!(store.current_step_index(), 1);
        assert!(!store.can_go_back());
        assert!(!store.go_to_step(0));

        store.settle_completion();
        assert!(store.completion_persisted());
        assert_eq!(store.current_step_index(), 2);

        let err = store.set_response("a", ResponseValue::from(true)).unwrap_err();
        assert!(err.is_illegal_operation());
    }

    #[test]
    fn test_reset_returns_to_defaults() {
        let mut store = attached(vec![optional_text("a")]);
        store.set_response("a", ResponseValue::from("x")).unwrap();
        let before = store.attachment();

        store.reset();

        assert_eq!(store.phase(), RuntimePhase::Uninitialized);
        assert!(store.responses().is_empty());
        assert_eq!(store.state(), RuntimeState::default());
        assert!(store.attachment() > before);
    }

    #[test]
    fn test_sync_bookkeeping() {
        let mut store = attached(vec![info("a")]);

        let first = store.begin_sync();
        let second = store.begin_sync();
        assert!(store.is_syncing());

        store.finish_sync(first, None);
        assert!(store.is_syncing());
        assert!(store.last_synced_at().is_none());

        let at = Utc::now();
        store.finish_sync(second, Some(at));
        assert!(!store.is_syncing());
        assert_eq!(store.last_synced_at(), Some(at));
    }

    #[test]
    fn test_finish_sync_from_previous_attachment_is_ignored() {
        let steps = vec![info("a")];
        let mut store = attached(steps.clone());
        let stale = store.begin_sync();

        store.init_from_session(&session(&steps), steps);
        store.begin_sync();
        store.finish_sync(stale, Some(Utc::now()));

        assert!(store.is_syncing());
        assert!(store.last_synced_at().is_none());
    }

    #[test]
    fn test_progress_update_selects_collections() {
        let mut store = attached(vec![optional_text("a")]);
        store.set_response("a", ResponseValue::from("x")).unwrap();

        let media_only = store.progress_update(false, true);
        assert!(media_only.responses.is_none());
        assert_eq!(media_only.captured_media, Some(vec![]));

        let full = store.progress_update(true, true);
        assert_eq!(full.responses.map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_unknown_step_policy_applies_to_can_proceed() {
        let steps = vec![
            Step::new(
                "sig",
                StepKind::Unknown {
                    type_name: "input.signature".to_string(),
                    config: serde_json::json!({}),
                },
            ),
            info("end"),
        ];

        let mut permissive = attached(steps.clone());
        assert!(permissive.next_step());

        let mut blocking = RuntimeStore::new(StepValidator::new(UnknownStepPolicy::Block));
        blocking.init_from_session(&session(&steps), steps);
        assert!(!blocking.next_step());
    }

    #[test]
    fn test_single_select_gates_cursor() {
        let mut store = attached(vec![
            Step::new(
                "pick",
                StepKind::MultiSelect(MultiSelectConfig {
                    options: vec!["a".into(), "b".into(), "c".into()],
                    multi_select: false,
                    required: true,
                    ..Default::default()
                }),
            ),
            info("end"),
        ]);

        store.set_response("pick", ResponseValue::from(vec!["a", "b"])).unwrap();
        assert!(!store.next_step());
        store.set_response("pick", ResponseValue::from(vec!["b"])).unwrap();
        assert!(store.next_step());
    }
}
