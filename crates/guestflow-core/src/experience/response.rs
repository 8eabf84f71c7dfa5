//! Collected guest input: responses and captured media.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The value a guest gave for an input step.
///
/// The shape depends on the step type: a number for scales, a boolean or
/// `"yes"`/`"no"` for yes/no steps, text for text steps and a list of option
/// values for multi-select steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    Selection(Vec<String>),
}

impl ResponseValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Human-readable rendering for summaries and terminal output.
    pub fn display(&self) -> String {
        match self {
            ResponseValue::Boolean(true) => "yes".to_string(),
            ResponseValue::Boolean(false) => "no".to_string(),
            ResponseValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            ResponseValue::Number(n) => n.to_string(),
            ResponseValue::Text(text) => text.clone(),
            ResponseValue::Selection(values) => values.join(", "),
        }
    }
}

impl From<bool> for ResponseValue {
    fn from(value: bool) -> Self {
        ResponseValue::Boolean(value)
    }
}

impl From<i64> for ResponseValue {
    fn from(value: i64) -> Self {
        ResponseValue::Number(value as f64)
    }
}

impl From<f64> for ResponseValue {
    fn from(value: f64) -> Self {
        ResponseValue::Number(value)
    }
}

impl From<&str> for ResponseValue {
    fn from(value: &str) -> Self {
        ResponseValue::Text(value.to_string())
    }
}

impl From<String> for ResponseValue {
    fn from(value: String) -> Self {
        ResponseValue::Text(value)
    }
}

impl From<Vec<&str>> for ResponseValue {
    fn from(values: Vec<&str>) -> Self {
        ResponseValue::Selection(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ResponseValue {
    fn from(values: Vec<String>) -> Self {
        ResponseValue::Selection(values)
    }
}

/// One recorded answer. At most one exists per `step_id` in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub step_id: String,
    pub step_type: String,
    pub value: ResponseValue,
    pub answered_at: DateTime<Utc>,
}

/// Reference to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub asset_id: String,
    pub url: String,
}

impl MediaAsset {
    pub fn new(asset_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            url: url.into(),
        }
    }
}

/// Media captured for a step. Keyed by `step_id` like [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedMedia {
    pub step_id: String,
    pub asset: MediaAsset,
    pub captured_at: DateTime<Utc>,
}

/// Something stored at most once per step id.
pub trait StepKeyed {
    fn step_id(&self) -> &str;
}

impl StepKeyed for Response {
    fn step_id(&self) -> &str {
        &self.step_id
    }
}

impl StepKeyed for CapturedMedia {
    fn step_id(&self) -> &str {
        &self.step_id
    }
}

/// Inserts `entry`, replacing any existing entry for the same step id in place.
///
/// Position of a replaced entry is kept so the collection order reflects the
/// first time each step was answered.
pub fn upsert_by_step<T: StepKeyed>(entries: &mut Vec<T>, entry: T) {
    match entries.iter().position(|e| e.step_id() == entry.step_id()) {
        Some(index) => entries[index] = entry,
        None => entries.push(entry),
    }
}
