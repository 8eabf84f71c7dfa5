//! Step definitions.
//!
//! A [`Step`] is one screen of an experience. Its behaviour is carried by
//! [`StepKind`], a closed set of variants so that every match over step types
//! (validation, rendering, definition checks) is exhaustive.
//!
//! On the wire a step is `{ id, type, config }` with a dotted type tag
//! (`input.scale`, `capture.photo`, ...). Tags that this build does not know
//! are preserved as [`StepKind::Unknown`] rather than rejected, so newer
//! published experiences still load.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GuestflowError;

/// Default lower bound of a scale step.
pub const DEFAULT_SCALE_MIN: i64 = 1;
/// Default upper bound of a scale step.
pub const DEFAULT_SCALE_MAX: i64 = 5;
/// Default maximum character count of a text step.
pub const DEFAULT_TEXT_MAX_LENGTH: usize = 1000;

/// An immutable step definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StepDocument", into = "StepDocument")]
pub struct Step {
    /// Identifier, unique within the experience's step list
    pub id: String,
    /// Type discriminant and type-specific configuration
    pub kind: StepKind,
}

/// Step type with its associated configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Display-only content; collects no input.
    Info(InfoConfig),
    /// Integral rating between `min` and `max`.
    Scale(ScaleConfig),
    /// Binary yes/no choice.
    YesNo(YesNoConfig),
    /// Choice among configured options (single or multi).
    MultiSelect(MultiSelectConfig),
    /// Single-line free text.
    ShortText(TextConfig),
    /// Multi-line free text.
    LongText(TextConfig),
    /// Media capture; progress is tracked as captured media, not as a response.
    Capture {
        media: CaptureMedia,
        config: CaptureConfig,
    },
    /// A type tag this build does not recognise.
    Unknown { type_name: String, config: Value },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_label: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl ScaleConfig {
    /// Returns the inclusive bounds, applying the 1..=5 defaults.
    pub fn bounds(&self) -> (i64, i64) {
        (
            self.min.unwrap_or(DEFAULT_SCALE_MIN),
            self.max.unwrap_or(DEFAULT_SCALE_MAX),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YesNoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSelectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    /// `false` means single-select: exactly one value must be chosen.
    #[serde(default)]
    pub multi_select: bool,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub required: bool,
}

impl TextConfig {
    pub fn max_length(&self) -> usize {
        self.max_length.unwrap_or(DEFAULT_TEXT_MAX_LENGTH)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_seconds: Option<u32>,
}

/// Media produced by a capture step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMedia {
    Photo,
    Gif,
    Video,
}

impl StepKind {
    /// Returns the wire type tag of this kind.
    pub fn type_name(&self) -> &str {
        match self {
            StepKind::Info(_) => "info",
            StepKind::Scale(_) => "input.scale",
            StepKind::YesNo(_) => "input.yesNo",
            StepKind::MultiSelect(_) => "input.multiSelect",
            StepKind::ShortText(_) => "input.shortText",
            StepKind::LongText(_) => "input.longText",
            StepKind::Capture { media, .. } => match media {
                CaptureMedia::Photo => "capture.photo",
                CaptureMedia::Gif => "capture.gif",
                CaptureMedia::Video => "capture.video",
            },
            StepKind::Unknown { type_name, .. } => type_name.as_str(),
        }
    }

    /// Whether this kind records a [`crate::experience::Response`].
    pub fn collects_response(&self) -> bool {
        matches!(
            self,
            StepKind::Scale(_)
                | StepKind::YesNo(_)
                | StepKind::MultiSelect(_)
                | StepKind::ShortText(_)
                | StepKind::LongText(_)
        )
    }

    pub fn is_capture(&self) -> bool {
        matches!(self, StepKind::Capture { .. })
    }

    /// Prompt text to show the guest, if configured.
    pub fn prompt(&self) -> Option<&str> {
        match self {
            StepKind::Info(c) => c.title.as_deref(),
            StepKind::Scale(c) => c.prompt.as_deref(),
            StepKind::YesNo(c) => c.prompt.as_deref(),
            StepKind::MultiSelect(c) => c.prompt.as_deref(),
            StepKind::ShortText(c) | StepKind::LongText(c) => c.prompt.as_deref(),
            StepKind::Capture { config, .. } => config.prompt.as_deref(),
            StepKind::Unknown { .. } => None,
        }
    }
}

impl Step {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

// ============================================================================
// Wire form
// ============================================================================

/// Serialized shape of a step: `{ id, type, config }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepDocument {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default = "empty_config")]
    config: Value,
}

fn empty_config() -> Value {
    Value::Object(Default::default())
}

fn parse_config<T: serde::de::DeserializeOwned>(
    id: &str,
    type_name: &str,
    config: Value,
) -> Result<T, GuestflowError> {
    serde_json::from_value(config).map_err(|e| {
        GuestflowError::InvalidDefinition(format!(
            "step '{}' has an invalid {} config: {}",
            id, type_name, e
        ))
    })
}

fn to_config<T: Serialize>(config: &T) -> Value {
    serde_json::to_value(config).unwrap_or_else(|_| empty_config())
}

impl TryFrom<StepDocument> for Step {
    type Error = GuestflowError;

    fn try_from(doc: StepDocument) -> Result<Self, Self::Error> {
        let StepDocument {
            id,
            type_name,
            config,
        } = doc;
        let config = if config.is_null() { empty_config() } else { config };

        let kind = match type_name.as_str() {
            "info" => StepKind::Info(parse_config(&id, &type_name, config)?),
            "input.scale" => StepKind::Scale(parse_config(&id, &type_name, config)?),
            "input.yesNo" => StepKind::YesNo(parse_config(&id, &type_name, config)?),
            "input.multiSelect" => StepKind::MultiSelect(parse_config(&id, &type_name, config)?),
            "input.shortText" => StepKind::ShortText(parse_config(&id, &type_name, config)?),
            "input.longText" => StepKind::LongText(parse_config(&id, &type_name, config)?),
            "capture.photo" | "capture.gif" | "capture.video" => {
                let media = match type_name.as_str() {
                    "capture.photo" => CaptureMedia::Photo,
                    "capture.gif" => CaptureMedia::Gif,
                    _ => CaptureMedia::Video,
                };
                StepKind::Capture {
                    media,
                    config: parse_config(&id, &type_name, config)?,
                }
            }
            _ => StepKind::Unknown { type_name, config },
        };

        Ok(Step { id, kind })
    }
}

impl From<Step> for StepDocument {
    fn from(step: Step) -> Self {
        let type_name = step.type_name().to_string();
        let config = match &step.kind {
            StepKind::Info(c) => to_config(c),
            StepKind::Scale(c) => to_config(c),
            StepKind::YesNo(c) => to_config(c),
            StepKind::MultiSelect(c) => to_config(c),
            StepKind::ShortText(c) | StepKind::LongText(c) => to_config(c),
            StepKind::Capture { config, .. } => to_config(config),
            StepKind::Unknown { config, .. } => config.clone(),
        };
        StepDocument {
            id: step.id,
            type_name,
            config,
        }
    }
}
