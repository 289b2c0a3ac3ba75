//! Validation failure codes.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Machine-readable validation failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Prompt absent or blank.
    MissingPrompt,
    /// Aspect ratio absent, unknown or not allowed for the mode.
    InvalidAspectRatio,
    /// Resolution absent, unknown or not allowed for the mode.
    InvalidResolution,
    /// Duration not in the mode's allowed set.
    InvalidDuration,
    /// Unknown generation mode.
    InvalidGenerationMode,
    /// Reference image list missing or outside 1..=3.
    InvalidReferenceImages,
    /// First-last-frame request without both frames.
    MissingFrameUrls,
    /// Extend request without a source video.
    MissingSourceVideoId,
    /// Source video identifier is not a task identifier.
    InvalidSourceVideoId,
    /// Inputs belonging to another mode were supplied.
    ConflictingFields,
    /// Person-generation policy unknown or not permitted.
    InvalidPersonGeneration,
}

impl ValidationCode {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingPrompt => "MISSING_PROMPT",
            Self::InvalidAspectRatio => "INVALID_ASPECT_RATIO",
            Self::InvalidResolution => "INVALID_RESOLUTION",
            Self::InvalidDuration => "INVALID_DURATION",
            Self::InvalidGenerationMode => "INVALID_GENERATION_MODE",
            Self::InvalidReferenceImages => "INVALID_REFERENCE_IMAGES",
            Self::MissingFrameUrls => "MISSING_FRAME_URLS",
            Self::MissingSourceVideoId => "MISSING_SOURCE_VIDEO_ID",
            Self::InvalidSourceVideoId => "INVALID_SOURCE_VIDEO_ID",
            Self::ConflictingFields => "CONFLICTING_FIELDS",
            Self::InvalidPersonGeneration => "INVALID_PERSON_GENERATION",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First rule a creation request violated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ValidationError {
    /// Failure code.
    pub code: ValidationCode,
    /// Offending request field.
    pub field: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(
        code: ValidationCode,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            field,
            message: message.into(),
        }
    }
}
