//! Generation modes and their mode-specific payloads.

use super::{GenerationTaskId, ParseParameterError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durations accepted for text-to-video.
pub const TEXT_TO_VIDEO_DURATIONS: [u32; 3] = [4, 6, 8];

/// Duration forced for image-conditioned modes.
pub const IMAGE_MODE_DURATION: u32 = 8;

/// Seconds appended by one extension.
pub const EXTENSION_SEGMENT_SECONDS: u32 = 7;

/// Maximum number of reference images.
pub const MAX_REFERENCE_IMAGES: usize = 3;

/// Discriminant of [`GenerationMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationModeKind {
    /// Prompt only.
    TextToVideo,
    /// Prompt conditioned on up to three reference images.
    ReferenceImages,
    /// Prompt interpolated between a first and a last frame.
    FirstLastFrame,
    /// Continuation of a previously generated video.
    ExtendVideo,
}

impl GenerationModeKind {
    /// Every mode.
    pub const ALL: [Self; 4] = [
        Self::TextToVideo,
        Self::ReferenceImages,
        Self::FirstLastFrame,
        Self::ExtendVideo,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextToVideo => "text-to-video",
            Self::ReferenceImages => "reference-images",
            Self::FirstLastFrame => "first-last-frame",
            Self::ExtendVideo => "extend-video",
        }
    }

    /// Durations the mode produces.
    #[must_use]
    pub const fn allowed_durations(self) -> &'static [u32] {
        match self {
            Self::TextToVideo => &TEXT_TO_VIDEO_DURATIONS,
            Self::ReferenceImages | Self::FirstLastFrame => &[IMAGE_MODE_DURATION],
            Self::ExtendVideo => &[EXTENSION_SEGMENT_SECONDS],
        }
    }

    /// Duration the mode imposes regardless of input, if any.
    #[must_use]
    pub const fn forced_duration(self) -> Option<u32> {
        match self {
            Self::TextToVideo => None,
            Self::ReferenceImages | Self::FirstLastFrame => Some(IMAGE_MODE_DURATION),
            Self::ExtendVideo => Some(EXTENSION_SEGMENT_SECONDS),
        }
    }

    /// Whether the mode is conditioned on caller-supplied images.
    #[must_use]
    pub const fn is_image_conditioned(self) -> bool {
        matches!(self, Self::ReferenceImages | Self::FirstLastFrame)
    }
}

impl TryFrom<&str> for GenerationModeKind {
    type Error = ParseParameterError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text-to-video" => Ok(Self::TextToVideo),
            "reference-images" => Ok(Self::ReferenceImages),
            "first-last-frame" => Ok(Self::FirstLastFrame),
            "extend-video" => Ok(Self::ExtendVideo),
            _ => Err(ParseParameterError::new("generation_mode", value)),
        }
    }
}

impl fmt::Display for GenerationModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Between one and three reference image URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ReferenceImages(Vec<String>);

impl ReferenceImages {
    /// Accepts 1..=3 URLs.
    ///
    /// # Errors
    ///
    /// Returns the original list when its length is out of range.
    pub fn new(urls: Vec<String>) -> Result<Self, Vec<String>> {
        if urls.is_empty() || urls.len() > MAX_REFERENCE_IMAGES {
            return Err(urls);
        }
        Ok(Self(urls))
    }

    /// Returns the URLs.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for ReferenceImages {
    type Error = ParseParameterError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
            .map_err(|urls| ParseParameterError::new("reference_images", &urls.len().to_string()))
    }
}

impl From<ReferenceImages> for Vec<String> {
    fn from(value: ReferenceImages) -> Self {
        value.0
    }
}

/// Generation mode together with exactly the inputs that mode accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "generation_mode", rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Prompt only.
    TextToVideo,
    /// Prompt plus reference images.
    ReferenceImages {
        /// Reference image URLs.
        reference_images: ReferenceImages,
    },
    /// Prompt plus boundary frames.
    FirstLastFrame {
        /// Opening frame URL.
        first_frame_url: String,
        /// Closing frame URL.
        last_frame_url: String,
    },
    /// Continuation of an earlier task's video.
    ExtendVideo {
        /// Task whose video is extended.
        source_video_id: GenerationTaskId,
    },
}

impl GenerationMode {
    /// Returns the mode discriminant.
    #[must_use]
    pub const fn kind(&self) -> GenerationModeKind {
        match self {
            Self::TextToVideo => GenerationModeKind::TextToVideo,
            Self::ReferenceImages { .. } => GenerationModeKind::ReferenceImages,
            Self::FirstLastFrame { .. } => GenerationModeKind::FirstLastFrame,
            Self::ExtendVideo { .. } => GenerationModeKind::ExtendVideo,
        }
    }

    /// Returns the source task for extensions.
    #[must_use]
    pub const fn source_video_id(&self) -> Option<GenerationTaskId> {
        match self {
            Self::ExtendVideo { source_video_id } => Some(*source_video_id),
            Self::TextToVideo | Self::ReferenceImages { .. } | Self::FirstLastFrame { .. } => None,
        }
    }
}
