//! Raw creation payload and its validated form.

use crate::credit::domain::CreditAmount;
use crate::generation::domain::{
    AspectRatio, GenerationDraft, GenerationMode, PersonGeneration, Resolution, credit_cost,
};
use crate::identity::domain::UserId;
use serde::{Deserialize, Serialize};

/// Creation payload as received from a client. Every field is optional so
/// that absence can be reported with a precise validation code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGenerationRequest {
    /// Prompt describing the video.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Content to steer away from.
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// `16:9` or `9:16`.
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// `720p` or `1080p`.
    #[serde(default)]
    pub resolution: Option<String>,
    /// Seconds of output.
    #[serde(default)]
    pub duration: Option<i64>,
    /// Mode name.
    #[serde(default)]
    pub generation_mode: Option<String>,
    /// Reference image URLs (reference-images mode).
    #[serde(default)]
    pub reference_images: Option<Vec<String>>,
    /// Opening frame URL (first-last-frame mode).
    #[serde(default)]
    pub first_frame_url: Option<String>,
    /// Closing frame URL (first-last-frame mode).
    #[serde(default)]
    pub last_frame_url: Option<String>,
    /// Task to extend (extend-video mode).
    #[serde(default)]
    pub source_video_id: Option<String>,
    /// Person-generation policy.
    #[serde(default)]
    pub person_generation: Option<String>,
}

/// Normalized request that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedGeneration {
    /// Mode and its payload.
    pub mode: GenerationMode,
    /// Trimmed prompt.
    pub prompt: String,
    /// Trimmed negative prompt, if non-blank.
    pub negative_prompt: Option<String>,
    /// Aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Resolution.
    pub resolution: Resolution,
    /// Effective duration in seconds.
    pub duration: u32,
    /// Effective person-generation policy.
    pub person_generation: PersonGeneration,
}

impl ValidatedGeneration {
    /// Credits this job costs.
    #[must_use]
    pub const fn credit_cost(&self) -> CreditAmount {
        credit_cost(self.mode.kind(), self.resolution, self.duration)
    }

    /// Converts into admission inputs for `user_id`.
    #[must_use]
    pub fn into_draft(self, user_id: UserId) -> GenerationDraft {
        let credit_cost = self.credit_cost();
        GenerationDraft {
            user_id,
            mode: self.mode,
            prompt: self.prompt,
            negative_prompt: self.negative_prompt,
            aspect_ratio: self.aspect_ratio,
            resolution: self.resolution,
            duration: self.duration,
            chain_duration: self.duration,
            person_generation: self.person_generation,
            credit_cost,
        }
    }
}
