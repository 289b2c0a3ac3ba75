//! Extension eligibility rules.

use super::{EXTENSION_SEGMENT_SECONDS, GenerationStatus, GenerationTask, Resolution};
use thiserror::Error;

/// Longest video an extension chain may produce, in seconds.
pub const MAX_CHAIN_SECONDS: u32 = 148;

/// Reason a task's video cannot be extended.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ExtensionIneligibility {
    /// The source has not finished.
    #[error("only completed videos can be extended")]
    NotCompleted,
    /// The source is not 720p.
    #[error("extension supports only 720p source videos")]
    UnsupportedResolution,
    /// The provider gave no reusable handle for the source.
    #[error("this video does not support extension")]
    MissingProviderUri,
    /// Another segment would exceed the chain cap.
    #[error(
        "extended duration would exceed the 148-second cap ({source_seconds}s + 7s = {extended_seconds}s)"
    )]
    DurationCapExceeded {
        /// Realised length of the source video.
        source_seconds: u32,
        /// Length after one more segment.
        extended_seconds: u32,
    },
}

/// Returns whether a video with these properties may be extended.
#[must_use]
pub fn can_extend(
    status: GenerationStatus,
    resolution: Resolution,
    chain_duration: u32,
    provider_video_uri: Option<&str>,
) -> bool {
    check_extension(status, resolution, chain_duration, provider_video_uri).is_ok()
}

/// Checks extension eligibility of `source`, reporting the first failing
/// rule.
///
/// # Errors
///
/// Returns the first [`ExtensionIneligibility`] in the order status,
/// resolution, provider handle, duration cap.
pub fn check_extension_source(source: &GenerationTask) -> Result<(), ExtensionIneligibility> {
    check_extension(
        source.status(),
        source.resolution(),
        source.chain_duration(),
        source.provider_video_uri(),
    )
}

fn check_extension(
    status: GenerationStatus,
    resolution: Resolution,
    chain_duration: u32,
    provider_video_uri: Option<&str>,
) -> Result<(), ExtensionIneligibility> {
    if status != GenerationStatus::Completed {
        return Err(ExtensionIneligibility::NotCompleted);
    }
    if resolution != Resolution::Hd720 {
        return Err(ExtensionIneligibility::UnsupportedResolution);
    }
    if provider_video_uri.is_none_or(|uri| uri.trim().is_empty()) {
        return Err(ExtensionIneligibility::MissingProviderUri);
    }
    let extended_seconds = chain_duration.saturating_add(EXTENSION_SEGMENT_SECONDS);
    if extended_seconds > MAX_CHAIN_SECONDS {
        return Err(ExtensionIneligibility::DurationCapExceeded {
            source_seconds: chain_duration,
            extended_seconds,
        });
    }
    Ok(())
}
