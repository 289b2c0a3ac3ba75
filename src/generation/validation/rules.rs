//! Individual validation rules and the composite validator.
//!
//! Each rule is a pure function over the raw request. The composite runs
//! them in priority order and stops at the first violation.

use super::{CreateGenerationRequest, ValidatedGeneration, ValidationCode, ValidationError};
use crate::generation::domain::{
    AspectRatio, GenerationMode, GenerationModeKind, GenerationTaskId, MAX_REFERENCE_IMAGES,
    PersonGeneration, ReferenceImages, Resolution,
};
use crate::identity::domain::UserRegion;

/// Validates and normalizes a creation request.
///
/// `region` is the caller's region, used for the person-generation policy.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in rule order: prompt, aspect
/// ratio, resolution, duration, mode, mode payload completeness, payload
/// exclusivity, mode constraints, person generation.
pub fn validate_generation_request(
    request: &CreateGenerationRequest,
    region: Option<&UserRegion>,
) -> Result<ValidatedGeneration, ValidationError> {
    let prompt = validate_prompt(request.prompt.as_deref())?;
    let aspect_ratio = validate_aspect_ratio(request.aspect_ratio.as_deref())?;
    let resolution = validate_resolution(request.resolution.as_deref())?;
    let declared_mode = request
        .generation_mode
        .as_deref()
        .and_then(|mode| GenerationModeKind::try_from(mode).ok());
    let duration = validate_duration(declared_mode, request.duration)?;
    let kind = validate_mode(request.generation_mode.as_deref(), declared_mode)?;
    let mode = build_mode_payload(kind, request)?;
    reject_conflicting_fields(kind, request)?;
    validate_mode_constraints(kind, aspect_ratio, resolution)?;
    let person_generation =
        validate_person_generation(kind, request.person_generation.as_deref(), region)?;

    Ok(ValidatedGeneration {
        mode,
        prompt,
        negative_prompt: non_blank(request.negative_prompt.as_deref()).map(str::to_owned),
        aspect_ratio,
        resolution,
        duration,
        person_generation,
    })
}

/// Person-generation policy applied when the caller omits one.
#[must_use]
pub fn default_person_generation(
    kind: GenerationModeKind,
    region: Option<&UserRegion>,
) -> PersonGeneration {
    if kind.is_image_conditioned() || region.is_some_and(UserRegion::is_restricted) {
        PersonGeneration::AllowAdult
    } else {
        PersonGeneration::AllowAll
    }
}

/// Policies a caller in `region` may request for `kind`.
#[must_use]
pub fn allowed_person_generation(
    kind: GenerationModeKind,
    region: Option<&UserRegion>,
) -> Vec<PersonGeneration> {
    let candidates: &[PersonGeneration] = if kind.is_image_conditioned() {
        &[PersonGeneration::AllowAdult]
    } else {
        &[
            PersonGeneration::AllowAll,
            PersonGeneration::AllowAdult,
            PersonGeneration::DontAllow,
        ]
    };
    let restricted = region.is_some_and(UserRegion::is_restricted);
    candidates
        .iter()
        .copied()
        .filter(|policy| !(restricted && *policy == PersonGeneration::AllowAll))
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

fn validate_prompt(prompt: Option<&str>) -> Result<String, ValidationError> {
    non_blank(prompt).map(str::to_owned).ok_or_else(|| {
        ValidationError::new(ValidationCode::MissingPrompt, "prompt", "prompt is required")
    })
}

fn validate_aspect_ratio(value: Option<&str>) -> Result<AspectRatio, ValidationError> {
    value
        .and_then(|raw| AspectRatio::try_from(raw).ok())
        .ok_or_else(|| {
            ValidationError::new(
                ValidationCode::InvalidAspectRatio,
                "aspect_ratio",
                "aspect_ratio must be one of: 16:9, 9:16",
            )
        })
}

fn validate_resolution(value: Option<&str>) -> Result<Resolution, ValidationError> {
    value
        .and_then(|raw| Resolution::try_from(raw).ok())
        .ok_or_else(|| {
            ValidationError::new(
                ValidationCode::InvalidResolution,
                "resolution",
                "resolution must be one of: 720p, 1080p",
            )
        })
}

/// Modes with a forced duration accept an omitted value or the forced one;
/// text-to-video (and an unrecognised mode) requires a value from its set.
fn validate_duration(
    mode: Option<GenerationModeKind>,
    duration: Option<i64>,
) -> Result<u32, ValidationError> {
    let kind = mode.unwrap_or(GenerationModeKind::TextToVideo);
    let allowed = kind.allowed_durations();
    let requested = duration.and_then(|seconds| u32::try_from(seconds).ok());
    let effective = match (requested, kind.forced_duration()) {
        (None, Some(forced)) if duration.is_none() => Some(forced),
        (Some(seconds), _) if allowed.contains(&seconds) => Some(seconds),
        _ => None,
    };
    effective.ok_or_else(|| {
        let listed = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        ValidationError::new(
            ValidationCode::InvalidDuration,
            "duration",
            format!("duration for {kind} must be one of: {listed}"),
        )
    })
}

fn validate_mode(
    raw: Option<&str>,
    parsed: Option<GenerationModeKind>,
) -> Result<GenerationModeKind, ValidationError> {
    parsed.ok_or_else(|| {
        let known = GenerationModeKind::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        ValidationError::new(
            ValidationCode::InvalidGenerationMode,
            "generation_mode",
            format!(
                "generation_mode '{}' is not one of: {known}",
                raw.unwrap_or_default()
            ),
        )
    })
}

fn build_mode_payload(
    kind: GenerationModeKind,
    request: &CreateGenerationRequest,
) -> Result<GenerationMode, ValidationError> {
    match kind {
        GenerationModeKind::TextToVideo => Ok(GenerationMode::TextToVideo),
        GenerationModeKind::ReferenceImages => {
            let urls = request
                .reference_images
                .iter()
                .flatten()
                .filter_map(|url| non_blank(Some(url)))
                .map(str::to_owned)
                .collect::<Vec<_>>();
            let reference_images = ReferenceImages::new(urls).map_err(|rejected| {
                ValidationError::new(
                    ValidationCode::InvalidReferenceImages,
                    "reference_images",
                    format!(
                        "reference-images mode requires 1-{MAX_REFERENCE_IMAGES} images, got {}",
                        rejected.len()
                    ),
                )
            })?;
            Ok(GenerationMode::ReferenceImages { reference_images })
        }
        GenerationModeKind::FirstLastFrame => {
            match (
                non_blank(request.first_frame_url.as_deref()),
                non_blank(request.last_frame_url.as_deref()),
            ) {
                (Some(first), Some(last)) => Ok(GenerationMode::FirstLastFrame {
                    first_frame_url: first.to_owned(),
                    last_frame_url: last.to_owned(),
                }),
                (first, _) => Err(ValidationError::new(
                    ValidationCode::MissingFrameUrls,
                    if first.is_none() {
                        "first_frame_url"
                    } else {
                        "last_frame_url"
                    },
                    "first-last-frame mode requires both first_frame_url and last_frame_url",
                )),
            }
        }
        GenerationModeKind::ExtendVideo => {
            let raw = non_blank(request.source_video_id.as_deref()).ok_or_else(|| {
                ValidationError::new(
                    ValidationCode::MissingSourceVideoId,
                    "source_video_id",
                    "extend-video mode requires source_video_id",
                )
            })?;
            let source_video_id = raw.parse::<GenerationTaskId>().map_err(|_| {
                ValidationError::new(
                    ValidationCode::InvalidSourceVideoId,
                    "source_video_id",
                    format!("source_video_id '{raw}' is not a task identifier"),
                )
            })?;
            Ok(GenerationMode::ExtendVideo { source_video_id })
        }
    }
}

/// Payload fields present on the request, by the mode that owns them.
fn present_payload_fields(
    request: &CreateGenerationRequest,
) -> [(&'static str, GenerationModeKind, bool); 4] {
    let has_images = request
        .reference_images
        .as_ref()
        .is_some_and(|urls| !urls.is_empty());
    [
        (
            "reference_images",
            GenerationModeKind::ReferenceImages,
            has_images,
        ),
        (
            "first_frame_url",
            GenerationModeKind::FirstLastFrame,
            non_blank(request.first_frame_url.as_deref()).is_some(),
        ),
        (
            "last_frame_url",
            GenerationModeKind::FirstLastFrame,
            non_blank(request.last_frame_url.as_deref()).is_some(),
        ),
        (
            "source_video_id",
            GenerationModeKind::ExtendVideo,
            non_blank(request.source_video_id.as_deref()).is_some(),
        ),
    ]
}

fn reject_conflicting_fields(
    kind: GenerationModeKind,
    request: &CreateGenerationRequest,
) -> Result<(), ValidationError> {
    let conflict = present_payload_fields(request)
        .into_iter()
        .find(|(_, owner, present)| *present && *owner != kind);
    match conflict {
        Some((field, owner, _)) => Err(ValidationError::new(
            ValidationCode::ConflictingFields,
            field,
            format!("{field} belongs to {owner} mode and cannot be combined with {kind}"),
        )),
        None => Ok(()),
    }
}

fn validate_mode_constraints(
    kind: GenerationModeKind,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
) -> Result<(), ValidationError> {
    match kind {
        GenerationModeKind::ReferenceImages if aspect_ratio != AspectRatio::Landscape => {
            Err(ValidationError::new(
                ValidationCode::InvalidAspectRatio,
                "aspect_ratio",
                "reference-images mode supports only 16:9",
            ))
        }
        GenerationModeKind::ExtendVideo if resolution != Resolution::Hd720 => {
            Err(ValidationError::new(
                ValidationCode::InvalidResolution,
                "resolution",
                "extend-video mode supports only 720p",
            ))
        }
        GenerationModeKind::TextToVideo
        | GenerationModeKind::ReferenceImages
        | GenerationModeKind::FirstLastFrame
        | GenerationModeKind::ExtendVideo => Ok(()),
    }
}

/// Validates an explicit policy, or picks the default when none is given.
///
/// # Errors
///
/// Returns [`ValidationCode::InvalidPersonGeneration`] for unknown values,
/// for anything other than `allow_adult` in image-conditioned modes, and for
/// `allow_all` in restricted regions.
pub(crate) fn validate_person_generation(
    kind: GenerationModeKind,
    value: Option<&str>,
    region: Option<&UserRegion>,
) -> Result<PersonGeneration, ValidationError> {
    let Some(raw) = non_blank(value) else {
        return Ok(default_person_generation(kind, region));
    };
    let reject = |message: String| {
        ValidationError::new(
            ValidationCode::InvalidPersonGeneration,
            "person_generation",
            message,
        )
    };
    let policy = PersonGeneration::try_from(raw).map_err(|_| {
        reject(format!(
            "person_generation '{raw}' must be one of: allow_all, allow_adult, dont_allow"
        ))
    })?;
    if kind.is_image_conditioned() && policy != PersonGeneration::AllowAdult {
        return Err(reject(format!(
            "{kind} mode supports only person_generation=allow_adult"
        )));
    }
    match region {
        Some(restricted) if restricted.is_restricted() && policy == PersonGeneration::AllowAll => {
            Err(reject(format!(
                "person_generation=allow_all is not available in region {restricted}"
            )))
        }
        _ => Ok(policy),
    }
}
