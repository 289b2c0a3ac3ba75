//! HTTP adapter for the Veo long-running video generation API.
//!
//! Request bodies and response parsing are plain functions over serde types
//! so they can be exercised without a network.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::generation::{
    domain::{GenerationMode, OperationId, PROVIDER_ERROR},
    ports::{
        ExtensionSubmission, GenerationProvider, GenerationSubmission, OperationStatus,
        ProviderError, ProviderResult,
    },
};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Code reported when the provider's safety filter blocks a job.
pub const SAFETY_FILTER: &str = "SAFETY_FILTER";
/// Code reported when the provider throttles the caller.
pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
/// Code reported when every produced sample was filtered as unsafe.
pub const NSFW_CONTENT_DETECTED: &str = "NSFW_CONTENT_DETECTED";

/// Connection settings for the Veo API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VeoProviderConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name used for submissions.
    pub model: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// [`GenerationProvider`] backed by the Veo REST API.
#[derive(Debug, Clone)]
pub struct VeoHttpProvider {
    client: Client,
    config: VeoProviderConfig,
}

impl VeoHttpProvider {
    /// Builds a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] when the client cannot be built.
    pub fn new(config: VeoProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ProviderError::transport)?;
        Ok(Self { client, config })
    }

    fn submit_url(&self) -> String {
        format!(
            "{}/models/{}:predictLongRunning",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn operation_url(&self, operation_id: &OperationId) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            operation_id.as_str().trim_start_matches('/')
        )
    }

    async fn start(&self, body: &PredictRequest) -> ProviderResult<OperationId> {
        let response = self
            .client
            .post(self.submit_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let payload = read_json(response).await?;
        let operation = parse_submit_response(&payload)?;
        debug!(operation_id = %operation, "provider accepted submission");
        Ok(operation)
    }
}

#[async_trait]
impl GenerationProvider for VeoHttpProvider {
    async fn submit(&self, submission: &GenerationSubmission) -> ProviderResult<OperationId> {
        self.start(&generation_request(submission)).await
    }

    async fn submit_extension(
        &self,
        submission: &ExtensionSubmission,
    ) -> ProviderResult<OperationId> {
        self.start(&extension_request(submission)).await
    }

    async fn poll_status(&self, operation_id: &OperationId) -> ProviderResult<OperationStatus> {
        let response = self
            .client
            .get(self.operation_url(operation_id))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;
        let payload = read_json(response).await?;
        parse_operation(&payload)
    }

    async fn fetch_result(&self, result_uri: &str) -> ProviderResult<Vec<u8>> {
        let response = self
            .client
            .get(result_uri)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(bytes.to_vec())
    }
}

/// Body of a `predictLongRunning` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    /// Single-element instance list.
    pub instances: Vec<PredictInstance>,
    /// Generation parameters.
    pub parameters: PredictParameters,
}

/// Prompt and conditioning inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictInstance {
    /// Prompt text.
    pub prompt: String,
    /// Opening frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInput>,
    /// Closing frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame: Option<ImageInput>,
    /// Asset references guiding the subject.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImageInput>,
    /// Video being extended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoInput>,
}

/// Image passed by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    /// Image URL.
    pub image_url: String,
}

/// Subject reference image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImageInput {
    /// The image.
    pub image: ImageInput,
    /// Always `asset`.
    pub reference_type: &'static str,
}

/// Previously generated video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    /// Provider handle of the video.
    pub video_uri: String,
}

/// Output parameters. Extensions omit duration and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    /// Seconds of output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// `16:9` or `9:16`.
    pub aspect_ratio: String,
    /// `720p` or `1080p`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Negative prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Person-generation policy.
    pub person_generation: String,
}

fn image(url: &str) -> ImageInput {
    ImageInput {
        image_url: url.to_owned(),
    }
}

/// Builds the body for a new-video job.
#[must_use]
pub fn generation_request(submission: &GenerationSubmission) -> PredictRequest {
    let mut instance = PredictInstance {
        prompt: submission.prompt.clone(),
        image: None,
        last_frame: None,
        reference_images: Vec::new(),
        video: None,
    };
    match &submission.mode {
        GenerationMode::TextToVideo | GenerationMode::ExtendVideo { .. } => {}
        GenerationMode::ReferenceImages { reference_images } => {
            instance.reference_images = reference_images
                .as_slice()
                .iter()
                .map(|url| ReferenceImageInput {
                    image: image(url),
                    reference_type: "asset",
                })
                .collect();
        }
        GenerationMode::FirstLastFrame {
            first_frame_url,
            last_frame_url,
        } => {
            instance.image = Some(image(first_frame_url));
            instance.last_frame = Some(image(last_frame_url));
        }
    }

    PredictRequest {
        instances: vec![instance],
        parameters: PredictParameters {
            duration_seconds: Some(submission.duration),
            aspect_ratio: submission.aspect_ratio.as_str().to_owned(),
            resolution: Some(submission.resolution.as_str().to_owned()),
            negative_prompt: submission.negative_prompt.clone(),
            person_generation: submission.person_generation.as_str().to_owned(),
        },
    }
}

/// Builds the body for a continuation job.
#[must_use]
pub fn extension_request(submission: &ExtensionSubmission) -> PredictRequest {
    PredictRequest {
        instances: vec![PredictInstance {
            prompt: submission.prompt.clone(),
            image: None,
            last_frame: None,
            reference_images: Vec::new(),
            video: Some(VideoInput {
                video_uri: submission.source_video_uri.clone(),
            }),
        }],
        parameters: PredictParameters {
            duration_seconds: None,
            aspect_ratio: submission.aspect_ratio.as_str().to_owned(),
            resolution: None,
            negative_prompt: None,
            person_generation: submission.person_generation.as_str().to_owned(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    done: bool,
    error: Option<OperationErrorBody>,
    response: Option<OperationResult>,
}

#[derive(Debug, Deserialize)]
struct OperationErrorBody {
    code: Option<Value>,
    status: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_count: u32,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<SampleVideo>,
}

#[derive(Debug, Deserialize)]
struct SampleVideo {
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<OperationErrorBody>,
}

/// Extracts the operation handle from a submission response.
///
/// # Errors
///
/// Returns [`ProviderError::Protocol`] when the response names no operation.
pub fn parse_submit_response(payload: &Value) -> ProviderResult<OperationId> {
    let response = SubmitResponse::deserialize(payload)
        .map_err(|err| ProviderError::Protocol(err.to_string()))?;
    response
        .name
        .filter(|name| !name.trim().is_empty())
        .map(OperationId::new)
        .ok_or_else(|| ProviderError::Protocol("no operation id returned".to_owned()))
}

/// Interprets an operation document.
///
/// # Errors
///
/// Returns [`ProviderError::Protocol`] when a finished operation carries
/// neither an error nor a video.
pub fn parse_operation(payload: &Value) -> ProviderResult<OperationStatus> {
    let operation = OperationResponse::deserialize(payload)
        .map_err(|err| ProviderError::Protocol(err.to_string()))?;
    if let Some(error) = operation.error {
        return Ok(OperationStatus::Error {
            code: error_code(&error),
            message: error.message,
        });
    }
    if !operation.done {
        return Ok(OperationStatus::Running);
    }

    let Some(generated) = operation
        .response
        .and_then(|result| result.generate_video_response)
    else {
        return Err(ProviderError::Protocol(
            "no video in completed operation".to_owned(),
        ));
    };
    let uri = generated
        .generated_samples
        .into_iter()
        .find_map(|sample| sample.video.and_then(|video| video.uri));
    match uri {
        Some(result_uri) => Ok(OperationStatus::Done { result_uri }),
        None if generated.rai_media_filtered_count > 0 => Ok(OperationStatus::Error {
            code: Some(NSFW_CONTENT_DETECTED.to_owned()),
            message: if generated.rai_media_filtered_reasons.is_empty() {
                "generated video was removed by the content filter".to_owned()
            } else {
                generated.rai_media_filtered_reasons.join("; ")
            },
        }),
        None => Err(ProviderError::Protocol(
            "no video in completed operation".to_owned(),
        )),
    }
}

fn error_code(error: &OperationErrorBody) -> Option<String> {
    match (&error.code, &error.status) {
        (Some(Value::String(code)), _) if !code.is_empty() => Some(code.clone()),
        (_, Some(status)) if !status.is_empty() => Some(status.clone()),
        (Some(Value::Number(code)), _) => Some(code.to_string()),
        _ => None,
    }
}

/// Maps a non-success HTTP response to a provider error.
#[must_use]
pub fn classify_http_failure(status: StatusCode, body: &str) -> ProviderError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).unwrap_or_default();
    let message = envelope
        .error
        .as_ref()
        .map(|error| error.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::Rejected {
            code: RATE_LIMIT_EXCEEDED.to_owned(),
            message,
        };
    }
    if message.to_ascii_lowercase().contains("safety filter") {
        return ProviderError::Rejected {
            code: SAFETY_FILTER.to_owned(),
            message,
        };
    }
    if status.is_server_error() {
        return ProviderError::Unavailable(message);
    }
    ProviderError::Rejected {
        code: envelope
            .error
            .as_ref()
            .and_then(error_code)
            .unwrap_or_else(|| PROVIDER_ERROR.to_owned()),
        message,
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::transport(err)
    }
}

async fn read_json(response: reqwest::Response) -> ProviderResult<Value> {
    let status = response.status();
    let body = response.text().await.map_err(map_transport_error)?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "provider returned an error response");
        return Err(classify_http_failure(status, &body));
    }
    serde_json::from_str(&body).map_err(|err| ProviderError::Protocol(err.to_string()))
}
