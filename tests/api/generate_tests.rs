//! `POST /v1/video/generate` outcomes.

use super::helpers::{TOKEN, TestApp, post_json, post_json_from, text, text_payload};
use axum::http::StatusCode;
use eyre::ensure;
use reelforge::generation::ports::ProviderError;
use reelforge::identity::domain::PlanTier;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

const GENERATE: &str = "/v1/video/generate";

#[fixture]
fn app() -> TestApp {
    TestApp::new(PlanTier::Basic, 100)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn text_to_video_is_admitted_and_charged(app: TestApp) -> eyre::Result<()> {
    let (status, body) = app
        .send(post_json(GENERATE, Some(TOKEN), &text_payload()))
        .await?;

    ensure!(status == StatusCode::OK, "unexpected status {status}: {body}");
    ensure!(text(&body, "status")? == "processing");
    ensure!(body.get("credit_cost") == Some(&json!(40)));
    ensure!(body.get("chain_duration") == Some(&json!(4)));
    ensure!(body.get("operation_id").is_some_and(Value::is_string));
    ensure!(app.balance(app.user).await? == 60);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn request_at_concurrency_ceiling_is_rejected(app: TestApp) -> eyre::Result<()> {
    let (first, _) = app
        .send(post_json(GENERATE, Some(TOKEN), &text_payload()))
        .await?;
    ensure!(first == StatusCode::OK);
    let before = app.balance(app.user).await?;

    let (status, body) = app
        .send(post_json(GENERATE, Some(TOKEN), &text_payload()))
        .await?;

    ensure!(status == StatusCode::TOO_MANY_REQUESTS);
    ensure!(text(&body, "error")? == "CONCURRENT_LIMIT_EXCEEDED");
    ensure!(app.balance(app.user).await? == before);
    ensure!(app.provider.submissions().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn four_reference_images_are_rejected(app: TestApp) -> eyre::Result<()> {
    let payload = json!({
        "prompt": "a product turntable",
        "aspect_ratio": "16:9",
        "resolution": "720p",
        "generation_mode": "reference-images",
        "reference_images": [
            "https://cdn.example/1.png",
            "https://cdn.example/2.png",
            "https://cdn.example/3.png",
            "https://cdn.example/4.png"
        ]
    });

    let (status, body) = app.send(post_json(GENERATE, Some(TOKEN), &payload)).await?;

    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(text(&body, "error")? == "INVALID_REFERENCE_IMAGES");
    ensure!(text(&body, "message")?.contains("1-3"));
    ensure!(text(&body, "field")? == "reference_images");
    ensure!(app.provider.submissions().is_empty());
    Ok(())
}

#[rstest]
#[case(json!({"aspect_ratio": "16:9"}), "MISSING_PROMPT")]
#[case(json!({"prompt": "x", "aspect_ratio": "4:3"}), "INVALID_ASPECT_RATIO")]
#[case(json!({"prompt": "x", "aspect_ratio": "16:9", "resolution": "4k"}), "INVALID_RESOLUTION")]
#[case(
    json!({"prompt": "x", "aspect_ratio": "16:9", "resolution": "720p", "duration": 5}),
    "INVALID_DURATION"
)]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_fields_map_to_bad_request(
    app: TestApp,
    #[case] payload: Value,
    #[case] code: &str,
) -> eyre::Result<()> {
    let (status, body) = app.send(post_json(GENERATE, Some(TOKEN), &payload)).await?;

    ensure!(status == StatusCode::BAD_REQUEST, "unexpected status {status}");
    ensure!(text(&body, "error")? == code, "unexpected body {body}");
    ensure!(body.get("retryable") == Some(&json!(false)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn insufficient_credits_is_payment_required() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Basic, 30);

    let (status, body) = app
        .send(post_json(GENERATE, Some(TOKEN), &text_payload()))
        .await?;

    ensure!(status == StatusCode::PAYMENT_REQUIRED);
    ensure!(text(&body, "error")? == "INSUFFICIENT_CREDITS");
    ensure!(app.balance(app.user).await? == 30);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn provider_rejection_is_retryable_and_refunded(app: TestApp) -> eyre::Result<()> {
    app.provider.fail_submissions_with(ProviderError::Unavailable(
        "model overloaded".to_owned(),
    ));

    let (status, body) = app
        .send(post_json(GENERATE, Some(TOKEN), &text_payload()))
        .await?;

    ensure!(status == StatusCode::SERVICE_UNAVAILABLE);
    ensure!(text(&body, "error")? == "PROVIDER_ERROR");
    ensure!(body.get("retryable") == Some(&json!(true)));
    ensure!(app.balance(app.user).await? == 100);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn restricted_region_cannot_allow_all_people(app: TestApp) -> eyre::Result<()> {
    let mut payload = text_payload();
    payload["person_generation"] = json!("allow_all");

    let (status, body) = app
        .send(post_json_from(GENERATE, TOKEN, "UK", &payload))
        .await?;

    ensure!(status == StatusCode::BAD_REQUEST, "unexpected status {status}: {body}");
    ensure!(text(&body, "error")? == "INVALID_PERSON_GENERATION");
    Ok(())
}
