//! `POST /v1/video/extend` and extension through the creation endpoint.

use super::helpers::{OTHER_TOKEN, TOKEN, TestApp, post_json, text};
use axum::http::StatusCode;
use eyre::ensure;
use reelforge::identity::domain::PlanTier;
use rstest::{fixture, rstest};
use serde_json::json;

const EXTEND: &str = "/v1/video/extend";

#[fixture]
fn app() -> TestApp {
    TestApp::new(PlanTier::Basic, 100)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn source_at_cap_is_rejected_without_provider_call(app: TestApp) -> eyre::Result<()> {
    let source = app.seed_completed(142).await?;

    let (status, body) = app
        .send(post_json(
            EXTEND,
            Some(TOKEN),
            &json!({ "source_video_id": source.id().to_string(), "prompt": "keep going" }),
        ))
        .await?;

    ensure!(status == StatusCode::BAD_REQUEST, "unexpected status {status}: {body}");
    ensure!(text(&body, "error")? == "EXTENSION_NOT_ALLOWED");
    ensure!(text(&body, "message")?.contains("148-second cap"));
    ensure!(app.provider.submissions().is_empty());
    ensure!(app.balance(app.user).await? == 100);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn eligible_source_is_extended(app: TestApp) -> eyre::Result<()> {
    let source = app.seed_completed(8).await?;

    let (status, body) = app
        .send(post_json(
            EXTEND,
            Some(TOKEN),
            &json!({
                "source_video_id": source.id().to_string(),
                "prompt": "the camera pulls back"
            }),
        ))
        .await?;

    ensure!(status == StatusCode::OK, "unexpected status {status}: {body}");
    ensure!(text(&body, "status")? == "processing");
    ensure!(body.get("chain_duration") == Some(&json!(15)));
    ensure!(body.get("credit_cost") == Some(&json!(40)));
    ensure!(app.balance(app.user).await? == 60);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn another_users_video_is_not_found(app: TestApp) -> eyre::Result<()> {
    let source = app.seed_completed(8).await?;

    let (status, body) = app
        .send(post_json(
            EXTEND,
            Some(OTHER_TOKEN),
            &json!({ "source_video_id": source.id().to_string(), "prompt": "mine now" }),
        ))
        .await?;

    ensure!(status == StatusCode::NOT_FOUND);
    ensure!(text(&body, "error")? == "SOURCE_VIDEO_NOT_FOUND");
    ensure!(app.balance(app.other_user).await? == 100);
    Ok(())
}

#[rstest]
#[case(json!({ "prompt": "more" }), "MISSING_SOURCE_VIDEO_ID")]
#[case(json!({ "source_video_id": "not-a-task", "prompt": "more" }), "INVALID_SOURCE_VIDEO_ID")]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_source_ids_are_bad_requests(
    app: TestApp,
    #[case] payload: serde_json::Value,
    #[case] code: &str,
) -> eyre::Result<()> {
    let (status, body) = app.send(post_json(EXTEND, Some(TOKEN), &payload)).await?;

    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(text(&body, "error")? == code);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generate_endpoint_routes_extend_mode(app: TestApp) -> eyre::Result<()> {
    let source = app.seed_completed(8).await?;

    let (status, body) = app
        .send(post_json(
            "/v1/video/generate",
            Some(TOKEN),
            &json!({
                "prompt": "and then it rains",
                "aspect_ratio": "16:9",
                "resolution": "720p",
                "generation_mode": "extend-video",
                "source_video_id": source.id().to_string()
            }),
        ))
        .await?;

    ensure!(status == StatusCode::OK, "unexpected status {status}: {body}");
    ensure!(body.get("chain_duration") == Some(&json!(15)));
    Ok(())
}
