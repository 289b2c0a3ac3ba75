//! Authentication and request-shape failures.

use super::helpers::{TOKEN, TestApp, get, post_json, post_raw, text, text_payload};
use axum::http::StatusCode;
use eyre::ensure;
use reelforge::identity::domain::PlanTier;
use rstest::{fixture, rstest};

#[fixture]
fn app() -> TestApp {
    TestApp::new(PlanTier::Basic, 100)
}

#[rstest]
#[case(None)]
#[case(Some("unknown-token"))]
#[tokio::test(flavor = "multi_thread")]
async fn missing_or_unknown_token_is_unauthorized(
    app: TestApp,
    #[case] token: Option<&str>,
) -> eyre::Result<()> {
    let (status, body) = app
        .send(post_json("/v1/video/generate", token, &text_payload()))
        .await?;

    ensure!(status == StatusCode::UNAUTHORIZED);
    ensure!(text(&body, "error")? == "UNAUTHORIZED");
    ensure!(app.provider.submissions().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn health_needs_no_token(app: TestApp) -> eyre::Result<()> {
    let (status, body) = app.send(get("/health", None)).await?;

    ensure!(status == StatusCode::OK);
    ensure!(text(&body, "status")? == "ok");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_is_bad_request(app: TestApp) -> eyre::Result<()> {
    let (status, body) = app
        .send(post_raw("/v1/video/generate", Some(TOKEN), "{\"prompt\": "))
        .await?;

    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(text(&body, "error")? == "INVALID_REQUEST_BODY");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stats_require_authentication(app: TestApp) -> eyre::Result<()> {
    let (status, _) = app.send(get("/v1/stats/video-generation", None)).await?;
    ensure!(status == StatusCode::UNAUTHORIZED);

    let (ok, body) = app
        .send(get("/v1/stats/video-generation?window=1h", Some(TOKEN)))
        .await?;
    ensure!(ok == StatusCode::OK);
    ensure!(text(&body, "window")? == "1h");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_stats_window_is_invalid_query(app: TestApp) -> eyre::Result<()> {
    let (status, body) = app
        .send(get("/v1/stats/video-generation?window=fortnight", Some(TOKEN)))
        .await?;

    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(text(&body, "error")? == "INVALID_QUERY");
    ensure!(text(&body, "field")? == "window");
    Ok(())
}
