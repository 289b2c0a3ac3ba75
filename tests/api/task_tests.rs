//! Reading, listing and cancelling tasks over HTTP.

use super::helpers::{OTHER_TOKEN, TOKEN, TestApp, get, post_json, text, text_payload};
use axum::http::StatusCode;
use eyre::{OptionExt, ensure};
use reelforge::generation::domain::OperationId;
use reelforge::identity::domain::PlanTier;
use rstest::rstest;
use serde_json::{Value, json};

async fn create(app: &TestApp) -> eyre::Result<(String, String)> {
    let (status, body) = app
        .send(post_json("/v1/video/generate", Some(TOKEN), &text_payload()))
        .await?;
    ensure!(status == StatusCode::OK, "create failed with {status}: {body}");
    Ok((
        text(&body, "task_id")?.to_owned(),
        text(&body, "operation_id")?.to_owned(),
    ))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn owner_reads_task_others_do_not() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Basic, 100);
    let (task_id, _) = create(&app).await?;
    let uri = format!("/v1/video/tasks/{task_id}");

    let (status, body) = app.send(get(&uri, Some(TOKEN))).await?;
    ensure!(status == StatusCode::OK);
    ensure!(text(&body, "id")? == task_id);
    ensure!(text(&body, "generation_mode")? == "text-to-video");
    ensure!(body.get("can_extend") == Some(&json!(false)));

    let (hidden, error) = app.send(get(&uri, Some(OTHER_TOKEN))).await?;
    ensure!(hidden == StatusCode::NOT_FOUND);
    ensure!(text(&error, "error")? == "TASK_NOT_FOUND");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_task_id_is_not_found() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Basic, 100);

    let (status, body) = app
        .send(get("/v1/video/tasks/not-a-uuid", Some(TOKEN)))
        .await?;

    ensure!(status == StatusCode::NOT_FOUND);
    ensure!(text(&body, "error")? == "TASK_NOT_FOUND");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_filters_by_status() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Max, 1_000);
    create(&app).await?;
    create(&app).await?;

    let (status, body) = app
        .send(get("/v1/video/tasks?status=processing&limit=1", Some(TOKEN)))
        .await?;
    ensure!(status == StatusCode::OK);
    ensure!(body.get("total") == Some(&json!(2)));
    ensure!(body.get("limit") == Some(&json!(1)));
    let tasks = body
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_eyre("tasks array")?;
    ensure!(tasks.len() == 1);

    let (empty, listing) = app
        .send(get("/v1/video/tasks?status=completed", Some(TOKEN)))
        .await?;
    ensure!(empty == StatusCode::OK);
    ensure!(listing.get("total") == Some(&json!(0)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_status_filter_is_invalid_query() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Basic, 100);

    let (status, body) = app
        .send(get("/v1/video/tasks?status=queued", Some(TOKEN)))
        .await?;

    ensure!(status == StatusCode::BAD_REQUEST);
    ensure!(text(&body, "error")? == "INVALID_QUERY");
    ensure!(text(&body, "field")? == "status");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancel_refunds_once_then_conflicts() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Basic, 100);
    let (task_id, _) = create(&app).await?;
    let uri = format!("/v1/video/tasks/{task_id}/cancel");

    let (status, body) = app.send(post_json(&uri, Some(TOKEN), &json!({}))).await?;
    ensure!(status == StatusCode::OK, "cancel failed with {status}: {body}");
    ensure!(text(&body, "status")? == "cancelled");
    ensure!(body.get("refunded") == Some(&json!(true)));
    ensure!(app.balance(app.user).await? == 100);

    let (again, error) = app.send(post_json(&uri, Some(TOKEN), &json!({}))).await?;
    ensure!(again == StatusCode::CONFLICT);
    ensure!(text(&error, "error")? == "CANCELLATION_REJECTED");
    ensure!(app.balance(app.user).await? == 100);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn finalized_task_exposes_stored_video() -> eyre::Result<()> {
    let app = TestApp::new(PlanTier::Basic, 100);
    let (task_id, operation) = create(&app).await?;
    app.provider.complete(
        &OperationId::new(operation),
        "https://provider.example/files/out.mp4",
        b"mp4-bytes",
    );

    let report = app.finalizer.tick().await?;
    ensure!(report.completed == 1, "unexpected tick report {report:?}");

    let (status, body) = app
        .send(get(&format!("/v1/video/tasks/{task_id}"), Some(TOKEN)))
        .await?;
    ensure!(status == StatusCode::OK);
    ensure!(text(&body, "status")? == "completed");
    ensure!(body.get("video_size_bytes") == Some(&json!(9)));
    ensure!(body.get("can_extend") == Some(&json!(true)));
    ensure!(body.get("refunded") == Some(&json!(false)));
    Ok(())
}
