//! Submission through storage, and extension chains up to the cap.

use super::helpers::{Pipeline, eight_second_request, operation_of, pipeline};
use eyre::{OptionExt, bail, ensure};
use reelforge::generation::{
    domain::{GenerationStatus, MAX_CHAIN_SECONDS},
    ports::{GenerationTaskRepository, asset_location},
    services::{ExtensionRequest, OrchestrationError},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_video_is_stored_with_checksum(pipeline: Pipeline) -> eyre::Result<()> {
    let task = pipeline
        .service
        .create(pipeline.user, &eight_second_request(), None)
        .await?;
    ensure!(pipeline.balance().await? == 920);

    pipeline.deliver(&task, b"0123456789").await?;

    let stored = pipeline
        .tasks
        .find_by_id(task.id())
        .await?
        .ok_or_eyre("task should exist")?;
    ensure!(stored.status() == GenerationStatus::Completed);
    let asset = stored.asset().ok_or_eyre("completed task records its asset")?;
    ensure!(asset.location == asset_location(pipeline.user, task.id()));
    ensure!(asset.size_bytes == 10);
    ensure!(asset.sha256.len() == 64);
    ensure!(pipeline.assets.get(&asset.location).as_deref() == Some(&b"0123456789"[..]));
    ensure!(pipeline.balance().await? == 920, "completion must not refund");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn extension_chain_stops_at_cap(pipeline: Pipeline) -> eyre::Result<()> {
    let mut current = pipeline
        .service
        .create(pipeline.user, &eight_second_request(), None)
        .await?;
    pipeline.deliver(&current, b"seed").await?;

    let mut hops = 0_u32;
    loop {
        let request = ExtensionRequest {
            source_video_id: current.id(),
            prompt: format!("hop {hops}"),
            person_generation: None,
        };
        match pipeline.service.extend(pipeline.user, request, None).await {
            Ok(extension) => {
                hops += 1;
                ensure!(extension.chain_duration() == 8 + 7 * hops);
                pipeline.deliver(&extension, b"segment").await?;
                current = extension;
            }
            Err(OrchestrationError::ExtensionRejected(_)) => break,
            Err(other) => bail!("unexpected extension error: {other}"),
        }
    }

    ensure!(hops == 20, "expected 20 hops, got {hops}");
    ensure!(current.chain_duration() == 148);
    ensure!(current.chain_duration() <= MAX_CHAIN_SECONDS);
    ensure!(pipeline.balance().await? == 1_000 - 80 - 40 * 20);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn provider_failure_after_submission_refunds(pipeline: Pipeline) -> eyre::Result<()> {
    let task = pipeline
        .service
        .create(pipeline.user, &eight_second_request(), None)
        .await?;
    pipeline
        .provider
        .fail_operation(&operation_of(&task)?, "SAFETY_FILTER", "blocked");

    let report = pipeline.finalizer.tick().await?;
    ensure!(report.failed == 1);

    let failed = pipeline
        .tasks
        .find_by_id(task.id())
        .await?
        .ok_or_eyre("task should exist")?;
    ensure!(failed.status() == GenerationStatus::Failed);
    ensure!(failed.refunded());
    ensure!(pipeline.balance().await? == 1_000);
    Ok(())
}
