//! When steps for generation admission BDD scenarios.

use super::world::{AdmissionWorld, run_async};
use reelforge::generation::validation::CreateGenerationRequest;
use rstest_bdd_macros::when;

#[when("the user requests {seconds:i64} seconds of {resolution} video")]
fn user_requests_video(world: &mut AdmissionWorld, seconds: i64, resolution: String) {
    let request = CreateGenerationRequest {
        prompt: Some("a lighthouse in fog".to_owned()),
        aspect_ratio: Some("16:9".to_owned()),
        resolution: Some(resolution),
        duration: Some(seconds),
        generation_mode: Some("text-to-video".to_owned()),
        ..CreateGenerationRequest::default()
    };
    world.last_result = Some(run_async(world.service.create(world.user, &request, None)));
}
