//! Fixed per-job credit pricing.

use super::{GenerationModeKind, Resolution};
use crate::credit::domain::CreditAmount;

/// Credits per second of 720p output.
pub const CREDITS_PER_SECOND_720P: u64 = 10;

/// Credits per second of 1080p output.
pub const CREDITS_PER_SECOND_1080P: u64 = 15;

/// Flat price of one extension.
pub const EXTENSION_COST: CreditAmount = CreditAmount::new(40);

/// Returns the credit cost of a job.
///
/// Extensions are priced flat; every other mode is priced per second of
/// output at the resolution's rate.
#[must_use]
pub const fn credit_cost(
    mode: GenerationModeKind,
    resolution: Resolution,
    duration_seconds: u32,
) -> CreditAmount {
    if matches!(mode, GenerationModeKind::ExtendVideo) {
        return EXTENSION_COST;
    }
    let rate = match resolution {
        Resolution::Hd720 => CREDITS_PER_SECOND_720P,
        Resolution::FullHd1080 => CREDITS_PER_SECOND_1080P,
    };
    CreditAmount::new(rate * duration_seconds as u64)
}
