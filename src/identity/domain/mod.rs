//! Identity domain values.

mod ids;
mod plan;
mod region;

pub use ids::{ParseUserIdError, UserId};
pub use plan::{ParsePlanTierError, PlanTier};
pub use region::UserRegion;
