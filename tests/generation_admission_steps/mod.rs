//! Step definitions for generation admission scenarios.

pub mod then;
pub mod when;
pub mod world;
