//! Parameter validation for generation requests.
//!
//! Rules run in a fixed priority order and the first violation wins. The
//! result of a successful validation is a [`ValidatedGeneration`] whose
//! mode payload is already the domain sum type.

mod error;
mod request;
mod rules;

pub use error::{ValidationCode, ValidationError};
pub use request::{CreateGenerationRequest, ValidatedGeneration};
pub use rules::{allowed_person_generation, default_person_generation, validate_generation_request};
pub(crate) use rules::validate_person_generation;
