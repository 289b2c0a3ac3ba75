//! `PostgreSQL` adapters for generation task persistence and admission.

mod admission;
mod models;
mod repository;
mod schema;

pub use admission::PostgresAdmissionGate;
pub use repository::{GenerationPgPool, PostgresGenerationTaskRepository};

use crate::generation::ports::{AdmissionError, TaskRepositoryError};

impl From<diesel::result::Error> for TaskRepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

impl From<diesel::result::Error> for AdmissionError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}
