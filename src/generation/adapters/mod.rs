//! Adapter implementations for generation ports.

pub mod filesystem;
pub mod http_provider;
pub mod locking;
pub mod memory;
pub mod postgres;

pub use filesystem::FilesystemAssetStore;
pub use http_provider::{VeoHttpProvider, VeoProviderConfig};
pub use locking::LockingAdmissionGate;
pub use memory::{InMemoryAssetStore, InMemoryGenerationTaskRepository, ScriptedProvider};
pub use postgres::{GenerationPgPool, PostgresAdmissionGate, PostgresGenerationTaskRepository};
