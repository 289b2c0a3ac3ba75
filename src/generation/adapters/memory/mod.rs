//! In-memory adapters used by tests and single-node deployments.

mod assets;
mod provider;
mod repository;

pub use assets::InMemoryAssetStore;
pub use provider::ScriptedProvider;
pub use repository::InMemoryGenerationTaskRepository;
