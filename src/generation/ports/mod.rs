//! Port contracts for generation task persistence, admission, the external
//! provider and result storage.

pub mod admission;
pub mod assets;
pub mod provider;
pub mod repository;

pub use admission::{AdmissionError, AdmissionGate, AdmissionResult};
pub use assets::{AssetError, AssetResult, AssetStore, asset_location, describe_asset};
pub use provider::{
    ExtensionSubmission, GenerationProvider, GenerationSubmission, OperationStatus,
    ProviderError, ProviderResult, ProviderSubmission,
};
pub use repository::{
    GenerationTaskRepository, TaskPage, TaskQuery, TaskRepositoryError, TaskRepositoryResult,
};
