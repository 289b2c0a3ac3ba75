//! Shared handler state.

use std::sync::Arc;

use mockable::DefaultClock;

use crate::generation::services::{
    GenerationPorts, GenerationService, GenerationStatsService, OrchestrationSettings,
};
use crate::identity::ports::IdentityVerifier;

/// Services reachable from every handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) generation: Arc<GenerationService<DefaultClock>>,
    pub(crate) stats: Arc<GenerationStatsService<DefaultClock>>,
    pub(crate) identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Builds the handler state over `ports`, authenticating callers with
    /// `identity`.
    #[must_use]
    pub fn new(
        ports: GenerationPorts,
        identity: Arc<dyn IdentityVerifier>,
        settings: OrchestrationSettings,
    ) -> Self {
        let clock = Arc::new(DefaultClock);
        let stats = GenerationStatsService::new(Arc::clone(&ports.tasks), Arc::clone(&clock));
        Self {
            generation: Arc::new(GenerationService::new(ports, clock, settings)),
            stats: Arc::new(stats),
            identity,
        }
    }
}
