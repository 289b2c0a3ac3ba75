//! Scriptable in-process provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::generation::{
    domain::OperationId,
    ports::{
        ExtensionSubmission, GenerationProvider, GenerationSubmission, OperationStatus,
        ProviderError, ProviderResult, ProviderSubmission,
    },
};

/// Provider double whose behaviour is scripted by the caller.
///
/// Submissions succeed with sequential operation names and start in
/// [`OperationStatus::Running`] until the script says otherwise.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    next_operation: u64,
    submissions: Vec<ProviderSubmission>,
    submit_failure: Option<ProviderError>,
    submit_delay: Option<Duration>,
    poll_failure: Option<ProviderError>,
    statuses: HashMap<OperationId, OperationStatus>,
    results: HashMap<String, Vec<u8>>,
    polls: usize,
}

impl ScriptedProvider {
    /// Creates a provider that accepts every submission.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> ProviderResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|err| ProviderError::Protocol(err.to_string()))?;
        Ok(f(&mut state))
    }

    fn script(&self, f: impl FnOnce(&mut ScriptState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }

    /// Makes every following submission fail with `error`.
    pub fn fail_submissions_with(&self, error: ProviderError) {
        self.script(|state| state.submit_failure = Some(error));
    }

    /// Makes following submissions succeed again.
    pub fn accept_submissions(&self) {
        self.script(|state| state.submit_failure = None);
    }

    /// Delays every following submission by `delay`.
    pub fn delay_submissions(&self, delay: Duration) {
        self.script(|state| state.submit_delay = Some(delay));
    }

    /// Makes every following poll fail with `error`, or succeed when `None`.
    pub fn fail_polls_with(&self, error: Option<ProviderError>) {
        self.script(|state| state.poll_failure = error);
    }

    /// Sets the status reported for `operation_id`.
    pub fn set_status(&self, operation_id: &OperationId, status: OperationStatus) {
        self.script(|state| {
            state.statuses.insert(operation_id.clone(), status);
        });
    }

    /// Finishes `operation_id` with downloadable `bytes` at `result_uri`.
    pub fn complete(&self, operation_id: &OperationId, result_uri: &str, bytes: &[u8]) {
        self.script(|state| {
            state.statuses.insert(
                operation_id.clone(),
                OperationStatus::Done {
                    result_uri: result_uri.to_owned(),
                },
            );
            state.results.insert(result_uri.to_owned(), bytes.to_vec());
        });
    }

    /// Finishes `operation_id` with a provider-side error.
    pub fn fail_operation(&self, operation_id: &OperationId, code: &str, message: &str) {
        self.set_status(
            operation_id,
            OperationStatus::Error {
                code: Some(code.to_owned()),
                message: message.to_owned(),
            },
        );
    }

    /// Submissions accepted or attempted so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<ProviderSubmission> {
        self.with_state(|state| state.submissions.clone())
            .unwrap_or_default()
    }

    /// Number of status polls served.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.with_state(|state| state.polls).unwrap_or_default()
    }

    async fn accept(&self, submission: ProviderSubmission) -> ProviderResult<OperationId> {
        let delay = self.with_state(|state| state.submit_delay)?;
        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }
        self.with_state(|state| {
            state.submissions.push(submission);
            if let Some(error) = state.submit_failure.clone() {
                return Err(error);
            }
            state.next_operation += 1;
            let operation_id = OperationId::new(format!("operations/op-{}", state.next_operation));
            state
                .statuses
                .insert(operation_id.clone(), OperationStatus::Running);
            Ok(operation_id)
        })?
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn submit(&self, submission: &GenerationSubmission) -> ProviderResult<OperationId> {
        self.accept(ProviderSubmission::Generation(submission.clone()))
            .await
    }

    async fn submit_extension(
        &self,
        submission: &ExtensionSubmission,
    ) -> ProviderResult<OperationId> {
        self.accept(ProviderSubmission::Extension(submission.clone()))
            .await
    }

    async fn poll_status(&self, operation_id: &OperationId) -> ProviderResult<OperationStatus> {
        self.with_state(|state| {
            state.polls += 1;
            if let Some(error) = state.poll_failure.clone() {
                return Err(error);
            }
            state
                .statuses
                .get(operation_id)
                .cloned()
                .ok_or_else(|| ProviderError::Protocol(format!("unknown operation {operation_id}")))
        })?
    }

    async fn fetch_result(&self, result_uri: &str) -> ProviderResult<Vec<u8>> {
        self.with_state(|state| {
            state
                .results
                .get(result_uri)
                .cloned()
                .ok_or_else(|| ProviderError::Unavailable(format!("no result at {result_uri}")))
        })?
    }
}
