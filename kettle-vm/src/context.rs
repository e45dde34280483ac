use std::sync::Arc;

use alloy_primitives::Bytes;
use kettle_store::TransactionalStore;

use crate::backend::{ExecutionBackend, RelaySubmitter};

/// Everything a precompile's confidential path may touch.
///
/// One context exists per in-flight confidential-compute request. The
/// caller stack travels inside the store view's request, so the
/// "most recent non-self caller" rule is evaluated against an explicit
/// value rather than shared state.
pub struct ConfidentialContext {
    /// Request-scoped view over the shared confidential store
    pub store: TransactionalStore,

    /// External execution backend for block building and simulation
    pub backend: Arc<dyn ExecutionBackend>,

    /// Relay endpoint client for block bid submission
    pub relay: Arc<dyn RelaySubmitter>,
}

impl ConfidentialContext {
    /// The out-of-band confidential input blob carried by the request
    #[must_use]
    pub fn confidential_inputs(&self) -> &Bytes {
        &self.store.request().confidential_inputs
    }
}
