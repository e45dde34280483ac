use std::time::Duration;

use alloy_primitives::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::{abi::BuildBlockArgs, errors::KettleVmError};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

/// A block assembled by the external execution backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltBlock {
    /// Serialized execution payload (header and body)
    pub payload: Bytes,

    /// Serialized value metric of the block (builder profit)
    pub value: Bytes,
}

/// External execution collaborator the adapter precompiles delegate to.
///
/// The backend owns transaction execution; this crate only moves bytes
/// between the confidential store and the backend.
pub trait ExecutionBackend: Send + Sync {
    /// Assembles a block from the given bundle payloads
    ///
    /// # Errors
    ///
    /// Returns [`KettleVmError::BlockBuildError`] when the backend cannot
    /// assemble a valid block from the bundles.
    fn build_block(&self, args: &BuildBlockArgs, bundles: Vec<Bytes>) -> Result<BuiltBlock>;

    /// Evaluates a bundle and reports its effective gas used
    ///
    /// # Errors
    ///
    /// Returns [`KettleVmError::BundleSimulationError`] when the bundle
    /// fails to execute.
    fn simulate_bundle(&self, bundle: &[u8]) -> Result<u64>;

    /// Extracts the public hint subset of an otherwise confidential bundle
    ///
    /// # Errors
    ///
    /// Returns [`KettleVmError::BundleSimulationError`] when the bundle
    /// cannot be parsed.
    fn extract_hint(&self, bundle: &[u8]) -> Result<Bytes>;
}

/// Forwards signed block bids to an external relay endpoint
pub trait RelaySubmitter: Send + Sync {
    /// Submits a signed block bid and returns the relay's response body
    ///
    /// # Errors
    ///
    /// Returns [`KettleVmError::RelaySubmissionError`] when the relay
    /// answers with a non-success status, and transport errors otherwise.
    fn submit_block_bid(&self, relay_url: &str, signed_bid: &[u8]) -> Result<Bytes>;
}

/// HTTP relay submitter.
///
/// Runs a blocking request on the calling thread; precompile execution is
/// synchronous, so this must not be invoked from inside an async runtime.
pub struct HttpRelaySubmitter {
    client: reqwest::blocking::Client,
}

impl HttpRelaySubmitter {
    /// Builds a submitter whose requests time out after `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl RelaySubmitter for HttpRelaySubmitter {
    fn submit_block_bid(&self, relay_url: &str, signed_bid: &[u8]) -> Result<Bytes> {
        let url = Url::parse(relay_url)?;
        debug!(
            target = "kettle-vm",
            event = "relay_submission",
            url = %url,
            bid_bytes = signed_bid.len(),
            "Submitting block bid to relay"
        );
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(signed_bid.to_vec())
            .send()?;
        let status = response.status();
        let body = response.bytes()?;
        if !status.is_success() {
            return Err(KettleVmError::RelaySubmissionError(format!(
                "{status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }
        Ok(Bytes::from(body))
    }
}
