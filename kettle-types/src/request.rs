use alloy_primitives::{Address, Bytes, B256};

use crate::caller::CallerStack;

/// Per-request binding of everything a confidential execution needs: the
/// caller stack, the out-of-band confidential input blob, and the identity
/// of the originating request.
///
/// Created once per confidential-compute request and discarded when the
/// request finishes; never shared across requests.
#[derive(Clone, Debug, Default)]
pub struct ConfidentialRequest {
    /// Chain of nested confidential callers for access-control decisions
    pub caller_stack: CallerStack,

    /// Confidential input side-channel, supplied out of band from calldata
    /// and never present in any public transaction field
    pub confidential_inputs: Bytes,

    /// Hash identifying the originating confidential-compute request
    pub request_hash: B256,

    /// Address that signed the originating request
    pub originator: Address,

    /// Recoverable signature of the request originator over `request_hash`,
    /// forwarded into replication messages as the context signature
    pub context_signature: Bytes,
}
