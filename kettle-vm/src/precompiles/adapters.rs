use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use kettle_store::KettleStoreError;
use kettle_types::BidId;

use crate::{
    abi::BuildBlockArgs,
    addresses::{
        BUILD_ETH_BLOCK_ADDRESS, EXTRACT_HINT_ADDRESS, SIMULATE_BUNDLE_ADDRESS,
        SUBMIT_BLOCK_BID_TO_RELAY_ADDRESS,
    },
    context::ConfidentialContext,
    errors::KettleVmError,
    registry::Precompile,
};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

/// Payload key under which a merged bid lists its component bid ids,
/// ABI-encoded as `bytes16[]`
pub const MERGED_BIDS_KEY: &str = "default:v0:mergedBids";

const SIMULATION_GAS: u64 = 10_000;
const BUILD_BLOCK_GAS: u64 = 10_000;
const RELAY_SUBMISSION_GAS: u64 = 1000;
const EXTRACT_HINT_GAS: u64 = 1000;

/// Evaluates a bundle against the execution backend and returns its
/// effective gas used as a `uint64`. Input tuple: `(bytes bundle)`.
pub struct SimulateBundle;

impl Precompile for SimulateBundle {
    fn address(&self) -> Address {
        SIMULATE_BUNDLE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "simulateBundle"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        SIMULATION_GAS
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (bundle,) = <(Bytes,)>::abi_decode_params(input)?;
        let gas_used = ctx.backend.simulate_bundle(&bundle)?;
        Ok(Bytes::from(gas_used.abi_encode()))
    }
}

/// Assembles a block from the bundles stored under a bid. Input tuple:
/// `(BuildBlockArgs args, bytes16 bidId, string namespace)`; returns
/// `(bytes payload, bytes value)`.
///
/// When the bid carries a merged listing under [`MERGED_BIDS_KEY`], each
/// listed component bid contributes the bundle stored under the namespace
/// key; otherwise the bid itself is the single component.
pub struct BuildEthBlock;

impl Precompile for BuildEthBlock {
    fn address(&self) -> Address {
        BUILD_ETH_BLOCK_ADDRESS
    }

    fn name(&self) -> &'static str {
        "buildEthBlock"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        BUILD_BLOCK_GAS
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (args, bid_id, namespace) =
            <(BuildBlockArgs, BidId, String)>::abi_decode_params(input)?;
        let component_ids = match ctx.store.retrieve(self.address(), bid_id, MERGED_BIDS_KEY) {
            Ok(listing) => <Vec<BidId>>::abi_decode(&listing)?,
            Err(e @ KettleStoreError::BidNotFound(_)) => return Err(e.into()),
            Err(_) => vec![bid_id],
        };
        let mut bundles = Vec::with_capacity(component_ids.len());
        for id in component_ids {
            bundles.push(ctx.store.retrieve(self.address(), id, &namespace)?);
        }
        let built = ctx.backend.build_block(&args, bundles)?;
        Ok(Bytes::from((built.payload, built.value).abi_encode_params()))
    }
}

/// Forwards a signed block bid to an external relay. Input tuple:
/// `(string relayUrl, bytes signedBid)`; returns the relay's response
/// body.
pub struct SubmitBlockBidToRelay;

impl Precompile for SubmitBlockBidToRelay {
    fn address(&self) -> Address {
        SUBMIT_BLOCK_BID_TO_RELAY_ADDRESS
    }

    fn name(&self) -> &'static str {
        "submitBlockBidToRelay"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        RELAY_SUBMISSION_GAS
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (relay_url, signed_bid) = <(String, Bytes)>::abi_decode_params(input)?;
        ctx.relay.submit_block_bid(&relay_url, &signed_bid)
    }
}

/// Extracts the public hint subset of a confidential bundle. Input
/// tuple: `(bytes bundle)`.
pub struct ExtractHint;

impl Precompile for ExtractHint {
    fn address(&self) -> Address {
        EXTRACT_HINT_ADDRESS
    }

    fn name(&self) -> &'static str {
        "extractHint"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        EXTRACT_HINT_GAS
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (bundle,) = <(Bytes,)>::abi_decode_params(input)?;
        ctx.backend.extract_hint(&bundle)
    }
}
