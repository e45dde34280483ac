use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;

use crate::{
    abi::SolBid,
    addresses::{FETCH_BIDS_ADDRESS, NEW_BID_ADDRESS},
    context::ConfidentialContext,
    errors::KettleVmError,
    registry::Precompile,
};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

const BID_PRECOMPILE_GAS: u64 = 1000;

/// Creates a bid record. Input tuple: `(uint64 decryptionCondition,
/// address[] allowedPeekers, address[] allowedStores, string namespace)`;
/// returns the ABI-encoded bid with its assigned id and salt.
///
/// The public path echoes the input back: when a confidential invocation
/// is replayed on chain, the call data already holds the cached result.
pub struct NewBid;

impl Precompile for NewBid {
    fn address(&self) -> Address {
        NEW_BID_ADDRESS
    }

    fn name(&self) -> &'static str {
        "newBid"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        BID_PRECOMPILE_GAS
    }

    fn run(&self, input: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(input))
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (decryption_condition, allowed_peekers, allowed_stores, namespace) =
            <(u64, Vec<Address>, Vec<Address>, String)>::abi_decode_params(input)?;
        let bid = ctx.store.initialize_bid(
            self.address(),
            kettle_types::Bid {
                decryption_condition,
                allowed_peekers,
                allowed_stores,
                namespace,
                ..Default::default()
            },
        )?;
        Ok(Bytes::from(SolBid::from(bid).abi_encode()))
    }
}

/// Lists bid metadata by `(decryptionCondition, namespace)`. Input tuple:
/// `(uint64 cond, string namespace)`; returns an ABI-encoded bid array.
/// No access control applies, payloads stay gated behind retrieval.
pub struct FetchBids;

impl Precompile for FetchBids {
    fn address(&self) -> Address {
        FETCH_BIDS_ADDRESS
    }

    fn name(&self) -> &'static str {
        "fetchBids"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        BID_PRECOMPILE_GAS
    }

    fn run(&self, input: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(input))
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (decryption_condition, namespace) = <(u64, String)>::abi_decode_params(input)?;
        let bids: Vec<SolBid> = ctx
            .store
            .fetch_bids(decryption_condition, &namespace)
            .into_iter()
            .map(SolBid::from)
            .collect();
        Ok(Bytes::from(bids.abi_encode()))
    }
}
