use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use kettle_types::BidId;

use crate::{
    addresses::{CONF_STORE_RETRIEVE_ADDRESS, CONF_STORE_STORE_ADDRESS},
    context::ConfidentialContext,
    errors::KettleVmError,
    registry::Precompile,
};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

/// Gas charged per input byte by the store-write precompile, keeping
/// confidential storage growth proportional to fees paid
const STORE_GAS_PER_BYTE: u64 = 100;

/// Flat gas cost of a payload retrieval
const RETRIEVE_GAS: u64 = 100;

/// Writes a payload under `(bid, key)`, gated by the bid's store
/// allow-list. Input tuple: `(bytes16 bidId, string key, bytes data)`.
pub struct ConfStoreStore;

impl Precompile for ConfStoreStore {
    fn address(&self) -> Address {
        CONF_STORE_STORE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "confidentialStoreStore"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        STORE_GAS_PER_BYTE * input.len() as u64
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (bid_id, key, value) = <(BidId, String, Bytes)>::abi_decode_params(input)?;
        ctx.store.store(self.address(), bid_id, &key, value)?;
        Ok(Bytes::new())
    }
}

/// Reads the payload stored under `(bid, key)`, gated by the bid's peeker
/// allow-list. Input tuple: `(bytes16 bidId, string key)`; the payload is
/// returned raw.
pub struct ConfStoreRetrieve;

impl Precompile for ConfStoreRetrieve {
    fn address(&self) -> Address {
        CONF_STORE_RETRIEVE_ADDRESS
    }

    fn name(&self) -> &'static str {
        "confidentialStoreRetrieve"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        RETRIEVE_GAS
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (bid_id, key) = <(BidId, String)>::abi_decode_params(input)?;
        Ok(ctx.store.retrieve(self.address(), bid_id, &key)?)
    }
}
