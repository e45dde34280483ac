use std::collections::HashMap;
use std::sync::LazyLock;

use alloy_primitives::{Address, Bytes};
use tracing::debug;

use crate::{
    context::ConfidentialContext,
    errors::KettleVmError,
    precompiles::{
        adapters::{BuildEthBlock, ExtractHint, SimulateBundle, SubmitBlockBidToRelay},
        bid::{FetchBids, NewBid},
        crypto::{Secp256k1Recover, Secp256k1Sign, Secp256k1Verify},
        store::{ConfStoreRetrieve, ConfStoreStore},
        utility::{ConfidentialInputs, IsConfidential},
    },
};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

/// A precompiled contract bound to a fixed address.
///
/// Three capabilities with distinct contracts: `required_gas` is a pure
/// function of the input (no store access, usable for fee estimation
/// before execution), `run` serves calls made outside a confidential
/// context and must stay inert (a fixed acknowledgment or a failure,
/// never confidential bytes), `run_confidential` performs the real work
/// against the request's context.
pub trait Precompile: Send + Sync {
    /// The fixed protocol address this precompile is bound to
    fn address(&self) -> Address;

    /// Human-readable name used in logs
    fn name(&self) -> &'static str;

    /// Gas charged for an invocation with the given input
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Public path, taken when no confidential context is attached
    ///
    /// # Errors
    ///
    /// Confidential-only precompiles fail with
    /// [`KettleVmError::NotAvailableInContextError`] here.
    fn run(&self, input: &[u8]) -> Result<Bytes>;

    /// Confidential path, taken when the call carries a request context
    ///
    /// # Errors
    ///
    /// Returns decode, access-control and backend errors; the dispatch
    /// layer mirrors the message into the returned output bytes.
    fn run_confidential(&self, ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes>;
}

/// Result of one precompile invocation
#[derive(Debug)]
pub struct PrecompileOutcome {
    /// Returned bytes; on failure this carries the error message so that
    /// revert data stays human-diagnosable
    pub output: Bytes,

    /// Gas consumed, always the declared `required_gas` of the input
    pub gas_used: u64,

    /// The typed failure, when the invocation did not succeed
    pub error: Option<KettleVmError>,
}

/// Static, address-keyed dispatch table over every precompile.
///
/// The public/confidential split is enforced here: the path is chosen
/// solely by whether a confidential context accompanies the call, and
/// both paths are terminal per invocation.
pub struct PrecompileRegistry {
    table: HashMap<Address, Box<dyn Precompile>>,
}

static REGISTRY: LazyLock<PrecompileRegistry> = LazyLock::new(PrecompileRegistry::new);

impl PrecompileRegistry {
    fn new() -> Self {
        let contracts: Vec<Box<dyn Precompile>> = vec![
            Box::new(IsConfidential),
            Box::new(ConfidentialInputs),
            Box::new(ConfStoreStore),
            Box::new(ConfStoreRetrieve),
            Box::new(NewBid),
            Box::new(FetchBids),
            Box::new(Secp256k1Sign),
            Box::new(Secp256k1Recover),
            Box::new(Secp256k1Verify),
            Box::new(SimulateBundle),
            Box::new(BuildEthBlock),
            Box::new(SubmitBlockBidToRelay),
            Box::new(ExtractHint),
        ];
        let table = contracts
            .into_iter()
            .map(|contract| (contract.address(), contract))
            .collect();
        Self { table }
    }

    /// The process-wide registry instance
    #[must_use]
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Looks up the precompile bound to `address`
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&dyn Precompile> {
        self.table.get(address).map(Box::as_ref)
    }

    /// Addresses of every registered precompile
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.table.keys()
    }

    /// Dispatches one invocation.
    ///
    /// Precompile-level failures (access control, decode, backend) are
    /// reported inside the outcome, with the error message mirrored into
    /// the output bytes. Only dispatch-level failures (unknown address,
    /// out of gas) short-circuit.
    ///
    /// # Errors
    ///
    /// Returns [`KettleVmError::UnknownPrecompileError`] for an unmapped
    /// address and [`KettleVmError::OutOfGasError`] when `gas_limit` does
    /// not cover the declared cost.
    pub fn execute(
        &self,
        address: Address,
        ctx: Option<&ConfidentialContext>,
        input: &[u8],
        gas_limit: u64,
    ) -> Result<PrecompileOutcome> {
        let precompile = self
            .table
            .get(&address)
            .ok_or(KettleVmError::UnknownPrecompileError(address))?;
        let required = precompile.required_gas(input);
        if required > gas_limit {
            return Err(KettleVmError::OutOfGasError {
                required,
                limit: gas_limit,
            });
        }
        let result = match ctx {
            Some(ctx) => precompile.run_confidential(ctx, input),
            None => precompile.run(input),
        };
        Ok(match result {
            Ok(output) => PrecompileOutcome {
                output,
                gas_used: required,
                error: None,
            },
            Err(e) => {
                debug!(
                    target = "kettle-vm",
                    event = "precompile_failed",
                    precompile = precompile.name(),
                    error = %e,
                    "Precompile invocation failed"
                );
                PrecompileOutcome {
                    output: Bytes::from(e.to_string().into_bytes()),
                    gas_used: required,
                    error: Some(e),
                }
            }
        })
    }
}
