use alloy_primitives::{Address, Bytes};

use crate::{
    addresses::{CONFIDENTIAL_INPUTS_ADDRESS, IS_CONFIDENTIAL_ADDRESS},
    context::ConfidentialContext,
    errors::KettleVmError,
    registry::Precompile,
};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

/// Probe reporting whether execution is inside a confidential context.
///
/// The public path answers `0x00` for an empty probe. A single `0x01`
/// byte is echoed back unchanged: that marker is what a prior
/// confidential invocation cached into the call data, so replaying the
/// call on chain reproduces the confidential answer without re-entering
/// the confidential machinery.
pub struct IsConfidential;

impl Precompile for IsConfidential {
    fn address(&self) -> Address {
        IS_CONFIDENTIAL_ADDRESS
    }

    fn name(&self) -> &'static str {
        "isConfidential"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        0
    }

    fn run(&self, input: &[u8]) -> Result<Bytes> {
        match input {
            [] => Ok(Bytes::from_static(&[0x00])),
            [0x01] => Ok(Bytes::from_static(&[0x01])),
            [_] => Err(KettleVmError::IncorrectInputValueError),
            _ => Err(KettleVmError::InvalidInputLengthError),
        }
    }

    fn run_confidential(&self, _ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        if !input.is_empty() {
            return Err(KettleVmError::InvalidInputLengthError);
        }
        Ok(Bytes::from_static(&[0x01]))
    }
}

/// Accessor for the out-of-band confidential input blob of the current
/// request. The blob never appears in any public transaction field, so
/// the public path has nothing to return.
pub struct ConfidentialInputs;

impl Precompile for ConfidentialInputs {
    fn address(&self) -> Address {
        CONFIDENTIAL_INPUTS_ADDRESS
    }

    fn name(&self) -> &'static str {
        "confidentialInputs"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        0
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, ctx: &ConfidentialContext, _input: &[u8]) -> Result<Bytes> {
        Ok(ctx.confidential_inputs().clone())
    }
}
