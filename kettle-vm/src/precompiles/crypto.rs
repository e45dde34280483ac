use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolValue;
use kettle_types::{recover_signer, MessageSigner as _, Secp256k1Signer};

use crate::{
    addresses::{SECP256K1_RECOVER_ADDRESS, SECP256K1_SIGN_ADDRESS, SECP256K1_VERIFY_ADDRESS},
    context::ConfidentialContext,
    errors::KettleVmError,
    registry::Precompile,
};

type Result<T, E = KettleVmError> = std::result::Result<T, E>;

/// Flat gas cost of the secp256k1 precompiles, mirroring the canonical
/// ecrecover cost
const SECP256K1_GAS: u64 = 3000;

/// Produces a recoverable secp256k1 signature over a 32-byte digest.
/// Input tuple: `(bytes32 digest, bytes signingKey)`; returns the raw
/// 65-byte `r || s || v` signature.
///
/// The signing key travels in the input, so the public path must never
/// see it.
pub struct Secp256k1Sign;

impl Precompile for Secp256k1Sign {
    fn address(&self) -> Address {
        SECP256K1_SIGN_ADDRESS
    }

    fn name(&self) -> &'static str {
        "secp256k1Sign"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        SECP256K1_GAS
    }

    fn run(&self, _input: &[u8]) -> Result<Bytes> {
        Err(KettleVmError::NotAvailableInContextError)
    }

    fn run_confidential(&self, _ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        let (digest, key) = <(B256, Bytes)>::abi_decode_params(input)?;
        let signer = Secp256k1Signer::from_slice(&key)?;
        let signature = signer.sign_hash(&digest.0)?;
        Ok(Bytes::from(signature.to_vec()))
    }
}

/// Recovers the signer address of a recoverable signature. Input tuple:
/// `(bytes32 digest, bytes signature)`; returns the ABI-encoded address.
///
/// Pure computation over public inputs, so both paths perform it.
pub struct Secp256k1Recover;

impl Secp256k1Recover {
    fn recover(input: &[u8]) -> Result<Bytes> {
        let (digest, signature) = <(B256, Bytes)>::abi_decode_params(input)?;
        let recovered = recover_signer(&digest.0, &signature)?;
        Ok(Bytes::from(recovered.abi_encode()))
    }
}

impl Precompile for Secp256k1Recover {
    fn address(&self) -> Address {
        SECP256K1_RECOVER_ADDRESS
    }

    fn name(&self) -> &'static str {
        "secp256k1Recover"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        SECP256K1_GAS
    }

    fn run(&self, input: &[u8]) -> Result<Bytes> {
        Self::recover(input)
    }

    fn run_confidential(&self, _ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        Self::recover(input)
    }
}

/// Checks a recoverable signature against an expected signer. Input
/// tuple: `(bytes32 digest, bytes signature, address expected)`; returns
/// `0x01` on a match, `0x00` otherwise. A malformed signature counts as
/// a mismatch, not an error.
pub struct Secp256k1Verify;

impl Secp256k1Verify {
    fn verify(input: &[u8]) -> Result<Bytes> {
        let (digest, signature, expected) = <(B256, Bytes, Address)>::abi_decode_params(input)?;
        let matches = recover_signer(&digest.0, &signature)
            .map(|recovered| recovered == expected)
            .unwrap_or(false);
        Ok(Bytes::from_static(if matches { &[0x01] } else { &[0x00] }))
    }
}

impl Precompile for Secp256k1Verify {
    fn address(&self) -> Address {
        SECP256K1_VERIFY_ADDRESS
    }

    fn name(&self) -> &'static str {
        "secp256k1Verify"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        SECP256K1_GAS
    }

    fn run(&self, input: &[u8]) -> Result<Bytes> {
        Self::verify(input)
    }

    fn run_confidential(&self, _ctx: &ConfidentialContext, input: &[u8]) -> Result<Bytes> {
        Self::verify(input)
    }
}
