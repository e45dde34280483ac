use alloy_primitives::Address;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

use crate::errors::KettleTypesError;

type Result<T, E = KettleTypesError> = std::result::Result<T, E>;

/// Length in bytes of a recoverable secp256k1 signature (`r || s || v`)
pub const SIGNATURE_LENGTH: usize = 65;

/// Signs 32-byte message hashes on behalf of an identity address.
///
/// The store engine signs replication payloads with the kettle's own key;
/// tests substitute in-memory signers with throwaway keys.
pub trait MessageSigner: Send + Sync {
    /// The address the signatures recover to
    fn address(&self) -> Address;

    /// Produces a recoverable signature over a prehashed message
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying signing operation fails
    fn sign_hash(&self, hash: &[u8; 32]) -> Result<[u8; SIGNATURE_LENGTH]>;
}

/// Recoverable secp256k1 signer over a raw private scalar
#[derive(Debug)]
pub struct Secp256k1Signer {
    signing_key: SigningKey,
    address: Address,
}

impl Secp256k1Signer {
    /// Builds a signer from a 32-byte private key
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not encode a valid secp256k1 scalar
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| KettleTypesError::InvalidSigningKeyError(e.to_string()))?;
        let address = address_of(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Generates a signer with a fresh random key
    #[must_use]
    pub fn random() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let address = address_of(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }
}

impl MessageSigner for Secp256k1Signer {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_hash(&self, hash: &[u8; 32]) -> Result<[u8; SIGNATURE_LENGTH]> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| KettleTypesError::SignatureError(e.to_string()))?;
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

/// Recovers the signer address of a recoverable secp256k1 signature over a
/// prehashed message
///
/// # Errors
///
/// Returns an error if the signature bytes are malformed or recovery fails
pub fn recover_signer(hash: &[u8; 32], signature: &[u8]) -> Result<Address> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(KettleTypesError::SignatureParseError(format!(
            "expected {SIGNATURE_LENGTH} bytes, received {}",
            signature.len()
        )));
    }
    let parsed = Signature::from_slice(&signature[..64])
        .map_err(|e| KettleTypesError::SignatureParseError(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature[64]).ok_or_else(|| {
        KettleTypesError::SignatureParseError(format!(
            "invalid recovery id {:#04x}",
            signature[64]
        ))
    })?;
    let verifying_key = VerifyingKey::recover_from_prehash(hash, &parsed, recovery_id)
        .map_err(|e| KettleTypesError::SignatureVerificationError(e.to_string()))?;
    Ok(address_of(&verifying_key))
}

fn address_of(verifying_key: &VerifyingKey) -> Address {
    let encoded = verifying_key.to_encoded_point(false);
    let digest = Keccak256::digest(&encoded.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    // First well-known dev-chain account
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "f39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_known_key_derives_known_address() {
        let key_bytes = hex::decode(TEST_PRIVATE_KEY).unwrap();
        let signer = Secp256k1Signer::from_slice(&key_bytes).unwrap();
        let expected = Address::from_slice(&hex::decode(TEST_ADDRESS.to_lowercase()).unwrap());
        assert_eq!(signer.address(), expected);
    }

    #[test]
    fn test_sign_and_recover_round_trip() {
        let signer = Secp256k1Signer::random();
        let hash = *blake3::hash(b"payload").as_bytes();
        let signature = signer.sign_hash(&hash).unwrap();
        let recovered = recover_signer(&hash, &signature).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_recover_rejects_wrong_length() {
        let hash = [0u8; 32];
        let err = recover_signer(&hash, &[0u8; 64]).unwrap_err();
        assert!(matches!(err, KettleTypesError::SignatureParseError(_)));
    }

    #[test]
    fn test_tampered_hash_recovers_different_address() {
        let signer = Secp256k1Signer::random();
        let hash = *blake3::hash(b"payload").as_bytes();
        let signature = signer.sign_hash(&hash).unwrap();
        let other = *blake3::hash(b"tampered").as_bytes();
        let recovered = recover_signer(&other, &signature);
        assert!(recovered.is_err() || recovered.unwrap() != signer.address());
    }

    #[test]
    fn test_invalid_key_bytes_rejected() {
        let err = Secp256k1Signer::from_slice(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, KettleTypesError::InvalidSigningKeyError(_)));
    }
}
