use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::{
    bid::{Bid, StoreWrite},
    errors::KettleTypesError,
    signer::{recover_signer, SIGNATURE_LENGTH},
};

type Result<T, E = KettleTypesError> = std::result::Result<T, E>;

/// A struct containing a serialized message and its hash
pub struct SerializedMessage {
    /// The serialized message
    pub message: Vec<u8>,

    /// The hash of the serialized message
    pub hash: blake3::Hash,
}

/// A trait for serializing a message (with ciborium) and returning the hash of the serialized message
pub trait SerializeWithHash {
    /// Serialize the message and return the hash of the serialized message
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized
    fn serialize_with_hash(&self) -> Result<SerializedMessage>;
}

/// The unit of replication between kettles: one bid together with the payload
/// writes produced under it during a single confidential-compute request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaMessage {
    /// Address of the kettle that produced the message; the application
    /// signature must recover to this address
    pub source: Address,

    /// The bid metadata, carried in full so a receiving kettle can admit the
    /// bid even when it never saw its creation
    pub bid: Bid,

    /// The effective caller that created the bid
    pub creator: Address,

    /// Address that signed the originating confidential-compute request; the
    /// context signature must recover to this address
    pub originator: Address,

    /// Hash of the confidential-compute request the writes originated from
    pub request_hash: B256,

    /// Payload writes to apply, in the order they were performed
    pub writes: Vec<StoreWrite>,
}

impl SerializeWithHash for DaMessage {
    fn serialize_with_hash(&self) -> Result<SerializedMessage> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)?;
        Ok(SerializedMessage {
            hash: blake3::hash(&bytes),
            message: bytes,
        })
    }
}

/// A [`DaMessage`] wrapped with its two authenticating signatures.
///
/// The application signature is produced by the originating kettle over the
/// blake3 hash of the CBOR payload. The context signature is produced by the
/// request originator over the request hash, binding the writes to one
/// specific confidential-compute request. Receivers verify both before
/// applying the message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDaMessage {
    /// The replication payload
    pub message: DaMessage,

    /// Recoverable signature of the originating kettle over the payload hash
    #[serde(skip)]
    pub signature: Vec<u8>,

    /// Recoverable signature of the request originator over the request hash
    #[serde(skip)]
    pub context_signature: Vec<u8>,
}

/// A trait for serializing a message (with ciborium)
///
/// This trait is used to serialize a message and return the serialized message
/// as a vector of bytes.
pub trait SerializeWithSignature {
    /// Serialize the message and return the serialized message
    /// as a vector of bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized
    fn serialize_with_signature(&self) -> Result<Vec<u8>>;

    /// Deserialize the message from a vector of bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be deserialized
    fn deserialize_with_signature(data: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

impl SerializeWithSignature for SignedDaMessage {
    fn serialize_with_signature(&self) -> Result<Vec<u8>> {
        if self.signature.len() != SIGNATURE_LENGTH
            || self.context_signature.len() != SIGNATURE_LENGTH
        {
            return Err(KettleTypesError::InvalidMessageLengthError);
        }
        let mut serialized = Vec::with_capacity(2 * SIGNATURE_LENGTH);
        serialized.extend_from_slice(&self.signature);
        serialized.extend_from_slice(&self.context_signature);
        ciborium::into_writer(&self.message, &mut serialized)?;
        Ok(serialized)
    }

    fn deserialize_with_signature(data: &[u8]) -> Result<Self> {
        if data.len() <= 2 * SIGNATURE_LENGTH {
            return Err(KettleTypesError::InvalidMessageLengthError);
        }
        let message = ciborium::from_reader(&data[2 * SIGNATURE_LENGTH..])?;
        Ok(Self {
            message,
            signature: data[..SIGNATURE_LENGTH].to_vec(),
            context_signature: data[SIGNATURE_LENGTH..2 * SIGNATURE_LENGTH].to_vec(),
        })
    }
}

impl SignedDaMessage {
    /// Verifies both signatures against the addresses claimed in the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if either signature is malformed, or recovers to an
    /// address other than the claimed `source` / `originator`.
    pub fn verify(&self) -> Result<()> {
        let serialized = self.message.serialize_with_hash()?;
        let recovered = recover_signer(serialized.hash.as_bytes(), &self.signature)?;
        if recovered != self.message.source {
            return Err(KettleTypesError::SignatureVerificationError(format!(
                "application signature recovered to {recovered}, expected source {}",
                self.message.source
            )));
        }
        let context_recovered =
            recover_signer(&self.message.request_hash.0, &self.context_signature)?;
        if context_recovered != self.message.originator {
            return Err(KettleTypesError::SignatureVerificationError(format!(
                "context signature recovered to {context_recovered}, expected originator {}",
                self.message.originator
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Bytes;

    use super::*;
    use crate::{
        bid::{random_bid_id, Bid},
        signer::{MessageSigner, Secp256k1Signer},
    };

    fn signed_message(
        kettle: &Secp256k1Signer,
        originator: &Secp256k1Signer,
    ) -> SignedDaMessage {
        let salt = random_bid_id();
        let mut bid = Bid {
            id: Default::default(),
            salt,
            decryption_condition: 7,
            allowed_peekers: vec![originator.address()],
            allowed_stores: vec![],
            namespace: "default:v0:ethBundles".to_string(),
        };
        bid.id = bid.derive_id().unwrap();
        let request_hash = B256::from(*blake3::hash(b"request").as_bytes());
        let message = DaMessage {
            source: kettle.address(),
            creator: originator.address(),
            originator: originator.address(),
            request_hash,
            writes: vec![StoreWrite {
                bid_id: bid.id,
                caller: originator.address(),
                key: "ethBundle".to_string(),
                value: Bytes::from_static(b"bundle-bytes"),
            }],
            bid,
        };
        let serialized = message.serialize_with_hash().unwrap();
        let signature = kettle.sign_hash(serialized.hash.as_bytes()).unwrap();
        let context_signature = originator.sign_hash(&request_hash.0).unwrap();
        SignedDaMessage {
            message,
            signature: signature.to_vec(),
            context_signature: context_signature.to_vec(),
        }
    }

    #[test]
    fn test_serialization_round_trip() {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let signed = signed_message(&kettle, &originator);
        let wire = signed.serialize_with_signature().unwrap();
        let decoded = SignedDaMessage::deserialize_with_signature(&wire).unwrap();
        assert_eq!(decoded, signed);
    }

    #[test]
    fn test_verify_accepts_valid_message() {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let signed = signed_message(&kettle, &originator);
        signed.verify().unwrap();
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let mut signed = signed_message(&kettle, &originator);
        signed.message.writes[0].value = Bytes::from_static(b"forged");
        assert!(signed.verify().is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_application_signer() {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let mut signed = signed_message(&kettle, &originator);
        signed.message.source = Address::repeat_byte(0x99);
        assert!(signed.verify().is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_context_signer() {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let imposter = Secp256k1Signer::random();
        let mut signed = signed_message(&kettle, &originator);
        signed.context_signature = imposter
            .sign_hash(&signed.message.request_hash.0)
            .unwrap()
            .to_vec();
        assert!(signed.verify().is_err());
    }

    #[test]
    fn test_verify_accepts_originator_distinct_from_creator() {
        let kettle = Secp256k1Signer::random();
        let originator = Secp256k1Signer::random();
        let other_creator = Secp256k1Signer::random();
        let mut signed = signed_message(&kettle, &originator);
        signed.message.creator = other_creator.address();
        let serialized = signed.message.serialize_with_hash().unwrap();
        signed.signature = kettle.sign_hash(serialized.hash.as_bytes()).unwrap().to_vec();
        signed.verify().unwrap();
    }

    #[test]
    fn test_deserialize_rejects_short_input() {
        let err = SignedDaMessage::deserialize_with_signature(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, KettleTypesError::InvalidMessageLengthError));
    }
}
