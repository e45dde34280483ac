//! Wire argument schemas for the precompile boundary.
//!
//! Inputs and outputs are Solidity ABI tuples: `bytes16` bid identifiers,
//! `bytes` payloads, `address[]` allow-lists, `string` namespaces.
//! Decoding is strict; malformed input yields a decode failure, never a
//! partial parse.

use alloy_sol_types::sol;
use kettle_types::Bid;

sol! {
    /// Bid metadata as it crosses the precompile boundary
    #[derive(Debug, Default, PartialEq, Eq)]
    struct SolBid {
        bytes16 id;
        bytes16 salt;
        uint64 decryptionCondition;
        address[] allowedPeekers;
        address[] allowedStores;
        string namespace;
    }

    /// Block-construction parameters accepted by the block-building adapter
    #[derive(Debug, Default, PartialEq, Eq)]
    struct BuildBlockArgs {
        uint64 slot;
        bytes proposerPubkey;
        bytes32 parent;
        uint64 timestamp;
        address feeRecipient;
        uint64 gasLimit;
        bytes32 prevRandao;
        bytes extra;
    }
}

impl From<Bid> for SolBid {
    fn from(bid: Bid) -> Self {
        Self {
            id: bid.id,
            salt: bid.salt,
            decryptionCondition: bid.decryption_condition,
            allowedPeekers: bid.allowed_peekers,
            allowedStores: bid.allowed_stores,
            namespace: bid.namespace,
        }
    }
}

impl From<SolBid> for Bid {
    fn from(bid: SolBid) -> Self {
        Self {
            id: bid.id,
            salt: bid.salt,
            decryption_condition: bid.decryptionCondition,
            allowed_peekers: bid.allowedPeekers,
            allowed_stores: bid.allowedStores,
            namespace: bid.namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use alloy_sol_types::SolValue;
    use kettle_types::BidId;

    use super::*;

    #[test]
    fn test_bid_survives_abi_round_trip() {
        let bid = Bid {
            id: BidId::repeat_byte(0x01),
            salt: BidId::repeat_byte(0x02),
            decryption_condition: 17,
            allowed_peekers: vec![Address::repeat_byte(0x41)],
            allowed_stores: vec![],
            namespace: "default:v0:ethBundles".to_string(),
        };
        let encoded = SolBid::from(bid.clone()).abi_encode();
        let decoded = Bid::from(SolBid::abi_decode(&encoded).unwrap());
        assert_eq!(decoded, bid);
    }

    #[test]
    fn test_truncated_bid_encoding_is_rejected() {
        let encoded = SolBid::from(Bid::default()).abi_encode();
        assert!(SolBid::abi_decode(&encoded[..encoded.len() - 1]).is_err());
    }
}
