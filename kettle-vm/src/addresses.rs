//! Stable precompile address table.
//!
//! Addresses are part of the external protocol. Each range groups related
//! precompiles: `0x4201xxxx` utility, `0x4202xxxx` confidential store,
//! `0x4203xxxx` bids, `0x4204xxxx` signature primitives, `0x4210xxxx`
//! block-building adapters.

use alloy_primitives::{address, Address};

pub const IS_CONFIDENTIAL_ADDRESS: Address =
    address!("0000000000000000000000000000000042010000");
pub const CONFIDENTIAL_INPUTS_ADDRESS: Address =
    address!("0000000000000000000000000000000042010001");

pub const CONF_STORE_STORE_ADDRESS: Address =
    address!("0000000000000000000000000000000042020000");
pub const CONF_STORE_RETRIEVE_ADDRESS: Address =
    address!("0000000000000000000000000000000042020001");

pub const NEW_BID_ADDRESS: Address = address!("0000000000000000000000000000000042030000");
pub const FETCH_BIDS_ADDRESS: Address = address!("0000000000000000000000000000000042030001");

pub const SECP256K1_SIGN_ADDRESS: Address =
    address!("0000000000000000000000000000000042040000");
pub const SECP256K1_RECOVER_ADDRESS: Address =
    address!("0000000000000000000000000000000042040001");
pub const SECP256K1_VERIFY_ADDRESS: Address =
    address!("0000000000000000000000000000000042040002");

pub const SIMULATE_BUNDLE_ADDRESS: Address =
    address!("0000000000000000000000000000000042100000");
pub const BUILD_ETH_BLOCK_ADDRESS: Address =
    address!("0000000000000000000000000000000042100001");
pub const SUBMIT_BLOCK_BID_TO_RELAY_ADDRESS: Address =
    address!("0000000000000000000000000000000042100002");
pub const EXTRACT_HINT_ADDRESS: Address =
    address!("0000000000000000000000000000000042100037");
