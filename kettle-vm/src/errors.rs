use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KettleVmError {
    #[error("Invalid input length")]
    InvalidInputLengthError,
    #[error("Incorrect value passed in")]
    IncorrectInputValueError,
    #[error("Failed to decode precompile input: {0}")]
    AbiDecodeError(#[from] alloy_sol_types::Error),
    #[error("Not available outside a confidential context")]
    NotAvailableInContextError,
    #[error(transparent)]
    StoreError(#[from] kettle_store::KettleStoreError),
    #[error(transparent)]
    CryptoError(#[from] kettle_types::KettleTypesError),
    #[error("No precompile registered at address {0}")]
    UnknownPrecompileError(Address),
    #[error("Out of gas: precompile requires {required}, limit is {limit}")]
    OutOfGasError { required: u64, limit: u64 },
    #[error("Failed to build block: {0}")]
    BlockBuildError(String),
    #[error("Failed to simulate bundle: {0}")]
    BundleSimulationError(String),
    #[error("Invalid relay url: {0}")]
    RelayUrlParseError(#[from] url::ParseError),
    #[error("Relay request failed: {0}")]
    RelayRequestError(#[from] reqwest::Error),
    #[error("Relay rejected block bid: {0}")]
    RelaySubmissionError(String),
}
