use thiserror::Error;

#[derive(Debug, Error)]
pub enum KettleTypesError {
    #[error("Failed to serialize message: `{0}`")]
    SerializeError(#[from] ciborium::ser::Error<std::io::Error>),
    #[error("Failed to deserialize message: `{0}`")]
    DeserializeError(#[from] ciborium::de::Error<std::io::Error>),
    #[error("Invalid message length")]
    InvalidMessageLengthError,
    #[error("Failed to parse signature: {0}")]
    SignatureParseError(String),
    #[error("Failed to sign hashed message, with error: {0}")]
    SignatureError(String),
    #[error("Failed to verify signature: {0}")]
    SignatureVerificationError(String),
    #[error("Invalid signing key: {0}")]
    InvalidSigningKeyError(String),
}
