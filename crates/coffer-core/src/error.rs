//! Error types for the Coffer core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("serialization: {0}")] Serialization(String),
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid secret key bytes")] InvalidSecretKey,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58: {0}")] InvalidEncoding(String),
    #[error("invalid checksum")] InvalidChecksum,
    #[error("invalid length: {0}")] InvalidLength(usize),
    #[error("unknown version byte: {0:#04x}")] UnknownVersion(u8),
    #[error("unknown network: {0}")] UnknownNetwork(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("empty script")] EmptyScript,
    #[error("truncated push at offset {0}")] TruncatedPush(usize),
    #[error("non-standard script")] NonStandard,
    #[error("invalid multisig threshold: {threshold} of {participants}")] InvalidThreshold { threshold: usize, participants: usize },
    #[error("network mismatch: script codec is {expected}, address is {got}")] NetworkMismatch { expected: String, got: String },
    #[error(transparent)] Crypto(#[from] CryptoError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("duplicate transaction: {0}")] DuplicateTransaction(String),
    #[error("unknown transaction: {0}")] UnknownTransaction(String),
    #[error("output already spent: {0}")] AlreadySpent(String),
    #[error("snapshot: {0}")] Snapshot(String),
    #[error("storage: {0}")] Storage(String),
    #[error(transparent)] Transaction(#[from] TransactionError),
}
