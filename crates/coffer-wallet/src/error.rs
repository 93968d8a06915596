//! Wallet error types.

use coffer_core::error::{AddressError, CryptoError, LedgerError, ScriptError, TransactionError};
use thiserror::Error;

/// Errors raised by a key store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The backing file exists but cannot be parsed.
    #[error("corrupted key store: {0}")]
    Corrupted(String),

    /// A record's address does not match its public key.
    #[error("inconsistent key record: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Errors that can occur in wallet operations.
///
/// Insufficient funds is deliberately absent: building a transaction the
/// wallet cannot fund yields `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The key store has no record for an address the operation needs.
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    /// The wallet has no addresses to route change to.
    #[error("wallet has no addresses")]
    NoAddresses,

    /// Invalid monetary amount or payment list.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_address() {
        let e = WalletError::UnknownAddress("tcabc".into());
        assert_eq!(e.to_string(), "unknown address: tcabc");
    }

    #[test]
    fn display_no_addresses() {
        assert_eq!(WalletError::NoAddresses.to_string(), "wallet has no addresses");
    }

    #[test]
    fn clone_and_eq() {
        let e1 = WalletError::InvalidAmount("zero".into());
        let e2 = e1.clone();
        assert_eq!(e1, e2);
    }

    #[test]
    fn ledger_failure_passes_through_unchanged() {
        let inner = LedgerError::Storage("disk gone".into());
        let wallet: WalletError = inner.clone().into();
        assert_eq!(wallet, WalletError::Ledger(inner.clone()));
        assert_eq!(wallet.to_string(), inner.to_string());
    }

    #[test]
    fn keystore_failure_passes_through() {
        let inner = KeyStoreError::Io("denied".into());
        let wallet: WalletError = inner.clone().into();
        assert_eq!(wallet, WalletError::KeyStore(inner));
    }

    #[test]
    fn from_script_error() {
        let wallet: WalletError = ScriptError::NonStandard.into();
        assert_eq!(wallet, WalletError::Script(ScriptError::NonStandard));
    }

    #[test]
    fn keystore_from_crypto_error() {
        let e: KeyStoreError = CryptoError::InvalidSecretKey.into();
        assert_eq!(e, KeyStoreError::Crypto(CryptoError::InvalidSecretKey));
    }
}
