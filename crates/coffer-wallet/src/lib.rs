//! # coffer-wallet: UTXO wallet accounting and unsigned transaction assembly.
//!
//! Computes balances over a ledger of unspent outputs, selects outputs to
//! fund payments, and lays out unsigned transactions with change routed by
//! policy. Signing and broadcast happen elsewhere.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` and `KeyStoreError`
//! - [`keys`]: `KeyStore` contract, key records, JSON file store
//! - [`coin_selection`]: `CoinSelector` strategies
//! - [`builder`]: payment requests, change policy, transaction layout
//! - [`config`]: layered `WalletConfig`
//! - [`wallet`]: high-level wallet composition

pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod error;
pub mod keys;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{ChangePolicy, Funding, PaymentRequest, TransactionBuilder};
pub use coin_selection::{CoinSelector, LargestFirst, SelectAll, SelectionStrategy, SmallestFirst};
pub use config::WalletConfig;
pub use error::{KeyStoreError, WalletError};
pub use keys::{FileKeyStore, KeyRecord, KeyStore};
pub use wallet::Wallet;
