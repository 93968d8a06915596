//! # coffer-core
//! Value types, addresses, locking scripts and the ledger contract for the
//! Coffer wallet.

pub mod address;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod script;
pub mod traits;
pub mod types;

pub use address::{Address, Network};
pub use crypto::{KeyPair, PublicKey};
pub use ledger::MemoryLedger;
pub use script::{Destination, Script, StandardScriptCodec};
pub use traits::{Ledger, ScriptCodec};
pub use types::{Hash256, InPoint, OutPoint, Transaction, TxInput, TxOutput, UnspentOutput};
