//! Collaborator contracts consumed by the wallet.
//!
//! - [`Ledger`]: indexed view of every output paid to an address
//!   ([`MemoryLedger`](crate::ledger::MemoryLedger) implements)
//! - [`ScriptCodec`]: locking script encoding and decoding
//!   ([`StandardScriptCodec`](crate::script::StandardScriptCodec) implements)

use crate::address::Address;
use crate::crypto::PublicKey;
use crate::error::{LedgerError, ScriptError};
use crate::script::{Destination, Script};
use crate::types::UnspentOutput;

/// Read-only view of the transaction ledger, indexed by address.
///
/// The wallet never mutates ledger state. Both queries may fail with
/// whatever the backing store reports; callers propagate those failures.
pub trait Ledger: Send + Sync {
    /// Every output ever paid to `address`, spent ones included.
    ///
    /// Spent outputs carry a `spent_by` reference so balance logic can
    /// exclude them.
    fn outputs_for(&self, address: &Address) -> Result<Vec<UnspentOutput>, LedgerError>;

    /// The ledger's own running balance for a hashed address identity
    /// (see [`Address::hashed_identity`]).
    ///
    /// This is a cached aggregate maintained by the ledger. It is not
    /// guaranteed to agree with a fresh sum over [`outputs_for`](Self::outputs_for).
    fn aggregate_balance(&self, hashed_identity: &str) -> Result<u64, LedgerError>;
}

/// Encoding and decoding of locking scripts.
pub trait ScriptCodec: Send + Sync {
    /// Single-signature locking script paying to `address`.
    fn encode_single_pay(&self, address: &Address) -> Result<Script, ScriptError>;

    /// `threshold`-of-n locking script over `participants`, in the given order.
    fn encode_multisig(
        &self,
        threshold: usize,
        participants: &[PublicKey],
    ) -> Result<Script, ScriptError>;

    /// Recover the address or addresses a locking script pays.
    fn decode(&self, script: &Script) -> Result<Destination, ScriptError>;
}
