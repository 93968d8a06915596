//! Core value types: hashes, outpoints, transactions, unspent outputs.
//!
//! All monetary values are in base units (1 coin = 10^8 units) and use u64.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::error::TransactionError;
use crate::script::Script;

/// BLAKE3 digest. Doubles as txid and pubkey hash.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s).map_err(|e| TransactionError::Serialization(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TransactionError::Serialization("hash must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub struct OutPoint {
    /// Hash of the producing transaction.
    pub txid: Hash256,
    /// Position within the producing transaction's output list.
    pub index: u64,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// Reference to a specific input of a later transaction.
///
/// Present on an [`UnspentOutput`] iff that input consumes it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InPoint {
    pub txid: Hash256,
    pub index: u64,
}

impl fmt::Display for InPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction input, spending a previous output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxInput {
    pub previous_output: OutPoint,
    /// Empty until an external signer fills it in.
    #[serde(with = "hex::serde")]
    pub unlocking_script: Vec<u8>,
}

impl TxInput {
    /// An input referencing `previous_output` with no unlocking data.
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            unlocking_script: Vec::new(),
        }
    }
}

/// A transaction output: a value and the condition locking it.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    pub value: u64,
    pub locking_script: Script,
}

/// A transaction transferring value between locking conditions.
///
/// Output order is significant: the wallet places payment outputs first and
/// the change output (if any) last.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    pub version: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u64,
}

impl Transaction {
    /// BLAKE3 over the bincode `standard()` encoding, unlocking scripts
    /// included. Signing therefore changes the id.
    pub fn txid(&self) -> Result<Hash256, TransactionError> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// `None` if the outputs overflow u64.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Outpoint of this transaction's output at `index`.
    pub fn outpoint(&self, index: u64) -> Result<OutPoint, TransactionError> {
        Ok(OutPoint {
            txid: self.txid()?,
            index,
        })
    }
}

/// One output ever paid to an address, as reported by the ledger.
///
/// Spent outputs are reported too; `spent_by` tells them apart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UnspentOutput {
    /// Producing transaction hash and output index.
    pub outpoint: OutPoint,
    pub value: u64,
    pub locking_script: Script,
    /// The address this output was indexed under.
    pub owner: Address,
    /// The input that consumed this output, if any.
    pub spent_by: Option<InPoint>,
    /// Whether the producing transaction is in an accepted block.
    pub confirmed: bool,
}

impl UnspentOutput {
    pub fn is_spent(&self) -> bool {
        self.spent_by.is_some()
    }

    /// Whether this output may fund a new transaction.
    ///
    /// Spent outputs never qualify. Unconfirmed outputs qualify unless
    /// `require_confirmed` is set.
    pub fn is_spendable(&self, require_confirmed: bool) -> bool {
        !self.is_spent() && (self.confirmed || !require_confirmed)
    }
}

/// Sum the values of `outputs`. Returns None on overflow.
pub fn total_value<'a>(outputs: impl IntoIterator<Item = &'a UnspentOutput>) -> Option<u64> {
    outputs
        .into_iter()
        .try_fold(0u64, |acc, out| acc.checked_add(out.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Network;
    use crate::constants::COIN;

    fn sample_owner() -> Address {
        Address::from_pubkey_hash(Hash256([0xAA; 32]), Network::Testnet)
    }

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput::unsigned(OutPoint {
                txid: Hash256([0x11; 32]),
                index: 0,
            })],
            outputs: vec![TxOutput {
                value: 50 * COIN,
                locking_script: Script::pay_to_address(&sample_owner()),
            }],
            lock_time: 0,
        }
    }

    fn sample_output(spent: bool, confirmed: bool) -> UnspentOutput {
        UnspentOutput {
            outpoint: OutPoint { txid: Hash256([1; 32]), index: 0 },
            value: 1000,
            locking_script: Script::pay_to_address(&sample_owner()),
            owner: sample_owner(),
            spent_by: spent.then(|| InPoint { txid: Hash256([2; 32]), index: 0 }),
            confirmed,
        }
    }

    #[test]
    fn hash_prints_as_lowercase_hex_and_parses_back() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xAB;
        bytes[31] = 0x01;
        let h = Hash256(bytes);
        let printed = h.to_string();
        assert!(printed.starts_with("ab00"));
        assert!(printed.ends_with("01"));
        assert_eq!(Hash256::from_hex(&printed).unwrap(), h);
        assert!(Hash256::from_hex("abcd").is_err());
        assert!(Hash256::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn outpoint_display() {
        let op = OutPoint { txid: Hash256::ZERO, index: 3 };
        assert!(op.to_string().ends_with(":3"));
    }

    #[test]
    fn txid_deterministic_and_64_hex_chars() {
        let tx = sample_tx();
        let id = tx.txid().unwrap();
        assert_eq!(id, tx.txid().unwrap());
        assert_eq!(id.to_string().len(), 64);
        assert!(!id.is_zero());
    }

    #[test]
    fn txid_changes_with_outputs() {
        let tx1 = sample_tx();
        let mut tx2 = sample_tx();
        tx2.outputs[0].value -= 1;
        assert_ne!(tx1.txid().unwrap(), tx2.txid().unwrap());
    }

    #[test]
    fn total_output_value_overflow_returns_none() {
        let mut tx = sample_tx();
        tx.outputs.push(TxOutput {
            value: u64::MAX,
            locking_script: Script::pay_to_address(&sample_owner()),
        });
        assert_eq!(tx.total_output_value(), None);
    }

    #[test]
    fn outpoint_of_output() {
        let tx = sample_tx();
        let op = tx.outpoint(0).unwrap();
        assert_eq!(op.txid, tx.txid().unwrap());
        assert_eq!(op.index, 0);
    }

    #[test]
    fn spent_output_never_spendable() {
        assert!(!sample_output(true, true).is_spendable(false));
        assert!(!sample_output(true, false).is_spendable(false));
        assert!(sample_output(true, true).is_spent());
    }

    #[test]
    fn unconfirmed_spendable_unless_required() {
        let out = sample_output(false, false);
        assert!(out.is_spendable(false));
        assert!(!out.is_spendable(true));
        assert!(sample_output(false, true).is_spendable(true));
    }

    #[test]
    fn total_value_sums_and_detects_overflow() {
        let a = sample_output(false, true);
        let mut b = sample_output(false, true);
        assert_eq!(total_value([&a, &b]), Some(2000));
        b.value = u64::MAX;
        assert_eq!(total_value([&a, &b]), None);
        assert_eq!(total_value(std::iter::empty::<&UnspentOutput>()), Some(0));
    }

    #[test]
    fn unsigned_input_has_empty_script() {
        let input = TxInput::unsigned(OutPoint { txid: Hash256::ZERO, index: 1 });
        assert!(input.unlocking_script.is_empty());
    }

    #[test]
    fn transaction_json_roundtrip() {
        let tx = sample_tx();
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
