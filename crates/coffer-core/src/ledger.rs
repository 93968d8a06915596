//! In-memory ledger indexer.
//!
//! [`MemoryLedger`] ingests transactions, indexes each standard output under
//! the address (or, for multisig, every participant address) it pays, and
//! records which later input consumed it. It keeps a running aggregate
//! balance per hashed address identity, updated incrementally as
//! transactions are applied.
//!
//! The aggregate is a cache. [`MemoryLedger::set_aggregate_balance`] lets an
//! external indexer overwrite it, after which it may disagree with a fresh
//! sum over [`Ledger::outputs_for`] until [`MemoryLedger::rebuild_aggregates`]
//! runs. Callers that need an authoritative figure recompute from outputs.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::{Address, Network};
use crate::error::LedgerError;
use crate::script::{Script, StandardScriptCodec};
use crate::traits::{Ledger, ScriptCodec};
use crate::types::{Hash256, InPoint, OutPoint, Transaction, UnspentOutput};

/// An output as stored in the index.
#[derive(Debug, Clone)]
struct IndexedOutput {
    value: u64,
    locking_script: Script,
    owners: Vec<Address>,
    spent_by: Option<InPoint>,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct LedgerIndex {
    /// Applied transactions in application order.
    transactions: Vec<SnapshotEntry>,
    txids: HashMap<Hash256, usize>,
    outputs: HashMap<OutPoint, IndexedOutput>,
    by_address: HashMap<Address, Vec<OutPoint>>,
    aggregates: HashMap<String, u64>,
}

/// One applied transaction in a [`LedgerSnapshot`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub transaction: Transaction,
    pub confirmed: bool,
}

/// Serializable ledger contents: the applied transactions, in order.
///
/// Replaying the entries through [`MemoryLedger::apply_transaction`]
/// reproduces the index.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub network: Network,
    pub entries: Vec<SnapshotEntry>,
}

/// Thread-safe in-memory [`Ledger`] implementation.
pub struct MemoryLedger {
    codec: StandardScriptCodec,
    inner: RwLock<LedgerIndex>,
}

impl MemoryLedger {
    pub fn new(network: Network) -> Self {
        Self {
            codec: StandardScriptCodec::new(network),
            inner: RwLock::new(LedgerIndex::default()),
        }
    }

    pub fn network(&self) -> Network {
        self.codec.network()
    }

    /// Index a transaction's outputs and mark the outputs it consumes as spent.
    ///
    /// Inputs referencing outpoints the ledger has never seen are accepted
    /// and ignored. Outputs whose scripts do not decode are stored but not
    /// attributed to any address. Returns the transaction's hash.
    pub fn apply_transaction(
        &self,
        tx: &Transaction,
        confirmed: bool,
    ) -> Result<Hash256, LedgerError> {
        let txid = tx.txid()?;
        let mut index = self.inner.write();

        if index.txids.contains_key(&txid) {
            return Err(LedgerError::DuplicateTransaction(txid.to_string()));
        }
        let mut consumed = HashSet::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            if !consumed.insert(&input.previous_output) {
                return Err(LedgerError::AlreadySpent(input.previous_output.to_string()));
            }
            if let Some(prev) = index.outputs.get(&input.previous_output) {
                if prev.spent_by.is_some() {
                    return Err(LedgerError::AlreadySpent(input.previous_output.to_string()));
                }
            }
        }

        for (i, input) in tx.inputs.iter().enumerate() {
            let LedgerIndex { outputs, aggregates, .. } = &mut *index;
            let Some(prev) = outputs.get_mut(&input.previous_output) else {
                continue;
            };
            prev.spent_by = Some(InPoint {
                txid,
                index: i as u64,
            });
            for owner in &prev.owners {
                let entry = aggregates.entry(owner.hashed_identity()).or_insert(0);
                *entry = entry.saturating_sub(prev.value);
            }
        }

        for (i, output) in tx.outputs.iter().enumerate() {
            let outpoint = OutPoint {
                txid,
                index: i as u64,
            };
            let mut owners = match self.codec.decode(&output.locking_script) {
                Ok(dest) => dest.addresses(),
                Err(e) => {
                    debug!(%outpoint, error = %e, "ledger: output not attributable");
                    Vec::new()
                }
            };
            // A multisig script may repeat a key; index each owner once.
            let mut seen = HashSet::with_capacity(owners.len());
            owners.retain(|owner| seen.insert(owner.clone()));
            for owner in &owners {
                index
                    .by_address
                    .entry(owner.clone())
                    .or_default()
                    .push(outpoint.clone());
                let entry = index.aggregates.entry(owner.hashed_identity()).or_insert(0);
                *entry = entry.saturating_add(output.value);
            }
            index.outputs.insert(
                outpoint,
                IndexedOutput {
                    value: output.value,
                    locking_script: output.locking_script.clone(),
                    owners,
                    spent_by: None,
                    confirmed,
                },
            );
        }

        let position = index.transactions.len();
        index.transactions.push(SnapshotEntry {
            transaction: tx.clone(),
            confirmed,
        });
        index.txids.insert(txid, position);

        debug!(%txid, inputs = tx.inputs.len(), outputs = tx.outputs.len(), confirmed, "ledger: transaction applied");
        Ok(txid)
    }

    /// Mark every output of an applied transaction as confirmed.
    pub fn confirm(&self, txid: &Hash256) -> Result<(), LedgerError> {
        let mut index = self.inner.write();
        let position = *index
            .txids
            .get(txid)
            .ok_or_else(|| LedgerError::UnknownTransaction(txid.to_string()))?;
        index.transactions[position].confirmed = true;
        let count = index.transactions[position].transaction.outputs.len() as u64;
        for i in 0..count {
            let outpoint = OutPoint { txid: *txid, index: i };
            if let Some(out) = index.outputs.get_mut(&outpoint) {
                out.confirmed = true;
            }
        }
        debug!(%txid, "ledger: transaction confirmed");
        Ok(())
    }

    /// Overwrite the cached aggregate for a hashed identity.
    pub fn set_aggregate_balance(&self, hashed_identity: &str, balance: u64) {
        self.inner
            .write()
            .aggregates
            .insert(hashed_identity.to_string(), balance);
    }

    /// Recompute every cached aggregate from the indexed outputs.
    pub fn rebuild_aggregates(&self) {
        let mut index = self.inner.write();
        let mut aggregates: HashMap<String, u64> = HashMap::new();
        for out in index.outputs.values().filter(|o| o.spent_by.is_none()) {
            for owner in &out.owners {
                let entry = aggregates.entry(owner.hashed_identity()).or_insert(0);
                *entry = entry.saturating_add(out.value);
            }
        }
        info!(identities = aggregates.len(), "ledger: aggregates rebuilt");
        index.aggregates = aggregates;
    }

    /// Number of applied transactions.
    pub fn transaction_count(&self) -> usize {
        self.inner.read().transactions.len()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            network: self.network(),
            entries: self.inner.read().transactions.clone(),
        }
    }

    /// Rebuild a ledger by replaying a snapshot.
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Result<Self, LedgerError> {
        let ledger = Self::new(snapshot.network);
        for entry in &snapshot.entries {
            ledger.apply_transaction(&entry.transaction, entry.confirmed)?;
        }
        Ok(ledger)
    }

    /// Load a JSON snapshot file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let data = std::fs::read(path).map_err(|e| LedgerError::Storage(e.to_string()))?;
        let snapshot: LedgerSnapshot =
            serde_json::from_slice(&data).map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        let ledger = Self::from_snapshot(&snapshot)?;
        info!(path = %path.display(), transactions = ledger.transaction_count(), "ledger: snapshot loaded");
        Ok(ledger)
    }

    /// Write the current contents to a JSON snapshot file.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| LedgerError::Storage(e.to_string()))
    }
}

impl Ledger for MemoryLedger {
    fn outputs_for(&self, address: &Address) -> Result<Vec<UnspentOutput>, LedgerError> {
        let index = self.inner.read();
        let Some(outpoints) = index.by_address.get(address) else {
            return Ok(Vec::new());
        };
        Ok(outpoints
            .iter()
            .filter_map(|op| {
                index.outputs.get(op).map(|out| UnspentOutput {
                    outpoint: op.clone(),
                    value: out.value,
                    locking_script: out.locking_script.clone(),
                    owner: address.clone(),
                    spent_by: out.spent_by.clone(),
                    confirmed: out.confirmed,
                })
            })
            .collect())
    }

    fn aggregate_balance(&self, hashed_identity: &str) -> Result<u64, LedgerError> {
        Ok(*self.inner.read().aggregates.get(hashed_identity).unwrap_or(&0))
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.inner.read();
        f.debug_struct("MemoryLedger")
            .field("network", &self.network())
            .field("transactions", &index.transactions.len())
            .field("outputs", &index.outputs.len())
            .finish()
    }
}
