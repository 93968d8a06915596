//! Shared test helpers for wallet integration and property tests.

use std::sync::Arc;

use parking_lot::Mutex;

use coffer_core::address::{Address, Network};
use coffer_core::crypto::KeyPair;
use coffer_core::ledger::MemoryLedger;
use coffer_core::script::Script;
use coffer_core::types::{OutPoint, Transaction, TxInput, TxOutput};
use coffer_wallet::{KeyRecord, KeyStore, KeyStoreError, Wallet, WalletConfig};

/// Deterministic in-memory [`KeyStore`].
///
/// The n-th generated key uses secret bytes `[n; 32]`, starting at 1.
pub struct MemoryKeyStore {
    network: Network,
    records: Mutex<Vec<KeyRecord>>,
    next_seed: Mutex<u8>,
}

impl MemoryKeyStore {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            records: Mutex::new(Vec::new()),
            next_seed: Mutex::new(1),
        }
    }

    /// A testnet store with `n` generated keys.
    pub fn with_keys(n: u8) -> Self {
        let store = Self::new(Network::Testnet);
        for _ in 0..n {
            store.generate().expect("memory store never fails");
        }
        store
    }
}

impl KeyStore for MemoryKeyStore {
    fn lookup(&self, address: &Address) -> Result<Option<KeyRecord>, KeyStoreError> {
        Ok(self.records.lock().iter().find(|r| &r.address == address).cloned())
    }

    fn all(&self) -> Result<Vec<KeyRecord>, KeyStoreError> {
        Ok(self.records.lock().clone())
    }

    fn generate(&self) -> Result<KeyRecord, KeyStoreError> {
        let mut seed = self.next_seed.lock();
        let keypair = KeyPair::from_secret_bytes([*seed; 32]);
        *seed = seed.wrapping_add(1);
        self.import(keypair)
    }

    fn import(&self, keypair: KeyPair) -> Result<KeyRecord, KeyStoreError> {
        let record = KeyRecord::from_keypair(keypair, self.network);
        let mut records = self.records.lock();
        if let Some(existing) = records.iter().find(|r| r.address == record.address) {
            return Ok(existing.clone());
        }
        records.push(record.clone());
        Ok(record)
    }
}

/// Testnet address for the key with secret bytes `[seed; 32]`.
///
/// Seeds from 200 upward never collide with [`MemoryKeyStore`] keys in
/// these tests.
pub fn addr(seed: u8) -> Address {
    Address::from_public_key(
        &KeyPair::from_secret_bytes([seed; 32]).public_key(),
        Network::Testnet,
    )
}

/// A transaction with no inputs paying each of `values` to `to`.
///
/// `marker` goes into `lock_time` so otherwise identical funding
/// transactions get distinct txids.
pub fn funding_tx(to: &Address, values: &[u64], marker: u64) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![],
        outputs: values
            .iter()
            .map(|&value| TxOutput {
                value,
                locking_script: Script::pay_to_address(to),
            })
            .collect(),
        lock_time: marker,
    }
}

/// An unsigned transaction spending `inputs` into `outputs`.
pub fn spend_tx(inputs: Vec<OutPoint>, outputs: Vec<(u64, Address)>) -> Transaction {
    Transaction {
        version: 1,
        inputs: inputs.into_iter().map(TxInput::unsigned).collect(),
        outputs: outputs
            .into_iter()
            .map(|(value, to)| TxOutput {
                value,
                locking_script: Script::pay_to_address(&to),
            })
            .collect(),
        lock_time: 0,
    }
}

/// Apply a confirmed single-output funding transaction; returns its outpoint.
pub fn fund(ledger: &MemoryLedger, to: &Address, value: u64, marker: u64) -> OutPoint {
    let txid = ledger
        .apply_transaction(&funding_tx(to, &[value], marker), true)
        .expect("funding applies");
    OutPoint { txid, index: 0 }
}

/// A default-config wallet with `keys` generated addresses over a fresh ledger.
pub fn wallet_with_keys(keys: u8) -> (Wallet, Arc<MemoryLedger>) {
    wallet_with_config(keys, WalletConfig::default())
}

pub fn wallet_with_config(keys: u8, config: WalletConfig) -> (Wallet, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new(config.network));
    let wallet = Wallet::new(ledger.clone(), Box::new(MemoryKeyStore::with_keys(keys)), config);
    (wallet, ledger)
}
