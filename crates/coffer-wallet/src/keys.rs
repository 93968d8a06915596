//! Key records and the key store contract.
//!
//! A [`KeyStore`] maps addresses to key material. The wallet only ever
//! looks keys up, lists them, and asks for new ones; how they are kept is
//! the store's business. [`FileKeyStore`] is the production store: a JSON
//! file holding each key in creation order, rewritten whenever a key is
//! added. Secrets are stored as plain hex.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use coffer_core::address::{Address, Network};
use coffer_core::crypto::{KeyPair, PublicKey};

use crate::error::KeyStoreError;

/// One key known to the wallet.
///
/// Watch-only records carry no keypair.
#[derive(Clone, Debug)]
pub struct KeyRecord {
    pub address: Address,
    pub public_key: PublicKey,
    pub keypair: Option<KeyPair>,
}

impl KeyRecord {
    pub fn from_keypair(keypair: KeyPair, network: Network) -> Self {
        let public_key = keypair.public_key();
        Self {
            address: Address::from_public_key(&public_key, network),
            public_key,
            keypair: Some(keypair),
        }
    }

    pub fn watch_only(public_key: PublicKey, network: Network) -> Self {
        Self {
            address: Address::from_public_key(&public_key, network),
            public_key,
            keypair: None,
        }
    }

    pub fn is_watch_only(&self) -> bool {
        self.keypair.is_none()
    }
}

/// Address-to-key mapping consumed by the wallet.
///
/// `all` returns records in creation order. `generate` and `import` persist
/// the new record before returning it.
pub trait KeyStore: Send + Sync {
    fn lookup(&self, address: &Address) -> Result<Option<KeyRecord>, KeyStoreError>;

    fn all(&self) -> Result<Vec<KeyRecord>, KeyStoreError>;

    /// Create, persist and return a fresh key.
    fn generate(&self) -> Result<KeyRecord, KeyStoreError>;

    /// Persist an existing keypair. Importing a key already present returns
    /// the existing record unchanged.
    fn import(&self, keypair: KeyPair) -> Result<KeyRecord, KeyStoreError>;
}

/// On-disk shape of a key record.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredKey {
    address: String,
    public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
}

impl StoredKey {
    fn from_record(record: &KeyRecord) -> Self {
        let secret_key = record.keypair.as_ref().map(|kp| {
            let mut secret = kp.secret_bytes();
            let encoded = hex::encode(secret);
            secret.zeroize();
            encoded
        });
        Self {
            address: record.address.encode(),
            public_key: record.public_key.to_string(),
            secret_key,
        }
    }

    fn to_record(&self, network: Network) -> Result<KeyRecord, KeyStoreError> {
        let record = match &self.secret_key {
            Some(secret) => KeyRecord::from_keypair(KeyPair::from_secret_hex(secret)?, network),
            None => {
                let bytes = hex::decode(&self.public_key)
                    .map_err(|e| KeyStoreError::Corrupted(e.to_string()))?;
                KeyRecord::watch_only(PublicKey::from_slice(&bytes)?, network)
            }
        };
        if record.public_key.to_string() != self.public_key {
            return Err(KeyStoreError::Inconsistent(format!(
                "secret does not match public key {}",
                self.public_key
            )));
        }
        let stored: Address = self.address.parse()?;
        if stored != record.address {
            return Err(KeyStoreError::Inconsistent(format!(
                "address {} does not belong to key {}",
                self.address, self.public_key
            )));
        }
        Ok(record)
    }
}

#[derive(Serialize, Deserialize)]
struct KeyFile {
    network: Network,
    keys: Vec<StoredKey>,
}

/// JSON-file backed [`KeyStore`].
pub struct FileKeyStore {
    path: PathBuf,
    network: Network,
    records: RwLock<Vec<KeyRecord>>,
}

impl FileKeyStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>, network: Network) -> Result<Self, KeyStoreError> {
        let path = path.into();
        let records = if path.exists() {
            let data = fs::read(&path).map_err(|e| KeyStoreError::Io(e.to_string()))?;
            let file: KeyFile =
                serde_json::from_slice(&data).map_err(|e| KeyStoreError::Corrupted(e.to_string()))?;
            if file.network != network {
                return Err(KeyStoreError::Corrupted(format!(
                    "key store is for {}, expected {network}",
                    file.network
                )));
            }
            file.keys
                .iter()
                .map(|k| k.to_record(network))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        info!(path = %path.display(), keys = records.len(), "key store opened");
        Ok(Self {
            path,
            network,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn network(&self) -> Network {
        self.network
    }

    fn persist(&self, records: &[KeyRecord]) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| KeyStoreError::Io(e.to_string()))?;
            }
        }
        let file = KeyFile {
            network: self.network,
            keys: records.iter().map(StoredKey::from_record).collect(),
        };
        let json =
            serde_json::to_vec_pretty(&file).map_err(|e| KeyStoreError::Corrupted(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| KeyStoreError::Io(e.to_string()))
    }

    fn push(&self, record: KeyRecord) -> Result<KeyRecord, KeyStoreError> {
        let mut records = self.records.write();
        if let Some(existing) = records.iter().find(|r| r.address == record.address) {
            return Ok(existing.clone());
        }
        records.push(record.clone());
        if let Err(e) = self.persist(&records) {
            records.pop();
            return Err(e);
        }
        debug!(address = %record.address, total = records.len(), "key store: key added");
        Ok(record)
    }
}

impl KeyStore for FileKeyStore {
    fn lookup(&self, address: &Address) -> Result<Option<KeyRecord>, KeyStoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| &r.address == address)
            .cloned())
    }

    fn all(&self) -> Result<Vec<KeyRecord>, KeyStoreError> {
        Ok(self.records.read().clone())
    }

    fn generate(&self) -> Result<KeyRecord, KeyStoreError> {
        self.push(KeyRecord::from_keypair(KeyPair::generate(), self.network))
    }

    fn import(&self, keypair: KeyPair) -> Result<KeyRecord, KeyStoreError> {
        self.push(KeyRecord::from_keypair(keypair, self.network))
    }
}

impl std::fmt::Debug for FileKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeyStore")
            .field("path", &self.path)
            .field("network", &self.network)
            .field("keys", &self.records.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FileKeyStore {
        FileKeyStore::open(dir.path().join("keys.json"), Network::Testnet).unwrap()
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.all().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn generate_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let a = store.generate().unwrap();
        let b = store.generate().unwrap();
        assert_ne!(a.address, b.address);

        let all = store.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].address, a.address);
        assert_eq!(all[1].address, b.address);
        assert!(store.path().exists());
    }

    #[test]
    fn reopen_preserves_order_and_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let first = {
            let store = store_in(&dir);
            let r1 = store.generate().unwrap();
            let r2 = store.generate().unwrap();
            vec![r1, r2]
        };
        let reopened = store_in(&dir);
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 2);
        for (orig, loaded) in first.iter().zip(&all) {
            assert_eq!(orig.address, loaded.address);
            assert_eq!(
                orig.keypair.as_ref().unwrap().secret_bytes(),
                loaded.keypair.as_ref().unwrap().secret_bytes()
            );
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let rec = store.generate().unwrap();
        assert!(store.lookup(&rec.address).unwrap().is_some());
        let stranger = KeyRecord::from_keypair(KeyPair::from_secret_bytes([9; 32]), Network::Testnet);
        assert!(store.lookup(&stranger.address).unwrap().is_none());
    }

    #[test]
    fn import_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let kp = KeyPair::from_secret_bytes([3; 32]);
        let a = store.import(kp.clone()).unwrap();
        let b = store.import(kp).unwrap();
        assert_eq!(a.address, b.address);
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn network_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir).generate().unwrap();
        let err = FileKeyStore::open(dir.path().join("keys.json"), Network::Mainnet).unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupted(_)));
    }

    #[test]
    fn garbage_file_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keys.json"), b"garbage").unwrap();
        let err = FileKeyStore::open(dir.path().join("keys.json"), Network::Testnet).unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupted(_)));
    }

    #[test]
    fn tampered_address_is_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let store = store_in(&dir);
        store.generate().unwrap();
        let other = KeyRecord::from_keypair(KeyPair::from_secret_bytes([8; 32]), Network::Testnet);

        let mut json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        json["keys"][0]["address"] = serde_json::Value::String(other.address.encode());
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        let err = FileKeyStore::open(&path, Network::Testnet).unwrap_err();
        assert!(matches!(err, KeyStoreError::Inconsistent(_)));
    }

    #[test]
    fn watch_only_record_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let pk = KeyPair::from_secret_bytes([5; 32]).public_key();
        let record = KeyRecord::watch_only(pk.clone(), Network::Testnet);
        let file = KeyFile {
            network: Network::Testnet,
            keys: vec![StoredKey::from_record(&record)],
        };
        std::fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

        let store = FileKeyStore::open(&path, Network::Testnet).unwrap();
        let loaded = store.lookup(&record.address).unwrap().unwrap();
        assert!(loaded.is_watch_only());
        assert_eq!(loaded.public_key, pk);
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            FileKeyStore::open(dir.path().join("nested/deeper/keys.json"), Network::Testnet).unwrap();
        store.generate().unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn debug_hides_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let rec = store.generate().unwrap();
        let secret = hex::encode(rec.keypair.unwrap().secret_bytes());
        let debug = format!("{store:?}");
        assert!(debug.contains("FileKeyStore"));
        assert!(!debug.contains(&secret));
    }
}
