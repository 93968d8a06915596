//! Address encoding for Coffer wallets.
//!
//! Addresses are Base58Check strings over `version || pubkey_hash`, where the
//! version byte selects the network and the pubkey hash is the 32-byte BLAKE3
//! hash of an Ed25519 public key. The 4-byte double-SHA-256 checksum that
//! Base58Check appends catches typos before a payment is built.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAINNET_ADDRESS_VERSION, TESTNET_ADDRESS_VERSION};
use crate::crypto::PublicKey;
use crate::error::AddressError;
use crate::types::Hash256;

/// Decoded payload length: one version byte plus the pubkey hash.
const PAYLOAD_LEN: usize = 1 + 32;

/// Network identifier determining the address version byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Base58Check version byte for this network.
    pub fn version_byte(&self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_ADDRESS_VERSION,
            Network::Testnet => TESTNET_ADDRESS_VERSION,
        }
    }

    /// Look up network from an address version byte.
    pub fn from_version_byte(byte: u8) -> Result<Self, AddressError> {
        match byte {
            MAINNET_ADDRESS_VERSION => Ok(Network::Mainnet),
            TESTNET_ADDRESS_VERSION => Ok(Network::Testnet),
            other => Err(AddressError::UnknownVersion(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            _ => Err(AddressError::UnknownNetwork(s.to_string())),
        }
    }
}

/// A wallet address: network plus the pubkey hash it pays to.
///
/// Immutable once derived. Two addresses are equal iff they share network
/// and pubkey hash, which also makes their encoded strings equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    pubkey_hash: Hash256,
}

impl Address {
    pub fn from_pubkey_hash(pubkey_hash: Hash256, network: Network) -> Self {
        Self {
            network,
            pubkey_hash,
        }
    }

    pub fn from_public_key(public_key: &PublicKey, network: Network) -> Self {
        Self::from_pubkey_hash(public_key.pubkey_hash(), network)
    }

    pub fn pubkey_hash(&self) -> Hash256 {
        self.pubkey_hash
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Hex form of the pubkey hash.
    ///
    /// This is the key the ledger indexes its aggregate balances under.
    pub fn hashed_identity(&self) -> String {
        hex::encode(self.pubkey_hash.as_bytes())
    }

    /// Encode this address as a Base58Check string.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(PAYLOAD_LEN);
        payload.push(self.network.version_byte());
        payload.extend_from_slice(self.pubkey_hash.as_bytes());
        bs58::encode(payload).with_check().into_string()
    }

    /// Decode a Base58Check address string.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let payload = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|e| match e {
                bs58::decode::Error::InvalidChecksum { .. } => AddressError::InvalidChecksum,
                other => AddressError::InvalidEncoding(other.to_string()),
            })?;

        if payload.len() != PAYLOAD_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        let network = Network::from_version_byte(payload[0])?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&payload[1..]);

        Ok(Self {
            network,
            pubkey_hash: Hash256(hash),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}
