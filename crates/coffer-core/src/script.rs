//! Locking scripts and the standard script codec.
//!
//! Two standard templates are produced and recognised:
//!
//! ```text
//! single pay: OP_DUP OP_BLAKE3 <32-byte pubkey hash> OP_EQUALVERIFY OP_CHECKSIG
//! multisig:   OP_m <32-byte pubkey> ... <32-byte pubkey> OP_n OP_CHECKMULTISIG
//! ```
//!
//! Multisig scripts carry the participants' public keys (not their hashes),
//! so decoding yields each participant's address by hashing its key. The
//! participant order in the script is the order the payer supplied.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::{Address, Network};
use crate::constants::MAX_MULTISIG_PARTICIPANTS;
use crate::crypto::PublicKey;
use crate::error::ScriptError;
use crate::traits::ScriptCodec;
use crate::types::Hash256;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_BLAKE3: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Largest push that fits a single-byte length opcode.
const MAX_DIRECT_PUSH: usize = 0x4b;

/// Raw locking script bytes.
#[derive(Clone, PartialEq, Eq, Hash, Default, bincode::Encode, bincode::Decode)]
pub struct Script(Vec<u8>);

/// One parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    Op(u8),
    Push(Vec<u8>),
}

impl Script {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ScriptError> {
        hex::decode(s).map(Self).map_err(|_| ScriptError::NonStandard)
    }

    /// Single-signature locking script paying to `address`.
    pub fn pay_to_address(address: &Address) -> Self {
        let hash = address.pubkey_hash();
        let mut bytes = Vec::with_capacity(5 + 32);
        bytes.push(OP_DUP);
        bytes.push(OP_BLAKE3);
        push_data(&mut bytes, hash.as_bytes());
        bytes.push(OP_EQUALVERIFY);
        bytes.push(OP_CHECKSIG);
        Self(bytes)
    }

    /// Bare `threshold`-of-`participants.len()` multisig locking script.
    pub fn multisig(threshold: usize, participants: &[PublicKey]) -> Result<Self, ScriptError> {
        let n = participants.len();
        if threshold == 0 || threshold > n || n > MAX_MULTISIG_PARTICIPANTS {
            return Err(ScriptError::InvalidThreshold {
                threshold,
                participants: n,
            });
        }

        let mut bytes = Vec::with_capacity(3 + n * 33);
        bytes.push(small_int_op(threshold));
        for pk in participants {
            push_data(&mut bytes, &pk.to_bytes());
        }
        bytes.push(small_int_op(n));
        bytes.push(OP_CHECKMULTISIG);
        Ok(Self(bytes))
    }

    /// Parse the script into opcodes and data pushes.
    pub fn chunks(&self) -> Result<Vec<Chunk>, ScriptError> {
        let bytes = &self.0;
        let mut chunks = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let op = bytes[pos];
            let start = pos;
            pos += 1;
            let len = match op {
                0x01..=0x4b => op as usize,
                OP_PUSHDATA1 => {
                    let len = *bytes.get(pos).ok_or(ScriptError::TruncatedPush(start))?;
                    pos += 1;
                    len as usize
                }
                _ => {
                    chunks.push(Chunk::Op(op));
                    continue;
                }
            };
            let end = pos + len;
            let data = bytes.get(pos..end).ok_or(ScriptError::TruncatedPush(start))?;
            chunks.push(Chunk::Push(data.to_vec()));
            pos = end;
        }
        Ok(chunks)
    }

    /// The pubkey hash of a single-pay script.
    pub fn single_pay_hash(&self) -> Result<Hash256, ScriptError> {
        match self.chunks()?.as_slice() {
            [
                Chunk::Op(OP_DUP),
                Chunk::Op(OP_BLAKE3),
                Chunk::Push(hash),
                Chunk::Op(OP_EQUALVERIFY),
                Chunk::Op(OP_CHECKSIG),
            ] if hash.len() == 32 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(hash);
                Ok(Hash256(out))
            }
            _ => Err(ScriptError::NonStandard),
        }
    }

    /// Threshold and ordered participant keys of a multisig script.
    pub fn multisig_keys(&self) -> Result<(usize, Vec<PublicKey>), ScriptError> {
        let chunks = self.chunks()?;
        let [Chunk::Op(m_op), keys @ .., Chunk::Op(n_op), Chunk::Op(OP_CHECKMULTISIG)] =
            chunks.as_slice()
        else {
            return Err(ScriptError::NonStandard);
        };
        let (Some(m), Some(n)) = (small_int_value(*m_op), small_int_value(*n_op)) else {
            return Err(ScriptError::NonStandard);
        };
        if keys.len() != n || m == 0 || m > n {
            return Err(ScriptError::NonStandard);
        }

        let participants = keys
            .iter()
            .map(|chunk| match chunk {
                Chunk::Push(bytes) => PublicKey::from_slice(bytes).map_err(ScriptError::from),
                Chunk::Op(_) => Err(ScriptError::NonStandard),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((m, participants))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl Serialize for Script {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Script {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

fn push_data(bytes: &mut Vec<u8>, data: &[u8]) {
    if data.len() > MAX_DIRECT_PUSH {
        bytes.push(OP_PUSHDATA1);
    }
    bytes.push(data.len() as u8);
    bytes.extend_from_slice(data);
}

fn small_int_op(n: usize) -> u8 {
    if n == 0 { OP_0 } else { OP_1 + (n as u8 - 1) }
}

fn small_int_value(op: u8) -> Option<usize> {
    match op {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some((op - OP_1) as usize + 1),
        _ => None,
    }
}

/// Who a locking script pays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    SinglePay(Address),
    Multisig {
        threshold: usize,
        addresses: Vec<Address>,
    },
}

impl Destination {
    /// Every address the script names, in script order.
    pub fn addresses(&self) -> Vec<Address> {
        match self {
            Destination::SinglePay(addr) => vec![addr.clone()],
            Destination::Multisig { addresses, .. } => addresses.clone(),
        }
    }
}

/// The script codec used in production: the two standard templates above,
/// with decoded addresses placed on a fixed network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StandardScriptCodec {
    network: Network,
}

impl StandardScriptCodec {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

impl ScriptCodec for StandardScriptCodec {
    fn encode_single_pay(&self, address: &Address) -> Result<Script, ScriptError> {
        if address.network() != self.network {
            return Err(ScriptError::NetworkMismatch {
                expected: self.network.to_string(),
                got: address.network().to_string(),
            });
        }
        Ok(Script::pay_to_address(address))
    }

    fn encode_multisig(
        &self,
        threshold: usize,
        participants: &[PublicKey],
    ) -> Result<Script, ScriptError> {
        Script::multisig(threshold, participants)
    }

    fn decode(&self, script: &Script) -> Result<Destination, ScriptError> {
        if script.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if let Ok(hash) = script.single_pay_hash() {
            return Ok(Destination::SinglePay(Address::from_pubkey_hash(hash, self.network)));
        }
        let (threshold, keys) = script.multisig_keys()?;
        Ok(Destination::Multisig {
            threshold,
            addresses: keys
                .iter()
                .map(|pk| Address::from_public_key(pk, self.network))
                .collect(),
        })
    }
}
