//! Monetary and encoding constants.

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// Flat fee applied when the caller does not supply one.
pub const DEFAULT_FEE: u64 = 0;

/// Version of transactions assembled by the wallet.
pub const TX_VERSION: u64 = 1;

/// Base58Check version byte for mainnet addresses.
pub const MAINNET_ADDRESS_VERSION: u8 = 0x1c;

/// Base58Check version byte for testnet addresses.
pub const TESTNET_ADDRESS_VERSION: u8 = 0x41;

/// Largest participant count a bare multisig script can express with a small-int opcode.
pub const MAX_MULTISIG_PARTICIPANTS: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_bytes_distinct() {
        assert_ne!(MAINNET_ADDRESS_VERSION, TESTNET_ADDRESS_VERSION);
    }

    #[test]
    fn default_fee_is_zero() {
        assert_eq!(DEFAULT_FEE, 0);
    }
}
