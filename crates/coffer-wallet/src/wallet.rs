//! High-level wallet composition.
//!
//! [`Wallet`] ties a [`Ledger`], a [`KeyStore`] and a [`CoinSelector`]
//! together. It never writes to the ledger; the only state it changes is
//! the key store, when a new address is requested directly or as the
//! change destination under [`ChangePolicy::GenerateNew`].
//!
//! Balances come from two places on purpose:
//! - [`Wallet::balance`] sums the unspent outputs the ledger reports for an
//!   address, recomputed on every call.
//! - [`Wallet::list`] reports the ledger's own cached aggregate per address.
//!   It is cheaper, and it is only as fresh as the ledger's bookkeeping, so
//!   the two figures can differ.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use coffer_core::address::{Address, Network};
use coffer_core::crypto::PublicKey;
use coffer_core::script::{Script, StandardScriptCodec};
use coffer_core::traits::{Ledger, ScriptCodec};
use coffer_core::types::{total_value, Transaction, UnspentOutput};

use crate::builder::{ChangePolicy, PaymentRequest, TransactionBuilder};
use crate::coin_selection::CoinSelector;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::keys::KeyStore;

/// A wallet view over a ledger and a key store.
pub struct Wallet {
    ledger: Arc<dyn Ledger>,
    keystore: Box<dyn KeyStore>,
    selector: Box<dyn CoinSelector>,
    codec: StandardScriptCodec,
    config: WalletConfig,
}

impl Wallet {
    /// Create a wallet using the coin selector named in `config`.
    pub fn new(ledger: Arc<dyn Ledger>, keystore: Box<dyn KeyStore>, config: WalletConfig) -> Self {
        Self {
            ledger,
            keystore,
            selector: config.selection.selector(),
            codec: StandardScriptCodec::new(config.network),
            config,
        }
    }

    /// Replace the coin selector.
    pub fn with_selector(mut self, selector: Box<dyn CoinSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    // ------------------------------------------------------------------
    // Balances
    // ------------------------------------------------------------------

    /// Sum of the unspent outputs paid to `address`, recomputed from the
    /// ledger. Zero for an address the ledger has never seen.
    pub fn balance(&self, address: &Address) -> Result<u64, WalletError> {
        let outputs = self.ledger.outputs_for(address)?;
        total_value(outputs.iter().filter(|o| !o.is_spent()))
            .ok_or_else(|| WalletError::InvalidAmount(format!("balance overflow for {address}")))
    }

    /// Sum of the unspent outputs paid to any wallet address.
    ///
    /// An output shared by several wallet addresses (multisig) counts once,
    /// so this can be less than the sum of per-address balances.
    pub fn total_balance(&self) -> Result<u64, WalletError> {
        let mut seen = HashSet::new();
        let mut unspent = Vec::new();
        for address in self.addrs()? {
            for utxo in self.ledger.outputs_for(&address)? {
                if !utxo.is_spent() && seen.insert(utxo.outpoint.clone()) {
                    unspent.push(utxo);
                }
            }
        }
        total_value(unspent.iter())
            .ok_or_else(|| WalletError::InvalidAmount("total balance overflow".into()))
    }

    /// Every wallet address with the ledger's cached aggregate for it,
    /// in creation order.
    pub fn list(&self) -> Result<Vec<(Address, u64)>, WalletError> {
        self.addrs()?
            .into_iter()
            .map(|address| {
                let balance = self.ledger.aggregate_balance(&address.hashed_identity())?;
                Ok((address, balance))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Addresses
    // ------------------------------------------------------------------

    /// All wallet addresses in creation order.
    pub fn addrs(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self
            .keystore
            .all()?
            .into_iter()
            .map(|record| record.address)
            .collect())
    }

    /// The first address, if the wallet has any.
    pub fn primary_address(&self) -> Result<Option<Address>, WalletError> {
        Ok(self.keystore.all()?.into_iter().next().map(|r| r.address))
    }

    /// Generate a key and return its address, appended after all others.
    pub fn new_address(&self) -> Result<Address, WalletError> {
        let record = self.keystore.generate()?;
        info!(address = %record.address, "wallet: new address");
        Ok(record.address)
    }

    // ------------------------------------------------------------------
    // Transaction building
    // ------------------------------------------------------------------

    /// Unspent outputs across all wallet addresses, each listed once.
    ///
    /// Unconfirmed outputs are left out when the config requires
    /// confirmation.
    pub fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>, WalletError> {
        let require_confirmed = self.config.require_confirmed;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for address in self.addrs()? {
            for utxo in self.ledger.outputs_for(&address)? {
                if utxo.is_spendable(require_confirmed) && seen.insert(utxo.outpoint.clone()) {
                    candidates.push(utxo);
                }
            }
        }
        Ok(candidates)
    }

    /// Build an unsigned transaction paying `payments` plus `fee`.
    ///
    /// Returns `Ok(None)` when the selected outputs cannot cover the
    /// payments and fee. Any change is routed per `change_policy`; under
    /// [`ChangePolicy::GenerateNew`] a new wallet address is created when
    /// (and only when) there is change.
    pub fn tx(
        &self,
        payments: Vec<PaymentRequest>,
        fee: u64,
        change_policy: ChangePolicy,
    ) -> Result<Option<Transaction>, WalletError> {
        let mut builder = TransactionBuilder::with_payments(payments);
        builder.set_fee(fee);
        let target = builder.target()?;

        let candidates = self.unspent_outputs()?;
        let available = candidates.len();
        let selected = self.selector.select(candidates, target);
        debug!(
            selector = self.selector.name(),
            available,
            selected = selected.len(),
            needed = target,
            "wallet: coins selected"
        );

        let Some(funding) = builder.fund(selected)? else {
            info!(needed = target, "wallet: insufficient funds");
            return Ok(None);
        };

        let payment_outputs = builder.payment_outputs(&self.codec, |a| self.resolve_key(a))?;
        let change_script = if funding.needs_change_output() {
            Some(self.change_script(&change_policy)?)
        } else {
            None
        };
        let tx = builder.assemble(&funding, payment_outputs, change_script)?;

        info!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            change = funding.change,
            fee,
            "wallet: transaction built"
        );
        Ok(Some(tx))
    }

    /// [`tx`](Self::tx) with the configured default fee and change to the
    /// primary address.
    pub fn pay(&self, payments: Vec<PaymentRequest>) -> Result<Option<Transaction>, WalletError> {
        self.tx(payments, self.config.default_fee, ChangePolicy::UseDefault)
    }

    fn resolve_key(&self, address: &Address) -> Result<PublicKey, WalletError> {
        self.keystore
            .lookup(address)?
            .map(|record| record.public_key)
            .ok_or_else(|| WalletError::UnknownAddress(address.to_string()))
    }

    fn change_script(&self, policy: &ChangePolicy) -> Result<Script, WalletError> {
        let address = match policy {
            ChangePolicy::UseAddress(address) => address.clone(),
            ChangePolicy::GenerateNew => self.new_address()?,
            ChangePolicy::UseDefault => self.primary_address()?.ok_or(WalletError::NoAddresses)?,
        };
        debug!(%address, %policy, "wallet: change routed");
        Ok(self.codec.encode_single_pay(&address)?)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("network", &self.config.network)
            .field("selector", &self.selector.name())
            .finish()
    }
}
