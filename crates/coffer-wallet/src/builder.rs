//! Unsigned transaction assembly.
//!
//! Building a transaction happens in three steps, driven by the wallet:
//! 1. Check the payment list and compute the selection target
//!    ([`TransactionBuilder::target`])
//! 2. Decide whether the selected outputs cover it ([`TransactionBuilder::fund`])
//! 3. Lay out inputs, payment outputs and change ([`TransactionBuilder::assemble`])
//!
//! Inputs follow the selector's order, payment outputs follow request
//! order, and the change output (if any) is always last.

use std::fmt;
use std::str::FromStr;

use coffer_core::address::Address;
use coffer_core::constants::TX_VERSION;
use coffer_core::crypto::PublicKey;
use coffer_core::script::Script;
use coffer_core::traits::ScriptCodec;
use coffer_core::types::{total_value, Transaction, TxInput, TxOutput, UnspentOutput};

use crate::error::WalletError;

/// One payment the caller wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequest {
    /// Pay `value` to a single address.
    SinglePay { address: Address, value: u64 },
    /// Pay `value` into a `threshold`-of-n condition over `participants`.
    MultisigPay {
        threshold: usize,
        participants: Vec<Address>,
        value: u64,
    },
}

impl PaymentRequest {
    pub fn single(address: Address, value: u64) -> Self {
        PaymentRequest::SinglePay { address, value }
    }

    pub fn multisig(threshold: usize, participants: Vec<Address>, value: u64) -> Self {
        PaymentRequest::MultisigPay {
            threshold,
            participants,
            value,
        }
    }

    pub fn value(&self) -> u64 {
        match self {
            PaymentRequest::SinglePay { value, .. } | PaymentRequest::MultisigPay { value, .. } => {
                *value
            }
        }
    }
}

/// Where the change output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChangePolicy {
    /// An explicit address.
    UseAddress(Address),
    /// A new wallet address. Generating it adds it to the wallet even if the
    /// transaction is never broadcast.
    GenerateNew,
    /// The wallet's primary (first) address.
    #[default]
    UseDefault,
}

impl FromStr for ChangePolicy {
    type Err = WalletError;

    /// `new`, `default`, or an address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ChangePolicy::GenerateNew),
            "default" => Ok(ChangePolicy::UseDefault),
            other => Ok(ChangePolicy::UseAddress(other.parse()?)),
        }
    }
}

impl fmt::Display for ChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePolicy::UseAddress(addr) => write!(f, "{addr}"),
            ChangePolicy::GenerateNew => write!(f, "new"),
            ChangePolicy::UseDefault => write!(f, "default"),
        }
    }
}

/// Outputs chosen to fund a transaction, and what is left over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Funding {
    pub selected: Vec<UnspentOutput>,
    pub selected_total: u64,
    /// `selected_total - requested_total - fee`.
    pub change: u64,
}

impl Funding {
    pub fn needs_change_output(&self) -> bool {
        self.change > 0
    }
}

/// Collects payments, fee and lock time for one unsigned transaction.
///
/// # Example
/// ```ignore
/// let mut builder = TransactionBuilder::new();
/// builder.add_payment(PaymentRequest::single(addr, 1000)).set_fee(50);
/// let target = builder.target()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    payments: Vec<PaymentRequest>,
    fee: u64,
    lock_time: u64,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payments(payments: Vec<PaymentRequest>) -> Self {
        Self {
            payments,
            ..Self::default()
        }
    }

    pub fn add_payment(&mut self, payment: PaymentRequest) -> &mut Self {
        self.payments.push(payment);
        self
    }

    /// Flat fee in base units (default 0).
    pub fn set_fee(&mut self, fee: u64) -> &mut Self {
        self.fee = fee;
        self
    }

    pub fn set_lock_time(&mut self, lock_time: u64) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    pub fn payments(&self) -> &[PaymentRequest] {
        &self.payments
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Sum of all payment values.
    ///
    /// Fails on an empty payment list, a zero-value payment, or overflow.
    pub fn requested_total(&self) -> Result<u64, WalletError> {
        if self.payments.is_empty() {
            return Err(WalletError::InvalidAmount("no payments".into()));
        }
        let mut total: u64 = 0;
        for (i, payment) in self.payments.iter().enumerate() {
            if payment.value() == 0 {
                return Err(WalletError::InvalidAmount(format!("payment {i} is zero")));
            }
            total = total
                .checked_add(payment.value())
                .ok_or_else(|| WalletError::InvalidAmount("payment total overflow".into()))?;
        }
        Ok(total)
    }

    /// Amount the selected outputs must cover: payments plus fee.
    pub fn target(&self) -> Result<u64, WalletError> {
        self.requested_total()?
            .checked_add(self.fee)
            .ok_or_else(|| WalletError::InvalidAmount("payment total plus fee overflow".into()))
    }

    /// Check `selected` against the target.
    ///
    /// Returns `Ok(None)` when the outputs do not cover payments plus fee.
    pub fn fund(&self, selected: Vec<UnspentOutput>) -> Result<Option<Funding>, WalletError> {
        let target = self.target()?;
        let selected_total = total_value(&selected)
            .ok_or_else(|| WalletError::InvalidAmount("selected total overflow".into()))?;
        if selected_total < target {
            return Ok(None);
        }
        Ok(Some(Funding {
            selected,
            selected_total,
            change: selected_total - target,
        }))
    }

    /// Locking outputs for every payment, in request order.
    ///
    /// `resolve_key` maps a multisig participant to its public key.
    pub fn payment_outputs<F>(
        &self,
        codec: &dyn ScriptCodec,
        mut resolve_key: F,
    ) -> Result<Vec<TxOutput>, WalletError>
    where
        F: FnMut(&Address) -> Result<PublicKey, WalletError>,
    {
        self.payments
            .iter()
            .map(|payment| {
                let locking_script = match payment {
                    PaymentRequest::SinglePay { address, .. } => codec.encode_single_pay(address)?,
                    PaymentRequest::MultisigPay {
                        threshold,
                        participants,
                        ..
                    } => {
                        let keys = participants
                            .iter()
                            .map(&mut resolve_key)
                            .collect::<Result<Vec<_>, _>>()?;
                        codec.encode_multisig(*threshold, &keys)?
                    }
                };
                Ok(TxOutput {
                    value: payment.value(),
                    locking_script,
                })
            })
            .collect()
    }

    /// Lay out the unsigned transaction.
    ///
    /// `change_script` must be present whenever the funding leaves change.
    pub fn assemble(
        &self,
        funding: &Funding,
        payment_outputs: Vec<TxOutput>,
        change_script: Option<Script>,
    ) -> Result<Transaction, WalletError> {
        let inputs = funding
            .selected
            .iter()
            .map(|utxo| TxInput::unsigned(utxo.outpoint.clone()))
            .collect();

        let mut outputs = payment_outputs;
        if funding.needs_change_output() {
            let locking_script = change_script.ok_or_else(|| {
                WalletError::InvalidAmount(format!(
                    "change of {} has no destination",
                    funding.change
                ))
            })?;
            outputs.push(TxOutput {
                value: funding.change,
                locking_script,
            });
        }

        Ok(Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: self.lock_time,
        })
    }
}
