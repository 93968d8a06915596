//! Property tests for value conservation in wallet-built transactions.
//!
//! For random unspent output sets, payment lists, fees and selection
//! strategies:
//! - a built transaction spends exactly what it pays out plus the fee
//! - the change output appears iff there is change, and is always last
//! - no transaction is produced iff the wallet cannot cover payments + fee
//! - inputs are distinct wallet outputs
//! - `balance` always equals the sum of unspent outputs

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use coffer_core::types::OutPoint;
use coffer_tests::helpers::*;
use coffer_wallet::{ChangePolicy, PaymentRequest, SelectionStrategy, WalletConfig};

fn strategy() -> impl Strategy<Value = SelectionStrategy> {
    prop_oneof![
        Just(SelectionStrategy::SelectAll),
        Just(SelectionStrategy::LargestFirst),
        Just(SelectionStrategy::SmallestFirst),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn built_transactions_conserve_value(
        utxo_values in prop::collection::vec(1u64..1_000_000, 0..12),
        payment_values in prop::collection::vec(1u64..2_000_000, 1..4),
        fee in 0u64..10_000,
        selection in strategy(),
    ) {
        let config = WalletConfig { selection, ..WalletConfig::default() };
        let (wallet, ledger) = wallet_with_config(2, config);
        let addrs = wallet.addrs().unwrap();

        let mut values_by_outpoint: HashMap<OutPoint, u64> = HashMap::new();
        for (i, value) in utxo_values.iter().enumerate() {
            let owner = &addrs[i % addrs.len()];
            let op = fund(&ledger, owner, *value, i as u64);
            values_by_outpoint.insert(op, *value);
        }

        let available: u64 = utxo_values.iter().sum();
        let requested: u64 = payment_values.iter().sum();
        let payments: Vec<PaymentRequest> = payment_values
            .iter()
            .map(|v| PaymentRequest::single(addr(200), *v))
            .collect();

        let result = wallet.tx(payments, fee, ChangePolicy::UseDefault).unwrap();
        match result {
            None => prop_assert!(available < requested + fee),
            Some(tx) => {
                prop_assert!(available >= requested + fee);

                let mut seen = HashSet::new();
                let mut spent: u64 = 0;
                for input in &tx.inputs {
                    prop_assert!(seen.insert(input.previous_output.clone()), "duplicate input");
                    spent += values_by_outpoint[&input.previous_output];
                }
                let paid_out = tx.total_output_value().unwrap();
                prop_assert_eq!(spent, paid_out + fee);

                let change = spent - requested - fee;
                let expected_outputs = payment_values.len() + usize::from(change > 0);
                prop_assert_eq!(tx.outputs.len(), expected_outputs);
                for (out, value) in tx.outputs.iter().zip(&payment_values) {
                    prop_assert_eq!(out.value, *value);
                }
                if change > 0 {
                    prop_assert_eq!(tx.outputs.last().unwrap().value, change);
                }
            }
        }
    }

    #[test]
    fn balance_matches_unspent_sum(
        utxo_values in prop::collection::vec(1u64..1_000_000, 1..12),
        spend_mask in prop::collection::vec(any::<bool>(), 12),
    ) {
        let (wallet, ledger) = wallet_with_keys(1);
        let a = wallet.addrs().unwrap()[0].clone();

        let mut expected: u64 = 0;
        for (i, value) in utxo_values.iter().enumerate() {
            let op = fund(&ledger, &a, *value, i as u64);
            if spend_mask[i] {
                ledger
                    .apply_transaction(&spend_tx(vec![op], vec![(*value, addr(200))]), true)
                    .unwrap();
            } else {
                expected += value;
            }
        }

        prop_assert_eq!(wallet.balance(&a).unwrap(), expected);
        prop_assert_eq!(wallet.list().unwrap()[0].1, expected);
    }
}
