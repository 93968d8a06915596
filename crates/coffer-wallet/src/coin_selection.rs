//! Coin selection strategies.
//!
//! A [`CoinSelector`] receives every spendable candidate and the amount the
//! transaction must cover, and returns the subset to spend. Selectors are
//! advisory: they never mark anything spent, and they do not decide whether
//! the result is sufficient. The builder compares the selected total with
//! the target and reports insufficient funds itself.

use serde::{Deserialize, Serialize};

use coffer_core::types::UnspentOutput;

/// Pluggable coin-selection policy.
pub trait CoinSelector: Send + Sync {
    /// Choose which of `candidates` to spend towards `target`.
    ///
    /// The returned order becomes the transaction's input order. When the
    /// candidates cannot reach `target` a selector returns whatever it can,
    /// possibly nothing.
    fn select(&self, candidates: Vec<UnspentOutput>, target: u64) -> Vec<UnspentOutput>;

    fn name(&self) -> &'static str;
}

/// Spend every candidate, in the order given.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectAll;

impl CoinSelector for SelectAll {
    fn select(&self, candidates: Vec<UnspentOutput>, _target: u64) -> Vec<UnspentOutput> {
        candidates
    }

    fn name(&self) -> &'static str {
        "select-all"
    }
}

/// Largest outputs first, stopping once `target` is covered.
///
/// Minimises input count.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestFirst;

impl CoinSelector for LargestFirst {
    fn select(&self, mut candidates: Vec<UnspentOutput>, target: u64) -> Vec<UnspentOutput> {
        candidates.sort_by(|a, b| b.value.cmp(&a.value));
        accumulate(candidates, target)
    }

    fn name(&self) -> &'static str {
        "largest-first"
    }
}

/// Smallest outputs first, stopping once `target` is covered.
///
/// Consolidates dust at the cost of more inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmallestFirst;

impl CoinSelector for SmallestFirst {
    fn select(&self, mut candidates: Vec<UnspentOutput>, target: u64) -> Vec<UnspentOutput> {
        candidates.sort_by(|a, b| a.value.cmp(&b.value));
        accumulate(candidates, target)
    }

    fn name(&self) -> &'static str {
        "smallest-first"
    }
}

/// Take outputs in order until their sum reaches `target`.
fn accumulate(candidates: Vec<UnspentOutput>, target: u64) -> Vec<UnspentOutput> {
    let mut total: u64 = 0;
    let mut selected = Vec::new();
    for utxo in candidates {
        if total >= target && !selected.is_empty() {
            break;
        }
        total = total.saturating_add(utxo.value);
        selected.push(utxo);
    }
    selected
}

/// Named selection strategy, as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    #[default]
    SelectAll,
    LargestFirst,
    SmallestFirst,
}

impl SelectionStrategy {
    pub fn selector(self) -> Box<dyn CoinSelector> {
        match self {
            SelectionStrategy::SelectAll => Box::new(SelectAll),
            SelectionStrategy::LargestFirst => Box::new(LargestFirst),
            SelectionStrategy::SmallestFirst => Box::new(SmallestFirst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::address::{Address, Network};
    use coffer_core::script::Script;
    use coffer_core::types::{Hash256, OutPoint};

    fn utxo(value: u64, index: u64) -> UnspentOutput {
        let owner = Address::from_pubkey_hash(Hash256([0x42; 32]), Network::Testnet);
        UnspentOutput {
            outpoint: OutPoint {
                txid: Hash256([index as u8; 32]),
                index,
            },
            value,
            locking_script: Script::pay_to_address(&owner),
            owner,
            spent_by: None,
            confirmed: true,
        }
    }

    fn values(selected: &[UnspentOutput]) -> Vec<u64> {
        selected.iter().map(|u| u.value).collect()
    }

    #[test]
    fn select_all_returns_everything_in_order() {
        let candidates = vec![utxo(300, 0), utxo(100, 1), utxo(200, 2)];
        let selected = SelectAll.select(candidates.clone(), 1);
        assert_eq!(selected, candidates);
    }

    #[test]
    fn select_all_empty() {
        assert!(SelectAll.select(vec![], 1000).is_empty());
    }

    #[test]
    fn largest_first_stops_at_target() {
        let candidates = vec![utxo(100, 0), utxo(500, 1), utxo(300, 2)];
        assert_eq!(values(&LargestFirst.select(candidates, 700)), vec![500, 300]);
    }

    #[test]
    fn smallest_first_stops_at_target() {
        let candidates = vec![utxo(500, 0), utxo(100, 1), utxo(300, 2)];
        assert_eq!(values(&SmallestFirst.select(candidates, 350)), vec![100, 300]);
    }

    #[test]
    fn unreachable_target_returns_all() {
        let candidates = vec![utxo(100, 0), utxo(200, 1)];
        assert_eq!(values(&LargestFirst.select(candidates.clone(), 10_000)), vec![200, 100]);
        assert_eq!(values(&SmallestFirst.select(candidates, 10_000)), vec![100, 200]);
    }

    #[test]
    fn zero_target_still_picks_one() {
        let candidates = vec![utxo(100, 0), utxo(200, 1)];
        assert_eq!(LargestFirst.select(candidates, 0).len(), 1);
    }

    #[test]
    fn strategy_builds_matching_selector() {
        assert_eq!(SelectionStrategy::default().selector().name(), "select-all");
        assert_eq!(SelectionStrategy::LargestFirst.selector().name(), "largest-first");
        assert_eq!(SelectionStrategy::SmallestFirst.selector().name(), "smallest-first");
    }

    #[test]
    fn strategy_serde_kebab_case() {
        let s: SelectionStrategy = serde_json::from_str("\"largest-first\"").unwrap();
        assert_eq!(s, SelectionStrategy::LargestFirst);
        assert_eq!(
            serde_json::to_string(&SelectionStrategy::SelectAll).unwrap(),
            "\"select-all\""
        );
    }
}
