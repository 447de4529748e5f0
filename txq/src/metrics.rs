//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Fee-escalation bookkeeping.

use std::collections::VecDeque;

use log::debug;

use crate::{fee::BASE_LEVEL, setup::Setup};

const LOG_TARGET: &str = "ledger_txq::metrics";

/// Bound on the recent-demand window used to smooth `txnsExpected` growth.
/// The original keeps a short rolling history (a `boost::circular_buffer`);
/// its exact capacity is not part of the distilled sources, so this core
/// picks 20 (roughly half a `ledgers_in_queue` default) — see DESIGN.md.
const RECENT_TXN_COUNTS_CAPACITY: usize = 20;

/// The immutable view of fee-escalation state consulted by `scale` and
/// exposed to `getMetrics`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FeeMetricsSnapshot {
    pub base_level: u64,
    pub minimum_txn_count: u32,
    pub target_txn_count: u32,
    pub maximum_txn_count: Option<u32>,
    pub txns_expected: u32,
    pub escalation_multiplier: u64,
}

/// Mutable fee-escalation state, updated once per closed ledger via
/// `process_closed_ledger`.
#[derive(Clone, Debug)]
pub struct FeeMetrics {
    minimum_txn_count: u32,
    target_txn_count: u32,
    maximum_txn_count: Option<u32>,
    txns_expected: u32,
    escalation_multiplier: u64,
    recent_txn_counts: VecDeque<u32>,
}

impl FeeMetrics {
    pub fn new(setup: &Setup) -> Self {
        Self {
            minimum_txn_count: setup.minimum_txn_count(),
            target_txn_count: setup.target_txn_in_ledger,
            maximum_txn_count: setup.maximum_txn_in_ledger,
            txns_expected: setup.minimum_txn_count(),
            escalation_multiplier: setup.minimum_escalation_multiplier,
            recent_txn_counts: VecDeque::with_capacity(RECENT_TXN_COUNTS_CAPACITY),
        }
    }

    pub fn snapshot(&self) -> FeeMetricsSnapshot {
        FeeMetricsSnapshot {
            base_level: BASE_LEVEL,
            minimum_txn_count: self.minimum_txn_count,
            target_txn_count: self.target_txn_count,
            maximum_txn_count: self.maximum_txn_count,
            txns_expected: self.txns_expected,
            escalation_multiplier: self.escalation_multiplier,
        }
    }

    /// Recomputes the escalation state from a just-closed ledger. `fee_levels`
    /// must already be the fee levels observed in the closed ledger (need
    /// not be sorted — this function sorts its own copy); `size` is its
    /// length. Returns the same `size` for caller convenience, mirroring the
    /// original's return value.
    pub fn update(&mut self, mut fee_levels: Vec<u64>, time_leap: bool, setup: &Setup) -> usize {
        fee_levels.sort_unstable();
        let size = fee_levels.len() as u64;

        debug!(
            target: LOG_TARGET,
            "ledger has {} transactions, processing {}, expected was {} multiplier was {}",
            size,
            if time_leap { "slowly" } else { "as expected" },
            self.txns_expected,
            self.escalation_multiplier,
        );

        if time_leap {
            let cut_pct = 100 - setup.slow_consensus_decrease_percent as u64;
            let upper_limit = std::cmp::max(
                mul_div_floor(self.txns_expected as u64, cut_pct, 100),
                self.minimum_txn_count as u64,
            );
            let candidate = mul_div_floor(size, cut_pct, 100);
            self.txns_expected = candidate.clamp(self.minimum_txn_count as u64, upper_limit) as u32;
            self.recent_txn_counts.clear();
        } else if size > self.txns_expected as u64 || size > self.target_txn_count as u64 {
            if self.recent_txn_counts.len() == RECENT_TXN_COUNTS_CAPACITY {
                self.recent_txn_counts.pop_front();
            }
            let boosted = mul_div_floor(size, 100 + setup.normal_consensus_increase_percent as u64, 100) as u32;
            self.recent_txn_counts.push_back(boosted);
            let peak = *self.recent_txn_counts.iter().max().expect("just pushed an element");
            let next = if peak as u64 >= self.txns_expected as u64 {
                peak
            } else {
                ((self.txns_expected as u64 * 9 + peak as u64) / 10) as u32
            };
            self.txns_expected = match self.maximum_txn_count {
                Some(max) => next.min(max),
                None => next,
            };
        }

        self.escalation_multiplier = if size == 0 {
            setup.minimum_escalation_multiplier
        } else {
            let mid = fee_levels[(size / 2) as usize];
            let mid_minus = fee_levels[((size - 1) / 2) as usize];
            let median = (mid + mid_minus + 1) / 2;
            std::cmp::max(median, setup.minimum_escalation_multiplier)
        };

        debug!(
            target: LOG_TARGET,
            "expected transactions updated to {}, multiplier updated to {}", self.txns_expected, self.escalation_multiplier,
        );

        size as usize
    }

    /// `maxSize ← max(txnsExpected · ledgersInQueue, queueSizeMin)`.
    pub fn max_queue_size(&self, setup: &Setup) -> u64 {
        std::cmp::max(
            self.txns_expected as u64 * setup.ledgers_in_queue as u64,
            setup.minimum_queue_size as u64,
        )
    }
}

/// The currently-required fee level given open-ledger occupancy `tx_count`
/// against the last snapshot.
pub fn scale_fee_level(snapshot: &FeeMetricsSnapshot, tx_count: u64) -> u64 {
    let target = snapshot.txns_expected as u64;
    if tx_count > target {
        mul_div_floor(
            snapshot.escalation_multiplier,
            tx_count * tx_count,
            target * target,
        )
    } else {
        snapshot.base_level
    }
}

/// `(value * numerator) / denominator`, computed in `u128` to avoid
/// intermediate overflow and floored as the original's `mulDiv` is.
pub fn mul_div_floor(value: u64, numerator: u64, denominator: u64) -> u64 {
    ((value as u128 * numerator as u128) / denominator as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_below_target_is_base_level() {
        let snapshot = FeeMetricsSnapshot {
            base_level: BASE_LEVEL,
            minimum_txn_count: 5,
            target_txn_count: 5,
            maximum_txn_count: None,
            txns_expected: 5,
            escalation_multiplier: 500,
        };
        assert_eq!(scale_fee_level(&snapshot, 5), BASE_LEVEL);
    }

    #[test]
    fn scale_above_target_is_quadratic() {
        // 10 txs, txnsExpected=5, multiplier=500 => required = 2000.
        let snapshot = FeeMetricsSnapshot {
            base_level: BASE_LEVEL,
            minimum_txn_count: 5,
            target_txn_count: 5,
            maximum_txn_count: None,
            txns_expected: 5,
            escalation_multiplier: 500,
        };
        assert_eq!(scale_fee_level(&snapshot, 10), 2000);
    }

    #[test]
    fn update_sets_escalation_multiplier_to_rounded_median() {
        let setup = Setup::default();
        let mut metrics = FeeMetrics::new(&setup);
        // Even-length: feeLevels[size/2]=300, feeLevels[(size-1)/2]=256 => (300+256+1)/2 = 278 (rounds up).
        let levels = vec![256, 300];
        metrics.update(levels, false, &setup);
        assert_eq!(metrics.snapshot().escalation_multiplier, 278.max(setup.minimum_escalation_multiplier));
    }

    #[test]
    fn time_leap_shrinks_txns_expected_and_clears_history() {
        let setup = Setup::default();
        let mut metrics = FeeMetrics::new(&setup);
        metrics.update(vec![BASE_LEVEL; 200], false, &setup);
        let before = metrics.snapshot().txns_expected;
        metrics.update(vec![BASE_LEVEL; 3], true, &setup);
        assert!(metrics.snapshot().txns_expected <= before);
        assert!(metrics.recent_txn_counts.is_empty());
    }
}
