//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

/// Recognized `TxQ` configuration options and their defaults, built once by
/// the embedding node as a named preset rather than parsed from a config
/// file.
#[derive(Clone, Debug)]
pub struct Setup {
    /// Multiplier for `maxSize` against `txnsExpected`.
    pub ledgers_in_queue: u32,
    /// Floor for `maxSize`.
    pub minimum_queue_size: u32,
    /// Replacement premium, in percent (default 25).
    pub retry_sequence_percent: u32,
    /// Premium for queueing behind a predecessor, in percent (default 25).
    pub multi_txn_percent: u32,
    /// Floor for the escalation multiplier.
    pub minimum_escalation_multiplier: u64,
    pub minimum_txn_in_ledger: u32,
    pub minimum_txn_in_ledger_standalone: u32,
    pub target_txn_in_ledger: u32,
    pub maximum_txn_in_ledger: Option<u32>,
    /// Growth on pressure, in percent, clamped to `[0, 1000]`.
    pub normal_consensus_increase_percent: u32,
    /// Shrink on time-leap, in percent, clamped to `[0, 100]`.
    pub slow_consensus_decrease_percent: u32,
    pub maximum_txn_per_account: u32,
    /// `LastLedgerSequence` must leave this much slack past the current view.
    pub minimum_last_ledger_buffer: u32,
    /// Sentinel fee level used when the reference fee is zero.
    pub zero_basefee_transaction_feelevel: u64,
    pub standalone: bool,
}

impl Setup {
    /// Clamp the user-supplied percentages into their documented ranges;
    /// called once at construction so the rest of the engine can trust the
    /// stored values without re-checking them on every access.
    pub fn clamped(mut self) -> Self {
        self.normal_consensus_increase_percent = self.normal_consensus_increase_percent.min(1000);
        self.slow_consensus_decrease_percent = self.slow_consensus_decrease_percent.min(100);
        self
    }

    pub fn minimum_txn_count(&self) -> u32 {
        if self.standalone {
            self.minimum_txn_in_ledger_standalone
        } else {
            self.minimum_txn_in_ledger
        }
    }
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            ledgers_in_queue: 20,
            minimum_queue_size: 2000,
            retry_sequence_percent: 25,
            multi_txn_percent: 25,
            minimum_escalation_multiplier: 500,
            minimum_txn_in_ledger: 5,
            minimum_txn_in_ledger_standalone: 1000,
            target_txn_in_ledger: 50,
            maximum_txn_in_ledger: None,
            normal_consensus_increase_percent: 20,
            slow_consensus_decrease_percent: 50,
            maximum_txn_per_account: 10,
            minimum_last_ledger_buffer: 2,
            zero_basefee_transaction_feelevel: 256_000,
            standalone: false,
        }
        .clamped()
    }
}
