//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Per-node `SeqEnforcer`: forbids a node's validations from reusing or
//! moving backward in `seq` within `validationSET_EXPIRES` of its last
//! accepted sequence.

use ledger_core_types::ids::Seq;

/// Tracks one node's most recently accepted validation sequence/time.
#[derive(Clone, Debug, Default)]
pub struct SeqEnforcer {
    last_seq: Option<Seq>,
    last_close_time: u64,
}

impl SeqEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `seq` is acceptable at `now` and records it as the
    /// new high-water mark. `set_expires_secs` bounds how long the
    /// monotonicity rule is enforced since the last accepted sequence —
    /// beyond that window, a node may legitimately restart validating after
    /// reusing a seq, so the rule is not enforced across that gap.
    pub fn advance(&mut self, seq: Seq, now: u64, set_expires_secs: u64) -> bool {
        if let Some(last) = self.last_seq {
            let within_window = now.saturating_sub(self.last_close_time) <= set_expires_secs;
            if within_window && seq <= last {
                return false;
            }
        }
        self.last_seq = Some(seq);
        self.last_close_time = now;
        true
    }
}
