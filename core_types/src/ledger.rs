//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ids::{LedgerId, Seq};

/// An immutable snapshot of account/state at a given height.
///
/// This is the engine-level view of a ledger: enough to decide ancestry and
/// close-time agreement. The account/state trie itself (SHAMap) is owned by
/// the storage subsystem and is not modelled here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub id: LedgerId,
    pub seq: Seq,
    pub parent_id: LedgerId,
    pub parent_close_time: u64,
    pub close_time: u64,
    pub close_time_resolution: Duration,
    /// True once this ledger's close time has been agreed by consensus
    /// (as opposed to assigned unilaterally, e.g. during a wrong-ledger jump).
    pub close_agree: bool,
}

impl Ledger {
    pub fn genesis(close_time_resolution: Duration) -> Self {
        Self {
            id: LedgerId::genesis(),
            seq: Seq::zero(),
            parent_id: LedgerId::genesis(),
            parent_close_time: 0,
            close_time: 0,
            close_time_resolution,
            close_agree: true,
        }
    }

    /// Whether `self` is the direct parent of `other`. Since this crate
    /// holds no ledger storage, ancestry beyond direct parentage is the
    /// caller's concern; we expose the one decidable local fact directly.
    pub fn is_parent_of(&self, other: &Ledger) -> bool {
        other.parent_id == self.id && other.seq == self.seq.next()
    }
}
