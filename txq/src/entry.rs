//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Queued entries modelled as an arena addressed by opaque `EntryId`s, with
//! two index structures (`byAccount`, `byFee`) pointing at the same arena
//! slots — a `BTreeMap`/`BTreeSet` pair standing in for a multi-index
//! container.

use ledger_core_types::{
    ids::{AccountId, Seq, TxId},
    ter::Ter,
    tx::{Drops, Tx, TxCategory},
};

use crate::adaptor::{ApplyFlags, PreflightResult};

/// Opaque handle into the entry arena. Never exposed across a lock boundary
/// on its own — callers always get an owned snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub(crate) u64);

/// Monotonically increasing insertion counter, used as the `byFee`
/// tie-break for equal fee levels (insertion order).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InsertionSeq(pub(crate) u64);

/// One arena slot; `byAccount` and `byFee` are separate index structures
/// over `EntryId`s pointing back at slots of this type.
#[derive(Clone, Debug)]
pub struct MaybeTx {
    pub tx: Tx,
    pub tx_id: TxId,
    pub fee_level: u64,
    pub account: AccountId,
    pub sequence: Seq,
    pub last_valid: Option<Seq>,
    pub prior_tx_id: Option<TxId>,
    pub category: TxCategory,
    pub potential_spend: Drops,
    pub retries_remaining: u32,
    pub last_result: Option<Ter>,
    pub flags: ApplyFlags,
    pub pfresult: PreflightResult,
    pub(crate) insertion_seq: InsertionSeq,
}

/// Number of retries granted to a freshly-queued entry before it is dropped
/// for retry exhaustion.
pub const RETRIES_ALLOWED: u32 = 10;

impl MaybeTx {
    /// Caps future retries at 1, used once an account has already incurred
    /// an eviction penalty this ledger.
    pub fn apply_retry_penalty(&mut self) {
        self.retries_remaining = self.retries_remaining.min(1);
    }
}
