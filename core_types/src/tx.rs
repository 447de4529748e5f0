//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, Seq, TxId};

/// Classification of a transaction's effect on the accounts that can be
/// queued behind it.
///
/// A `Blocker` forbids queuing unrelated successors for the same account
/// (e.g. a SetRegularKey or a full account-sequence-consuming operation);
/// a `Normal` transaction does not.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxCategory {
    Normal,
    Blocker,
}

/// Fee, in base drops (the ledger's smallest fee unit).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Drops(pub u64);

impl Drops {
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl std::ops::Add for Drops {
    type Output = Drops;

    fn add(self, rhs: Self) -> Self::Output {
        Drops(self.0.saturating_add(rhs.0))
    }
}

/// A client transaction as seen by the core. Transaction *semantics*
/// (payment pathfinding, offer crossing, signature checks) are opaque; the
/// core only ever invokes `preflight`/`preclaim`/`doApply` on them via the
/// `TxEngine` collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub id: TxId,
    pub account: AccountId,
    pub sequence: Seq,
    pub fee: Drops,
    pub last_ledger_sequence: Option<Seq>,
    /// Links this transaction to the account's previously-applied
    /// transaction, if the account requires strict chaining.
    pub account_txn_id: Option<TxId>,
    pub category: TxCategory,
    /// Upper bound on the balance this transaction could consume, used by
    /// the multi-transaction admission check to ensure a chain of queued
    /// transactions for one account cannot collectively overspend.
    pub potential_spend: Drops,
}

/// Result of the collaborator's `calculateConsequences`: the queue-relevant
/// summary of a transaction that has already passed preflight.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxConsequences {
    pub category: TxCategory,
    pub fee: Drops,
    pub potential_spend: Drops,
}
