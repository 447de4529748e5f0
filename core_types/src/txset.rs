//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{TxId, TxSetId};

/// A content-hashed set of transaction identifiers.
///
/// Membership is all this crate models; encoding the underlying merkle
/// structure that produces `TxSetId` on the wire is owned by the storage/
/// codec subsystem. `id` is therefore supplied by the caller (whoever built
/// the set) rather than computed here — this type trusts its constructor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSet {
    id: TxSetId,
    members: BTreeSet<TxId>,
}

/// Outcome of comparing two `TxSet`s: for every `TxId` that differs between
/// them, whether it is present only on the left-hand side.
pub type TxSetDiff = std::collections::BTreeMap<TxId, bool>;

impl TxSet {
    pub fn new(id: TxSetId, members: BTreeSet<TxId>) -> Self {
        Self { id, members }
    }

    pub fn id(&self) -> TxSetId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, tx: &TxId) -> bool {
        self.members.contains(tx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxId> {
        self.members.iter()
    }

    /// Maps every `TxId` that differs between `self` and `other` to whether
    /// it is present only on `self`'s side.
    pub fn compare(&self, other: &TxSet) -> TxSetDiff {
        let mut diff = TxSetDiff::new();
        for id in self.members.symmetric_difference(&other.members) {
            diff.insert(*id, self.members.contains(id));
        }
        diff
    }
}
