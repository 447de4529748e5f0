//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

use crate::ids::{LedgerId, NodeId, TxSetId};

/// The terminal `proposeSeq` value marking a bow-out proposal. Chosen as
/// `u32::MAX` so any honest `proposeSeq` sequence (which starts at 0 and
/// increments) can never collide with it.
pub const SEQ_LEAVE: u32 = u32::MAX;

/// A node's current intended `TxSet` and close time for the round.
///
/// `propose_seq == 0` marks the node's *initial* position for the round;
/// `propose_seq == SEQ_LEAVE` marks a bow-out. Proposals from the same node
/// supersede strictly by `propose_seq`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub node_id: NodeId,
    pub prev_ledger_id: LedgerId,
    pub position: TxSetId,
    pub close_time: u64,
    pub propose_seq: u32,
    pub sign_time: u64,
}

impl Proposal {
    pub fn is_initial(&self) -> bool {
        self.propose_seq == 0
    }

    pub fn is_bow_out(&self) -> bool {
        self.propose_seq == SEQ_LEAVE
    }

    /// Whether `self` should supersede `stored` for the same node: strictly
    /// greater `propose_seq`, or a bow-out (which always supersedes since it
    /// is the terminal sequence number).
    pub fn supersedes(&self, stored: &Proposal) -> bool {
        self.propose_seq > stored.propose_seq
    }
}
