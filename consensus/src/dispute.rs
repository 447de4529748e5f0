//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `Dispute`: per-`TxId` vote tracking for the current round. One dispute
//! exists for every transaction that at least one participant (including
//! us) wants in the final `TxSet` but that is not unanimous.

use std::collections::HashMap;

use ledger_core_types::{ids::NodeId, tx::Tx};

use crate::constants::ConsensusParms;

/// A single transaction's disputed status for the round. Tracks our own
/// vote alongside each peer's observed vote.
#[derive(Clone, Debug)]
pub struct Dispute {
    tx: Tx,
    our_vote: bool,
    votes: HashMap<NodeId, bool>,
}

impl Dispute {
    pub fn new(tx: Tx, our_vote: bool) -> Self {
        Self {
            tx,
            our_vote,
            votes: HashMap::new(),
        }
    }

    pub fn tx(&self) -> &Tx {
        &self.tx
    }

    pub fn our_vote(&self) -> bool {
        self.our_vote
    }

    /// Record (or overwrite) `node`'s vote on this transaction, as observed
    /// from its current `TxSet` position.
    pub fn set_vote(&mut self, node: NodeId, included: bool) {
        self.votes.insert(node, included);
    }

    /// Retract `node`'s vote — used when a peer bows out or its proposal
    /// goes stale.
    pub fn unset_vote(&mut self, node: &NodeId) {
        self.votes.remove(node);
    }

    fn agree_percent(&self) -> u32 {
        if self.votes.is_empty() {
            return 0;
        }
        let yes = self.votes.values().filter(|&&v| v).count();
        ((yes * 100) / self.votes.len()) as u32
    }

    /// `updateVote(convergePercent, proposing, parms)`: the yes-threshold
    /// rises as `convergePercent` (the round's elapsed time relative to the
    /// previous round's duration) advances past `av_mid_converge_pct` →
    /// `av_late_converge_pct` → `av_stuck_converge_pct`. Returns whether our
    /// vote flipped, so the caller knows whether the position needs to be
    /// rebuilt and re-broadcast.
    ///
    /// When we are not proposing (witnessing only), we never flip our own
    /// vote — there is nothing to broadcast, and the original only applies
    /// this escalation to a node that is actively proposing.
    pub fn update_vote(&mut self, converge_percent: u32, proposing: bool, parms: &ConsensusParms) -> bool {
        if !proposing {
            return false;
        }

        let threshold = if converge_percent < parms.av_mid_converge_pct {
            parms.av_init_consensus_pct
        } else if converge_percent < parms.av_late_converge_pct {
            parms.av_mid_consensus_pct
        } else if converge_percent < parms.av_stuck_converge_pct {
            parms.av_late_consensus_pct
        } else {
            parms.av_stuck_consensus_pct
        };

        let new_vote = self.agree_percent() >= threshold;
        let changed = new_vote != self.our_vote;
        self.our_vote = new_vote;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core_types::{
        ids::{AccountId, Seq, TxId},
        tx::{Drops, TxCategory},
    };

    fn tx() -> Tx {
        Tx {
            id: TxId([1; 32]),
            account: AccountId([1; 20]),
            sequence: Seq(1),
            fee: Drops(10),
            last_ledger_sequence: None,
            account_txn_id: None,
            category: TxCategory::Normal,
            potential_spend: Drops::zero(),
        }
    }

    #[test]
    fn non_proposing_node_never_flips_its_vote() {
        let mut dispute = Dispute::new(tx(), true);
        dispute.set_vote(NodeId([2; 32]), false);
        dispute.set_vote(NodeId([3; 32]), false);
        let changed = dispute.update_vote(200, false, &ConsensusParms::default());
        assert!(!changed);
        assert!(dispute.our_vote());
    }

    #[test]
    fn early_round_uses_the_init_threshold() {
        let mut dispute = Dispute::new(tx(), true);
        // 1 of 3 votes yes (33%) - below the 50% init threshold.
        dispute.set_vote(NodeId([2; 32]), false);
        dispute.set_vote(NodeId([3; 32]), false);
        dispute.set_vote(NodeId([4; 32]), true);
        let changed = dispute.update_vote(10, true, &ConsensusParms::default());
        assert!(changed);
        assert!(!dispute.our_vote());
    }

    #[test]
    fn stuck_threshold_accepts_a_lower_agreement_than_mid_round() {
        // 66% agree: clears av_mid_consensus_pct (65) but not
        // av_late_consensus_pct (70). Below av_late_converge_pct it's a yes;
        // at or beyond it the same tally is a no.
        let mut dispute = Dispute::new(tx(), false);
        dispute.set_vote(NodeId([2; 32]), true);
        dispute.set_vote(NodeId([3; 32]), true);
        dispute.set_vote(NodeId([4; 32]), false);

        let parms = ConsensusParms::default();
        assert!(dispute.update_vote(parms.av_mid_converge_pct, true, &parms));
        assert!(dispute.our_vote());

        assert!(dispute.update_vote(parms.av_late_converge_pct, true, &parms));
        assert!(!dispute.our_vote());
    }

    #[test]
    fn unset_vote_removes_a_retracted_peer() {
        let mut dispute = Dispute::new(tx(), false);
        let peer = NodeId([2; 32]);
        dispute.set_vote(peer, true);
        dispute.unset_vote(&peer);
        assert_eq!(dispute.agree_percent(), 0);
    }
}
