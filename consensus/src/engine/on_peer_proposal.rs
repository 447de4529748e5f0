//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `peerProposal`: ingest an inbound proposal from a peer and update
//! dispute votes accordingly.

use log::{debug, trace};

use ledger_core_types::ids::NodeId;
use ledger_core_types::proposal::Proposal;
use ledger_core_types::txset::TxSet;

use crate::adaptor::Adaptor;

use super::Consensus;

const LOG_TARGET: &str = "ledger_consensus::engine::peer_proposal";

impl Consensus {
    /// Process an inbound `Proposal` from a peer. Returns `true` if the
    /// proposal was accepted (stored or caused a bow-out), `false` if it was
    /// discarded.
    pub fn peer_proposal<A: Adaptor>(&mut self, adaptor: &mut A, new_proposal: Proposal) -> bool {
        // Wrong round entirely: silently discard.
        if new_proposal.prev_ledger_id != self.round.prev_ledger_id {
            trace!(target: LOG_TARGET, "discarding proposal for {} (we are on {})", new_proposal.prev_ledger_id, self.round.prev_ledger_id);
            return false;
        }

        // A node we have already declared dead this round is not heard from again.
        if self.round.dead_nodes.contains(&new_proposal.node_id) {
            trace!(target: LOG_TARGET, "discarding proposal from dead node {}", new_proposal.node_id);
            return false;
        }

        // Stale `proposeSeq`: a strictly newer proposal from this node has
        // already superseded it.
        if let Some(stored) = self.round.peer_positions.get(&new_proposal.node_id) {
            if !new_proposal.supersedes(stored) {
                trace!(target: LOG_TARGET, "discarding stale proposal from {}", new_proposal.node_id);
                return false;
            }
        }

        if new_proposal.is_bow_out() {
            debug!(target: LOG_TARGET, "node {} is bowing out", new_proposal.node_id);
            self.round.peer_positions.remove(&new_proposal.node_id);
            self.round.dead_nodes.insert(new_proposal.node_id);
            for dispute in self.round.disputes.values_mut() {
                dispute.unset_vote(&new_proposal.node_id);
            }
            return true;
        }

        if new_proposal.is_initial() {
            *self.round.close_time_votes.entry(new_proposal.close_time).or_insert(0) += 1;
        }

        self.round.peer_positions.insert(new_proposal.node_id, new_proposal);

        if let Some(tx_set) = self.acquire_tx_set(adaptor, new_proposal.position) {
            self.update_disputes(adaptor, new_proposal.node_id, &tx_set);
        } else {
            trace!(target: LOG_TARGET, "tx set {} not yet acquired, deferring dispute update", new_proposal.position);
        }

        true
    }

    /// Record `node`'s vote on every existing `Dispute`, and open new ones
    /// for transactions `their_set` disagrees with us about that we have not
    /// seen disputed before.
    pub(crate) fn update_disputes<A: Adaptor>(&mut self, adaptor: &mut A, node: NodeId, their_set: &TxSet) {
        let Some(our_position) = self.round.our_position.clone() else {
            return;
        };

        for tx_id in our_position.iter() {
            let included = their_set.contains(tx_id);
            if included {
                continue;
            }
            let dispute = match self.round.disputes.get_mut(tx_id) {
                Some(d) => d,
                None => {
                    let Some(tx) = adaptor.resolve_tx(*tx_id) else {
                        continue;
                    };
                    self.round.disputes.entry(*tx_id).or_insert_with(|| crate::dispute::Dispute::new(tx, true))
                },
            };
            dispute.set_vote(node, included);
        }

        for tx_id in their_set.iter() {
            if our_position.contains(tx_id) {
                continue;
            }
            let dispute = match self.round.disputes.get_mut(tx_id) {
                Some(d) => d,
                None => {
                    let Some(tx) = adaptor.resolve_tx(*tx_id) else {
                        continue;
                    };
                    self.round.disputes.entry(*tx_id).or_insert_with(|| crate::dispute::Dispute::new(tx, false))
                },
            };
            dispute.set_vote(node, true);
        }
    }
}
