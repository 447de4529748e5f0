//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `updateOurPositions`: re-evaluate every open dispute against the round's
//! `convergePercent`, rebuild and re-broadcast our position if any vote
//! flipped, and recompute the weighted close-time consensus.

use std::collections::BTreeSet;
use std::time::Duration;

use log::debug;

use ledger_core_types::proposal::Proposal;

use crate::adaptor::Adaptor;
use crate::close_time::converge_percent;

use super::Consensus;

const LOG_TARGET: &str = "ledger_consensus::engine::update_positions";

impl Consensus {
    /// Drop peer proposals whose `sign_time` has aged out of
    /// `propose_freshness`. Unlike a bow-out, a stale node is not added to
    /// `dead_nodes` — a fresh proposal from it is still welcome.
    fn prune_stale_positions<A: Adaptor>(&mut self, adaptor: &A, now: u64) {
        let freshness = adaptor.parms().propose_freshness.as_secs();
        self.round.peer_positions.retain(|_, proposal| now.saturating_sub(proposal.sign_time) <= freshness);
    }

    /// `updateOurPositions(adaptor, now)`.
    pub fn update_our_positions<A: Adaptor>(&mut self, adaptor: &mut A, now: u64) {
        self.prune_stale_positions(adaptor, now);

        let round_time = Duration::from_secs(now.saturating_sub(self.round.round_start));
        let pct = converge_percent(round_time, self.prev_round_time, adaptor.parms());
        self.convergence_percent = pct;
        let proposing = self.round.mode.is_proposing();

        let mut flipped = Vec::new();
        for (tx_id, dispute) in self.round.disputes.iter_mut() {
            if dispute.update_vote(pct, proposing, adaptor.parms()) {
                flipped.push(*tx_id);
            }
        }

        if !flipped.is_empty() {
            self.rebuild_our_position(adaptor, now, &flipped);
        }

        self.update_close_time_consensus(adaptor);
    }

    fn rebuild_our_position<A: Adaptor>(&mut self, adaptor: &mut A, now: u64, flipped: &[ledger_core_types::ids::TxId]) {
        let Some(current) = self.round.our_position.clone() else {
            return;
        };
        let mut members: BTreeSet<_> = current.iter().copied().collect();
        for tx_id in flipped {
            let Some(dispute) = self.round.disputes.get(tx_id) else {
                continue;
            };
            if dispute.our_vote() {
                members.insert(*tx_id);
            } else {
                members.remove(tx_id);
            }
        }

        let new_position = adaptor.rebuild_position(members);
        debug!(target: LOG_TARGET, "rebuilt our position as {} ({} members)", new_position.id(), new_position.len());
        self.round.acquired.insert(new_position.id(), new_position.clone());
        self.round.our_position = Some(new_position.clone());

        if self.round.mode.is_proposing() {
            self.round.our_propose_seq += 1;
            let proposal = Proposal {
                node_id: adaptor.validator(),
                prev_ledger_id: self.round.prev_ledger_id,
                position: new_position.id(),
                close_time: self.round.close_time,
                propose_seq: self.round.our_propose_seq,
                sign_time: now,
            };
            adaptor.propose(proposal);
        }
    }

    /// Weighted plurality over `close_time_votes`: the close time with the
    /// most votes wins; ties favour the later timestamp, the way
    /// `effCloseTime`'s tie-break prefers the larger value. Rounded to
    /// `close_time_resolution` when `use_rounded_close_time` is set.
    fn update_close_time_consensus<A: Adaptor>(&mut self, adaptor: &A) {
        if self.round.close_time_votes.is_empty() {
            return;
        }
        let (&best_time, _) = self
            .round
            .close_time_votes
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)))
            .expect("checked non-empty above");

        let resolved = if adaptor.parms().use_rounded_close_time {
            let res = self.round.prev_ledger.close_time_resolution.as_secs().max(1);
            ((best_time + res / 2) / res) * res
        } else {
            best_time
        };
        self.round.consensus_close_time = Some(resolved);
    }
}
