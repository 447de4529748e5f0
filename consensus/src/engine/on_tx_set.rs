//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `gotTxSet`: a previously requested `TxSet` arrives (pushed by a peer, or
//! resolved by the adaptor's async acquisition).

use log::debug;

use ledger_core_types::txset::TxSet;

use crate::adaptor::Adaptor;

use super::Consensus;

const LOG_TARGET: &str = "ledger_consensus::engine::tx_set";

impl Consensus {
    /// Record an acquired `TxSet` and update every peer position that
    /// references it.
    pub fn got_tx_set<A: Adaptor>(&mut self, adaptor: &mut A, tx_set: TxSet) {
        let id = tx_set.id();
        debug!(target: LOG_TARGET, "acquired tx set {}", id);
        self.round.acquired.insert(id, tx_set.clone());

        let nodes: Vec<_> = self
            .round
            .peer_positions
            .iter()
            .filter(|(_, proposal)| proposal.position == id)
            .map(|(node, _)| *node)
            .collect();

        for node in nodes {
            self.update_disputes(adaptor, node, &tx_set);
        }
    }
}
