//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! A thread-shared wrapper around [`Consensus`], keeping a single logical
//! lock per component — mirroring `txq::handle::TxQHandle`: the engine
//! itself stays a plain `&mut self` type generic over the caller's
//! `Adaptor`, and this handle holds the mutex a multi-threaded embedding
//! would actually share.

use std::sync::{Arc, Mutex};

use ledger_core_types::{ids::LedgerId, ledger::Ledger, proposal::Proposal, txset::TxSet};

use crate::{
    adaptor::Adaptor,
    engine::{Consensus, Phase},
    error::ConsensusError,
};

/// A cloneable, `Send + Sync` handle onto a shared [`Consensus`] engine.
#[derive(Clone)]
pub struct ConsensusHandle {
    inner: Arc<Mutex<Consensus>>,
}

impl ConsensusHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Consensus::new())),
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().expect("consensus mutex poisoned").phase()
    }

    pub fn prev_ledger_id(&self) -> LedgerId {
        self.inner.lock().expect("consensus mutex poisoned").prev_ledger_id()
    }

    pub fn our_position(&self) -> Option<TxSet> {
        self.inner.lock().expect("consensus mutex poisoned").our_position().cloned()
    }

    pub fn start_round(&self, now: u64, prev_id: LedgerId, prev_ledger: Ledger, proposing: bool) {
        self.inner
            .lock()
            .expect("consensus mutex poisoned")
            .start_round(now, prev_id, prev_ledger, proposing);
    }

    pub fn timer_entry<A: Adaptor>(&self, adaptor: &mut A, now: u64) -> Result<(), ConsensusError> {
        self.inner.lock().expect("consensus mutex poisoned").timer_entry(adaptor, now)
    }

    pub fn peer_proposal<A: Adaptor>(&self, adaptor: &mut A, proposal: Proposal) -> bool {
        self.inner.lock().expect("consensus mutex poisoned").peer_proposal(adaptor, proposal)
    }

    pub fn got_tx_set<A: Adaptor>(&self, adaptor: &mut A, tx_set: TxSet) {
        self.inner.lock().expect("consensus mutex poisoned").got_tx_set(adaptor, tx_set);
    }

    pub fn simulate<A: Adaptor>(&self, adaptor: &mut A, now: u64, delay: Option<std::time::Duration>) -> Result<(), ConsensusError> {
        self.inner.lock().expect("consensus mutex poisoned").simulate(adaptor, now, delay)
    }
}

impl Default for ConsensusHandle {
    fn default() -> Self {
        Self::new()
    }
}
