//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! A thread-shared wrapper around [`ValidationStore`], mirroring
//! `txq::handle::TxQHandle` and `consensus::handle::ConsensusHandle`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use ledger_core_types::{
    ids::{LedgerId, NodeId, Seq},
    ledger::Ledger,
    validation::Validation,
};

use crate::{error::AddOutcome, parms::ValidationParms, store::{AncestryOracle, ValidationStore}};

#[derive(Clone)]
pub struct ValidationsHandle {
    inner: Arc<Mutex<ValidationStore>>,
}

impl ValidationsHandle {
    pub fn new(parms: ValidationParms) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ValidationStore::new(parms))),
        }
    }

    pub fn add(&self, node_id: NodeId, v: Validation, now: u64) -> AddOutcome {
        self.inner.lock().expect("validations mutex poisoned").add(node_id, v, now)
    }

    pub fn expire(&self, now: u64) {
        self.inner.lock().expect("validations mutex poisoned").expire(now);
    }

    pub fn flush(&self, sink: &mut Vec<Validation>) {
        self.inner.lock().expect("validations mutex poisoned").flush(sink);
    }

    pub fn trust_changed(&self, now_trusted: &HashSet<NodeId>, now_untrusted: &HashSet<NodeId>) {
        self.inner.lock().expect("validations mutex poisoned").trust_changed(now_trusted, now_untrusted);
    }

    pub fn current_trusted(&self) -> Vec<Validation> {
        self.inner.lock().expect("validations mutex poisoned").current_trusted()
    }

    pub fn num_trusted_for_ledger(&self, id: LedgerId) -> usize {
        self.inner.lock().expect("validations mutex poisoned").num_trusted_for_ledger(id)
    }

    pub fn get_trusted_for_ledger(&self, id: LedgerId) -> Vec<Validation> {
        self.inner.lock().expect("validations mutex poisoned").get_trusted_for_ledger(id)
    }

    pub fn fees(&self, id: LedgerId, base: u32) -> Vec<u32> {
        self.inner.lock().expect("validations mutex poisoned").fees(id, base)
    }

    pub fn get_nodes_after<O: AncestryOracle>(&self, ledger: &Ledger, ledger_id: LedgerId, oracle: &O) -> usize {
        self.inner.lock().expect("validations mutex poisoned").get_nodes_after(ledger, ledger_id, oracle)
    }

    pub fn get_preferred<O: AncestryOracle>(&self, curr: &Ledger, min_seq: Seq, oracle: &O) -> Option<(Seq, LedgerId)> {
        self.inner.lock().expect("validations mutex poisoned").get_preferred(curr, min_seq, oracle)
    }

    pub fn get_preferred_lcl<O: AncestryOracle>(
        &self,
        curr: &Ledger,
        min_seq: Seq,
        peer_counts: &HashMap<LedgerId, usize>,
        oracle: &O,
    ) -> LedgerId {
        self.inner.lock().expect("validations mutex poisoned").get_preferred_lcl(curr, min_seq, peer_counts, oracle)
    }
}
