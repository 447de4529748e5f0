//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! A thread-shared wrapper around [`TxQ`], keeping a single logical lock per
//! component. `TxQ` itself stays a plain `&mut self` synchronous type so
//! it can be driven directly in tests or single-threaded embeddings;
//! `TxQHandle` is the multi-threaded façade a node would actually hold,
//! modelled on the common `*Handle` wrapper pattern (e.g. `MempoolHandle`)
//! but backed by a held mutex rather than an actor task, since `TxQ`'s
//! `apply`/`accept` are generic over the caller's `TxEngine` and so
//! cannot be boxed behind a single non-generic request channel the way
//! `MempoolHandle` boxes `Transaction`.

use std::sync::{Arc, Mutex};

use ledger_core_types::{ids::Seq, ter::Ter, tx::Tx};

use crate::{
    adaptor::{ApplyFlags, MutableLedgerView, TxEngine},
    queue::{TxQMetrics, TxQ},
    setup::Setup,
};

/// A cloneable, `Send + Sync` handle onto a shared [`TxQ`]. Every method
/// acquires the queue's lock for the duration of the call; callers must not
/// assume atomicity across multiple handle calls.
#[derive(Clone)]
pub struct TxQHandle {
    inner: Arc<Mutex<TxQ>>,
}

impl TxQHandle {
    pub fn new(setup: Setup) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TxQ::new(setup))),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("txq mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("txq mutex poisoned").is_empty()
    }

    pub fn get_metrics<V: crate::adaptor::LedgerView>(&self, view: &V) -> TxQMetrics {
        self.inner.lock().expect("txq mutex poisoned").get_metrics(view)
    }

    pub fn process_closed_ledger(&self, closed_fee_levels: Vec<u64>, time_leap: bool, ledger_seq: Seq) {
        self.inner
            .lock()
            .expect("txq mutex poisoned")
            .process_closed_ledger(closed_fee_levels, time_leap, ledger_seq);
    }

    pub fn apply<E: TxEngine>(&self, engine: &E, view: &mut E::View, tx: Tx, flags: ApplyFlags) -> (Ter, bool) {
        self.inner.lock().expect("txq mutex poisoned").apply(engine, view, tx, flags)
    }

    pub fn accept<V: MutableLedgerView, E: TxEngine<View = V>>(&self, view: &mut V) -> bool {
        self.inner.lock().expect("txq mutex poisoned").accept::<E>(view)
    }
}
