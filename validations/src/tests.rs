//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use std::collections::HashMap;
use std::time::Duration;

use ledger_core_types::ids::{LedgerId, NodeId, Seq};
use ledger_core_types::ledger::Ledger;

use crate::{error::AddOutcome, parms::ValidationParms, store::ValidationStore};

fn node(n: u8) -> NodeId {
    NodeId([n; 32])
}

fn ledger(n: u8) -> LedgerId {
    LedgerId([n; 32])
}

/// A minimal `Ledger` at `(id, seq)`, enough to exercise `get_preferred`'s
/// curr-relative logic without a real account/state trie.
fn ledger_ref(id: LedgerId, seq: u32) -> Ledger {
    Ledger {
        id,
        seq: Seq(seq),
        parent_id: LedgerId::genesis(),
        parent_close_time: 0,
        close_time: 0,
        close_time_resolution: Duration::from_secs(10),
        close_agree: true,
    }
}

/// A small in-memory ledger genealogy, resolving `ancestor(id, target_seq)`
/// by walking recorded parent links — the test double for `AncestryOracle`.
#[derive(Default)]
struct History(HashMap<LedgerId, (Seq, LedgerId)>);

impl History {
    fn record(&mut self, id: LedgerId, seq: u32, parent: LedgerId) {
        self.0.insert(id, (Seq(seq), parent));
    }

    fn ancestor(&self, id: LedgerId, target_seq: Seq) -> Option<LedgerId> {
        let mut current = id;
        loop {
            let (seq, parent) = *self.0.get(&current)?;
            if seq == target_seq {
                return Some(current);
            }
            if seq < target_seq {
                return None;
            }
            current = parent;
        }
    }
}

fn validation(node_id: NodeId, ledger_id: LedgerId, seq: u32, now: u64, trusted: bool) -> ledger_core_types::validation::Validation {
    ledger_core_types::validation::Validation {
        node_id,
        public_key: vec![],
        ledger_id,
        seq: Seq(seq),
        sign_time: now,
        seen_time: now,
        full: true,
        trusted,
        load_fee: None,
    }
}

/// No ancestry resolvable; sufficient when every validation already sits at
/// or above `min_ledger`.
fn no_ancestry(_id: LedgerId, _seq: Seq) -> Option<LedgerId> {
    None
}

#[test]
fn add_accepts_a_fresh_validation_as_current() {
    let mut store = ValidationStore::new(ValidationParms::default());
    let outcome = store.add(node(1), validation(node(1), ledger(1), 10, 1000, true), 1000);
    assert_eq!(outcome, AddOutcome::Current);
    assert_eq!(store.current_trusted().len(), 1);
}

#[test]
fn add_rejects_stale_sign_time() {
    let mut store = ValidationStore::new(ValidationParms::default());
    let mut v = validation(node(1), ledger(1), 10, 100, true);
    v.sign_time = 0;
    let outcome = store.add(node(1), v, 100_000);
    assert_eq!(outcome, AddOutcome::Stale);
}

#[test]
fn add_rejects_sequence_regression_within_the_expiry_window() {
    let mut store = ValidationStore::new(ValidationParms::default());
    assert_eq!(store.add(node(1), validation(node(1), ledger(1), 10, 1000, true), 1000), AddOutcome::Current);
    assert_eq!(store.add(node(1), validation(node(1), ledger(2), 9, 1001, true), 1001), AddOutcome::BadSeq);
}

#[test]
fn a_node_appears_at_most_once_among_current_validations() {
    // A node's later validation always supersedes its own earlier one.
    let mut store = ValidationStore::new(ValidationParms::default());
    store.add(node(1), validation(node(1), ledger(1), 10, 1000, true), 1000);
    store.add(node(1), validation(node(1), ledger(2), 11, 1001, true), 1001);
    assert_eq!(store.current_trusted().len(), 1);
    assert_eq!(store.current_trusted()[0].ledger_id, ledger(2));
}

#[test]
fn superseding_a_validation_moves_the_prior_one_to_the_stale_sink() {
    let mut store = ValidationStore::new(ValidationParms::default());
    store.add(node(1), validation(node(1), ledger(1), 10, 1000, true), 1000);
    store.add(node(1), validation(node(1), ledger(2), 11, 1001, true), 1001);

    let mut sink = Vec::new();
    store.flush(&mut sink);
    assert!(sink.iter().any(|v| v.ledger_id == ledger(1)));
    assert!(sink.iter().any(|v| v.ledger_id == ledger(2)));
}

#[test]
fn get_preferred_returns_the_tip_five_trusted_nodes_converge_on() {
    // 5 trusted nodes all validate ledger A @ seq 10, queried from an
    // unrelated genesis ledger: getPreferred names (10, A).
    let mut store = ValidationStore::new(ValidationParms::default());
    let tip = ledger(0xA);
    for n in 1..=5u8 {
        store.add(node(n), validation(node(n), tip, 10, 1000, true), 1000);
    }

    let curr = ledger_ref(LedgerId::genesis(), 0);
    let preferred = store.get_preferred(&curr, Seq::zero(), &no_ancestry);
    assert_eq!(preferred, Some((Seq(10), tip)));
}

#[test]
fn get_preferred_only_jumps_branches_when_curr_is_not_already_on_the_winning_chain() {
    // Mirrors the original's fork scenario: a/b/d (trusted) all converge on
    // AC (seq 2, child of A); c (untrusted) does too. Querying from A (an
    // ancestor of the winner) stays put; querying from the unrelated
    // sibling B jumps to AC; querying from ACD (a descendant of the winner)
    // also stays put, since it has already moved past AC on the same chain.
    let mut store = ValidationStore::new(ValidationParms::default());

    let a = ledger(0xA1);
    let b = ledger(0xB1);
    let ac = ledger(0xAC);
    let acd = ledger(0xAD);

    let mut history = History::default();
    history.record(a, 1, LedgerId::genesis());
    history.record(b, 1, LedgerId::genesis());
    history.record(ac, 2, a);
    history.record(acd, 3, ac);
    let oracle = |id: LedgerId, seq: Seq| history.ancestor(id, seq);

    for n in 1..=3u8 {
        store.add(node(n), validation(node(n), ac, 2, 1000, true), 1000);
    }
    store.add(node(9), validation(node(9), ac, 2, 1000, false), 1000);

    let curr_a = ledger_ref(a, 1);
    assert_eq!(store.get_preferred(&curr_a, Seq::zero(), &oracle), Some((Seq(1), a)));

    let curr_b = ledger_ref(b, 1);
    assert_eq!(store.get_preferred(&curr_b, Seq::zero(), &oracle), Some((Seq(2), ac)));

    let curr_acd = ledger_ref(acd, 3);
    assert_eq!(store.get_preferred(&curr_acd, Seq::zero(), &oracle), Some((Seq(3), acd)));
}

#[test]
fn untrusted_validations_do_not_count_toward_get_preferred() {
    let mut store = ValidationStore::new(ValidationParms::default());
    store.add(node(1), validation(node(1), ledger(1), 5, 1000, false), 1000);
    let curr = ledger_ref(ledger(1), 5);
    assert_eq!(store.get_preferred(&curr, Seq::zero(), &no_ancestry), None);
}

#[test]
fn trust_changed_flips_the_trusted_bit_on_stored_validations() {
    let mut store = ValidationStore::new(ValidationParms::default());
    store.add(node(1), validation(node(1), ledger(1), 5, 1000, true), 1000);

    let mut untrusted = std::collections::HashSet::new();
    untrusted.insert(node(1));
    store.trust_changed(&std::collections::HashSet::new(), &untrusted);

    assert!(store.current_trusted().is_empty());
}

#[test]
fn expire_drops_validations_older_than_the_expiry_window() {
    let mut store = ValidationStore::new(ValidationParms::default());
    store.add(node(1), validation(node(1), ledger(1), 5, 0, true), 0);

    let far_future = ValidationParms::default().validation_set_expires.as_secs() + 1;
    store.expire(far_future);

    assert!(store.current_trusted().is_empty());
}

#[test]
fn fees_substitutes_base_for_validators_that_did_not_publish_a_load_fee() {
    let mut store = ValidationStore::new(ValidationParms::default());
    let tip = ledger(0x9);
    let mut v = validation(node(1), tip, 5, 1000, true);
    v.load_fee = Some(512);
    store.add(node(1), v, 1000);
    store.add(node(2), validation(node(2), tip, 5, 1000, true), 1000);

    let mut levels = store.fees(tip, 256);
    levels.sort();
    assert_eq!(levels, vec![256, 512]);
}
