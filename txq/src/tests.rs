//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! End-to-end admission tests against a fake, in-memory `TxEngine`/`LedgerView`
//! pair. These exercise `TxQ::apply`/`accept` the way an embedding node's
//! trusted collaborator would, without any real ledger/account model — the
//! fakes here stand in for it.

use std::collections::HashMap;

use ledger_core_types::{
    ids::{AccountId, Seq, TxId},
    ter::{Local, Ter},
    tx::{Drops, Tx, TxCategory, TxConsequences},
};

use crate::{
    adaptor::{ApplyFlags, LedgerView, MutableLedgerView, PreclaimResult, PreflightResult, TxEngine},
    setup::Setup,
    queue::TxQ,
};

fn account(n: u8) -> AccountId {
    AccountId([n; 20])
}

fn tx_id(n: u8) -> TxId {
    TxId([n; 32])
}

fn tx(account_id: AccountId, sequence: u32, fee: u64) -> Tx {
    Tx {
        id: tx_id(sequence as u8 + account_id.0[0]),
        account: account_id,
        sequence: Seq(sequence),
        fee: Drops(fee),
        last_ledger_sequence: None,
        account_txn_id: None,
        category: TxCategory::Normal,
        potential_spend: Drops::zero(),
    }
}

#[derive(Clone)]
struct FakeView {
    seq: Seq,
    tx_count: u64,
    accounts: HashMap<AccountId, Seq>,
}

impl FakeView {
    fn new(tx_count: u64) -> Self {
        Self {
            seq: Seq(1),
            tx_count,
            accounts: HashMap::new(),
        }
    }

    fn with_account(mut self, account_id: AccountId, sequence: u32) -> Self {
        self.accounts.insert(account_id, Seq(sequence));
        self
    }
}

impl LedgerView for FakeView {
    fn seq(&self) -> Seq {
        self.seq
    }

    fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn account_sequence(&self, account: AccountId) -> Option<Seq> {
        self.accounts.get(&account).copied()
    }
}

impl MutableLedgerView for FakeView {
    fn apply_tx(&mut self, tx: &Tx) -> Ter {
        match self.account_sequence(tx.account) {
            Some(seq) if seq == tx.sequence => {
                self.accounts.insert(tx.account, seq.next());
                self.tx_count += 1;
                Ter::Success
            },
            _ => Ter::Retry(ledger_core_types::ter::Retry::PreSeq),
        }
    }
}

struct FakeEngine {
    base_fee: Drops,
}

impl FakeEngine {
    fn new(base_fee: u64) -> Self {
        Self { base_fee: Drops(base_fee) }
    }
}

impl TxEngine for FakeEngine {
    type View = FakeView;

    fn preflight(&self, _tx: &Tx, _flags: ApplyFlags) -> PreflightResult {
        PreflightResult { ter: Ter::Success }
    }

    fn preclaim(&self, _pf: &PreflightResult, view: &FakeView, tx: &Tx) -> PreclaimResult {
        match view.account_sequence(tx.account) {
            Some(seq) if seq == tx.sequence => PreclaimResult {
                ter: Ter::Success,
                likely_to_claim_fee: true,
            },
            Some(seq) if tx.sequence.as_u32() < seq.as_u32() => PreclaimResult {
                ter: Ter::TefFailure(ledger_core_types::ter::TefFailure::PastSeq),
                likely_to_claim_fee: false,
            },
            Some(_) => PreclaimResult {
                ter: Ter::Retry(ledger_core_types::ter::Retry::PreSeq),
                likely_to_claim_fee: false,
            },
            None => PreclaimResult {
                ter: Ter::Local(Local::FailedProcessing),
                likely_to_claim_fee: false,
            },
        }
    }

    fn calculate_base_fee(&self, _view: &FakeView, _tx: &Tx) -> Drops {
        self.base_fee
    }

    fn calculate_consequences(&self, _pf: &PreflightResult, tx: &Tx) -> TxConsequences {
        TxConsequences {
            category: tx.category,
            fee: tx.fee,
            potential_spend: tx.potential_spend,
        }
    }

    fn clone_view(&self, view: &FakeView) -> FakeView {
        view.clone()
    }

    fn project_account(&self, view: &mut FakeView, account: AccountId, projected_sequence: Seq, _spend: Drops) {
        view.accounts.insert(account, projected_sequence);
    }
}

#[test]
fn immediate_apply_when_fee_sufficient_and_sequence_matches() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(0).with_account(account(1), 0);

    let (ter, applied) = txq.apply(&engine, &mut view, tx(account(1), 0, 50), ApplyFlags::default());

    assert_eq!(ter, Ter::Success);
    assert!(applied);
    assert_eq!(view.account_sequence(account(1)), Some(Seq(1)));
    assert!(txq.is_empty());
}

#[test]
fn queues_when_sequence_matches_but_fee_is_below_the_escalated_level() {
    // txnsExpected starts at minimum_txn_in_ledger (5); 10 txs already in the
    // open ledger pushes the required level to 2000.
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(10).with_account(account(1), 0);

    let (ter, applied) = txq.apply(&engine, &mut view, tx(account(1), 0, 5), ApplyFlags::default());

    assert_eq!(ter, Ter::Queued);
    assert!(!applied);
    assert_eq!(txq.len(), 1);
    assert_eq!(view.account_sequence(account(1)), Some(Seq(0)));
}

#[test]
fn rejects_ahead_of_sequence_transaction_with_no_queued_predecessor() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(0).with_account(account(1), 0);

    let (ter, applied) = txq.apply(&engine, &mut view, tx(account(1), 1, 100_000), ApplyFlags::default());

    assert!(!applied);
    assert!(matches!(ter, Ter::Retry(_)));
    assert!(txq.is_empty());
}

#[test]
fn multi_txn_chain_clears_atomically_via_the_fast_path() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(10).with_account(account(1), 0);

    // First queue a fresh, underpriced predecessor at the account's current sequence.
    let (ter0, applied0) = txq.apply(&engine, &mut view, tx(account(1), 0, 5), ApplyFlags::default());
    assert_eq!(ter0, Ter::Queued);
    assert!(!applied0);
    assert_eq!(txq.len(), 1);

    // A well-funded follow-up clears both transactions in one shot.
    let (ter1, applied1) = txq.apply(&engine, &mut view, tx(account(1), 1, 200), ApplyFlags::default());

    assert_eq!(ter1, Ter::Success);
    assert!(applied1);
    assert!(txq.is_empty());
    assert_eq!(view.account_sequence(account(1)), Some(Seq(2)));
}

#[test]
fn higher_fee_replacement_evicts_the_queued_entry_at_the_same_sequence() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(10).with_account(account(1), 0);

    let (ter0, _) = txq.apply(&engine, &mut view, tx(account(1), 0, 5), ApplyFlags::default());
    assert_eq!(ter0, Ter::Queued);
    assert_eq!(txq.len(), 1);

    // retrySequencePercent defaults to 25%: 128 * 1.25 = 160, so a replacement
    // must clear fee-level 160 to win; 50 drops (fee-level 1280) clears that
    // comfortably while staying below the escalated 2000 required to apply
    // directly, so the replacement lands back in the queue.
    let (ter1, applied1) = txq.apply(&engine, &mut view, tx(account(1), 0, 50), ApplyFlags::default());

    assert_eq!(ter1, Ter::Queued);
    assert!(!applied1);
    assert_eq!(txq.len(), 1, "the replacement should supersede, not duplicate, the original entry");
}

#[test]
fn replacement_below_the_retry_premium_is_rejected() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(10).with_account(account(1), 0);

    txq.apply(&engine, &mut view, tx(account(1), 0, 5), ApplyFlags::default());
    assert_eq!(txq.len(), 1);

    let (ter1, applied1) = txq.apply(&engine, &mut view, tx(account(1), 0, 6), ApplyFlags::default());

    assert_eq!(ter1, Ter::Local(Local::CanNotQueueFee));
    assert!(!applied1);
    assert_eq!(txq.len(), 1);
}

#[test]
fn queue_full_evicts_the_lower_priority_account_for_a_better_paying_newcomer() {
    let engine = FakeEngine::new(10);
    let setup = Setup {
        minimum_queue_size: 1,
        ledgers_in_queue: 1,
        minimum_txn_in_ledger: 1,
        target_txn_in_ledger: 1,
        ..Setup::default()
    };
    let mut txq = TxQ::new(setup);
    let mut view = FakeView::new(0).with_account(account(1), 0).with_account(account(2), 0);

    let (ter_a, _) = txq.apply(&engine, &mut view, tx(account(1), 0, 5), ApplyFlags::default());
    assert_eq!(ter_a, Ter::Queued);
    assert_eq!(txq.len(), 1);

    let (ter_b, applied_b) = txq.apply(&engine, &mut view, tx(account(2), 0, 8), ApplyFlags::default());

    assert_eq!(ter_b, Ter::Queued);
    assert!(!applied_b);
    assert_eq!(txq.len(), 1, "account 1's entry should have been evicted to make room");
}

#[test]
fn account_txn_id_linkage_makes_an_ahead_of_sequence_tx_unqueueable() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(0).with_account(account(1), 0);

    let mut candidate = tx(account(1), 1, 100_000);
    candidate.account_txn_id = Some(tx_id(9));

    let (ter, applied) = txq.apply(&engine, &mut view, candidate, ApplyFlags::default());

    assert!(!applied);
    assert!(matches!(ter, Ter::Retry(_)) || matches!(ter, Ter::Local(Local::CanNotQueue)));
    assert!(txq.is_empty());
}

#[test]
fn accept_drains_queued_entries_once_the_open_ledger_catches_up() {
    let engine = FakeEngine::new(10);
    let mut txq = TxQ::new(Setup::default());
    let mut view = FakeView::new(10).with_account(account(1), 0);

    // fee-level 512 clears the base reference level (256) but not the
    // congested 2000 required while the open ledger carries 10 txs.
    txq.apply(&engine, &mut view, tx(account(1), 0, 20), ApplyFlags::default());
    assert_eq!(txq.len(), 1);

    // Simulate the ledger closing with low occupancy, which collapses the
    // escalated fee level back to the base level so the queued entry clears.
    txq.process_closed_ledger(vec![256, 256], false, Seq(1));
    view.tx_count = 0;

    let changed = txq.accept::<FakeEngine>(&mut view);

    assert!(changed);
    assert!(txq.is_empty());
    assert_eq!(view.account_sequence(account(1)), Some(Seq(1)));
}
