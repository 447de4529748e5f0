//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The `TxEngine` collaborator interface. The queue invokes
//! `preflight`/`preclaim`/`doApply` as opaque operations on a view;
//! transaction semantics (pathfinding, offer crossing, signature checks)
//! are entirely the collaborator's concern.

use ledger_core_types::{
    ids::{AccountId, Seq},
    tx::{Drops, Tx, TxConsequences},
    Ter,
};

/// Flags accompanying an `apply()` call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyFlags {
    /// When set, an incoming transaction must beat the current top of
    /// `byFee`, not merely the baseline required level.
    pub prefer_queue: bool,
}

/// Result of `preflight`: context-free validity plus enough of the
/// transaction's shape to drive the rest of admission.
#[derive(Clone, Debug)]
pub struct PreflightResult {
    pub ter: Ter,
}

impl PreflightResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.ter, Ter::Success)
    }
}

/// Result of `preclaim`: view-dependent check.
#[derive(Copy, Clone, Debug)]
pub struct PreclaimResult {
    pub ter: Ter,
    pub likely_to_claim_fee: bool,
}

/// A read-only view of the open ledger the queue escalates fees against,
/// held exclusively during apply/accept.
pub trait LedgerView {
    fn seq(&self) -> Seq;
    /// Number of transactions already applied to this open ledger.
    fn tx_count(&self) -> u64;
    /// The account's current on-ledger sequence number, if the account
    /// exists (used by the multi-transaction chain check).
    fn account_sequence(&self, account: AccountId) -> Option<Seq>;
}

/// A view that can additionally be mutated by `doApply`. Kept as a
/// separate trait from `LedgerView` so read-only callers (e.g. `getMetrics`)
/// do not need mutable access.
pub trait MutableLedgerView: LedgerView {
    /// Apply `tx`'s effects to this view, returning the same disposition
    /// `doApply` would.
    fn apply_tx(&mut self, tx: &Tx) -> Ter;
}

/// The transaction-engine collaborator. Implementations are supplied
/// by the embedding node; the queue never constructs a `Tx`'s effects
/// itself.
pub trait TxEngine {
    type View: MutableLedgerView;

    fn preflight(&self, tx: &Tx, flags: ApplyFlags) -> PreflightResult;
    fn preclaim(&self, pf: &PreflightResult, view: &Self::View, tx: &Tx) -> PreclaimResult;
    fn calculate_base_fee(&self, view: &Self::View, tx: &Tx) -> Drops;
    fn calculate_consequences(&self, pf: &PreflightResult, tx: &Tx) -> TxConsequences;

    /// Take an independent snapshot of `view` that can be mutated and
    /// discarded without affecting the real open ledger: used to synthesize
    /// a sandbox view for the multi-transaction chain check, and for
    /// `tryClearAccountQueue`'s all-or-nothing chain application. The
    /// account/state model behind `View` is the storage engine's concern,
    /// so cloning it is the collaborator's job, not this crate's.
    fn clone_view(&self, view: &Self::View) -> Self::View;

    /// Project `account`'s sequence and balance forward in a sandboxed
    /// `view` (obtained from `clone_view`) as if `spend` drops had already
    /// been committed against it, so that `preclaim` on the synthesized
    /// view sees the account as it will look once the queued chain ahead
    /// of the new transaction lands.
    fn project_account(&self, view: &mut Self::View, account: AccountId, projected_sequence: Seq, spend: Drops);
}
