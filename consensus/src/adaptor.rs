//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The `Adaptor` collaborator interface. Everything the consensus engine
//! needs from the embedding node — peer I/O, ledger building,
//! network-preferred-tip lookup — is expressed as a trait the engine takes
//! `&mut` for the duration of a single call, a single trait with methods
//! rather than an associated-type bundle, since every type it would
//! parameterize over — `Ledger`, `TxSet`, `NodeId`, `Proposal` — is already a
//! concrete `core_types` type shared by every implementation.

use std::time::Duration;

use ledger_core_types::{
    ids::{LedgerId, NodeId, Seq, TxId, TxSetId},
    ledger::Ledger,
    proposal::Proposal,
    tx::Tx,
    txset::TxSet,
    validation::Validation,
};

use crate::{constants::ConsensusParms, error::ConsensusError};

/// The node's participation mode for the round. `WrongLedger`/
/// `SwitchedLedger` are entered by `handleWrongLedger` when our
/// `prevLedgerID` diverges from the network's preferred tip.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Actively proposing and voting.
    Proposing,
    /// Following the round without proposing (e.g. not yet validated).
    Observing,
    /// We detected our `prevLedgerID` is wrong and are re-running the round
    /// against the newly preferred chain.
    SwitchedLedger,
    /// We detected our `prevLedgerID` is wrong and could not immediately
    /// switch (acquisition still pending).
    WrongLedger,
}

impl Mode {
    pub fn is_proposing(self) -> bool {
        matches!(self, Mode::Proposing)
    }
}

/// Result of an asynchronous collaborator lookup: blocking work is
/// delegated to the collaborator, which reports `Pending` rather than
/// blocking the engine, and resolves later by calling back into
/// `Consensus::ledger_acquired`/`Consensus::got_tx_set`.
#[derive(Clone, Debug)]
pub enum Acquired<T> {
    Ready(T),
    Pending,
}

/// Everything `onAccept`/`onForceAccept` need to build and publish the new
/// ledger.
#[derive(Clone, Debug)]
pub struct AcceptedRound {
    pub tx_set: TxSet,
    pub close_time: u64,
    /// Whether `close_time` represents a consensus agreement or was assigned
    /// unilaterally (e.g. during `Expired`/`MovedOn`).
    pub close_time_agreed: bool,
    pub round_duration: Duration,
    pub proposers: usize,
}

/// The consensus engine's collaborator interface.
pub trait Adaptor {
    fn acquire_ledger(&mut self, id: LedgerId) -> Acquired<Ledger>;
    fn acquire_tx_set(&mut self, id: TxSetId) -> Acquired<TxSet>;
    /// Resolve a transaction's full contents from its id, when building a
    /// `Dispute` for a transaction we did not ourselves propose. `None` if
    /// neither queued locally nor otherwise known; such ids are skipped
    /// rather than disputed.
    fn resolve_tx(&self, id: TxId) -> Option<Tx>;

    /// Broadcast our own proposal.
    fn propose(&mut self, proposal: Proposal);
    /// Re-share a `TxSet`/validation on request from a peer that hasn't
    /// acquired it yet.
    fn share_tx_set(&mut self, tx_set: TxSet);
    fn share_validation(&mut self, validation: Validation);

    /// Build the initial position for a new round: open-ledger transactions
    /// union TxQ admits.
    fn on_close(&mut self, prev_ledger: &Ledger, now: u64, mode: Mode) -> Result<TxSet, ConsensusError>;
    /// Re-hash an updated member set into a new `TxSet` after a dispute's
    /// vote flips. The identifier encoding itself is owned elsewhere; the
    /// engine only owns membership.
    fn rebuild_position(&mut self, members: std::collections::BTreeSet<ledger_core_types::ids::TxId>) -> TxSet;
    /// Apply and publish the agreed ledger.
    fn on_accept(&mut self, accepted: &AcceptedRound, prev_ledger: &Ledger, close_time_resolution: Duration, mode: Mode);
    /// Simulation-mode variant of `on_accept`, used when consensus did not
    /// actually converge but the round is being forced to a close
    /// (`Expired`, or `simulate`).
    fn on_force_accept(
        &mut self,
        accepted: &AcceptedRound,
        prev_ledger: &Ledger,
        close_time_resolution: Duration,
        mode: Mode,
    );

    /// The network-preferred previous-ledger tip, as seen by the embedding
    /// node's `Validations` store.
    fn get_prev_ledger(&self, cur_id: LedgerId, cur_ledger: &Ledger, mode: Mode) -> LedgerId;
    fn proposers_validated(&self, prev_id: LedgerId) -> usize;
    fn proposers_finished(&self, prev_ledger: &Ledger, prev_id: LedgerId) -> usize;

    fn parms(&self) -> &ConsensusParms;
    fn get_valid_ledger_index(&self) -> Seq;
    fn validator(&self) -> NodeId;
    fn have_validated(&self) -> bool;
    /// Number of peers lagging more than one ledger behind `seq` among
    /// `trusted_keys`.
    fn laggards(&self, seq: Seq, trusted_keys: &[NodeId]) -> usize;
    /// `(quorum, trustedKeys)` for the currently active UNL.
    fn get_quorum_keys(&self) -> (usize, Vec<NodeId>);
}
