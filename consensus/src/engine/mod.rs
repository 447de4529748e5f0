//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The Consensus state machine. Split into one file per externally
//! triggered operation (`on_peer_proposal.rs`, `on_timer.rs`, …), one file
//! per inbound event. Every method here is a plain `&mut self` call
//! parameterized over the caller's `Adaptor` impl: a single logical lock
//! per component, with the engine taking `&mut Adaptor` for all outward
//! calls rather than holding its own reference.

mod check_ledger;
mod on_peer_proposal;
mod on_timer;
mod on_tx_set;
mod update_positions;

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::time::Duration;

use log::{debug, info};

use ledger_core_types::{
    ids::{LedgerId, NodeId, TxSetId},
    ledger::Ledger,
    proposal::Proposal,
    txset::TxSet,
};

use crate::{
    adaptor::{Acquired, AcceptedRound, Adaptor, Mode},
    dispute::Dispute,
};

const LOG_TARGET: &str = "ledger_consensus::engine";

/// Per-round phase. Transitions are monotone within a round and reset at
/// `start_round`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Open,
    Establish,
    Accepted,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Open => write!(f, "open"),
            Phase::Establish => write!(f, "establish"),
            Phase::Accepted => write!(f, "accepted"),
        }
    }
}

/// The per-round state reset by `start_round`.
pub(crate) struct RoundState {
    pub(crate) prev_ledger_id: LedgerId,
    pub(crate) prev_ledger: Ledger,
    pub(crate) mode: Mode,
    pub(crate) proposing: bool,

    pub(crate) round_start: u64,
    pub(crate) open_time_start: u64,
    pub(crate) have_closed: bool,
    pub(crate) close_time: u64,
    pub(crate) close_time_votes: HashMap<u64, usize>,
    pub(crate) consensus_close_time: Option<u64>,

    pub(crate) acquired: HashMap<TxSetId, TxSet>,
    pub(crate) peer_positions: HashMap<NodeId, Proposal>,
    pub(crate) dead_nodes: HashSet<NodeId>,
    pub(crate) disputes: HashMap<ledger_core_types::ids::TxId, Dispute>,
    pub(crate) our_position: Option<TxSet>,
    pub(crate) our_propose_seq: u32,
}

impl RoundState {
    fn new(now: u64, prev_id: LedgerId, prev_ledger: Ledger, mode: Mode, proposing: bool) -> Self {
        Self {
            prev_ledger_id: prev_id,
            prev_ledger,
            mode,
            proposing,
            round_start: now,
            open_time_start: now,
            have_closed: false,
            close_time: now,
            close_time_votes: HashMap::new(),
            consensus_close_time: None,
            acquired: HashMap::new(),
            peer_positions: HashMap::new(),
            dead_nodes: HashSet::new(),
            disputes: HashMap::new(),
            our_position: None,
            our_propose_seq: 0,
        }
    }
}

/// The Consensus engine. Holds exactly one round's worth of mutable
/// state plus the bookkeeping (`prev_proposers`, `prev_round_time`) carried
/// forward into the next round's close-timer and consensus-check
/// calculations.
pub struct Consensus {
    pub(crate) phase: Phase,
    pub(crate) round: RoundState,
    pub(crate) prev_proposers: usize,
    pub(crate) prev_round_time: Duration,
    pub(crate) convergence_percent: u32,
    pub(crate) paused: bool,
}

impl Consensus {
    /// Initial state is `Accepted` with no active round.
    pub fn new() -> Self {
        Self {
            phase: Phase::Accepted,
            round: RoundState::new(0, LedgerId::genesis(), Ledger::genesis(Duration::from_secs(10)), Mode::Observing, false),
            prev_proposers: 0,
            prev_round_time: Duration::ZERO,
            convergence_percent: 0,
            paused: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.round.mode
    }

    pub fn prev_ledger_id(&self) -> LedgerId {
        self.round.prev_ledger_id
    }

    pub fn our_position(&self) -> Option<&TxSet> {
        self.round.our_position.as_ref()
    }

    pub fn convergence_percent(&self) -> u32 {
        self.convergence_percent
    }

    /// Resets all per-round state and transitions to `open`.
    pub fn start_round(&mut self, now: u64, prev_id: LedgerId, prev_ledger: Ledger, proposing: bool) {
        info!(target: LOG_TARGET, "starting round for seq {} atop {}", prev_ledger.seq.next(), prev_id);
        let mode = if proposing { Mode::Proposing } else { Mode::Observing };
        self.prev_proposers = self.round.peer_positions.len();
        self.round = RoundState::new(now, prev_id, prev_ledger, mode, proposing);
        self.phase = Phase::Open;
        self.convergence_percent = 0;
        self.paused = false;
    }

    /// Entry action for `establish`: build our initial position from the
    /// open ledger and broadcast it.
    pub fn close<A: Adaptor>(&mut self, adaptor: &mut A, now: u64) -> Result<(), crate::error::ConsensusError> {
        if self.phase != Phase::Open {
            return Ok(());
        }
        debug!(target: LOG_TARGET, "closing the open ledger atop {}", self.round.prev_ledger_id);

        let position = adaptor.on_close(&self.round.prev_ledger, now, self.round.mode)?;
        self.round.have_closed = true;
        self.round.close_time = now;
        *self.round.close_time_votes.entry(now).or_insert(0) += 1;
        self.round.acquired.insert(position.id(), position.clone());
        self.round.our_position = Some(position.clone());
        self.phase = Phase::Establish;

        if self.round.mode.is_proposing() {
            let proposal = Proposal {
                node_id: adaptor.validator(),
                prev_ledger_id: self.round.prev_ledger_id,
                position: position.id(),
                close_time: now,
                propose_seq: 0,
                sign_time: now,
            };
            self.round.our_propose_seq = 0;
            adaptor.propose(proposal);
        }
        Ok(())
    }

    /// Exit action for `establish`: invoke `onAccept`/`onForceAccept` to
    /// build and apply the new ledger, then record round duration for next
    /// round's close-timer inputs.
    pub(crate) fn accept<A: Adaptor>(&mut self, adaptor: &mut A, now: u64, forced: bool) {
        let round_duration = Duration::from_secs(now.saturating_sub(self.round.round_start));
        let close_time = self.round.consensus_close_time.unwrap_or(self.round.close_time);
        let tx_set = self
            .round
            .our_position
            .clone()
            .unwrap_or_else(|| TxSet::new(TxSetId([0; 32]), Default::default()));

        let accepted = AcceptedRound {
            tx_set,
            close_time,
            close_time_agreed: self.round.consensus_close_time.is_some(),
            round_duration,
            proposers: self.round.peer_positions.len(),
        };

        info!(
            target: LOG_TARGET,
            "round accepted{} after {:?} with {} proposers",
            if forced { " (forced)" } else { "" },
            round_duration,
            accepted.proposers
        );

        if forced {
            adaptor.on_force_accept(&accepted, &self.round.prev_ledger, self.round.prev_ledger.close_time_resolution, self.round.mode);
        } else {
            adaptor.on_accept(&accepted, &self.round.prev_ledger, self.round.prev_ledger.close_time_resolution, self.round.mode);
        }

        self.prev_round_time = round_duration;
        self.phase = Phase::Accepted;
    }

    /// `gotTxSet`'s ledger-acquisition twin: resolves a previously-pending
    /// `acquireLedger` suspension point. Required to drive `checkLedger`'s
    /// async acquisition to completion.
    pub fn ledger_acquired(&mut self, ledger: Ledger) {
        if ledger.id == self.round.prev_ledger_id {
            self.round.prev_ledger = ledger;
        }
    }

    /// Single-step close + accept with a synthetic round duration, for
    /// standalone mode.
    pub fn simulate<A: Adaptor>(&mut self, adaptor: &mut A, now: u64, delay: Option<Duration>) -> Result<(), crate::error::ConsensusError> {
        if self.phase == Phase::Open {
            self.close(adaptor, now)?;
        }
        let elapsed = delay.unwrap_or(adaptor.parms().ledger_min_consensus);
        self.round.round_start = now.saturating_sub(elapsed.as_secs());
        self.accept(adaptor, now, false);
        Ok(())
    }

    pub(crate) fn acquire_tx_set<A: Adaptor>(&mut self, adaptor: &mut A, id: TxSetId) -> Option<TxSet> {
        if let Some(set) = self.round.acquired.get(&id) {
            return Some(set.clone());
        }
        match adaptor.acquire_tx_set(id) {
            Acquired::Ready(set) => {
                self.round.acquired.insert(id, set.clone());
                Some(set)
            },
            Acquired::Pending => None,
        }
    }
}

impl Default for Consensus {
    fn default() -> Self {
        Self::new()
    }
}
