//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `timerEntry`: the heartbeat driving phase transitions. Dispatches on the
//! current `Phase` every tick, synchronously, since this engine has no
//! actor loop of its own.

use log::{debug, info};

use crate::adaptor::Adaptor;
use crate::close_time::{check_consensus, should_close_ledger, ConsensusCheckResult};
use crate::error::ConsensusError;

use super::{Consensus, Phase};

const LOG_TARGET: &str = "ledger_consensus::engine::timer";

impl Consensus {
    /// Drives one heartbeat tick of the current phase's state machine.
    pub fn timer_entry<A: Adaptor>(&mut self, adaptor: &mut A, now: u64) -> Result<(), ConsensusError> {
        self.check_ledger(adaptor, now);

        match self.phase {
            Phase::Accepted => Ok(()),
            Phase::Open => self.timer_open(adaptor, now),
            Phase::Establish => self.timer_establish(adaptor, now),
        }
    }

    fn timer_open<A: Adaptor>(&mut self, adaptor: &mut A, now: u64) -> Result<(), ConsensusError> {
        let parms = adaptor.parms();
        let any_transactions = self.round.our_position.as_ref().map(|p| !p.is_empty()).unwrap_or(false);
        let proposers_closed = self.round.peer_positions.values().filter(|p| !p.is_initial() || self.round.have_closed).count();
        let proposers_validated = adaptor.proposers_validated(self.round.prev_ledger_id);
        let since_close = std::time::Duration::from_secs(now.saturating_sub(self.round.close_time));
        let open_time = std::time::Duration::from_secs(now.saturating_sub(self.round.open_time_start));

        let ready = should_close_ledger(
            any_transactions,
            self.prev_proposers,
            proposers_closed,
            proposers_validated,
            self.prev_round_time,
            since_close,
            open_time,
            parms.ledger_idle_interval,
            parms,
        );

        if ready {
            self.close(adaptor, now)
        } else {
            Ok(())
        }
    }

    fn timer_establish<A: Adaptor>(&mut self, adaptor: &mut A, now: u64) -> Result<(), ConsensusError> {
        self.update_our_positions(adaptor, now);

        let Some(our_position) = self.round.our_position.clone() else {
            return Ok(());
        };

        let total = self.round.peer_positions.len() + 1;
        let agreeing = self
            .round
            .peer_positions
            .values()
            .filter(|p| p.position == our_position.id())
            .count()
            + 1;
        let finished = adaptor.proposers_finished(&self.round.prev_ledger, self.round.prev_ledger_id);
        let round_time = std::time::Duration::from_secs(now.saturating_sub(self.round.round_start));

        let result = check_consensus(self.prev_proposers, total, agreeing, finished, round_time, adaptor.parms());

        match result {
            ConsensusCheckResult::No => {
                debug!(target: LOG_TARGET, "establish: no consensus yet ({agreeing}/{total} agree)");
                Ok(())
            },
            ConsensusCheckResult::Yes => {
                self.maybe_pause_for_laggards(adaptor, now, false)
            },
            ConsensusCheckResult::MovedOn => {
                info!(target: LOG_TARGET, "moved on without full agreement, {finished} peers finished");
                self.maybe_pause_for_laggards(adaptor, now, false)
            },
            ConsensusCheckResult::Expired => {
                info!(target: LOG_TARGET, "round expired, forcing accept");
                self.maybe_pause_for_laggards(adaptor, now, true)
            },
        }
    }

    /// "Pause for laggards": when we are ready to accept but a
    /// meaningful fraction of trusted validators are still more than one
    /// ledger behind, hold the accept open one more tick so they can catch
    /// up, instead of leaving them permanently behind the new tip.
    fn maybe_pause_for_laggards<A: Adaptor>(&mut self, adaptor: &mut A, now: u64, forced: bool) -> Result<(), ConsensusError> {
        let (quorum, trusted_keys) = adaptor.get_quorum_keys();
        let laggards = adaptor.laggards(adaptor.get_valid_ledger_index(), &trusted_keys);

        if !self.paused && laggards > 0 && trusted_keys.len().saturating_sub(laggards) < quorum {
            debug!(target: LOG_TARGET, "pausing one tick for {laggards} laggard(s)");
            self.paused = true;
            return Ok(());
        }

        self.accept(adaptor, now, forced);
        Ok(())
    }
}
