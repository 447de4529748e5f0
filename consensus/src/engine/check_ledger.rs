//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `checkLedger`/`handleWrongLedger`: detect that our `prevLedgerID` has
//! fallen behind the network-preferred tip (per the `Validations` store, via
//! the adaptor) and recover by switching chains.

use log::{info, warn};

use ledger_core_types::ids::LedgerId;

use crate::adaptor::{Acquired, Adaptor, Mode};

use super::Consensus;

const LOG_TARGET: &str = "ledger_consensus::engine::check_ledger";

impl Consensus {
    /// `checkLedger`: compare our round's `prevLedgerID` against the
    /// network-preferred tip and switch onto it if we have fallen behind.
    pub fn check_ledger<A: Adaptor>(&mut self, adaptor: &mut A, now: u64) {
        let preferred = adaptor.get_prev_ledger(self.round.prev_ledger_id, &self.round.prev_ledger, self.round.mode);
        if preferred == self.round.prev_ledger_id {
            if matches!(self.round.mode, Mode::WrongLedger | Mode::SwitchedLedger) {
                self.round.mode = if self.round.proposing { Mode::Proposing } else { Mode::Observing };
            }
            return;
        }
        self.handle_wrong_ledger(adaptor, now, preferred);
    }

    fn handle_wrong_ledger<A: Adaptor>(&mut self, adaptor: &mut A, now: u64, preferred: LedgerId) {
        match adaptor.acquire_ledger(preferred) {
            Acquired::Ready(ledger) => {
                info!(target: LOG_TARGET, "switching from {} to network-preferred {}", self.round.prev_ledger_id, preferred);
                let proposing = self.round.proposing;
                self.start_round(now, preferred, ledger, proposing);
                self.round.mode = Mode::SwitchedLedger;
            },
            Acquired::Pending => {
                warn!(target: LOG_TARGET, "network prefers {} but it is not yet acquired", preferred);
                self.round.mode = Mode::WrongLedger;
            },
        }
    }
}
