//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The close timer and the consensus-check classifier. Both are pure
//! functions of their inputs so they can be exercised directly in tests
//! without a running `Consensus` engine.

use std::time::Duration;

use crate::constants::ConsensusParms;

/// The current round's elapsed time expressed as a percentage of the
/// previous round's duration, floored at `av_min_consensus_time` so an
/// unusually fast previous round cannot make the vote-threshold schedule
/// escalate instantly. This is the `convergePercent` that drives
/// `Dispute::update_vote`'s threshold lookup — not a raw duration
/// comparison.
pub fn converge_percent(round_time: Duration, prev_round_time: Duration, parms: &ConsensusParms) -> u32 {
    let divisor = prev_round_time.max(parms.av_min_consensus_time).as_millis().max(1);
    let pct = (round_time.as_millis() * 100) / divisor;
    pct.min(u32::MAX as u128) as u32
}

/// `shouldCloseLedger`. Pure, monotone in `open_time` holding all other
/// inputs fixed.
#[allow(clippy::too_many_arguments)]
pub fn should_close_ledger(
    any_transactions: bool,
    prev_proposers: usize,
    proposers_closed: usize,
    proposers_validated: usize,
    prev_round_time: Duration,
    since_close: Duration,
    open_time: Duration,
    idle_interval: Duration,
    parms: &ConsensusParms,
) -> bool {
    // Refuse to close: minimum open-ledger lifetime not yet reached.
    if since_close < parms.ledger_min_close {
        return false;
    }

    // Safety valve: an unexpectedly long previous round (a node catching up
    // after being offline, say) shouldn't block progress on this one.
    if prev_round_time > parms.ledger_max_consensus {
        return true;
    }

    // (a) A majority of last round's proposers have already closed.
    if prev_proposers > 0 && proposers_closed >= prev_proposers / 2 + 1 {
        return true;
    }

    // (b) We have transactions to close and a quorum of the network has
    // already validated past us; no reason to keep waiting.
    let quorum = ceil_div(prev_proposers * parms.min_consensus_pct as usize, 100);
    if any_transactions && open_time >= parms.ledger_min_close && proposers_validated >= quorum {
        return true;
    }

    // (c) Liveness: close unconditionally after the idle interval so a lone
    // or partitioned node keeps making progress.
    if since_close >= idle_interval {
        return true;
    }

    // (d) Hard ceiling on how long the open ledger may stay open.
    if open_time >= parms.ledger_max_open {
        return true;
    }

    false
}

fn ceil_div(numerator: usize, denominator: usize) -> usize {
    if denominator == 0 {
        return 0;
    }
    (numerator + denominator - 1) / denominator
}

/// Classification returned by `check_consensus`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConsensusCheckResult {
    /// Consensus reached on our own position.
    Yes,
    /// We have not personally reached consensus, but enough peers have
    /// already moved past us that we should accept anyway.
    MovedOn,
    /// The round has run long enough that it is declared stuck; force an
    /// accept with whatever position we have.
    Expired,
    /// Keep establishing.
    No,
}

/// `checkConsensus`: classify the current round given vote tallies.
///
/// - `total`: number of peers (including us) whose current position we hold.
/// - `agreeing`: of `total`, how many agree with our current position.
/// - `finished`: `proposersFinished` — peers already past this round.
#[allow(clippy::too_many_arguments)]
pub fn check_consensus(
    prev_proposers: usize,
    total: usize,
    agreeing: usize,
    finished: usize,
    current_agree_time: Duration,
    parms: &ConsensusParms,
) -> ConsensusCheckResult {
    let quorum = ceil_div(prev_proposers * parms.min_consensus_pct as usize, 100);

    if total >= quorum {
        let agreement_pct = if total == 0 { 0 } else { (agreeing * 100) / total };
        if agreement_pct as u32 >= parms.min_consensus_pct && current_agree_time >= parms.ledger_min_consensus {
            return ConsensusCheckResult::Yes;
        }
    }

    if finished >= quorum {
        return ConsensusCheckResult::MovedOn;
    }

    if current_agree_time >= parms.ledger_max_consensus {
        return ConsensusCheckResult::Expired;
    }

    ConsensusCheckResult::No
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converge_percent_floors_the_divisor_at_av_min_consensus_time() {
        let parms = ConsensusParms::default();
        // prev_round_time below the floor is clamped up to av_min_consensus_time
        // before dividing, so this is round_time / av_min_consensus_time, not
        // round_time / prev_round_time.
        let pct = converge_percent(parms.av_min_consensus_time, Duration::from_millis(1), &parms);
        assert_eq!(pct, 100);
    }

    #[test]
    fn converge_percent_can_exceed_a_hundred_once_stuck() {
        let parms = ConsensusParms::default();
        let pct = converge_percent(parms.av_min_consensus_time * 3, parms.av_min_consensus_time, &parms);
        assert_eq!(pct, 300);
    }

    #[test]
    fn safety_valve_closes_after_an_anomalously_long_previous_round() {
        let parms = ConsensusParms::default();
        let closed = should_close_ledger(
            false,
            0,
            0,
            0,
            parms.ledger_max_consensus * 2,
            parms.ledger_min_close,
            Duration::from_secs(0),
            parms.ledger_idle_interval,
            &parms,
        );
        assert!(closed);
    }

    #[test]
    fn refuses_to_close_before_minimum_open_time() {
        let parms = ConsensusParms::default();
        let closed = should_close_ledger(
            true,
            5,
            5,
            5,
            parms.ledger_min_consensus,
            Duration::from_millis(100),
            Duration::from_secs(10),
            parms.ledger_idle_interval,
            &parms,
        );
        assert!(!closed);
    }

    #[test]
    fn majority_of_prior_proposers_closing_triggers_close() {
        let parms = ConsensusParms::default();
        let closed = should_close_ledger(
            false,
            10,
            6,
            0,
            parms.ledger_min_consensus,
            parms.ledger_min_close,
            Duration::from_secs(1),
            parms.ledger_idle_interval,
            &parms,
        );
        assert!(closed);
    }

    #[test]
    fn should_close_is_monotone_in_open_time() {
        let parms = ConsensusParms::default();
        let base = |open_time: Duration| {
            should_close_ledger(
                false,
                0,
                0,
                0,
                parms.ledger_min_consensus,
                parms.ledger_min_close,
                open_time,
                parms.ledger_idle_interval,
                &parms,
            )
        };
        // Once true at some open_time, every larger open_time must also be true.
        let sample_points = [0, 1, 2, 5, 10, 30, 59, 60, 61, 120];
        let mut seen_true = false;
        for secs in sample_points {
            let result = base(Duration::from_secs(secs));
            if result {
                seen_true = true;
            }
            if seen_true {
                assert!(result, "open_time={secs}s regressed from true back to false");
            }
        }
    }

    #[test]
    fn idle_interval_forces_close_regardless_of_transactions() {
        let parms = ConsensusParms::default();
        let closed = should_close_ledger(
            false,
            0,
            0,
            0,
            parms.ledger_min_consensus,
            parms.ledger_idle_interval,
            Duration::from_secs(0),
            parms.ledger_idle_interval,
            &parms,
        );
        assert!(closed);
    }

    #[test]
    fn check_consensus_yes_requires_quorum_agreement_and_minimum_time() {
        let parms = ConsensusParms::default();
        let result = check_consensus(10, 10, 9, 0, parms.ledger_min_consensus, &parms);
        assert_eq!(result, ConsensusCheckResult::Yes);
    }

    #[test]
    fn check_consensus_no_before_minimum_agree_time() {
        let parms = ConsensusParms::default();
        let result = check_consensus(10, 10, 10, 0, Duration::from_millis(1), &parms);
        assert_eq!(result, ConsensusCheckResult::No);
    }

    #[test]
    fn check_consensus_moved_on_when_peers_finished_without_us() {
        let parms = ConsensusParms::default();
        let result = check_consensus(10, 2, 0, 9, Duration::from_millis(1), &parms);
        assert_eq!(result, ConsensusCheckResult::MovedOn);
    }

    #[test]
    fn check_consensus_expired_past_max_consensus_time() {
        let parms = ConsensusParms::default();
        let result = check_consensus(10, 3, 1, 0, parms.ledger_max_consensus, &parms);
        assert_eq!(result, ConsensusCheckResult::Expired);
    }
}
