//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `ConsensusParms`: the timing constants that drive the close-timer and
//! consensus-check heuristics. Defaults mirror the well-known XRPL
//! `ConsensusParms` values; the config surface itself (how these are
//! loaded from a node's configuration file) is out of scope — this struct
//! is the seam, built once by the embedding node as a named preset.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusParms {
    /// Minimum time the open ledger must stay open before it may close.
    pub ledger_min_close: Duration,
    /// Minimum duration a round must spend in agreement before `Yes` can be
    /// declared.
    pub ledger_min_consensus: Duration,
    /// Ceiling on how long a round may spend in `establish` before it is
    /// declared `Expired`.
    pub ledger_max_consensus: Duration,
    /// Liveness trigger: close unconditionally once this long has elapsed
    /// since the last close.
    pub ledger_idle_interval: Duration,
    /// Ceiling on how long the open ledger may stay open regardless of peer
    /// activity.
    pub ledger_max_open: Duration,
    /// Peer proposals older than this are dropped and their dispute votes
    /// retracted.
    pub propose_freshness: Duration,
    /// Minimum spacing between our own successive proposals while
    /// establishing (not separately enforced by this crate's state machine,
    /// which is driven by the caller's tick cadence, but carried as part of
    /// the documented parameter surface).
    pub propose_interval: Duration,
    /// `convergePercent` threshold below which the yes-vote threshold is
    /// `av_init_consensus_pct`.
    pub av_mid_converge_pct: u32,
    /// `convergePercent` threshold below which the yes-vote threshold is
    /// `av_mid_consensus_pct`.
    pub av_late_converge_pct: u32,
    /// `convergePercent` threshold below which the yes-vote threshold is
    /// `av_late_consensus_pct`; at or beyond it, `av_stuck_consensus_pct`
    /// applies. Can exceed 100 since a stuck round may run well past the
    /// previous round's duration.
    pub av_stuck_converge_pct: u32,
    /// Lower bound used when clamping a pathological `prevRoundTime`, and
    /// the divisor floor in the `convergePercent` computation.
    pub av_min_consensus_time: Duration,
    pub av_init_consensus_pct: u32,
    pub av_mid_consensus_pct: u32,
    pub av_late_consensus_pct: u32,
    pub av_stuck_consensus_pct: u32,
    /// Share of weighted close-time votes a single close time must exceed
    /// before close-time consensus is declared.
    pub av_ct_consensus_pct: u32,
    /// Share of `prevProposers` (and current total) required for `Yes`/
    /// `MovedOn` classification.
    pub min_consensus_pct: u32,
    /// Whether `consensusCloseTime` is rounded to `closeResolution` before
    /// being compared across peers.
    pub use_rounded_close_time: bool,
}

impl ConsensusParms {
    /// Values matching the reference network's production defaults
    /// (the standard `ConsensusParms` seen across XRPL-derived networks).
    pub const fn mainnet() -> Self {
        Self {
            ledger_min_close: Duration::from_secs(2),
            ledger_min_consensus: Duration::from_millis(1950),
            ledger_max_consensus: Duration::from_secs(10 * 60),
            ledger_idle_interval: Duration::from_secs(15),
            ledger_max_open: Duration::from_secs(60),
            propose_freshness: Duration::from_secs(20),
            propose_interval: Duration::from_secs(4),
            av_mid_converge_pct: 50,
            av_late_converge_pct: 85,
            av_stuck_converge_pct: 200,
            av_min_consensus_time: Duration::from_secs(5),
            av_init_consensus_pct: 50,
            av_mid_consensus_pct: 65,
            av_late_consensus_pct: 70,
            av_stuck_consensus_pct: 95,
            av_ct_consensus_pct: 75,
            min_consensus_pct: 80,
            use_rounded_close_time: true,
        }
    }

    /// A faster-converging preset for standalone/test operation, trimming
    /// production timings down for local iteration.
    pub const fn standalone() -> Self {
        Self {
            ledger_min_close: Duration::from_millis(200),
            ledger_min_consensus: Duration::from_millis(200),
            ledger_max_consensus: Duration::from_secs(15),
            ledger_idle_interval: Duration::from_secs(2),
            ledger_max_open: Duration::from_secs(5),
            propose_freshness: Duration::from_secs(5),
            propose_interval: Duration::from_millis(500),
            av_min_consensus_time: Duration::from_millis(500),
            ..Self::mainnet()
        }
    }
}

impl Default for ConsensusParms {
    fn default() -> Self {
        Self::mainnet()
    }
}
