//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Errors surfaced by the consensus engine. Wrong-ledger detection and
//! missing-tx-set acquisition are *not* modelled here: they are recovered
//! locally (branch switch, async acquisition) and never surface as a
//! user-visible failure. This enum is reserved for the handful of genuinely
//! exceptional conditions the engine cannot itself recover from: one variant
//! per failure class, with `#[from]` for wrapped collaborator errors.

#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("onClose failed to build an initial position: {details}")]
    OnCloseFailed { details: String },
    #[error("adaptor reported an internal error: {0}")]
    Adaptor(String),
    #[error("BUG invariant violated: {0}")]
    Invariant(String),
}
