//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Errors surfaced by the validation store. Ordinary non-acceptance
//! (`stale`, `badSeq`) is a silent, typed outcome (see [`AddOutcome`]) rather
//! than an error — this enum is reserved for genuinely exceptional
//! conditions raised by the embedding collaborator: one variant per failure
//! class.

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("failed to flush validations to the stable-storage sink: {0}")]
    FlushFailed(String),
}

/// Outcome of [`crate::store::ValidationStore::add`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Accepted and stored as the node's current validation.
    Current,
    /// `signTime`/`seenTime` fell outside the acceptance window; discarded.
    Stale,
    /// Violated the per-node monotone-sequence rule; discarded.
    BadSeq,
}
