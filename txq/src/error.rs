//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

/// Internal failures of the queue itself, distinct from the `Ter` taxonomy
/// which models transaction-admission *outcomes*. These are
/// programming-contract violations the caller should never be able to
/// trigger through the public API; they exist so invariant breaks surface
/// as a typed `Result` rather than a panic.
#[derive(Debug, thiserror::Error)]
pub enum TxQError {
    #[error("entry {0:?} referenced by an index but missing from the arena")]
    DanglingEntry(crate::entry::EntryId),
    #[error("fee-level series computation overflowed (chain too long)")]
    SeriesOverflow,
}
