//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The Transaction Queue: a bounded, fee-escalating admission queue for
//! transactions that cannot yet be applied to the open ledger.

pub mod adaptor;
pub mod entry;
pub mod error;
pub mod fee;
pub mod handle;
pub mod metrics;
pub mod queue;
pub mod setup;

pub use adaptor::{ApplyFlags, LedgerView, MutableLedgerView, PreclaimResult, PreflightResult, TxEngine};
pub use error::TxQError;
pub use handle::TxQHandle;
pub use queue::{TxQMetrics, TxQ};
pub use setup::Setup;

#[cfg(test)]
mod tests;
