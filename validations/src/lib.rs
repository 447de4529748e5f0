//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The validation store: tracks each node's current endorsed ledger
//! and answers preferred-tip queries used by consensus's `checkLedger`.

pub mod error;
pub mod handle;
pub mod parms;
pub mod seq_enforcer;
pub mod store;

pub use error::{AddOutcome, ValidationError};
pub use handle::ValidationsHandle;
pub use parms::ValidationParms;
pub use seq_enforcer::SeqEnforcer;
pub use store::{AncestryOracle, ValidationStore};

#[cfg(test)]
mod tests;
