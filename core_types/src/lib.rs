//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Shared identifiers and core data model: ledgers, transactions, proposals,
//! tx-sets and validations. This crate holds no mutable state and performs
//! no I/O; it exists so that
//! `consensus`, `validations` and `txq` can exchange the same value types
//! without a dependency cycle between them.

pub mod ids;
pub mod ledger;
pub mod proposal;
pub mod ter;
pub mod tx;
pub mod txset;
pub mod validation;

pub use ids::{LedgerId, NodeId, Seq, TxId, TxSetId};
pub use ledger::Ledger;
pub use proposal::Proposal;
pub use ter::Ter;
pub use tx::{Tx, TxConsequences};
pub use txset::TxSet;
pub use validation::Validation;
