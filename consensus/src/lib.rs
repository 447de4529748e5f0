//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The consensus engine: per-round proposal exchange, dispute voting and the
//! close-timer heuristics that decide when to close and accept a ledger.

pub mod adaptor;
pub mod close_time;
pub mod constants;
pub mod dispute;
pub mod engine;
pub mod error;
pub mod handle;

pub use adaptor::{Acquired, AcceptedRound, Adaptor, Mode};
pub use constants::ConsensusParms;
pub use dispute::Dispute;
pub use engine::{Consensus, Phase};
pub use error::ConsensusError;
pub use handle::ConsensusHandle;
