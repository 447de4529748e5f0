//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! `ValidationParms`: the acceptance-window and expiry constants, following
//! `consensus::ConsensusParms`'s named-preset pattern.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationParms {
    /// How far in the past `signTime` may lag `now`.
    pub validation_current_early: Duration,
    /// How far in the future `signTime` may lead `now`.
    pub validation_current_wall: Duration,
    /// Acceptable local-clock skew window for `seenTime`.
    pub validation_current_local: Duration,
    /// How long a validation remains current before `expire()` drops it, and
    /// the window `SeqEnforcer` enforces monotonicity over.
    pub validation_set_expires: Duration,
}

impl ValidationParms {
    pub const fn mainnet() -> Self {
        Self {
            validation_current_early: Duration::from_secs(3 * 60),
            validation_current_wall: Duration::from_secs(5 * 60),
            validation_current_local: Duration::from_secs(5 * 60),
            validation_set_expires: Duration::from_secs(10 * 60),
        }
    }
}

impl Default for ValidationParms {
    fn default() -> Self {
        Self::mainnet()
    }
}
