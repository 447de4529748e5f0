//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! Fee-level arithmetic.
//!
//! A "fee level" is a dimensionless ratio of paid fee to reference fee, with
//! `BASE_LEVEL` representing "paid exactly the reference fee".

use ledger_core_types::tx::Drops;

use crate::setup::Setup;

/// The reference fee level: paying exactly the reference fee scores this.
pub const BASE_LEVEL: u64 = 256;

/// Above this input, `sum_of_first_squares` would overflow a `u64` when
/// multiplied through by the escalation multiplier in `tryClearAccountQueue`.
pub const SUM_OF_SQUARES_OVERFLOW_BOUND: u64 = 1 << 21;

/// `feeLevel(tx) = (tx.fee * baseLevel) / baseRefFee`, floor division.
/// `base_ref_fee` is the collaborator-supplied reference fee for this
/// specific transaction (`calculateBaseFee`); if it is zero, the sentinel
/// from `Setup::zero_basefee_transaction_feelevel` is returned
/// unconditionally, whatever the reason the reference fee came back zero.
pub fn fee_level_paid(fee: Drops, base_ref_fee: Drops, setup: &Setup) -> u64 {
    if base_ref_fee.0 == 0 {
        return setup.zero_basefee_transaction_feelevel;
    }
    // u128 intermediate: fee and BASE_LEVEL are both bounded well under 2^64,
    // but the product can exceed it for large fees.
    ((fee.0 as u128 * BASE_LEVEL as u128) / base_ref_fee.0 as u128) as u64
}

/// `Σ_{i=a}^{b} i²` via the closed form `n(n+1)(2n+1)/6`, used by
/// `tryClearAccountQueue`'s series-fee-requirement integral.
/// Returns `None` on overflow.
pub fn sum_of_first_squares(n: u64) -> Option<u64> {
    if n >= SUM_OF_SQUARES_OVERFLOW_BOUND {
        return None;
    }
    let n = n as u128;
    let sum = n.checked_mul(n + 1)?.checked_mul(2 * n + 1)? / 6;
    u64::try_from(sum).ok()
}

/// `Σ_{i=a}^{b} i²` for an inclusive range, used to compute the series fee
/// requirement over `i ∈ [view.txCount, view.txCount + chainLen - 1]`.
pub fn sum_of_squares_range(a: u64, b: u64) -> Option<u64> {
    if b < a {
        return Some(0);
    }
    let upper = sum_of_first_squares(b)?;
    let lower = if a == 0 { 0 } else { sum_of_first_squares(a - 1)? };
    Some(upper - lower)
}
