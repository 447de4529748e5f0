//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

/// Abstract transaction-engine-result taxonomy. Names match the
/// category prefixes the wider ecosystem uses (`tem`/`tel`/`ter`/`tef`/
/// `tec`/`tes`) so that diagnostics and logs stay interoperable with other
/// tools that understand the same vocabulary, even though this core does
/// not implement the full result-code catalogue — only the subset the
/// Consensus/TxQ control flow actually branches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ter {
    /// `tem*` — malformed or context-free invalid; rejected synchronously,
    /// never queued.
    Malformed(Malformed),
    /// `tel*` — local admission failure; caller may retry.
    Local(Local),
    /// `ter*` — transient; left queued, retried with a decremented counter.
    Retry(Retry),
    /// `tef*` — terminal at the ledger level; dropped from the queue.
    TefFailure(TefFailure),
    /// `tec*` — claimed fee; applied (fee taken) but not retried.
    ClaimedFee,
    /// `terQUEUED` — accepted into the TxQ; `applied == false`.
    Queued,
    /// `tesSUCCESS` — applied; `applied == true`.
    Success,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Malformed {
    BadPath,
    BadSequence,
    InvalidFlag,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Local {
    InsufficientFeeP,
    CanNotQueueFee,
    CanNotQueueFull,
    CanNotQueueBlocks,
    CanNotQueue,
    FailedProcessing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Retry {
    Retry,
    PreSeq,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TefFailure {
    PastSeq,
    MaxLedger,
    Failure,
}

impl Ter {
    /// Whether this outcome should cause the TxQ to drop the entry outright.
    pub fn is_terminal(self) -> bool {
        matches!(self, Ter::TefFailure(_) | Ter::Malformed(_))
    }

    /// Whether this outcome leaves the entry queued for a future retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, Ter::Retry(_))
    }

    pub fn is_success(self) -> bool {
        matches!(self, Ter::Success | Ter::ClaimedFee)
    }

    pub fn applied(self) -> bool {
        matches!(self, Ter::Success | Ter::ClaimedFee)
    }

    /// Whether `preclaim` judged this likely to claim a fee even if it did
    /// not fully succeed.
    pub fn likely_to_claim_fee(self) -> bool {
        !matches!(self, Ter::Malformed(_) | Ter::Local(_))
    }
}

impl Display for Ter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ter::Malformed(Malformed::BadPath) => write!(f, "temBAD_PATH"),
            Ter::Malformed(Malformed::BadSequence) => write!(f, "temBAD_SEQUENCE"),
            Ter::Malformed(Malformed::InvalidFlag) => write!(f, "temINVALID_FLAG"),
            Ter::Local(Local::InsufficientFeeP) => write!(f, "telINSUF_FEE_P"),
            Ter::Local(Local::CanNotQueueFee) => write!(f, "telCAN_NOT_QUEUE_FEE"),
            Ter::Local(Local::CanNotQueueFull) => write!(f, "telCAN_NOT_QUEUE_FULL"),
            Ter::Local(Local::CanNotQueueBlocks) => write!(f, "telCAN_NOT_QUEUE_BLOCKS"),
            Ter::Local(Local::CanNotQueue) => write!(f, "telCAN_NOT_QUEUE"),
            Ter::Local(Local::FailedProcessing) => write!(f, "telFAILED_PROCESSING"),
            Ter::Retry(Retry::Retry) => write!(f, "terRETRY"),
            Ter::Retry(Retry::PreSeq) => write!(f, "terPRE_SEQ"),
            Ter::TefFailure(TefFailure::PastSeq) => write!(f, "tefPAST_SEQ"),
            Ter::TefFailure(TefFailure::MaxLedger) => write!(f, "tefMAX_LEDGER"),
            Ter::TefFailure(TefFailure::Failure) => write!(f, "tefFAILURE"),
            Ter::ClaimedFee => write!(f, "tecCLAIMED_FEE"),
            Ter::Queued => write!(f, "terQUEUED"),
            Ter::Success => write!(f, "tesSUCCESS"),
        }
    }
}
