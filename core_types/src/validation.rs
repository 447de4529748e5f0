//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

use crate::ids::{LedgerId, NodeId, Seq};

/// A signed assertion by a node that a specific ledger is the result of its
/// consensus round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub node_id: NodeId,
    /// Raw public key bytes used to verify `node_id`'s signature. Signature
    /// verification itself is a collaborator concern; this field is
    /// carried so the store can report it back to callers that need to
    /// re-verify or display it.
    pub public_key: Vec<u8>,
    pub ledger_id: LedgerId,
    pub seq: Seq,
    /// Wall-clock time the validator claims to have signed at.
    pub sign_time: u64,
    /// Wall-clock time this node first observed the validation.
    pub seen_time: u64,
    /// A "full" validation covers every transaction the validator applied;
    /// a partial validation (not full) is used during some recovery paths.
    pub full: bool,
    pub trusted: bool,
    /// Validator-reported local load fee, if published.
    pub load_fee: Option<u32>,
}

impl Validation {
    pub fn key(&self) -> (NodeId, LedgerId) {
        (self.node_id, self.ledger_id)
    }
}
