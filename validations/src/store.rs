//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The trusted/untrusted validation collection and the network-preferred-
//! ledger algorithm built on top of it.

use std::collections::{HashMap, HashSet};

use log::{debug, trace, warn};

use ledger_core_types::{
    ids::{LedgerId, NodeId, Seq},
    ledger::Ledger,
    validation::Validation,
};

use crate::{error::AddOutcome, parms::ValidationParms, seq_enforcer::SeqEnforcer};

const LOG_TARGET: &str = "ledger_validations::store";

/// Given a ledger id and a target (lower or equal) sequence, resolve the id
/// of that ledger's ancestor at the target height. This crate holds no
/// ledger storage of its own; every method that needs to walk ancestry takes
/// this oracle as a parameter rather than owning a chain cache.
pub trait AncestryOracle {
    fn ancestor(&self, ledger_id: LedgerId, target_seq: Seq) -> Option<LedgerId>;
}

impl<F: Fn(LedgerId, Seq) -> Option<LedgerId>> AncestryOracle for F {
    fn ancestor(&self, ledger_id: LedgerId, target_seq: Seq) -> Option<LedgerId> {
        self(ledger_id, target_seq)
    }
}

/// The validation store. `&mut self` throughout; thread-sharing is the job
/// of [`crate::handle::ValidationsHandle`].
pub struct ValidationStore {
    parms: ValidationParms,
    current: HashMap<NodeId, Validation>,
    by_ledger: HashMap<LedgerId, HashSet<NodeId>>,
    seq_enforcers: HashMap<NodeId, SeqEnforcer>,
    stale: Vec<Validation>,
}

impl ValidationStore {
    pub fn new(parms: ValidationParms) -> Self {
        Self {
            parms,
            current: HashMap::new(),
            by_ledger: HashMap::new(),
            seq_enforcers: HashMap::new(),
            stale: Vec::new(),
        }
    }

    /// Accepts `v` as the node's current validation if it passes the sign-
    /// time/seen-time freshness windows and the node's sequence enforcer;
    /// otherwise rejects it without disturbing the prior current validation.
    pub fn add(&mut self, node_id: NodeId, v: Validation, now: u64) -> AddOutcome {
        let parms = &self.parms;
        let sign_window_ok = v.sign_time + parms.validation_current_early.as_secs() >= now
            && v.sign_time <= now + parms.validation_current_wall.as_secs();
        let seen_window_ok = v.seen_time + parms.validation_current_local.as_secs() >= now
            && v.seen_time <= now + parms.validation_current_local.as_secs();
        if !sign_window_ok || !seen_window_ok {
            trace!(target: LOG_TARGET, "validation from {node_id} is stale (signTime={}, seenTime={})", v.sign_time, v.seen_time);
            return AddOutcome::Stale;
        }

        let enforcer = self.seq_enforcers.entry(node_id).or_default();
        if !enforcer.advance(v.seq, now, parms.validation_set_expires.as_secs()) {
            warn!(target: LOG_TARGET, "validation from {node_id} violates monotone seq (seq={})", v.seq);
            return AddOutcome::BadSeq;
        }

        if let Some(prior) = self.current.remove(&node_id) {
            if let Some(nodes) = self.by_ledger.get_mut(&prior.ledger_id) {
                nodes.remove(&node_id);
                if nodes.is_empty() {
                    self.by_ledger.remove(&prior.ledger_id);
                }
            }
            self.stale.push(prior);
        }

        debug!(target: LOG_TARGET, "accepted validation from {node_id} for {} @ {}", v.ledger_id, v.seq);
        self.by_ledger.entry(v.ledger_id).or_default().insert(node_id);
        self.current.insert(node_id, v);
        AddOutcome::Current
    }

    /// Drops validations whose `sign_time` has aged past
    /// `validation_set_expires`.
    pub fn expire(&mut self, now: u64) {
        let expires = self.parms.validation_set_expires.as_secs();
        let expired: Vec<NodeId> = self
            .current
            .iter()
            .filter(|(_, v)| now.saturating_sub(v.sign_time) > expires)
            .map(|(node, _)| *node)
            .collect();

        for node_id in expired {
            if let Some(v) = self.current.remove(&node_id) {
                if let Some(nodes) = self.by_ledger.get_mut(&v.ledger_id) {
                    nodes.remove(&node_id);
                    if nodes.is_empty() {
                        self.by_ledger.remove(&v.ledger_id);
                    }
                }
                debug!(target: LOG_TARGET, "expired validation from {node_id}");
                self.stale.push(v);
            }
        }
    }

    /// Move every remaining current validation (plus anything already
    /// staged as stale) into `sink`, for shutdown.
    pub fn flush(&mut self, sink: &mut Vec<Validation>) {
        sink.append(&mut self.stale);
        sink.extend(self.current.drain().map(|(_, v)| v));
        self.by_ledger.clear();
    }

    /// Flips the `trusted` bit on stored current validations; does not
    /// affect `seq_enforcers` or indexing, since both are keyed by node
    /// identity regardless of trust.
    pub fn trust_changed(&mut self, now_trusted: &HashSet<NodeId>, now_untrusted: &HashSet<NodeId>) {
        for (node_id, v) in self.current.iter_mut() {
            if now_trusted.contains(node_id) {
                v.trusted = true;
            } else if now_untrusted.contains(node_id) {
                v.trusted = false;
            }
        }
    }

    pub fn current_trusted(&self) -> Vec<Validation> {
        self.current.values().filter(|v| v.trusted).cloned().collect()
    }

    pub fn num_trusted_for_ledger(&self, id: LedgerId) -> usize {
        self.by_ledger
            .get(&id)
            .map(|nodes| nodes.iter().filter(|n| self.current.get(n).map(|v| v.trusted).unwrap_or(false)).count())
            .unwrap_or(0)
    }

    pub fn get_trusted_for_ledger(&self, id: LedgerId) -> Vec<Validation> {
        self.by_ledger
            .get(&id)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|n| self.current.get(n))
                    .filter(|v| v.trusted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Observed load fee levels from trusted validators currently endorsing
    /// `id`. `base` is substituted for validators that did not publish a
    /// `load_fee`.
    pub fn fees(&self, id: LedgerId, base: u32) -> Vec<u32> {
        self.get_trusted_for_ledger(id).iter().map(|v| v.load_fee.unwrap_or(base)).collect()
    }

    /// Trusted nodes whose current validation sits strictly after `ledger`
    /// and descends from it.
    pub fn get_nodes_after<O: AncestryOracle>(&self, ledger: &Ledger, ledger_id: LedgerId, oracle: &O) -> usize {
        self.current
            .values()
            .filter(|v| v.trusted && v.seq > ledger.seq)
            .filter(|v| oracle.ancestor(v.ledger_id, ledger.seq) == Some(ledger_id))
            .count()
    }

    /// The ledger this node should treat as its working tip. Scores every
    /// current trusted validation's
    /// ancestor chain at or above `min_seq`, then applies the same rule the
    /// original does: if `curr` sits on the winning chain (an ancestor or
    /// descendant of it), stay at `curr` rather than jump ahead or behind on
    /// our own branch; only switch when the winning chain is a genuinely
    /// different branch than the one we are on. `None` only when the store
    /// has never held a trusted validation at all; once it has, a query
    /// below `min_seq` still resolves, falling back to `curr` itself.
    pub fn get_preferred<O: AncestryOracle>(&self, curr: &Ledger, min_seq: Seq, oracle: &O) -> Option<(Seq, LedgerId)> {
        if !self.current.values().any(|v| v.trusted) {
            return None;
        }

        let tally = self.tally_ancestor_support(min_seq, oracle);
        let Some((best, _)) = tally.into_iter().max_by(|a, b| a.1.cmp(&b.1).then((a.0).0.cmp(&(b.0).0)).then((a.0).1.cmp(&(b.0).1))) else {
            return Some((curr.seq, curr.id));
        };

        if Self::same_chain(curr, best, oracle) {
            Some((curr.seq, curr.id))
        } else {
            Some(best)
        }
    }

    /// As [`Self::get_preferred`], but used before any trusted validation has
    /// ever arrived (e.g. at startup) — in that gap, fall back to a simple
    /// plurality vote over externally reported `peerCounts` (ties favour the
    /// higher `LedgerID`), with `curr` itself as the default if nothing
    /// outweighs it. Once the store holds a real trusted validation,
    /// `peer_counts` is ignored entirely in favour of `get_preferred`.
    pub fn get_preferred_lcl<O: AncestryOracle>(
        &self,
        curr: &Ledger,
        min_seq: Seq,
        peer_counts: &HashMap<LedgerId, usize>,
        oracle: &O,
    ) -> LedgerId {
        match self.get_preferred(curr, min_seq, oracle) {
            Some((_, id)) => id,
            None => {
                let mut net_id = curr.id;
                let mut net_support = peer_counts.get(&curr.id).copied().unwrap_or(0);
                for (&id, &count) in peer_counts {
                    if count > net_support || (count == net_support && id > net_id) {
                        net_id = id;
                        net_support = count;
                    }
                }
                net_id
            },
        }
    }

    /// Whether `curr` sits on the same chain as `(other_seq, other_id)` —
    /// either is an ancestor of the other, including equality.
    fn same_chain<O: AncestryOracle>(curr: &Ledger, (other_seq, other_id): (Seq, LedgerId), oracle: &O) -> bool {
        if other_id == curr.id && other_seq == curr.seq {
            return true;
        }
        if other_seq >= curr.seq {
            oracle.ancestor(other_id, curr.seq) == Some(curr.id)
        } else {
            oracle.ancestor(curr.id, other_seq) == Some(other_id)
        }
    }

    /// Tally support for `(seq, LedgerID)` pairs at or above `min_seq` by
    /// walking each current trusted validation's ancestor chain one step at
    /// a time.
    fn tally_ancestor_support<O: AncestryOracle>(&self, min_seq: Seq, oracle: &O) -> HashMap<(Seq, LedgerId), usize> {
        let mut support: HashMap<(Seq, LedgerId), usize> = HashMap::new();
        for v in self.current.values().filter(|v| v.trusted) {
            let mut seq = v.seq;
            let mut id = v.ledger_id;
            loop {
                if seq < min_seq {
                    break;
                }
                *support.entry((seq, id)).or_insert(0) += 1;
                if seq <= min_seq || seq.as_u32() == 0 {
                    break;
                }
                let parent_seq = Seq(seq.as_u32() - 1);
                match oracle.ancestor(v.ledger_id, parent_seq) {
                    Some(parent_id) => {
                        seq = parent_seq;
                        id = parent_id;
                    },
                    None => break,
                }
            }
        }
        support
    }
}
