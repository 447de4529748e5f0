//  Copyright 2024 The Ledger Core Contributors
//  SPDX-License-Identifier: BSD-3-Clause

//! The Transaction Queue. Bounded priority queue of pending
//! transactions ordered by fee level, with per-account sequencing,
//! replacement and fee-escalation admission.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use log::{debug, trace, warn};

use ledger_core_types::{
    ids::{AccountId, Seq},
    ter::{Local, Ter},
    tx::{Drops, Tx, TxCategory, TxConsequences},
};

use crate::{
    adaptor::{ApplyFlags, LedgerView, MutableLedgerView, PreflightResult, TxEngine},
    entry::{EntryId, InsertionSeq, MaybeTx, RETRIES_ALLOWED},
    fee::{fee_level_paid, sum_of_squares_range, BASE_LEVEL},
    metrics::{mul_div_floor, scale_fee_level, FeeMetrics, FeeMetricsSnapshot},
    setup::Setup,
};

const LOG_TARGET: &str = "ledger_txq::queue";

/// RPC-visible projection of the queue's state. Converting `*_level` fields
/// to drops (`mulDiv`) is left to the embedding node's RPC surface, which
/// this core does not implement — the fields here are exactly what that
/// conversion needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TxQMetrics {
    pub tx_count: usize,
    pub tx_q_max_size: Option<u64>,
    pub tx_in_ledger: u64,
    pub tx_per_ledger: u32,
    pub reference_fee_level: u64,
    pub min_processing_fee_level: u64,
    pub med_fee_level: u64,
    pub open_ledger_fee_level: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ByFeeKey {
    /// A lower `neg_fee_level` sorts first, so ascending `BTreeSet`
    /// iteration order walks fee level highest-to-lowest, matching the
    /// original's `(feeLevel desc, insertion order)` multiset order.
    neg_fee_level: std::cmp::Reverse<u64>,
    insertion_seq: InsertionSeq,
    entry_id: EntryId,
}

#[derive(Default)]
struct AccountBucket {
    transactions: BTreeMap<Seq, EntryId>,
    /// Caps future `retriesRemaining` at 1 for every entry once set.
    retry_penalty: bool,
    /// Allows dropping the account's lowest-priority entry under memory
    /// pressure once set.
    drop_penalty: bool,
}

/// The Transaction Queue. `&mut self` throughout: a single logical lock per
/// component is the rule, so this type is deliberately not
/// internally synchronized — see `handle::TxQHandle` for a thread-shared
/// wrapper.
pub struct TxQ {
    setup: Setup,
    metrics: FeeMetrics,
    max_size: u64,
    arena: HashMap<EntryId, MaybeTx>,
    by_account: HashMap<AccountId, AccountBucket>,
    by_fee: BTreeSet<ByFeeKey>,
    next_entry_id: u64,
    next_insertion_seq: u64,
}

impl TxQ {
    pub fn new(setup: Setup) -> Self {
        let metrics = FeeMetrics::new(&setup);
        let max_size = metrics.max_queue_size(&setup);
        Self {
            setup,
            metrics,
            max_size,
            arena: HashMap::new(),
            by_account: HashMap::new(),
            by_fee: BTreeSet::new(),
            next_entry_id: 0,
            next_insertion_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.by_fee.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fee.is_empty()
    }

    fn is_full(&self) -> bool {
        self.by_fee.len() as u64 >= self.max_size
    }

    /// Whether the queue is at least `pct` percent full.
    fn is_full_pct(&self, pct: u64) -> bool {
        self.by_fee.len() as u64 * 100 >= self.max_size * pct
    }

    /// Snapshot of the queue's current fee-escalation metrics.
    pub fn get_metrics<V: LedgerView>(&self, view: &V) -> TxQMetrics {
        let snapshot = self.metrics.snapshot();
        let min_processing_fee_level = if self.is_full() {
            self.by_fee
                .iter()
                .next_back()
                .map(|k| k.neg_fee_level.0 + 1)
                .unwrap_or(BASE_LEVEL)
        } else {
            BASE_LEVEL
        };
        TxQMetrics {
            tx_count: self.by_fee.len(),
            tx_q_max_size: Some(self.max_size),
            tx_in_ledger: view.tx_count(),
            tx_per_ledger: snapshot.txns_expected,
            reference_fee_level: BASE_LEVEL,
            min_processing_fee_level,
            med_fee_level: snapshot.escalation_multiplier,
            open_ledger_fee_level: scale_fee_level(&snapshot, view.tx_count()),
        }
    }

    /// Recomputes fee-escalation state from the ledger that just closed.
    pub fn process_closed_ledger(&mut self, closed_fee_levels: Vec<u64>, time_leap: bool, ledger_seq: Seq) {
        self.metrics.update(closed_fee_levels, time_leap, &self.setup);
        if !time_leap {
            self.max_size = self.metrics.max_queue_size(&self.setup);
        }

        let expired: Vec<EntryId> = self
            .by_fee
            .iter()
            .filter(|key| {
                let entry = &self.arena[&key.entry_id];
                entry.last_valid.is_some_and(|lv| lv <= ledger_seq)
            })
            .map(|key| key.entry_id)
            .collect();
        for entry_id in expired {
            let account = self.arena[&entry_id].account;
            if let Some(bucket) = self.by_account.get_mut(&account) {
                bucket.drop_penalty = true;
            }
            self.remove_entry(entry_id);
        }

        self.by_account.retain(|_, bucket| !bucket.transactions.is_empty());
    }

    fn fee_level_key(&self, entry_id: EntryId) -> ByFeeKey {
        let entry = &self.arena[&entry_id];
        ByFeeKey {
            neg_fee_level: std::cmp::Reverse(entry.fee_level),
            insertion_seq: entry.insertion_seq,
            entry_id,
        }
    }

    fn remove_entry(&mut self, entry_id: EntryId) -> Option<MaybeTx> {
        let key = self.fee_level_key(entry_id);
        self.by_fee.remove(&key);
        let entry = self.arena.remove(&entry_id)?;
        if let Some(bucket) = self.by_account.get_mut(&entry.account) {
            bucket.transactions.remove(&entry.sequence);
        }
        Some(entry)
    }

    fn insert_entry(&mut self, entry: MaybeTx) -> EntryId {
        let entry_id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;
        let account = entry.account;
        let sequence = entry.sequence;
        self.arena.insert(entry_id, entry);
        self.by_account
            .entry(account)
            .or_default()
            .transactions
            .insert(sequence, entry_id);
        self.by_fee.insert(self.fee_level_key(entry_id));
        entry_id
    }

    /// Attempts to admit `tx`, either applying it directly or queueing it;
    /// returns the resulting `Ter` and whether the ledger view changed.
    pub fn apply<E: TxEngine>(&mut self, engine: &E, view: &mut E::View, tx: Tx, flags: ApplyFlags) -> (Ter, bool) {
        let account = tx.account;
        let tx_id = tx.id;
        let t_seq = tx.sequence;

        // 1. Preflight.
        let pfresult = engine.preflight(&tx, flags);
        if !pfresult.is_ok() {
            return (pfresult.ter, false);
        }

        // 2. Compute fee.
        let snapshot = self.metrics.snapshot();
        let base_fee = engine.calculate_base_fee(&*view, &tx);
        let fee_level_paid_value = fee_level_paid(tx.fee, base_fee, &self.setup);
        let required_fee_level = {
            let level = scale_fee_level(&snapshot, view.tx_count());
            if flags.prefer_queue {
                self.by_fee
                    .iter()
                    .next()
                    .map(|top| level.max(self.arena[&top.entry_id].fee_level))
                    .unwrap_or(level)
            } else {
                level
            }
        };

        // 3. Replacement check.
        let mut replaced: Option<EntryId> = None;
        let mut new_consequences: Option<TxConsequences> = None;
        if let Some(bucket) = self.by_account.get(&account) {
            if let Some(&existing_id) = bucket.transactions.get(&t_seq) {
                let existing = &self.arena[&existing_id];
                let required_retry_level = increase(existing.fee_level, self.setup.retry_sequence_percent);
                let is_first = bucket.transactions.keys().next() == Some(&t_seq);
                let wins = fee_level_paid_value > required_retry_level
                    || (existing.fee_level < required_fee_level && fee_level_paid_value >= required_fee_level && is_first);
                if wins {
                    let has_successor = bucket.transactions.range((Bound::Excluded(t_seq), Bound::Unbounded)).next().is_some();
                    if has_successor && existing.category == TxCategory::Normal {
                        let consequences = engine.calculate_consequences(&pfresult, &tx);
                        if consequences.category == TxCategory::Blocker {
                            trace!(target: LOG_TARGET, "{} would replace a depended-on normal tx with a blocker", tx_id);
                            return (Ter::Local(Local::CanNotQueueBlocks), false);
                        }
                        new_consequences = Some(consequences);
                    }
                    trace!(target: LOG_TARGET, "{} replaces queued entry at ({}, {})", tx_id, account, t_seq);
                    replaced = Some(existing_id);
                } else {
                    return (Ter::Local(Local::CanNotQueueFee), false);
                }
            }
        }

        // 4. Multi-txn chain.
        let a_seq = view.account_sequence(account);
        let mut multi_txn_view: Option<E::View> = None;
        if let Some(a_seq) = a_seq {
            if a_seq < t_seq && self.can_be_held(&tx, &*view, replaced) {
                match self.build_chain_sandbox(engine, &*view, account, a_seq, t_seq, fee_level_paid_value, &tx) {
                    Ok(Some(sandbox)) => multi_txn_view = Some(sandbox),
                    Ok(None) => {},
                    Err(ter) => return (ter, false),
                }
            }
        }

        // 5. Preclaim.
        let pcresult = match &multi_txn_view {
            Some(sandbox) => engine.preclaim(&pfresult, sandbox, &tx),
            None => engine.preclaim(&pfresult, &*view, &tx),
        };
        if !pcresult.likely_to_claim_fee {
            return (pcresult.ter, false);
        }

        // 6. Fast path: tryClearAccountQueue.
        if !flags.prefer_queue && multi_txn_view.is_some() {
            if let Some(a_seq) = a_seq {
                let fast_path_ready = self
                    .by_account
                    .get(&account)
                    .and_then(|b| b.transactions.get(&a_seq))
                    .map(|&id| self.arena[&id].retries_remaining == RETRIES_ALLOWED)
                    .unwrap_or(false)
                    && fee_level_paid_value > required_fee_level
                    && required_fee_level > BASE_LEVEL
                    && base_fee.0 != 0;
                if fast_path_ready {
                    let tx_count_before = view.tx_count();
                    if let Some(result) =
                        self.try_clear_account_queue(engine, view, &tx, account, a_seq, fee_level_paid_value, &pfresult, tx_count_before, &snapshot)
                    {
                        return (result, true);
                    }
                }
            }
        }

        // 7. Immediate apply.
        if multi_txn_view.is_none() && fee_level_paid_value >= required_fee_level {
            trace!(target: LOG_TARGET, "applying {} directly to the open ledger", tx_id);
            let result = view.apply_tx(&tx);
            if result.applied() {
                if let Some(replaced_id) = replaced {
                    self.remove_entry(replaced_id);
                }
            }
            return (result, result.applied());
        }

        // 8. Queue.
        if multi_txn_view.is_none() && !self.can_be_held(&tx, &*view, replaced) {
            return (Ter::Local(Local::CanNotQueue), false);
        }

        if replaced.is_none() && self.is_full() {
            let worst_key = self.by_fee.iter().next_back().copied();
            if let Some(worst_key) = worst_key {
                let worst_entry_account = self.arena[&worst_key.entry_id].account;
                let worst_entry_fee_level = self.arena[&worst_key.entry_id].fee_level;
                if worst_entry_account == account {
                    return (Ter::Local(Local::CanNotQueueFull), false);
                }
                let end_effective_fee_level = self.account_average_fee_level(worst_entry_account, worst_entry_fee_level, fee_level_paid_value);
                if fee_level_paid_value > end_effective_fee_level {
                    let drop_id = *self.by_account[&worst_entry_account].transactions.values().next_back().unwrap();
                    warn!(
                        target: LOG_TARGET,
                        "queue full; dropping lowest-priority entry of account {} (avg fee level {}) for {} (fee level {})",
                        worst_entry_account, end_effective_fee_level, tx_id, fee_level_paid_value
                    );
                    self.remove_entry(drop_id);
                } else {
                    return (Ter::Local(Local::CanNotQueueFull), false);
                }
            }
        }

        if let Some(replaced_id) = replaced {
            self.remove_entry(replaced_id);
        }

        let consequences = new_consequences.unwrap_or_else(|| engine.calculate_consequences(&pfresult, &tx));
        let entry = MaybeTx {
            tx: tx.clone(),
            tx_id,
            fee_level: fee_level_paid_value,
            account,
            sequence: t_seq,
            last_valid: tx.last_ledger_sequence,
            prior_tx_id: tx.account_txn_id,
            category: consequences.category,
            potential_spend: consequences.potential_spend,
            retries_remaining: RETRIES_ALLOWED,
            last_result: None,
            flags: ApplyFlags::default(),
            pfresult,
            insertion_seq: InsertionSeq(self.next_insertion_seq),
        };
        self.next_insertion_seq += 1;
        self.insert_entry(entry);
        debug!(target: LOG_TARGET, "queued {} from account {} at sequence {}", tx_id, account, t_seq);
        (Ter::Queued, false)
    }

    /// Whether `tx` is eligible to be held in the queue rather than rejected
    /// outright. Only the single `account_txn_id` linkage field is modelled,
    /// not a full predecessor graph.
    fn can_be_held<V: LedgerView>(&self, tx: &Tx, view: &V, replacing: Option<EntryId>) -> bool {
        if tx.account_txn_id.is_some() {
            return false;
        }
        if let Some(last_valid) = tx.last_ledger_sequence {
            if last_valid.as_u32() < view.seq().as_u32() + self.setup.minimum_last_ledger_buffer {
                return false;
            }
        }
        match self.by_account.get(&tx.account) {
            None => true,
            Some(bucket) => {
                if replacing.is_some() {
                    return true;
                }
                if (bucket.transactions.len() as u32) < self.setup.maximum_txn_per_account {
                    return true;
                }
                bucket
                    .transactions
                    .keys()
                    .next_back()
                    .is_some_and(|&last| tx.sequence < last)
            },
        }
    }

    /// Validates the contiguous chain of queued predecessors for `account`
    /// up to `t_seq - 1` and, if it holds, projects a sandboxed view with
    /// the account advanced to `t_seq`.
    ///
    /// Returns `Ok(None)` when the chain is absent/non-contiguous (not an
    /// error — admission simply proceeds without a multi-txn view),
    /// `Err(ter)` for a hard rejection (insufficient premium, or a blocker
    /// dependency).
    #[allow(clippy::too_many_arguments)]
    fn build_chain_sandbox<E: TxEngine>(
        &self,
        engine: &E,
        view: &E::View,
        account: AccountId,
        a_seq: Seq,
        t_seq: Seq,
        fee_level_paid_value: u64,
        tx: &Tx,
    ) -> Result<Option<E::View>, Ter> {
        let bucket = match self.by_account.get(&account) {
            Some(b) => b,
            None => return Ok(None),
        };

        let t_seq_minus_1 = Seq(t_seq.as_u32().saturating_sub(1));
        let mut total_fee = Drops::zero();
        let mut total_spend = Drops::zero();
        let mut include_current_fee = false;
        let mut working_seq = a_seq;
        let mut reached_predecessor = false;

        for (&seq, &entry_id) in bucket.transactions.range(a_seq..) {
            if working_seq < t_seq && seq != working_seq {
                return Ok(None);
            }
            let entry = &self.arena[&entry_id];

            if seq == t_seq_minus_1 {
                let required_multi_level = increase(entry.fee_level, self.setup.multi_txn_percent);
                if fee_level_paid_value <= required_multi_level {
                    return Err(Ter::Local(Local::InsufficientFeeP));
                }
                reached_predecessor = true;
            }

            if seq == t_seq {
                include_current_fee = bucket.transactions.range((Bound::Excluded(seq), Bound::Unbounded)).next().is_some();
                working_seq = working_seq.next();
                continue;
            }

            if seq < t_seq && entry.category == TxCategory::Blocker {
                return Err(Ter::Local(Local::CanNotQueueBlocks));
            }

            total_fee = total_fee + entry.tx.fee;
            total_spend = total_spend + entry.potential_spend;
            working_seq = working_seq.next();
        }

        if !reached_predecessor || working_seq < t_seq {
            return Ok(None);
        }

        if include_current_fee {
            total_fee = total_fee + tx.fee;
        }
        let mut sandbox = engine.clone_view(view);
        engine.project_account(&mut sandbox, account, t_seq, total_fee + total_spend);
        Ok(Some(sandbox))
    }

    /// Atomically drains the queued chain `[a_seq, t_seq)` and the new tx
    /// into a sandbox, returning `Some(ter)` only when the whole series
    /// fully applied. Any other outcome (insufficient aggregate fee, a
    /// chain member failing to apply, `preclaim` rejecting) falls through to
    /// `None` so the caller continues with the normal immediate-apply/queue
    /// path; the result is discarded entirely unless it actually applied.
    #[allow(clippy::too_many_arguments)]
    fn try_clear_account_queue<E: TxEngine>(
        &mut self,
        engine: &E,
        view: &mut E::View,
        tx: &Tx,
        account: AccountId,
        a_seq: Seq,
        fee_level_paid_value: u64,
        pfresult: &PreflightResult,
        tx_count_before: u64,
        snapshot: &FeeMetricsSnapshot,
    ) -> Option<Ter> {
        let t_seq = tx.sequence;
        let series_size = (t_seq.as_u32() - a_seq.as_u32()) as u64 + 1;
        let current = tx_count_before;
        let last = current + series_size - 1;
        let target = snapshot.txns_expected as u64;
        let sum_range = sum_of_squares_range(current, last)?;
        let required_total = mul_div_floor(snapshot.escalation_multiplier, sum_range, target * target);

        let chain_ids: Vec<EntryId> = self
            .by_account
            .get(&account)?
            .transactions
            .range(a_seq..t_seq)
            .map(|(_, &id)| id)
            .collect();
        let total_paid: u64 = fee_level_paid_value + chain_ids.iter().map(|id| self.arena[id].fee_level).sum::<u64>();
        if total_paid < required_total {
            return None;
        }

        let mut sandbox = engine.clone_view(&*view);
        for &entry_id in &chain_ids {
            let entry_tx = self.arena[&entry_id].tx.clone();
            let result = sandbox.apply_tx(&entry_tx);
            let entry = self.arena.get_mut(&entry_id).expect("chain entry present");
            entry.retries_remaining = entry.retries_remaining.saturating_sub(1);
            entry.last_result = Some(result);
            if !result.applied() {
                return None;
            }
        }
        let pcresult = engine.preclaim(pfresult, &sandbox, tx);
        if !pcresult.likely_to_claim_fee {
            return None;
        }
        let result = sandbox.apply_tx(tx);
        if !result.applied() {
            return None;
        }
        *view = sandbox;
        for entry_id in chain_ids {
            self.remove_entry(entry_id);
        }
        Some(result)
    }

    /// Average-fee-level calculation used to decide whether an incoming
    /// high-fee transaction may evict the queue's lowest-priority account
    /// bucket under memory pressure.
    fn account_average_fee_level(&self, account: AccountId, worst_fee_level: u64, incoming_fee_level: u64) -> u64 {
        let bucket = &self.by_account[&account];
        if worst_fee_level > incoming_fee_level || bucket.transactions.len() == 1 {
            return worst_fee_level;
        }
        let count = bucket.transactions.len() as u64;
        let total: u64 = bucket.transactions.values().map(|id| self.arena[id].fee_level).sum();
        total / count
    }

    /// Walks the queue in fee-level order, applying as many transactions as
    /// will fit into the closing ledger. Returns whether any transaction was
    /// applied (the ledger changed).
    pub fn accept<E: TxEngine>(&mut self, view: &mut E::View) -> bool {
        let mut ledger_changed = false;
        let snapshot = self.metrics.snapshot();

        let mut cursor = self.by_fee.iter().next().copied();
        while let Some(key) = cursor {
            let account = self.arena[&key.entry_id].account;
            let sequence = self.arena[&key.entry_id].sequence;
            let fee_level = self.arena[&key.entry_id].fee_level;

            let is_first = self.by_account[&account].transactions.keys().next() == Some(&sequence);
            if !is_first {
                cursor = self.next_by_fee_after(key);
                continue;
            }

            let required_fee_level = scale_fee_level(&snapshot, view.tx_count());
            if fee_level < required_fee_level {
                break;
            }

            let entry_tx = self.arena[&key.entry_id].tx.clone();
            let result = view.apply_tx(&entry_tx);

            if result.applied() {
                ledger_changed = true;
                cursor = self.erase_and_advance(key);
                continue;
            }

            let retries_remaining = self.arena[&key.entry_id].retries_remaining;
            if result.is_terminal() || retries_remaining == 0 {
                let bucket = self.by_account.get_mut(&account).expect("account bucket present");
                if retries_remaining == 0 {
                    bucket.retry_penalty = true;
                } else {
                    bucket.drop_penalty = true;
                }
                cursor = self.erase_and_advance(key);
                continue;
            }

            let retry_penalty = self.by_account[&account].retry_penalty;
            {
                let entry = self.arena.get_mut(&key.entry_id).expect("entry present");
                if retry_penalty && entry.retries_remaining > 2 {
                    entry.retries_remaining = 1;
                } else {
                    entry.retries_remaining -= 1;
                }
                entry.last_result = Some(result);
            }

            let drop_penalty = self.by_account[&account].drop_penalty;
            let account_entry_count = self.by_account[&account].transactions.len();
            if drop_penalty && account_entry_count > 1 && self.is_full_pct(95) {
                let drop_id = *self.by_account[&account].transactions.values().next_back().unwrap();
                warn!(target: LOG_TARGET, "queue nearly full; dropping last entry of account {} after a retry", account);
                self.remove_entry(drop_id);
            }

            cursor = self.next_by_fee_after(key);
        }

        ledger_changed
    }

    fn next_by_fee_after(&self, key: ByFeeKey) -> Option<ByFeeKey> {
        self.by_fee.range((Bound::Excluded(key), Bound::Unbounded)).next().copied()
    }

    /// After a successful apply, prefer to continue with the same account's
    /// immediate successor when it strictly outranks the next by-fee
    /// candidate.
    fn erase_and_advance(&mut self, key: ByFeeKey) -> Option<ByFeeKey> {
        let account = self.arena[&key.entry_id].account;
        let sequence = self.arena[&key.entry_id].sequence;
        let fee_next = self.next_by_fee_after(key);

        let account_next_id = self.by_account[&account]
            .transactions
            .range((Bound::Excluded(sequence), Bound::Unbounded))
            .next()
            .map(|(&seq, &id)| (seq, id));

        let use_account_next = match account_next_id {
            Some((next_seq, next_id)) => {
                next_seq == sequence.next()
                    && fee_next
                        .map(|f| self.arena[&next_id].fee_level > self.arena[&f.entry_id].fee_level)
                        .unwrap_or(true)
            },
            None => false,
        };

        self.remove_entry(key.entry_id);

        if use_account_next {
            let (_, next_id) = account_next_id.expect("checked above");
            Some(self.fee_level_key(next_id))
        } else {
            fee_next
        }
    }
}

/// Scales a fee level up by `pct` percent, rounding down.
fn increase(level: u64, pct: u32) -> u64 {
    mul_div_floor(level, 100 + pct as u64, 100)
}
