//! XP batch aggregator - Coalesces per-message XP awards into periodic bulk writes.
//!
//! `record` updates the cached account immediately and adds the delta to a pending map keyed
//! by account. A timer drains the map and writes one row per account. A failed flush is
//! logged and its batch is dropped: XP is cosmetic, so at most one interval of awards is lost.

use crate::{
    core::{
        cache::{AccountKey, EconomyCache},
        ledger::StatField,
        store::{Store, XpIncrement},
    },
    errors::{Error, Result},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Observable state of the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XpBatchState {
    /// Nothing pending
    Idle,
    /// At least one delta waiting for the next flush
    Accumulating,
    /// A bulk write is in flight
    Flushing,
}

/// Outcome of one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Distinct accounts in the batch
    pub rows: usize,
    /// Awards coalesced into those rows
    pub messages: usize,
    /// Total XP in the batch
    pub xp: i64,
    /// Whether the batch reached the store
    pub persisted: bool,
}

#[derive(Debug, Default)]
struct PendingBatch {
    deltas: HashMap<AccountKey, i64>,
    messages: usize,
}

/// Buffers XP awards between flushes.
#[derive(Debug)]
pub struct XpAggregator {
    cache: Arc<EconomyCache>,
    store: Store,
    pending: Mutex<PendingBatch>,
    flush_lock: Mutex<()>,
    interval: Duration,
}

impl XpAggregator {
    /// Creates an idle aggregator flushing every `interval`.
    #[must_use]
    pub fn new(cache: Arc<EconomyCache>, store: Store, interval: Duration) -> Self {
        Self {
            cache,
            store,
            pending: Mutex::default(),
            flush_lock: Mutex::new(()),
            interval,
        }
    }

    /// Awards `delta` XP to an account. Only positive awards are accepted.
    ///
    /// The cached account changes now; the store catches up on the next flush. Never waits
    /// for a flush in progress.
    pub async fn record(&self, guild_id: u64, user_id: u64, delta: i64) -> Result<()> {
        if delta <= 0 {
            return Err(Error::invalid_amount("XP awards must be positive."));
        }
        let key = AccountKey::new(guild_id, user_id);
        if !self.cache.apply_deltas(key, &[(StatField::Xp, delta)]).await? {
            return Err(Error::NotRegistered {
                message: "You are not registered.".to_string(),
            });
        }

        let mut pending = self.pending.lock().await;
        *pending.deltas.entry(key).or_insert(0) += delta;
        pending.messages += 1;
        Ok(())
    }

    /// Number of distinct accounts waiting to be flushed.
    pub async fn pending_rows(&self) -> usize {
        self.pending.lock().await.deltas.len()
    }

    /// Pending delta for one account.
    pub async fn pending_delta(&self, guild_id: u64, user_id: u64) -> Option<i64> {
        self.pending
            .lock()
            .await
            .deltas
            .get(&AccountKey::new(guild_id, user_id))
            .copied()
    }

    /// Current state of the batch.
    pub async fn state(&self) -> XpBatchState {
        if self.flush_lock.try_lock().is_err() {
            return XpBatchState::Flushing;
        }
        if self.pending.lock().await.deltas.is_empty() {
            XpBatchState::Idle
        } else {
            XpBatchState::Accumulating
        }
    }

    /// Drains the pending set into one bulk write. A no-op when nothing is pending.
    pub async fn flush(&self) -> FlushReport {
        let _flushing = self.flush_lock.lock().await;
        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.deltas.is_empty() {
            return FlushReport::default();
        }

        let mut increments: Vec<XpIncrement> = batch
            .deltas
            .into_iter()
            .map(|(key, delta)| XpIncrement { key, delta })
            .collect();
        increments.sort_by_key(|increment| increment.key);

        let mut report = FlushReport {
            rows: increments.len(),
            messages: batch.messages,
            xp: increments.iter().map(|increment| increment.delta).sum(),
            persisted: false,
        };

        match self.store.add_xp_batch(&increments).await {
            Ok(matched) => {
                report.persisted = true;
                debug!(
                    "Flushed {} XP rows ({} messages, {} matched)",
                    report.rows, report.messages, matched
                );
            }
            Err(e) => {
                error!(
                    "XP flush failed, dropping {} rows ({} XP): {}",
                    report.rows, report.xp, e
                );
            }
        }
        report
    }

    /// Spawns the flush timer. On shutdown the task performs one last flush before exiting.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    #[instrument(skip_all, fields(interval = ?self.interval))]
    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;
        info!("XP flush task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let report = self.flush().await;
        info!("XP flush task stopped after final flush of {} rows", report.rows);
    }
}
