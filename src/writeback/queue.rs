//! Bounded write-behind queue with a single persisting consumer.
//!
//! Producers hand over [`WriteBatch`]es with [`WriteBehindQueue::enqueue`],
//! waiting at most the configured enqueue timeout for buffer space. One
//! spawned task dequeues batches, deduplicates them and writes images to the
//! content store, then metadata for the records whose image landed. It is
//! the only writer of either cache tier.
//!
//! Lifecycle: `Created -> Running -> Draining -> Stopped`. Shutdown lets the
//! consumer finish the batch in hand, then applies the [`ShutdownPolicy`] to
//! whatever is still buffered.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thumbcache_common::{Error, Result};
use thumbcache_store::MetadataCache;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::batch::WriteBatch;

/// Default number of batches the buffer holds.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default longest wait for buffer space before a batch is refused.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(250);

/// Lifecycle state of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Created,
    Running,
    Draining,
    Stopped,
}

impl QueueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to buffered batches at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Persist every batch accepted before shutdown.
    #[default]
    Drain,
    /// Drop buffered batches and log how many were lost.
    Discard,
}

impl fmt::Display for ShutdownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drain => "drain",
            Self::Discard => "discard",
        })
    }
}

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub capacity: usize,
    pub enqueue_timeout: Duration,
    pub shutdown: ShutdownPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
            shutdown: ShutdownPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    completed_batches: AtomicU64,
    persisted_records: AtomicU64,
    failed_records: AtomicU64,
    discarded_batches: AtomicU64,
}

impl Counters {
    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of the queue, also returned by shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub state: QueueState,
    pub policy: ShutdownPolicy,
    pub capacity: usize,
    /// Accepted batches not yet persisted or discarded.
    pub pending: u64,
    pub accepted: u64,
    /// Batches refused because the buffer stayed full.
    pub rejected: u64,
    pub completed_batches: u64,
    pub persisted_records: u64,
    pub failed_records: u64,
    pub discarded_batches: u64,
}

struct Inner {
    state: QueueState,
    sender: Option<mpsc::Sender<WriteBatch>>,
    receiver: Option<mpsc::Receiver<WriteBatch>>,
    worker: Option<JoinHandle<()>>,
}

/// Handle to the write-behind buffer and its consumer task.
pub struct WriteBehindQueue {
    cache: Arc<MetadataCache>,
    settings: QueueSettings,
    inner: Mutex<Inner>,
    stop: watch::Sender<bool>,
    counters: Arc<Counters>,
}

impl WriteBehindQueue {
    /// Create a queue in the `Created` state. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(cache: Arc<MetadataCache>, mut settings: QueueSettings) -> Self {
        settings.capacity = settings.capacity.max(1);
        let (sender, receiver) = mpsc::channel(settings.capacity);
        let (stop, _) = watch::channel(false);

        Self {
            cache,
            settings,
            inner: Mutex::new(Inner {
                state: QueueState::Created,
                sender: Some(sender),
                receiver: Some(receiver),
                worker: None,
            }),
            stop,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn state(&self) -> QueueState {
        self.inner.lock().state
    }

    /// Spawn the consumer task. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != QueueState::Created {
            return Err(Error::QueueClosed(format!(
                "cannot start from state {}",
                inner.state
            )));
        }

        let receiver = inner
            .receiver
            .take()
            .ok_or_else(|| Error::internal("write-behind receiver missing"))?;

        inner.worker = Some(tokio::spawn(consume(
            receiver,
            self.stop.subscribe(),
            self.cache.clone(),
            self.counters.clone(),
        )));
        inner.state = QueueState::Running;

        info!(
            capacity = self.settings.capacity,
            policy = %self.settings.shutdown,
            "Write-behind queue started"
        );
        Ok(())
    }

    /// Hand a batch to the consumer.
    ///
    /// Fails with `InvalidInput` for an empty batch, `QueueClosed` unless
    /// the queue is running, and `QueueOverloaded` when no buffer slot frees
    /// up within the enqueue timeout.
    pub async fn enqueue(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::invalid_input("empty write batch"));
        }

        let sender = {
            let inner = self.inner.lock();
            match (inner.state, &inner.sender) {
                (QueueState::Running, Some(sender)) => sender.clone(),
                (state, _) => return Err(Error::QueueClosed(state.to_string())),
            }
        };

        let records = batch.len();
        match sender
            .send_timeout(batch, self.settings.enqueue_timeout)
            .await
        {
            Ok(()) => {
                Counters::add(&self.counters.accepted, 1);
                debug!(records, "Write batch enqueued");
                Ok(())
            }
            Err(SendTimeoutError::Timeout(_)) => {
                Counters::add(&self.counters.rejected, 1);
                warn!(
                    records,
                    wait_ms = self.settings.enqueue_timeout.as_millis() as u64,
                    "Write-behind queue full; batch refused"
                );
                Err(Error::QueueOverloaded)
            }
            Err(SendTimeoutError::Closed(_)) => {
                Err(Error::QueueClosed("consumer stopped".to_string()))
            }
        }
    }

    /// Stop accepting batches and wait for the consumer to finish.
    ///
    /// Callers bound this with their own timeout. Calling it again, or on a
    /// queue that never started, just reports the current counters.
    pub async fn shutdown(&self) -> QueueStats {
        let worker = {
            let mut inner = self.inner.lock();
            match inner.state {
                QueueState::Created => {
                    inner.state = QueueState::Stopped;
                    inner.sender = None;
                    inner.receiver = None;
                    None
                }
                QueueState::Running => {
                    inner.state = QueueState::Draining;
                    inner.sender = None;
                    inner.worker.take()
                }
                QueueState::Draining | QueueState::Stopped => None,
            }
        };

        if let Some(worker) = worker {
            info!(
                policy = %self.settings.shutdown,
                pending = self.pending(),
                "Stopping write-behind queue"
            );
            if self.settings.shutdown == ShutdownPolicy::Discard {
                self.stop.send_replace(true);
            }
            if let Err(e) = worker.await {
                error!(error = %e, "Write-behind consumer task failed");
            }
            self.inner.lock().state = QueueState::Stopped;

            let stats = self.stats();
            info!(
                persisted = stats.persisted_records,
                failed = stats.failed_records,
                discarded = stats.discarded_batches,
                "Write-behind queue stopped"
            );
            return stats;
        }

        self.stats()
    }

    pub fn stats(&self) -> QueueStats {
        let c = &self.counters;
        QueueStats {
            state: self.state(),
            policy: self.settings.shutdown,
            capacity: self.settings.capacity,
            pending: self.pending(),
            accepted: Counters::get(&c.accepted),
            rejected: Counters::get(&c.rejected),
            completed_batches: Counters::get(&c.completed_batches),
            persisted_records: Counters::get(&c.persisted_records),
            failed_records: Counters::get(&c.failed_records),
            discarded_batches: Counters::get(&c.discarded_batches),
        }
    }

    fn pending(&self) -> u64 {
        let c = &self.counters;
        let done = Counters::get(&c.completed_batches) + Counters::get(&c.discarded_batches);
        Counters::get(&c.accepted).saturating_sub(done)
    }
}

/// Consumer loop. Exits when every sender is gone and the buffer is empty,
/// or right after the current batch once a discard stop is signalled.
async fn consume(
    mut receiver: mpsc::Receiver<WriteBatch>,
    mut stop: watch::Receiver<bool>,
    cache: Arc<MetadataCache>,
    counters: Arc<Counters>,
) {
    info!(backend = cache.backend_name(), "Write-behind consumer started");

    loop {
        let batch = tokio::select! {
            biased;
            Ok(()) = stop.changed() => break,
            batch = receiver.recv() => match batch {
                Some(batch) => batch,
                None => break,
            },
        };
        persist_batch(&cache, &counters, batch).await;
    }

    if *stop.borrow() {
        receiver.close();
        let mut batches = 0;
        let mut records = 0;
        while let Ok(batch) = receiver.try_recv() {
            batches += 1;
            records += batch.len();
        }
        if batches > 0 {
            Counters::add(&counters.discarded_batches, batches);
            warn!(batches, records, "Discarded buffered write batches on shutdown");
        }
    }

    info!("Write-behind consumer stopped");
}

async fn persist_batch(cache: &MetadataCache, counters: &Counters, batch: WriteBatch) {
    let batch = batch.dedup();
    let total = batch.len();

    let mut written = Vec::with_capacity(total);
    for record in batch.into_records() {
        match cache.content().write(record.id(), &record.image).await {
            Ok(_) => written.push(record),
            Err(e) => {
                let err = Error::persist_failed(format!("image for {}: {e}", record.id()));
                error!(id = %record.id(), error = %err, "Failed to persist thumbnail image");
                Counters::add(&counters.failed_records, 1);
            }
        }
    }

    if !written.is_empty() {
        match cache.set_batch(&written).await {
            Ok(()) => Counters::add(&counters.persisted_records, written.len()),
            Err(e) => {
                let err = Error::persist_failed(format!("metadata: {e}"));
                error!(records = written.len(), error = %err, "Failed to persist thumbnail metadata");
                Counters::add(&counters.failed_records, written.len());
            }
        }
    }

    Counters::add(&counters.completed_batches, 1);
    debug!(records = total, written = written.len(), "Write batch processed");
}
