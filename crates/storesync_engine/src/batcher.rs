//! Debounced batching of outgoing change records.

use crate::channel::MessageChannel;
use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storesync_diff::ChangeRecord;
use storesync_protocol::{Envelope, SyncForClient};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Resolves when the batch holding an enqueued set of records is flushed.
#[derive(Debug)]
pub struct FlushReceipt {
    receiver: oneshot::Receiver<SyncResult<usize>>,
}

impl FlushReceipt {
    /// Waits for the flush.
    ///
    /// Yields the number of records in the flushed envelope, zero if the
    /// batch held no records and nothing was sent.
    pub async fn flushed(self) -> SyncResult<usize> {
        self.receiver.await.map_err(|_| SyncError::BatchDropped)?
    }
}

#[derive(Default)]
struct Batch {
    pending: Vec<Vec<ChangeRecord>>,
    receipts: Vec<oneshot::Sender<SyncResult<usize>>>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

struct Shared<C> {
    channel: Arc<C>,
    quiet_period: Duration,
    batch: Mutex<Batch>,
    sent: AtomicU64,
}

/// Coalesces change records into one envelope per quiet period.
///
/// Each [`enqueue`](Self::enqueue) restarts the quiet-period timer. When the
/// timer fires, everything enqueued since the last flush is concatenated in
/// enqueue order and sent as a single `SYNC_FOR_CLIENT_STORE` envelope.
/// Sends happen under the batch lock, so a flush never interleaves with an
/// immediate send.
pub struct OutgoingBatcher<C: MessageChannel> {
    shared: Arc<Shared<C>>,
}

impl<C: MessageChannel> Clone for OutgoingBatcher<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: MessageChannel + 'static> OutgoingBatcher<C> {
    /// Creates a batcher sending through `channel`.
    pub fn new(channel: Arc<C>, quiet_period: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                channel,
                quiet_period,
                batch: Mutex::new(Batch::default()),
                sent: AtomicU64::new(0),
            }),
        }
    }

    /// Queues `records` and restarts the quiet-period timer.
    ///
    /// The timer runs on the current tokio runtime. Without one the records
    /// stay queued until [`flush_now`](Self::flush_now) and
    /// [`SyncError::NoRuntime`] is returned.
    pub fn enqueue(&self, records: Vec<ChangeRecord>) -> SyncResult<FlushReceipt> {
        let (sender, receiver) = oneshot::channel();
        let mut batch = self.shared.batch.lock();
        batch.pending.push(records);
        batch.receipts.push(sender);
        if let Some(timer) = batch.timer.take() {
            timer.abort();
        }
        batch.generation += 1;

        let handle = tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let generation = batch.generation;
        let shared = Arc::clone(&self.shared);
        batch.timer = Some(handle.spawn(async move {
            tokio::time::sleep(shared.quiet_period).await;
            shared.flush_if_current(generation);
        }));
        trace!(pending = batch.pending.len(), "records enqueued");
        Ok(FlushReceipt { receiver })
    }

    /// Flushes pending records now, cancelling the timer.
    ///
    /// Returns the number of records sent.
    pub fn flush_now(&self) -> SyncResult<usize> {
        let mut batch = self.shared.batch.lock();
        self.shared.flush_locked(&mut batch)
    }

    /// Flushes pending records, then sends `envelope` on its own.
    pub fn send_immediately(&self, envelope: SyncForClient) -> SyncResult<()> {
        let mut batch = self.shared.batch.lock();
        self.shared.flush_locked(&mut batch)?;
        debug!(
            records = envelope.differences.len(),
            init = envelope.is_init_action,
            "sending immediately"
        );
        self.shared.send(Envelope::from(envelope))
    }

    /// Returns the number of record sets waiting to be flushed.
    pub fn pending_len(&self) -> usize {
        self.shared.batch.lock().pending.len()
    }

    /// Returns the number of envelopes sent so far.
    pub fn envelopes_sent(&self) -> u64 {
        self.shared.sent.load(Ordering::Relaxed)
    }

    /// Returns the quiet period.
    pub fn quiet_period(&self) -> Duration {
        self.shared.quiet_period
    }
}

impl<C: MessageChannel> Shared<C> {
    fn flush_if_current(&self, generation: u64) {
        let mut batch = self.batch.lock();
        if batch.generation != generation {
            return;
        }
        batch.timer = None;
        if let Err(err) = self.flush_locked(&mut batch) {
            warn!(error = %err, "batched flush failed");
        }
    }

    fn send(&self, envelope: Envelope) -> SyncResult<()> {
        self.channel.send(envelope.to_message())?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush_locked(&self, batch: &mut Batch) -> SyncResult<usize> {
        if let Some(timer) = batch.timer.take() {
            timer.abort();
        }
        batch.generation += 1;
        let receipts = std::mem::take(&mut batch.receipts);
        let records: Vec<ChangeRecord> = std::mem::take(&mut batch.pending)
            .into_iter()
            .flatten()
            .collect();

        let count = records.len();
        let outcome = if records.is_empty() {
            Ok(0)
        } else {
            debug!(records = count, "flushing batch");
            self.send(Envelope::from(SyncForClient::new(records)))
                .map(|()| count)
        };
        for receipt in receipts {
            let _ = receipt.send(outcome.clone());
        }
        outcome
    }
}
