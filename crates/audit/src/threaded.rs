//! Off-thread audit delivery.
//!
//! Audit backends may be network-backed. `ThreadedAuditSink` runs the inner
//! sink on a dedicated worker thread. A batch is one queue entry and the
//! caller waits once, up to `timeout`, for its acknowledgements. Records the
//! worker has not acknowledged by then are reported as timed out but stay
//! queued exactly once; they may still land later.
//!
//! The queue is bounded. When it is full the batch is refused immediately
//! instead of blocking the caller.

use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{AuditAck, AuditError, AuditRecord, AuditSink};

/// Pending batches the worker may hold before new ones are refused.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

type Reply = (usize, Result<AuditAck, AuditError>);

struct Batch {
    records: Vec<AuditRecord>,
    reply: mpsc::Sender<Reply>,
}

/// Runs an [`AuditSink`] on a worker thread.
pub struct ThreadedAuditSink {
    sender: Mutex<Option<SyncSender<Batch>>>,
    join: Option<thread::JoinHandle<()>>,
    timeout: Duration,
}

impl core::fmt::Debug for ThreadedAuditSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadedAuditSink")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ThreadedAuditSink {
    /// Spawn the worker thread around `inner`.
    pub fn spawn<S>(inner: S, timeout: Duration) -> std::io::Result<Self>
    where
        S: AuditSink + 'static,
    {
        Self::spawn_with_depth(inner, timeout, DEFAULT_QUEUE_DEPTH)
    }

    pub fn spawn_with_depth<S>(inner: S, timeout: Duration, depth: usize) -> std::io::Result<Self>
    where
        S: AuditSink + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<Batch>(depth.max(1));

        let join = thread::Builder::new()
            .name("autoorganize-audit".to_string())
            .spawn(move || {
                // Exits once every sender is dropped.
                while let Ok(batch) = rx.recv() {
                    for (index, record) in batch.records.iter().enumerate() {
                        let result = inner.append(record);
                        if let Err(err) = &result {
                            debug!(key = %record.key(), error = %err, "audit append failed on worker");
                        }
                        // The caller may have stopped waiting; the record is kept anyway.
                        let _ = batch.reply.send((index, result));
                    }
                }
            })?;

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            join: Some(join),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stop accepting records and wait for the worker to drain.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("audit worker panicked");
            }
        }
    }

    fn submit(&self, batch: Batch) -> Result<(), AuditError> {
        let sender = self.sender.lock().map_err(|_| AuditError::Disconnected)?;
        let sender = sender.as_ref().ok_or(AuditError::Disconnected)?;
        sender.try_send(batch).map_err(|err| match err {
            TrySendError::Full(_) => AuditError::Unavailable("audit queue full".to_string()),
            TrySendError::Disconnected(_) => AuditError::Disconnected,
        })
    }
}

impl AuditSink for ThreadedAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<AuditAck, AuditError> {
        self.append_batch(std::slice::from_ref(record))
            .into_iter()
            .next()
            .unwrap_or(Err(AuditError::Disconnected))
    }

    fn append_batch(&self, records: &[AuditRecord]) -> Vec<Result<AuditAck, AuditError>> {
        if records.is_empty() {
            return Vec::new();
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        if let Err(err) = self.submit(Batch {
            records: records.to_vec(),
            reply: reply_tx,
        }) {
            return vec![Err(err); records.len()];
        }

        let deadline = Instant::now() + self.timeout;
        let mut results: Vec<Option<Result<AuditAck, AuditError>>> = vec![None; records.len()];
        let mut pending = records.len();
        let mut missing = AuditError::Timeout(self.timeout);

        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match reply_rx.recv_timeout(remaining) {
                Ok((index, result)) => {
                    if let Some(slot) = results.get_mut(index) {
                        if slot.is_none() {
                            pending -= 1;
                        }
                        *slot = Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    missing = AuditError::Disconnected;
                    break;
                }
            }
        }

        if pending > 0 {
            debug!(pending, total = records.len(), "audit batch not fully acknowledged");
        }

        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(missing.clone())))
            .collect()
    }
}

impl Drop for ThreadedAuditSink {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuditKey, AuditOutcome, InMemoryAuditLog};
    use autoorganize_core::{ActorId, ExecutionId, LocationKey};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(sequence: u32) -> AuditRecord {
        AuditRecord::new(
            AuditKey {
                execution: ExecutionId::new(),
                sequence,
            },
            ActorId::new(),
            Utc::now(),
            LocationKey::new("world", 0, 64, 0),
            LocationKey::new("world", 1, 64, 0),
            "cobblestone".into(),
            64,
            AuditOutcome::Applied,
        )
    }

    /// Sleeps per append and counts calls.
    struct SlowSink {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl AuditSink for SlowSink {
        fn append(&self, _record: &AuditRecord) -> Result<AuditAck, AuditError> {
            thread::sleep(self.delay);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuditAck::Recorded)
        }
    }

    #[test]
    fn forwards_to_inner_sink() {
        let log = Arc::new(InMemoryAuditLog::new());
        let sink = ThreadedAuditSink::spawn(Arc::clone(&log), Duration::from_secs(5)).unwrap();

        assert_eq!(sink.append(&record(0)).unwrap(), AuditAck::Recorded);
        let batch = sink.append_batch(&[record(1), record(2)]);
        assert_eq!(batch, vec![Ok(AuditAck::Recorded), Ok(AuditAck::Recorded)]);
        sink.shutdown();

        assert_eq!(log.len(), 3);
    }

    #[test]
    fn slow_backend_times_out() {
        let sink = ThreadedAuditSink::spawn(
            SlowSink {
                delay: Duration::from_millis(300),
                calls: Arc::default(),
            },
            Duration::from_millis(20),
        )
        .unwrap();

        let err = sink.append(&record(0)).unwrap_err();
        assert_eq!(err, AuditError::Timeout(Duration::from_millis(20)));
    }

    #[test]
    fn batch_waits_once_and_enqueues_each_record_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = ThreadedAuditSink::spawn(
            SlowSink {
                delay: Duration::from_millis(100),
                calls: Arc::clone(&calls),
            },
            Duration::from_millis(10),
        )
        .unwrap();
        let records: Vec<AuditRecord> = (0..5).map(record).collect();

        let started = Instant::now();
        let results = sink.append_batch(&records);
        let waited = started.elapsed();

        assert!(waited < Duration::from_millis(100), "waited {waited:?}");
        assert_eq!(results.len(), 5);
        assert!(results
            .iter()
            .all(|r| *r == Err(AuditError::Timeout(Duration::from_millis(10)))));

        sink.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn acknowledged_records_are_reported_before_the_deadline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = ThreadedAuditSink::spawn(
            SlowSink {
                delay: Duration::from_millis(5),
                calls: Arc::clone(&calls),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let results = sink.append_batch(&[record(0), record(1), record(2)]);
        assert!(results.iter().all(|r| *r == Ok(AuditAck::Recorded)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// Blocks every append until the gate is released.
    struct GatedSink {
        gate: Arc<Mutex<()>>,
    }

    impl AuditSink for GatedSink {
        fn append(&self, _record: &AuditRecord) -> Result<AuditAck, AuditError> {
            let _open = self.gate.lock().unwrap();
            Ok(AuditAck::Recorded)
        }
    }

    #[test]
    fn full_queue_refuses_without_blocking() {
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock().unwrap();
        let sink = ThreadedAuditSink::spawn_with_depth(
            GatedSink {
                gate: Arc::clone(&gate),
            },
            Duration::from_millis(10),
            1,
        )
        .unwrap();

        // One batch occupies the worker, one fills the queue.
        sink.append(&record(0)).unwrap_err();
        sink.append(&record(1)).unwrap_err();

        let started = Instant::now();
        let err = sink.append(&record(2)).unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(10));
        assert_eq!(err, AuditError::Unavailable("audit queue full".into()));

        drop(held);
        sink.shutdown();
    }
}
