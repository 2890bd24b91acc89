// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::{
    Arc, Condvar, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use thiserror::Error;
use tracing::{error, info, warn};

use super::storage::{LedgerError, LedgerStorage};
use crate::types::Trade;

/// Error types for trade writer operations
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Trade writer is not running")]
    NotRunning,
    #[error("Trade queue is full")]
    QueueFull,
}

/// Configuration for the trade writer
#[derive(Debug, Clone)]
pub struct TradeWriterConfig {
    /// Capacity of the trade queue between engine and writer
    pub queue_capacity: usize,
    /// How long the writer waits on the queue before re-checking shutdown
    pub poll_interval_ms: u64,
    /// How many times a failed ledger write is retried before giving up
    pub io_retry_limit: u32,
    /// Delay between ledger write retries
    pub io_retry_delay_ms: u64,
}

impl Default for TradeWriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4096,
            poll_interval_ms: 200,
            io_retry_limit: 5,
            io_retry_delay_ms: 100,
        }
    }
}

/// Flush accounting shared between the producer and the writer thread
struct Progress {
    enqueued: u64,
    persisted: u64,
}

struct WriterShared {
    shutdown: AtomicBool,
    running: AtomicBool,
    progress: Mutex<Progress>,
    drained: Condvar,
}

/// Asynchronous trade persistence pipeline
///
/// The matching loop produces trades; a dedicated `trade-writer` thread
/// consumes them from a bounded SPSC queue and appends them to the ledger
/// in FIFO submission order. Enqueueing never blocks the matching path:
/// a full queue or a stopped writer is reported as an error and left to
/// the engine's soft-error policy.
///
/// Guarantees:
/// - FIFO: trades appear in the ledger in successful-enqueue order
/// - `flush` returns only once every previously-enqueued trade has been
///   appended and pushed to the OS
/// - graceful `stop` drains the queue before the thread exits
///
/// A persistent I/O failure terminates the writer thread after bounded
/// retries; `is_running` then reports `false` and `flush` callers are
/// released rather than wedged.
pub struct TradeWriter {
    sender: Sender<Trade>,
    receiver: Option<Receiver<Trade>>,
    storage: Option<Box<dyn LedgerStorage>>,
    config: TradeWriterConfig,
    shared: Arc<WriterShared>,
    thread_handle: Option<JoinHandle<()>>,
}

impl TradeWriter {
    pub fn new(storage: Box<dyn LedgerStorage>, config: TradeWriterConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity);

        Self {
            sender,
            receiver: Some(receiver),
            storage: Some(storage),
            config,
            shared: Arc::new(WriterShared {
                shutdown: AtomicBool::new(false),
                running: AtomicBool::new(false),
                progress: Mutex::new(Progress {
                    enqueued: 0,
                    persisted: 0,
                }),
                drained: Condvar::new(),
            }),
            thread_handle: None,
        }
    }

    /// Launch the writer thread
    ///
    /// Idempotent: a second call while running is a no-op. A writer that
    /// has been stopped cannot be restarted.
    pub fn start(&mut self) {
        if self.shared.running.load(Ordering::Acquire) {
            return;
        }

        let (Some(receiver), Some(storage)) = (self.receiver.take(), self.storage.take()) else {
            warn!("Trade writer cannot be restarted after stop");
            return;
        };

        self.shared.shutdown.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let shared = self.shared.clone();
        let config = self.config.clone();

        let thread_handle = thread::Builder::new()
            .name("trade-writer".to_string())
            .spawn(move || {
                info!("Trade writer started");
                Self::run_writer_loop(&receiver, storage, &config, &shared);
                shared.running.store(false, Ordering::Release);
                shared.drained.notify_all();
                info!("Trade writer stopped");
            })
            .expect("Failed to spawn trade writer thread");

        self.thread_handle = Some(thread_handle);
    }

    /// Submit a trade for asynchronous persistence (non-blocking)
    ///
    /// The order of successful enqueues is the order of ledger records.
    pub fn enqueue(&self, trade: Trade) -> Result<(), WriterError> {
        if !self.is_running() {
            return Err(WriterError::NotRunning);
        }

        // The progress lock spans the send so enqueued counts and queue
        // order can never disagree.
        let mut progress = self.shared.progress.lock().unwrap();
        match self.sender.try_send(trade) {
            Ok(()) => {
                progress.enqueued += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(WriterError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(WriterError::NotRunning),
        }
    }

    /// Block until every previously-enqueued trade is durably appended
    ///
    /// Returns early if the writer dies on a persistent I/O failure.
    pub fn flush(&self) {
        let mut progress = self.shared.progress.lock().unwrap();
        let target = progress.enqueued;

        while progress.persisted < target && self.shared.running.load(Ordering::Acquire) {
            let (guard, _) = self
                .shared
                .drained
                .wait_timeout(progress, Duration::from_millis(50))
                .unwrap();
            progress = guard;
        }
    }

    /// Signal shutdown, let the writer drain the queue, and join the thread
    ///
    /// Idempotent; safe to call without `start`.
    pub fn stop(&mut self) {
        let Some(thread_handle) = self.thread_handle.take() else {
            return;
        };

        info!("Stopping trade writer");
        self.shared.shutdown.store(true, Ordering::Release);
        if thread_handle.join().is_err() {
            warn!("Trade writer thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Writer loop: bounded-wait take, append, account
    ///
    /// Terminates only when shutdown has been signalled and the queue is
    /// empty, or when the storage keeps failing past the retry budget.
    fn run_writer_loop(
        receiver: &Receiver<Trade>,
        mut storage: Box<dyn LedgerStorage>,
        config: &TradeWriterConfig,
        shared: &WriterShared,
    ) {
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        loop {
            match receiver.recv_timeout(poll_interval) {
                Ok(trade) => {
                    let mut batch = vec![trade];
                    while let Ok(more) = receiver.try_recv() {
                        batch.push(more);
                    }

                    if let Err(e) = Self::commit_batch(storage.as_mut(), &batch, config) {
                        error!(
                            error = %e,
                            lost = batch.len(),
                            "Ledger write failed past the retry budget, trade writer terminating"
                        );
                        return;
                    }

                    let mut progress = shared.progress.lock().unwrap();
                    progress.persisted += batch.len() as u64;
                    drop(progress);
                    shared.drained.notify_all();
                }
                Err(RecvTimeoutError::Timeout) => {
                    if shared.shutdown.load(Ordering::Acquire) && receiver.is_empty() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if let Err(e) = storage.sync() {
            error!(error = %e, "Final ledger sync failed");
        }
    }

    /// Append a batch and push it to the OS before reporting it persisted
    fn commit_batch(
        storage: &mut dyn LedgerStorage,
        batch: &[Trade],
        config: &TradeWriterConfig,
    ) -> Result<(), LedgerError> {
        for trade in batch {
            Self::retry_io(config, || storage.append(trade))?;
        }
        Self::retry_io(config, || storage.sync())
    }

    fn retry_io(
        config: &TradeWriterConfig,
        mut op: impl FnMut() -> Result<(), LedgerError>,
    ) -> Result<(), LedgerError> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt > config.io_retry_limit {
                        return Err(e);
                    }
                    warn!(error = %e, attempt, "Ledger I/O error, retrying");
                    thread::sleep(Duration::from_millis(config.io_retry_delay_ms));
                }
            }
        }
    }
}

impl Drop for TradeWriter {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(thread_handle) = self.thread_handle.take()
            && let Err(e) = thread_handle.join()
        {
            let _ = Err::<(), _>(e);
        }
    }
}
