//! Worker pool draining the ingest queue.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kingfisher_core::{Counters, RawDatagram};
use kingfisher_db::SinkSet;
use kingfisher_parse::{Disposition, classify};

use crate::DEQUEUE_WAIT_SECS;
use crate::queue::{Inbound, WorkerInbox};
use crate::reassembly::Reassembler;

/// State shared by every worker task.
pub struct WorkerContext {
    pub counters: Counters,
    pub sinks: SinkSet,
    pub allowed_sources: HashSet<IpAddr>,
    pub message_timeout: Duration,
    pub flush_interval: Duration,
    pub last_flush: Mutex<Instant>,
    pub shutdown: CancellationToken,
}

impl WorkerContext {
    /// True when this call wins the current flush interval. Losers skip, so
    /// a burst of workers cannot stack redundant flushes.
    fn take_flush_slot(&self) -> bool {
        let mut last_flush = lock_ignoring_poison(&self.last_flush);
        if last_flush.elapsed() >= self.flush_interval {
            *last_flush = Instant::now();
            true
        } else {
            false
        }
    }
}

/// Fixed set of worker tasks. Each worker shares its inbox through an
/// `Arc<Mutex<..>>`, so a replacement spawned after a failure resumes the
/// same channel.
pub struct WorkerPool {
    context: Arc<WorkerContext>,
    inboxes: Vec<WorkerInbox>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(context: Arc<WorkerContext>, inboxes: Vec<WorkerInbox>) -> Self {
        Self {
            context,
            inboxes,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn spawn_all(&self) {
        let mut handles = lock_ignoring_poison(&self.handles);
        handles.clear();
        for (worker_id, inbox) in self.inboxes.iter().enumerate() {
            handles.push(spawn_worker(worker_id, inbox.clone(), self.context.clone()));
        }
        info!("Started {} workers", self.inboxes.len());
    }

    /// Replace finished workers. Returns the number alive afterwards.
    pub fn respawn_missing(&self) -> usize {
        let mut handles = lock_ignoring_poison(&self.handles);
        if self.context.shutdown.is_cancelled() {
            return handles.iter().filter(|handle| !handle.is_finished()).count();
        }
        let mut respawned = 0;
        for (worker_id, handle) in handles.iter_mut().enumerate() {
            if handle.is_finished() {
                *handle = spawn_worker(worker_id, self.inboxes[worker_id].clone(), self.context.clone());
                respawned += 1;
            }
        }
        if respawned > 0 {
            warn!("Starting {} new workers", respawned);
        }
        handles.len()
    }

    pub fn alive(&self) -> usize {
        lock_ignoring_poison(&self.handles)
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Wait for the workers to wind down after shutdown, aborting stragglers
    /// at the deadline.
    pub async fn stop(&self, deadline: Duration) {
        let end = Instant::now() + deadline;
        while self.alive() > 0 && Instant::now() < end {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        for handle in lock_ignoring_poison(&self.handles).iter() {
            handle.abort();
        }
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn spawn_worker(worker_id: usize, inbox: WorkerInbox, context: Arc<WorkerContext>) -> JoinHandle<()> {
    tokio::spawn(async move { worker_loop(worker_id, inbox, context).await })
}

async fn worker_loop(worker_id: usize, inbox: WorkerInbox, context: Arc<WorkerContext>) {
    debug!("Worker {} starting", worker_id);
    let mut reassembler = Reassembler::new(context.message_timeout);
    loop {
        match inbox.recv_timeout(Duration::from_secs(DEQUEUE_WAIT_SECS)).await {
            Inbound::Item(datagram) => {
                context.counters.record_handled();
                handle_datagram(&context, &mut reassembler, datagram).await;
                if context.take_flush_slot() {
                    context.sinks.flush_all().await;
                }
            }
            Inbound::Timeout => {
                if context.shutdown.is_cancelled() {
                    break;
                }
            }
            Inbound::Closed => break,
        }
    }
    debug!("Worker {} stopping", worker_id);
}

async fn handle_datagram(
    context: &WorkerContext,
    reassembler: &mut Reassembler,
    datagram: RawDatagram,
) {
    if !context.allowed_sources.contains(&datagram.source) {
        warn!("Unhandled syslog source: {}", datagram.source);
        return;
    }

    let mut all_rows_accepted = true;
    for message in reassembler.offer(datagram, Instant::now()) {
        match classify(&message) {
            Disposition::Row(row) => {
                let table = row.family().table_name();
                if let Err(error) = context.sinks.enqueue(row).await {
                    all_rows_accepted = false;
                    context.counters.record_rejected();
                    warn!("Rejected row for {}: {}", table, error);
                }
            }
            Disposition::Ignored => {}
            Disposition::Unhandled(token) => {
                info!(
                    "Unhandled message type from {}: {}",
                    message.source,
                    token.as_deref().unwrap_or("Unknown")
                );
            }
        }
    }
    if all_rows_accepted {
        context.counters.record_ready_for_insertion();
    }
}
