//! Bounded fan-out queue between the receiver and the workers.
//!
//! One mpsc channel per worker, routed by source-address hash. The hash
//! affinity keeps every fragment of one sender on the same worker, which is
//! what lets each worker own its reassembly buffers outright. A shared
//! depth counter enforces the global cap; the receiver never blocks.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use kingfisher_core::RawDatagram;

/// Why a datagram was not enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// Global depth cap reached.
    QueueFull,
    /// The selected worker's channel is full or its receiver is gone.
    WorkerUnavailable,
}

/// One dequeue attempt.
#[derive(Debug)]
pub enum Inbound {
    Item(RawDatagram),
    Timeout,
    Closed,
}

/// Sender side, owned by the receiver (and sampled by the supervisor).
#[derive(Clone)]
pub struct WorkQueue {
    senders: Vec<mpsc::Sender<RawDatagram>>,
    depth: Arc<AtomicUsize>,
    max_depth: usize,
}

/// Receiver side for one worker. Cloneable so a respawned worker can pick
/// up the channel its predecessor left behind.
#[derive(Clone)]
pub struct WorkerInbox {
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<RawDatagram>>>,
    depth: Arc<AtomicUsize>,
}

/// Build the queue for `worker_count` workers with `max_depth` datagrams of
/// total capacity.
pub fn work_queue(worker_count: usize, max_depth: usize) -> (WorkQueue, Vec<WorkerInbox>) {
    let worker_count = worker_count.max(1);
    let channel_capacity = (max_depth / worker_count).max(1) + 1;
    let depth = Arc::new(AtomicUsize::new(0));

    let mut senders = Vec::with_capacity(worker_count);
    let mut inboxes = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let (tx, rx) = mpsc::channel::<RawDatagram>(channel_capacity);
        senders.push(tx);
        inboxes.push(WorkerInbox {
            receiver: Arc::new(tokio::sync::Mutex::new(rx)),
            depth: depth.clone(),
        });
    }

    (WorkQueue { senders, depth, max_depth }, inboxes)
}

impl WorkQueue {
    /// Non-blocking enqueue; drops are the caller's to count.
    pub fn push(&self, datagram: RawDatagram) -> Result<(), EnqueueError> {
        if self.depth.load(Ordering::Relaxed) >= self.max_depth {
            return Err(EnqueueError::QueueFull);
        }
        let index = select_worker(datagram.source, self.senders.len());
        match self.senders[index].try_send(datagram) {
            Ok(()) => {
                self.depth.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => Err(EnqueueError::WorkerUnavailable),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }
}

impl WorkerInbox {
    /// Timed dequeue so the worker loop can observe shutdown.
    pub async fn recv_timeout(&self, wait: Duration) -> Inbound {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(wait, receiver.recv()).await {
            Ok(Some(datagram)) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                Inbound::Item(datagram)
            }
            Ok(None) => Inbound::Closed,
            Err(_) => Inbound::Timeout,
        }
    }
}

/// Hash the source address to a worker slot.
pub fn select_worker(source: IpAddr, worker_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    (hasher.finish() as usize) % worker_count
}
