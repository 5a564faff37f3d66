//! Service wiring and lifecycle.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kingfisher_core::{Counters, Result};
use kingfisher_db::{Database, SinkSet};

use crate::config::SyslogConfig;
use crate::queue::{self, WorkQueue};
use crate::receiver;
use crate::supervisor::Supervisor;
use crate::worker::{WorkerContext, WorkerPool};

/// How long shutdown waits for the workers to drain the queue.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SyslogServer {
    config: Arc<SyslogConfig>,
}

impl SyslogServer {
    pub fn new(config: SyslogConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run until ctrl-c or a fatal socket error, then shut down in order:
    /// stop the receiver, drain the queue with a bounded wait, flush every
    /// sink and close the pool.
    pub async fn run(self) -> Result<()> {
        let config = self.config;

        let database = Database::connect_lazy(
            &config.database.url,
            config.database.min_connections,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )?;
        let sinks = SinkSet::new(
            &database,
            config.batch.max_batch_size,
            Duration::from_secs(config.batch.max_wait_secs),
        );
        let counters = Counters::new();
        let shutdown = CancellationToken::new();

        let worker_count = if config.queue.worker_count == 0 {
            num_cpus::get().max(1)
        } else {
            config.queue.worker_count
        };
        let (work_queue, inboxes) = queue::work_queue(worker_count, config.queue.max_queue_size);

        let allowed_sources: HashSet<IpAddr> = config.sources.allowed.iter().copied().collect();
        let context = Arc::new(WorkerContext {
            counters: counters.clone(),
            sinks: sinks.clone(),
            allowed_sources,
            message_timeout: Duration::from_secs(config.reassembly.message_timeout_secs),
            flush_interval: Duration::from_secs(config.batch.flush_interval_secs),
            last_flush: Mutex::new(Instant::now()),
            shutdown: shutdown.clone(),
        });
        let workers = Arc::new(WorkerPool::new(context, inboxes));
        workers.spawn_all();

        let socket = receiver::bind_socket(config.bind_addr, config.queue.recv_buffer_bytes)?;
        info!("Syslog server started on {}", config.bind_addr);
        let receiver_handle = tokio::spawn(receiver::receive_loop(
            socket,
            work_queue.clone(),
            counters.clone(),
            shutdown.clone(),
        ));

        let supervisor = Supervisor {
            monitoring: config.monitoring.clone(),
            queue: work_queue.clone(),
            counters: counters.clone(),
            sinks: sinks.clone(),
            workers: workers.clone(),
            max_queue_size: config.queue.max_queue_size,
            shutdown: shutdown.clone(),
        };
        let supervisor_handle = tokio::spawn(supervisor.run());

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            _ = shutdown.cancelled() => {}
        }
        shutdown.cancel();

        drain_queue(&work_queue).await;
        let _ = receiver_handle.await;
        let _ = supervisor_handle.await;
        workers.stop(Duration::from_secs(2)).await;

        sinks.flush_all().await;
        database.close().await;

        let snapshot = counters.snapshot();
        info!(
            "Final counters: received={}, enqueued={}, handled={}, ready={}, rejected={}, overflow_drops={}",
            snapshot.received,
            snapshot.enqueued,
            snapshot.handled,
            snapshot.ready_for_insertion,
            snapshot.rejected,
            snapshot.overflow_drops
        );
        Ok(())
    }
}

/// Give the workers a bounded window to finish what is queued.
async fn drain_queue(queue: &WorkQueue) {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while queue.depth() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let remaining = queue.depth();
    if remaining > 0 {
        warn!("Shutting down with {} messages still queued", remaining);
    }
}
