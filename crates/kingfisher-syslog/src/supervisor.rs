//! Periodic liveness, monitoring and backpressure control.
//!
//! Every tick samples the queue and the sinks into the monitoring files,
//! appends a counters row to the CSV, replaces any worker that has died and
//! forces a global flush once the queue crosses half capacity.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kingfisher_core::{Counters, CountersSnapshot};
use kingfisher_db::SinkSet;

use crate::config::MonitoringConfig;
use crate::queue::WorkQueue;
use crate::worker::WorkerPool;

const CSV_HEADER: &str = "timestamp,received,handled,ready_for_insertion,rejected,\
new_received,new_handled,new_ready_for_insertion,new_rejected,\
lost_before_handling,lost_during_handling";

pub struct Supervisor {
    pub monitoring: MonitoringConfig,
    pub queue: WorkQueue,
    pub counters: Counters,
    pub sinks: SinkSet,
    pub workers: Arc<WorkerPool>,
    pub max_queue_size: usize,
    pub shutdown: CancellationToken,
}

impl Supervisor {
    pub async fn run(self) {
        let interval = Duration::from_secs(self.monitoring.interval_secs.max(1));
        if let Err(e) = ensure_csv_header(&self.monitoring.counters_file).await {
            error!(
                "Error writing to file {}: {}",
                self.monitoring.counters_file.display(),
                e
            );
        }

        let mut previous = self.counters.snapshot();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            previous = self.tick(previous).await;
        }
        info!("Supervisor stopped");
    }

    async fn tick(&self, previous: CountersSnapshot) -> CountersSnapshot {
        let depth = self.queue.depth();
        let alive = self.workers.respawn_missing();
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let mut queue_line = format!("{} - Queue Size: {}", timestamp, depth);
        let mut batches = String::new();
        for (table, pending) in self.sinks.pending_sizes() {
            let _ = write!(batches, " {}={}", table, pending);
        }
        let _ = write!(queue_line, " - Batches:{}", batches);
        append_line(&self.monitoring.queue_size_file, &queue_line).await;

        let thread_line = format!("{} - Thread Count: {}", timestamp, alive);
        append_line(&self.monitoring.thread_count_file, &thread_line).await;

        let snapshot = self.counters.snapshot();
        append_line(
            &self.monitoring.counters_file,
            &csv_line(&timestamp, &snapshot, &previous),
        )
        .await;

        info!("Active workers: {}, Queue size: {}", alive, depth);

        if depth > self.max_queue_size / 2 {
            warn!(
                "Queue depth {} above half capacity ({}); forcing a flush",
                depth, self.max_queue_size
            );
            self.sinks.flush_all().await;
        }

        snapshot
    }
}

/// One CSV row: totals, deltas and the two derived loss columns. The losses
/// are signed; a draining backlog legitimately handles more than it
/// receives within one interval.
fn csv_line(timestamp: &str, current: &CountersSnapshot, previous: &CountersSnapshot) -> String {
    let new_received = current.received - previous.received;
    let new_handled = current.handled - previous.handled;
    let new_ready = current.ready_for_insertion - previous.ready_for_insertion;
    let new_rejected = current.rejected - previous.rejected;
    let lost_before_handling = new_received as i64 - new_handled as i64;
    let lost_during_handling = new_handled as i64 - new_ready as i64;
    format!(
        "{},{},{},{},{},{},{},{},{},{},{}",
        timestamp,
        current.received,
        current.handled,
        current.ready_for_insertion,
        current.rejected,
        new_received,
        new_handled,
        new_ready,
        new_rejected,
        lost_before_handling,
        lost_during_handling
    )
}

async fn ensure_csv_header(path: &Path) -> std::io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(CSV_HEADER.as_bytes()).await?;
            file.write_all(b"\n").await
        }
    }
}

async fn append_line(path: &Path, line: &str) {
    let result: std::io::Result<()> = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await
    }
    .await;
    if let Err(e) = result {
        error!("Error writing to file {}: {}", path.display(), e);
    }
}
