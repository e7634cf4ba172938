//! Collection Orchestrator
//!
//! Runs one poll cycle: every collector in parallel, every collector's units
//! in a worker pool bounded by its `max_parallel_requests`, then one merged
//! [`Snapshot`] handed to every output.
//!
//! Failures stay local. A unit that errors or panics contributes nothing to
//! the cycle; an output that fails does not affect its siblings. The cycle
//! itself always completes once every spawned task has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::collector::Collector;
use crate::output::Output;
use crate::status::{LocalStatus, SharedSnapshot, Snapshot};

/// Owns the configured collectors and outputs for the lifetime of a run.
pub struct CollectionOrchestrator {
    collectors: Vec<Arc<dyn Collector>>,
    outputs: Vec<Arc<dyn Output>>,
    closed: AtomicBool,
}

impl CollectionOrchestrator {
    pub fn new(collectors: Vec<Arc<dyn Collector>>, outputs: Vec<Arc<dyn Output>>) -> Self {
        Self {
            collectors,
            outputs,
            closed: AtomicBool::new(false),
        }
    }

    pub fn collectors(&self) -> &[Arc<dyn Collector>] {
        &self.collectors
    }

    pub fn outputs(&self) -> &[Arc<dyn Output>] {
        &self.outputs
    }

    /// Run every collector and merge their namespaced results.
    ///
    /// The returned snapshot's keys are exactly the union of
    /// `(collector name, job)` over everything the collectors reported.
    pub async fn collect(&self) -> Snapshot {
        let started = Instant::now();
        let mut tasks = JoinSet::new();
        for collector in &self.collectors {
            let collector = Arc::clone(collector);
            tasks.spawn(async move {
                let source = collector.name().to_string();
                let local = collect_source(collector).await;
                (source, local)
            });
        }

        let mut snapshot = Snapshot::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((source, local)) => {
                    for key in snapshot.merge(Snapshot::from_local(&source, local)) {
                        tracing::error!(job = %key, "Duplicate status key, keeping last");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Collector task failed"),
            }
        }

        tracing::debug!(
            collectors = self.collectors.len(),
            jobs = snapshot.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Collection cycle finished"
        );
        snapshot
    }

    /// Hand the snapshot to every output concurrently.
    ///
    /// Returns how many outputs accepted the update.
    pub async fn dispatch(&self, snapshot: &SharedSnapshot) -> usize {
        let mut tasks = JoinSet::new();
        for output in &self.outputs {
            let output = Arc::clone(output);
            let snapshot = Arc::clone(snapshot);
            tasks.spawn(async move {
                let result = output.on_update(&snapshot).await;
                (output.name().to_string(), result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => delivered += 1,
                Ok((name, Err(e))) => {
                    tracing::warn!(output = %name, error = %e, "Output update failed");
                }
                Err(e) => tracing::warn!(error = %e, "Output task failed"),
            }
        }
        delivered
    }

    /// Close every output. Only the first call has any effect.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut tasks = JoinSet::new();
        for output in &self.outputs {
            let output = Arc::clone(output);
            tasks.spawn(async move {
                let result = output.close().await;
                (output.name().to_string(), result)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => tracing::debug!(output = %name, "Output closed"),
                Ok((name, Err(e))) => {
                    tracing::warn!(output = %name, error = %e, "Output close failed");
                }
                Err(e) => tracing::warn!(error = %e, "Output close task failed"),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CollectionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let collectors: Vec<_> = self.collectors.iter().map(|c| c.name()).collect();
        let outputs: Vec<_> = self.outputs.iter().map(|o| o.name()).collect();
        f.debug_struct("CollectionOrchestrator")
            .field("collectors", &collectors)
            .field("outputs", &outputs)
            .finish_non_exhaustive()
    }
}

/// Collect all units of one collector through a bounded worker pool.
///
/// Results are applied in unit order, so when two units report the same job
/// the later unit wins regardless of completion order.
pub async fn collect_source(collector: Arc<dyn Collector>) -> LocalStatus {
    let started = Instant::now();
    let units = collector.units();
    let semaphore = Arc::new(Semaphore::new(collector.max_parallel_requests().max(1)));

    let mut tasks = JoinSet::new();
    for (index, unit) in units.into_iter().enumerate() {
        let collector = Arc::clone(&collector);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // Never closed, so acquiring only waits for a free slot.
            let _permit = semaphore.acquire_owned().await;
            let result = collector.collect_unit(&unit).await;
            (index, unit, result)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(statuses))) => results.push((index, statuses)),
            Ok((_, unit, Err(e))) => tracing::error!(
                collector = %collector.name(),
                unit = %unit,
                error = %e,
                "Unit collection failed"
            ),
            Err(e) => tracing::error!(
                collector = %collector.name(),
                error = %e,
                "Unit task failed"
            ),
        }
    }

    results.sort_by_key(|(index, _)| *index);
    let mut local = LocalStatus::new();
    for (_, statuses) in results {
        local.extend(statuses);
    }

    tracing::debug!(
        collector = %collector.name(),
        jobs = local.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Collector finished"
    );
    local
}
