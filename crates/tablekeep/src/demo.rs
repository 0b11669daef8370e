// SPDX-FileCopyrightText: 2026 Tablekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tablekeep demo`: a writer and an updater hammering one guard.
//!
//! Each [`Worker`] is a tokio task on its own interval. Guard calls block, so
//! every step runs on the blocking pool. Both workers share one
//! `Arc<ConnectionGuard>` and stop when their token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tablekeep_config::model::DemoConfig;
use tablekeep_core::GuardError;
use tablekeep_storage::{ConnectionGuard, Filter, Value};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const NAMES: [&str; 14] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n",
];

/// A cancellable background loop running one guard operation per tick.
pub struct Worker {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<u64>,
}

impl Worker {
    /// Spawn a worker that runs `step` every `interval` until `parent` or the
    /// worker's own token is cancelled. Failed steps are logged and the loop
    /// carries on.
    pub fn spawn<F>(
        name: &'static str,
        parent: &CancellationToken,
        interval: Duration,
        guard: Arc<ConnectionGuard>,
        step: F,
    ) -> Self
    where
        F: Fn(&ConnectionGuard) -> Result<(), GuardError> + Send + Sync + 'static,
    {
        let token = parent.child_token();
        let cancel = token.clone();
        let step = Arc::new(step);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut completed = 0u64;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let guard = Arc::clone(&guard);
                        let step = Arc::clone(&step);
                        match tokio::task::spawn_blocking(move || (*step)(&guard)).await {
                            Ok(Ok(())) => completed += 1,
                            Ok(Err(e)) => warn!(worker = name, error = %e, "step failed"),
                            Err(e) => warn!(worker = name, error = %e, "step panicked"),
                        }
                    }
                }
            }
            debug!(worker = name, completed, "worker stopped");
            completed
        });

        Self {
            name,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel the worker and wait for it. Returns the number of steps that
    /// succeeded.
    pub async fn join(self) -> u64 {
        self.token.cancel();
        match self.handle.await {
            Ok(completed) => completed,
            Err(e) => {
                warn!(worker = self.name, error = %e, "worker task ended abnormally");
                0
            }
        }
    }
}

/// Create the demo table if it is missing.
pub fn prepare_table(guard: &ConnectionGuard, table: &str) -> Result<(), GuardError> {
    guard.create_table(
        table,
        &["id", "name", "score", "age"],
        &["int", "text", "int", "int"],
        None,
    )
}

/// One writer step: `rows` generated rows in a single batch.
pub fn write_batch(guard: &ConnectionGuard, table: &str, rows: usize) -> Result<(), GuardError> {
    let mut rng = rand::thread_rng();
    let mut ids = Vec::with_capacity(rows);
    let mut names = Vec::with_capacity(rows);
    let mut scores = Vec::with_capacity(rows);
    let mut ages = Vec::with_capacity(rows);
    for i in 0..rows {
        ids.push(Value::Integer(i as i64));
        names.push(Value::Text(NAMES[i % NAMES.len()].to_string()));
        scores.push(Value::Integer(rng.gen_range(85..95)));
        ages.push(Value::Integer(rng.gen_range(16..21)));
    }
    let inserted = guard.insert_batch(table, &[ids, names, scores, ages], &[] as &[&str])?;
    debug!(table, inserted, "batch written");
    Ok(())
}

/// One updater step: every row's `id` set to 2.
pub fn rewrite_ids(guard: &ConnectionGuard, table: &str) -> Result<(), GuardError> {
    let changed = guard.update_value(table, "id", 2, Filter::All)?;
    debug!(table, changed, "ids rewritten");
    Ok(())
}

/// Start the writer and the updater on `guard`.
pub fn spawn_workers(
    guard: &Arc<ConnectionGuard>,
    config: &DemoConfig,
    parent: &CancellationToken,
) -> Vec<Worker> {
    let writer_table = config.table.clone();
    let rows = config.batch_rows;
    let updater_table = config.table.clone();
    vec![
        Worker::spawn(
            "writer",
            parent,
            Duration::from_millis(config.writer_interval_ms),
            Arc::clone(guard),
            move |g| write_batch(g, &writer_table, rows),
        ),
        Worker::spawn(
            "updater",
            parent,
            Duration::from_millis(config.updater_interval_ms),
            Arc::clone(guard),
            move |g| rewrite_ids(g, &updater_table),
        ),
    ]
}

/// Run the demo until `shutdown` fires or `duration` elapses.
pub async fn run_demo(
    guard: Arc<ConnectionGuard>,
    config: &DemoConfig,
    shutdown: CancellationToken,
    duration: Option<Duration>,
) -> Result<(), GuardError> {
    {
        let guard = Arc::clone(&guard);
        let table = config.table.clone();
        tokio::task::spawn_blocking(move || prepare_table(&guard, &table))
            .await
            .map_err(|e| GuardError::Internal(format!("table setup task failed: {e}")))??;
    }

    let workers = spawn_workers(&guard, config, &shutdown);
    info!(table = %config.table, "demo workers running, press Ctrl+C to stop");

    match duration {
        Some(limit) => {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(limit) => info!("demo duration elapsed"),
            }
        }
        None => shutdown.cancelled().await,
    }

    for worker in &workers {
        worker.cancel();
    }
    for worker in workers {
        let name = worker.name();
        let completed = worker.join().await;
        info!(worker = name, completed, "worker joined");
    }

    let table = config.table.clone();
    let rows = tokio::task::spawn_blocking(move || guard.row_count(&table, Filter::All))
        .await
        .map_err(|e| GuardError::Internal(format!("row count task failed: {e}")))??;
    info!(table = %config.table, rows, "demo finished");
    Ok(())
}
