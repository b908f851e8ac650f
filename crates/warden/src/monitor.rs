//! Background capacity monitor.
//!
//! A long-lived task, scheduled independently of admission passes, that
//! periodically compares the subject count against aggregate facility
//! capacity and raises an advisory deficit signal when the ratio exceeds the
//! configured subjects-per-slot threshold. Strictly read-only: it never
//! mutates subject or facility state.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{info, warn};

use crate::admission::SharedEngine;
use crate::config::MonitorConfig;

/// Advisory signal raised when capacity falls short of demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityAlert {
    pub subject_count: usize,
    pub aggregate_capacity: u32,
    pub ratio: f64,
    pub required_capacity: u32,
    pub deficit: u32,
}

/// Delivery failure reported by a signal collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("signal transport unavailable: {0}")]
    Transport(String),
}

/// Outbound hook for capacity alerts; delivery mechanism (log, callback,
/// channel) is the collaborator's concern.
pub trait CapacitySignal: Send + Sync {
    fn raise(&self, alert: CapacityAlert) -> Result<(), SignalError>;
}

/// Evaluate the subject-to-capacity ratio. Returns `None` while capacity is
/// zero (the waiting state; never divides by zero) or while the ratio stays
/// within the threshold.
pub fn evaluate_ratio(
    subject_count: usize,
    aggregate_capacity: u32,
    ratio_threshold: u32,
) -> Option<CapacityAlert> {
    if aggregate_capacity == 0 || ratio_threshold == 0 {
        return None;
    }

    let ratio = subject_count as f64 / f64::from(aggregate_capacity);
    if ratio <= f64::from(ratio_threshold) {
        return None;
    }

    let required_capacity =
        ((subject_count as u64 + u64::from(ratio_threshold) - 1) / u64::from(ratio_threshold)) as u32;
    Some(CapacityAlert {
        subject_count,
        aggregate_capacity,
        ratio,
        required_capacity,
        deficit: required_capacity.saturating_sub(aggregate_capacity),
    })
}

/// Handle to the running monitor task; dropping the handle leaves the task
/// running, [`CapacityMonitor::shutdown`] stops it cleanly.
#[derive(Debug)]
pub struct CapacityMonitor {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CapacityMonitor {
    pub fn spawn(
        engine: SharedEngine,
        config: MonitorConfig,
        signal: Arc<dyn CapacitySignal>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(monitor_loop(engine, config, signal, stop_rx));
        Self { stop_tx, task }
    }

    /// Signal the task to stop and wait for it to exit. Every blocking wait
    /// in the loop is interruptible, so shutdown is prompt and no further
    /// signals are raised afterwards.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

async fn monitor_loop(
    engine: SharedEngine,
    config: MonitorConfig,
    signal: Arc<dyn CapacitySignal>,
    mut stop_rx: watch::Receiver<bool>,
) {
    // Warm-up before the first evaluation, letting initial state load.
    if sleep_or_stop(&mut stop_rx, config.warmup).await {
        return;
    }

    loop {
        let (subject_count, aggregate_capacity) = {
            let Ok(guard) = engine.read() else {
                warn!("engine lock poisoned; capacity monitor exiting");
                return;
            };
            (guard.subject_count(), guard.aggregate_capacity())
        };

        if aggregate_capacity == 0 {
            info!("no facility capacity registered yet; monitor waiting");
            if sleep_or_stop(&mut stop_rx, config.capacity_poll).await {
                return;
            }
            continue;
        }

        if let Some(alert) = evaluate_ratio(subject_count, aggregate_capacity, config.ratio_threshold)
        {
            warn!(
                subject_count = alert.subject_count,
                aggregate_capacity = alert.aggregate_capacity,
                ratio = alert.ratio,
                required_capacity = alert.required_capacity,
                deficit = alert.deficit,
                "subject-to-capacity ratio exceeded"
            );
            if let Err(err) = signal.raise(alert) {
                warn!(error = %err, "capacity alert was not delivered");
            }
        }

        if sleep_or_stop(&mut stop_rx, config.evaluation_interval).await {
            return;
        }
    }
}

/// Wait for the given duration, returning `true` when shutdown was requested
/// (or the shutdown channel closed) before the wait elapsed.
async fn sleep_or_stop(stop_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        changed = stop_rx.changed() => match changed {
            Ok(()) => *stop_rx.borrow(),
            Err(_) => true,
        },
        _ = time::sleep(duration) => false,
    }
}
