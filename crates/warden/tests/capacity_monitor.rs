use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::time::timeout;
use warden::admission::{shared, AdmissionEngine, FacilityDraft, Origin, SubjectDraft};
use warden::config::{EngineConfig, MonitorConfig};
use warden::monitor::{evaluate_ratio, CapacityAlert, CapacityMonitor, CapacitySignal, SignalError};

/// Forwards alerts onto a channel so tests can await them.
struct ChannelSignal {
    tx: mpsc::UnboundedSender<CapacityAlert>,
}

impl CapacitySignal for ChannelSignal {
    fn raise(&self, alert: CapacityAlert) -> Result<(), SignalError> {
        self.tx
            .send(alert)
            .map_err(|err| SignalError::Transport(err.to_string()))
    }
}

fn fast_config(ratio_threshold: u32) -> MonitorConfig {
    MonitorConfig {
        warmup: Duration::from_millis(5),
        capacity_poll: Duration::from_millis(5),
        evaluation_interval: Duration::from_millis(5),
        ratio_threshold,
    }
}

fn engine_with_load(subjects: usize, capacity: u32) -> AdmissionEngine {
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid evaluation date");
    let mut engine = AdmissionEngine::with_today(EngineConfig::default(), today);
    if capacity > 0 {
        engine
            .add_facility(FacilityDraft {
                id: "main".to_string(),
                name: "main facility".to_string(),
                capacity,
            })
            .expect("facility added");
    }
    for index in 0..subjects {
        engine
            .register_subject(SubjectDraft {
                id: format!("{:04}", index + 1),
                name: format!("subject {index}"),
                support_level: 5,
                impact_score: 5,
                economic_percentile: 5,
                birth_date: NaiveDate::from_ymd_opt(1995, 6, 1).expect("valid birth date"),
                origin: Origin::A,
                elevated: false,
            })
            .expect("registration accepted");
    }
    engine
}

#[test]
fn ratio_within_threshold_raises_nothing() {
    assert!(evaluate_ratio(100, 10, 10).is_none());
    assert!(evaluate_ratio(0, 10, 10).is_none());
}

#[test]
fn zero_capacity_never_evaluates() {
    assert!(evaluate_ratio(500, 0, 10).is_none());
}

#[test]
fn deficit_is_the_missing_slots_rounded_up() {
    let alert = evaluate_ratio(101, 10, 10).expect("ratio exceeded");
    assert_eq!(alert.required_capacity, 11);
    assert_eq!(alert.deficit, 1);
    assert!(alert.ratio > 10.0);

    let alert = evaluate_ratio(250, 10, 10).expect("ratio exceeded");
    assert_eq!(alert.required_capacity, 25);
    assert_eq!(alert.deficit, 15);
}

#[tokio::test]
async fn overloaded_engine_raises_an_alert() {
    let engine = shared(engine_with_load(21, 2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = CapacityMonitor::spawn(
        engine,
        fast_config(10),
        Arc::new(ChannelSignal { tx }),
    );

    let alert = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("alert arrives before timeout")
        .expect("signal channel open");
    assert_eq!(alert.subject_count, 21);
    assert_eq!(alert.aggregate_capacity, 2);
    assert_eq!(alert.required_capacity, 3);
    assert_eq!(alert.deficit, 1);

    monitor.shutdown().await;
}

#[tokio::test]
async fn monitor_waits_quietly_while_capacity_is_zero() {
    let engine = shared(engine_with_load(50, 0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = CapacityMonitor::spawn(
        engine,
        fast_config(10),
        Arc::new(ChannelSignal { tx }),
    );

    // Several poll cycles pass without any signal.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());

    monitor.shutdown().await;
}

#[tokio::test]
async fn registering_capacity_moves_the_monitor_out_of_the_waiting_state() {
    let engine = shared(engine_with_load(50, 0));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = CapacityMonitor::spawn(
        engine.clone(),
        fast_config(10),
        Arc::new(ChannelSignal { tx }),
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    {
        let mut guard = engine.write().expect("engine lock");
        guard
            .add_facility(FacilityDraft {
                id: "late".to_string(),
                name: "late facility".to_string(),
                capacity: 2,
            })
            .expect("facility added");
    }

    let alert = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("alert arrives once capacity exists")
        .expect("signal channel open");
    assert_eq!(alert.aggregate_capacity, 2);
    assert_eq!(alert.subject_count, 50);

    monitor.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_the_task_promptly() {
    let engine = shared(engine_with_load(0, 1));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = CapacityMonitor::spawn(
        engine,
        // Long steady-state interval: shutdown must interrupt the wait.
        MonitorConfig {
            warmup: Duration::from_millis(1),
            capacity_poll: Duration::from_secs(600),
            evaluation_interval: Duration::from_secs(600),
            ratio_threshold: 10,
        },
        Arc::new(ChannelSignal { tx }),
    );

    timeout(Duration::from_secs(2), monitor.shutdown())
        .await
        .expect("shutdown completes promptly");
    assert!(rx.try_recv().is_err());
}
