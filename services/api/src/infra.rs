use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::error;
use warden::monitor::{CapacityAlert, CapacitySignal, SignalError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Default alert sink: surfaces capacity deficits on the service log at
/// error level so they stand out from the monitor's own warnings.
#[derive(Default)]
pub(crate) struct LoggingCapacitySignal;

impl CapacitySignal for LoggingCapacitySignal {
    fn raise(&self, alert: CapacityAlert) -> Result<(), SignalError> {
        error!(
            subject_count = alert.subject_count,
            aggregate_capacity = alert.aggregate_capacity,
            required_capacity = alert.required_capacity,
            deficit = alert.deficit,
            "facility capacity deficit: additional slots required"
        );
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
