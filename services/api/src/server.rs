use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingCapacitySignal};
use crate::routes::service_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use warden::admission::{shared, AdmissionEngine};
use warden::config::AppConfig;
use warden::error::AppError;
use warden::monitor::CapacityMonitor;
use warden::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = shared(AdmissionEngine::new(config.engine));
    let monitor = CapacityMonitor::spawn(
        engine.clone(),
        config.monitor,
        Arc::new(LoggingCapacitySignal),
    );

    let app = service_router(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "warden admission service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("ctrl-c handler unavailable; serving until the process exits");
        std::future::pending::<()>().await;
    }
}
