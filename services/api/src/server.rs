use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryBillingRepository, InMemoryTaskQueue};
use crate::routes::with_billing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use leasehold::billing::BillingService;
use leasehold::config::AppConfig;
use leasehold::error::AppError;
use leasehold::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryBillingRepository::default());
    let queue = Arc::new(InMemoryTaskQueue::default());
    let billing_service = Arc::new(BillingService::new(
        repository,
        queue,
        config.billing.clone(),
        config.pagination,
    ));

    let app = with_billing_routes(billing_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        default_currency = config.billing.default_currency(),
        "billing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
