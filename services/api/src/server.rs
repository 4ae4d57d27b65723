use crate::cli::ServeArgs;
use crate::infra::{AppState, TracingNotificationPublisher};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use leasehold::config::AppConfig;
use leasehold::error::AppError;
use leasehold::marketplace::{InMemoryMarketplaceStore, MarketplaceService};
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

    let store = Arc::new(InMemoryMarketplaceStore::new());
    let notifier = Arc::new(TracingNotificationPublisher);
    let marketplace = Arc::new(MarketplaceService::new(
        store,
        notifier,
        config.marketplace,
    ));

    let app = with_service_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        page_size = config.marketplace.default_page_size,
        "leasehold marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
