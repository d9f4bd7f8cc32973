use crate::cli::ServeArgs;
use crate::infra::{policy_from_settings, recorder_settings, AppState, InMemoryDecisionLog};
use crate::routes::with_consolidation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use parcel_consolidation::config::AppConfig;
use parcel_consolidation::error::AppError;
use parcel_consolidation::telemetry;
use parcel_consolidation::workflows::consolidation::{
    ConsolidationService, DecisionRecorder, GeoProvider,
};
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

    let settings = &config.consolidation;
    let geo = Arc::new(GeoProvider::from_url(settings.geo_service_url.as_deref()));
    let audit_log = Arc::new(InMemoryDecisionLog::default());
    let (recorder, _recorder_task) =
        DecisionRecorder::spawn(audit_log.clone(), recorder_settings(settings));
    let consolidation_service = Arc::new(ConsolidationService::new(
        geo,
        audit_log,
        recorder,
        policy_from_settings(settings),
    ));

    let policy = consolidation_service.engine().policy();
    let lookup_concurrency = policy.lookup_concurrency();
    let lookup_timeout_ms = policy.lookup_timeout_ms;

    let app = with_consolidation_routes(consolidation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        geo_service = settings.geo_service_url.as_deref().unwrap_or("haversine"),
        lookup_concurrency,
        lookup_timeout_ms,
        "parcel consolidation engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
