use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use parcel_consolidation::workflows::consolidation::{
    consolidation_router, ConsolidationService, DecisionAuditLog, GeoDistance,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_consolidation_routes<G, L>(
    service: Arc<ConsolidationService<G, L>>,
) -> axum::Router
where
    G: GeoDistance + 'static,
    L: DecisionAuditLog + 'static,
{
    consolidation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryDecisionLog;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use parcel_consolidation::workflows::consolidation::{
        Coordinates, DecisionContext, DecisionRecorder, HaversineDistance, Parcel, ParcelId,
        ParcelPriority, PolicyConfig, RecorderSettings,
    };
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn app() -> axum::Router {
        let log = Arc::new(InMemoryDecisionLog::default());
        let (recorder, _handle) = DecisionRecorder::spawn(log.clone(), RecorderSettings::default());
        let service = ConsolidationService::new(
            Arc::new(HaversineDistance::default()),
            log,
            recorder,
            PolicyConfig::default(),
        );
        with_consolidation_routes(Arc::new(service)).layer(Extension(app_state(true)))
    }

    #[tokio::test]
    async fn health_route_reports_ok() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reflects_startup_state() {
        let pending = readiness_endpoint(Extension(app_state(false)))
            .await
            .into_response();
        let ready = readiness_endpoint(Extension(app_state(true)))
            .await
            .into_response();

        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn evaluate_route_is_mounted() {
        let context = DecisionContext {
            parcel: Parcel {
                id: ParcelId("parcel-77".to_string()),
                weight_kg: 1.0,
                volume_m3: 0.01,
                destination: Coordinates::new(12.9716, 77.5946),
                sla_deadline: Utc::now() + Duration::hours(2),
                priority: ParcelPriority::High,
            },
            vehicles: Vec::new(),
            shadow_mode: true,
        };
        let body = serde_json::to_vec(&context).expect("serialize context");

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/consolidation/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json payload");
        assert_eq!(payload["outcome"], "REJECT");
    }
}
