use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{DecisionContext, ParcelId};
use super::geo::GeoDistance;
use super::recorder::DecisionAuditLog;
use super::service::{ConsolidationService, ConsolidationServiceError};

/// Router builder exposing the engine as a single JSON-in/JSON-out endpoint.
pub fn consolidation_router<G, L>(service: Arc<ConsolidationService<G, L>>) -> Router
where
    G: GeoDistance + 'static,
    L: DecisionAuditLog + 'static,
{
    Router::new()
        .route(
            "/api/v1/consolidation/evaluate",
            post(evaluate_handler::<G, L>),
        )
        .route(
            "/api/v1/consolidation/decisions/:parcel_id",
            get(history_handler::<G, L>),
        )
        .with_state(service)
}

pub(crate) async fn evaluate_handler<G, L>(
    State(service): State<Arc<ConsolidationService<G, L>>>,
    axum::Json(context): axum::Json<DecisionContext>,
) -> Response
where
    G: GeoDistance + 'static,
    L: DecisionAuditLog + 'static,
{
    match service.evaluate(context).await {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        Err(ConsolidationServiceError::Validation(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn history_handler<G, L>(
    State(service): State<Arc<ConsolidationService<G, L>>>,
    Path(parcel_id): Path<String>,
) -> Response
where
    G: GeoDistance + 'static,
    L: DecisionAuditLog + 'static,
{
    let id = ParcelId(parcel_id);
    match service.history(&id) {
        Ok(records) => {
            let payload = json!({
                "parcel_id": id.0,
                "decisions": records,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
