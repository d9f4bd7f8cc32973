use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{DecisionContext, ParcelId};
use super::evaluation::{ConsolidationDecision, ConsolidationEngine, PolicyConfig};
use super::geo::GeoDistance;
use super::recorder::{AuditError, DecisionAuditLog, DecisionRecord, DecisionRecorder};
use super::validation::{ContextGuard, ValidationError};

/// Service composing the input guard, decision engine, and audit recorder.
pub struct ConsolidationService<G, L> {
    guard: ContextGuard,
    engine: Arc<ConsolidationEngine<G>>,
    recorder: DecisionRecorder,
    audit_log: Arc<L>,
}

impl<G, L> ConsolidationService<G, L>
where
    G: GeoDistance + 'static,
    L: DecisionAuditLog + 'static,
{
    pub fn new(
        geo: Arc<G>,
        audit_log: Arc<L>,
        recorder: DecisionRecorder,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            guard: ContextGuard,
            engine: Arc::new(ConsolidationEngine::new(geo, policy)),
            recorder,
            audit_log,
        }
    }

    pub fn engine(&self) -> &ConsolidationEngine<G> {
        &self.engine
    }

    /// Validate, decide, and hand the decision to the recorder.
    pub async fn evaluate(
        &self,
        context: DecisionContext,
    ) -> Result<ConsolidationDecision, ConsolidationServiceError> {
        self.evaluate_at(context, Utc::now()).await
    }

    pub async fn evaluate_at(
        &self,
        context: DecisionContext,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationDecision, ConsolidationServiceError> {
        self.guard.validate(&context)?;

        let decision = self.engine.evaluate_at(&context, now).await;

        info!(
            parcel = %context.parcel.id.0,
            priority = context.parcel.priority.label(),
            outcome = decision.outcome_label(),
            vehicle = decision.vehicle_id().map(|id| id.0.as_str()).unwrap_or("-"),
            score = decision.score(),
            shadow_mode = context.shadow_mode,
            "consolidation decision made"
        );

        if let Err(err) = self.recorder.record(
            context.parcel.id.clone(),
            decision.clone(),
            context.shadow_mode,
        ) {
            warn!(
                parcel = %context.parcel.id.0,
                error = %err,
                "decision could not be queued for recording"
            );
        }

        Ok(decision)
    }

    /// Recorded decisions for a parcel, oldest first.
    pub fn history(
        &self,
        parcel_id: &ParcelId,
    ) -> Result<Vec<DecisionRecord>, ConsolidationServiceError> {
        Ok(self.audit_log.history(parcel_id)?)
    }
}

/// Error raised by the consolidation service.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}
