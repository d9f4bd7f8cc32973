mod config;
mod eligibility;
mod impact;
mod policy;
mod scoring;

pub use config::{PolicyConfig, VehicleTypePolicy};
pub use eligibility::filter_eligible;
pub use impact::{Impact, ImpactEstimator};
pub use policy::{ConsolidationDecision, ConstraintChecks};
pub use scoring::{ScoreBreakdown, ScoredCandidate, VehicleScorer};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::DecisionContext;
use super::geo::GeoDistance;

/// Stateless decision maker: filter, score, rank, then re-check the best candidate.
pub struct ConsolidationEngine<G> {
    policy: PolicyConfig,
    scorer: VehicleScorer<G>,
}

impl<G> ConsolidationEngine<G>
where
    G: GeoDistance,
{
    pub fn new(geo: Arc<G>, policy: PolicyConfig) -> Self {
        let estimator =
            ImpactEstimator::new(geo, policy.lookup_timeout(), policy.fallback_speed_kmh);
        let scorer = VehicleScorer::new(estimator, policy.lookup_concurrency());
        Self { policy, scorer }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub async fn evaluate(&self, context: &DecisionContext) -> ConsolidationDecision {
        self.evaluate_at(context, Utc::now()).await
    }

    /// Evaluate against an explicit clock reading; SLA feasibility is measured from `now`.
    pub async fn evaluate_at(
        &self,
        context: &DecisionContext,
        now: DateTime<Utc>,
    ) -> ConsolidationDecision {
        let parcel = &context.parcel;
        let eligible = filter_eligible(parcel, &context.vehicles, &self.policy);
        if eligible.is_empty() {
            return policy::no_eligible_vehicle(context.vehicles.len());
        }

        let ranked = self.scorer.rank(parcel, eligible).await;
        for candidate in &ranked {
            debug!(
                parcel = %parcel.id.0,
                priority = parcel.priority.label(),
                vehicle = %candidate.vehicle.id.0,
                vehicle_type = candidate.vehicle.vehicle_type.label(),
                status = candidate.vehicle.status.label(),
                score = candidate.score,
                breakdown = ?candidate.breakdown,
                additional_km = candidate.impact.additional_km,
                "scored consolidation candidate"
            );
        }

        match ranked.first() {
            Some(best) => policy::decide(parcel, best, &self.policy, now),
            None => policy::no_eligible_vehicle(context.vehicles.len()),
        }
    }
}
