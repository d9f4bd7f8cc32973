use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{Parcel, Vehicle, VehicleId};
use super::super::geo::DistanceStatus;
use super::config::PolicyConfig;
use super::eligibility::meets_trust;
use super::impact::Impact;
use super::scoring::ScoredCandidate;

/// Outcome of every constraint checked against the candidate that was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstraintChecks {
    pub capacity: bool,
    pub sla: bool,
    pub deviation: bool,
    pub trust: bool,
}

impl ConstraintChecks {
    pub const fn none_satisfied() -> Self {
        Self {
            capacity: false,
            sla: false,
            deviation: false,
            trust: false,
        }
    }

    pub const fn all_satisfied(&self) -> bool {
        self.capacity && self.sla && self.deviation && self.trust
    }

    pub fn failed(&self) -> Vec<&'static str> {
        [
            ("capacity", self.capacity),
            ("sla", self.sla),
            ("deviation", self.deviation),
            ("trust", self.trust),
        ]
        .into_iter()
        .filter(|(_, passed)| !passed)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Final, explainable verdict for a single parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsolidationDecision {
    Accept {
        vehicle_id: VehicleId,
        score: u8,
        explanation: String,
        constraints: ConstraintChecks,
        impact: Impact,
    },
    Reject {
        explanation: String,
        constraints: ConstraintChecks,
        /// Best candidate that was re-checked, absent when nothing was eligible.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vehicle_id: Option<VehicleId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        impact: Option<Impact>,
    },
}

impl ConsolidationDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, ConsolidationDecision::Accept { .. })
    }

    pub const fn outcome_label(&self) -> &'static str {
        match self {
            ConsolidationDecision::Accept { .. } => "accept",
            ConsolidationDecision::Reject { .. } => "reject",
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            ConsolidationDecision::Accept { explanation, .. }
            | ConsolidationDecision::Reject { explanation, .. } => explanation,
        }
    }

    pub fn constraints(&self) -> &ConstraintChecks {
        match self {
            ConsolidationDecision::Accept { constraints, .. }
            | ConsolidationDecision::Reject { constraints, .. } => constraints,
        }
    }

    pub fn vehicle_id(&self) -> Option<&VehicleId> {
        match self {
            ConsolidationDecision::Accept { vehicle_id, .. } => Some(vehicle_id),
            ConsolidationDecision::Reject { vehicle_id, .. } => vehicle_id.as_ref(),
        }
    }

    pub fn score(&self) -> Option<u8> {
        match self {
            ConsolidationDecision::Accept { score, .. } => Some(*score),
            ConsolidationDecision::Reject { score, .. } => *score,
        }
    }
}

pub(crate) fn no_eligible_vehicle(candidate_count: usize) -> ConsolidationDecision {
    ConsolidationDecision::Reject {
        explanation: format!(
            "no vehicle meets hard constraints (capacity, trust, en-route status, consolidation opt-in) among {candidate_count} candidate(s)"
        ),
        constraints: ConstraintChecks::none_satisfied(),
        vehicle_id: None,
        score: None,
        impact: None,
    }
}

pub(crate) fn check_constraints(
    parcel: &Parcel,
    vehicle: &Vehicle,
    impact: &Impact,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> ConstraintChecks {
    let buffer = f64::from(policy.for_type(vehicle.vehicle_type).sla_buffer_minutes);
    let minutes_until_deadline = (parcel.sla_deadline - now).num_seconds() as f64 / 60.0;

    ConstraintChecks {
        capacity: vehicle.fits(parcel),
        sla: impact.additional_minutes + buffer <= minutes_until_deadline,
        deviation: impact.additional_km <= vehicle.max_deviation_km
            && impact.additional_minutes <= vehicle.max_deviation_minutes,
        trust: meets_trust(vehicle, policy),
    }
}

/// Re-validates the top-ranked candidate and applies the per-type score threshold.
pub(crate) fn decide(
    parcel: &Parcel,
    best: &ScoredCandidate<'_>,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> ConsolidationDecision {
    let vehicle = best.vehicle;
    let constraints = check_constraints(parcel, vehicle, &best.impact, policy, now);
    let minimum_score = policy.for_type(vehicle.vehicle_type).minimum_score;

    if constraints.all_satisfied() && best.score >= minimum_score {
        return ConsolidationDecision::Accept {
            vehicle_id: vehicle.id.clone(),
            score: best.score,
            explanation: accept_explanation(vehicle, best.score, &best.impact),
            constraints,
            impact: best.impact,
        };
    }

    ConsolidationDecision::Reject {
        explanation: reject_explanation(vehicle, best.score, minimum_score, &constraints),
        constraints,
        vehicle_id: Some(vehicle.id.clone()),
        score: Some(best.score),
        impact: Some(best.impact),
    }
}

fn accept_explanation(vehicle: &Vehicle, score: u8, impact: &Impact) -> String {
    let mut text = format!(
        "consolidate onto {} (score {}/100): +{:.1} km, +{:.0} min, utilization +{:.1} pts",
        vehicle.registration,
        score,
        impact.additional_km,
        impact.additional_minutes,
        impact.utilization_improvement_pct
    );
    if impact.distance_source == DistanceStatus::Fallback {
        text.push_str(" (distance estimated)");
    }
    text
}

fn reject_explanation(
    vehicle: &Vehicle,
    score: u8,
    minimum_score: u8,
    constraints: &ConstraintChecks,
) -> String {
    let mut reasons = Vec::new();

    let failed = constraints.failed();
    if !failed.is_empty() {
        reasons.push(format!("failed constraints: {}", failed.join(", ")));
    }
    if score < minimum_score {
        reasons.push(format!(
            "score {score} below minimum {minimum_score} by {}",
            minimum_score - score
        ));
    }

    format!(
        "rejected best candidate {} (score {}/100): {}",
        vehicle.registration,
        score,
        reasons.join("; ")
    )
}
