use std::cmp::Ordering;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::super::domain::{Parcel, ParcelPriority, Vehicle, VehicleType};
use super::super::geo::GeoDistance;
use tokio::sync::Semaphore;

use super::impact::{Impact, ImpactEstimator};

pub const CAPACITY_FIT_MAX: f64 = 30.0;
pub const PROXIMITY_MAX: f64 = 25.0;
pub const TRUST_MAX: f64 = 20.0;

/// The five independently capped factors behind a vehicle's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub capacity_fit: f64,
    pub proximity: f64,
    pub trust: f64,
    pub vehicle_type: f64,
    pub priority: f64,
}

impl ScoreBreakdown {
    pub fn compute(parcel: &Parcel, vehicle: &Vehicle, impact: &Impact) -> Self {
        Self {
            capacity_fit: capacity_fit(parcel, vehicle),
            proximity: proximity(impact.additional_km),
            trust: (f64::from(vehicle.trust_score.min(100)) / 100.0) * TRUST_MAX,
            vehicle_type: type_preference(vehicle.vehicle_type),
            priority: priority_bonus(parcel.priority),
        }
    }

    pub fn total(&self) -> f64 {
        self.capacity_fit + self.proximity + self.trust + self.vehicle_type + self.priority
    }

    /// Rounded total, always within 0..=100.
    pub fn score(&self) -> u8 {
        let total = self.total();
        if total.is_nan() {
            return 0;
        }
        total.clamp(0.0, 100.0).round() as u8
    }
}

fn share_pct(demand: f64, spare: f64) -> f64 {
    if spare > 0.0 {
        demand / spare * 100.0
    } else if demand > 0.0 {
        100.0
    } else {
        0.0
    }
}

fn capacity_fit(parcel: &Parcel, vehicle: &Vehicle) -> f64 {
    let weight_pct = share_pct(parcel.weight_kg, vehicle.spare_weight_kg);
    let volume_pct = share_pct(parcel.volume_m3, vehicle.spare_volume_m3);
    let tighter = weight_pct.min(volume_pct).clamp(0.0, 100.0);
    tighter / 100.0 * CAPACITY_FIT_MAX
}

fn proximity(additional_km: f64) -> f64 {
    if additional_km.is_nan() {
        return 0.0;
    }
    (PROXIMITY_MAX - (additional_km / 10.0) * 5.0).clamp(0.0, PROXIMITY_MAX)
}

pub(crate) const fn type_preference(vehicle_type: VehicleType) -> f64 {
    match vehicle_type {
        VehicleType::FourWheeler => 15.0,
        VehicleType::TwoWheeler => 5.0,
    }
}

pub(crate) const fn priority_bonus(priority: ParcelPriority) -> f64 {
    match priority {
        ParcelPriority::Low => 2.0,
        ParcelPriority::Normal => 5.0,
        ParcelPriority::High => 8.0,
        ParcelPriority::Urgent => 10.0,
    }
}

/// A scored vehicle paired with the impact its score was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub vehicle: &'a Vehicle,
    pub score: u8,
    pub breakdown: ScoreBreakdown,
    pub impact: Impact,
}

/// Best first: higher score, then higher trust, then lower vehicle id.
pub(crate) fn compare_candidates(a: &ScoredCandidate<'_>, b: &ScoredCandidate<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.vehicle.trust_score.cmp(&a.vehicle.trust_score))
        .then_with(|| a.vehicle.id.cmp(&b.vehicle.id))
}

pub struct VehicleScorer<G> {
    estimator: ImpactEstimator<G>,
    concurrency: usize,
}

impl<G> VehicleScorer<G>
where
    G: GeoDistance,
{
    pub fn new(estimator: ImpactEstimator<G>, concurrency: usize) -> Self {
        Self {
            estimator,
            concurrency: concurrency.clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    pub async fn score<'a>(&self, parcel: &Parcel, vehicle: &'a Vehicle) -> ScoredCandidate<'a> {
        let impact = self.estimator.estimate(parcel, vehicle).await;
        let breakdown = ScoreBreakdown::compute(parcel, vehicle, &impact);

        ScoredCandidate {
            vehicle,
            score: breakdown.score(),
            breakdown,
            impact,
        }
    }

    /// Scores every vehicle with at most `concurrency` lookups in flight, best first.
    pub async fn rank<'a>(
        &self,
        parcel: &Parcel,
        vehicles: Vec<&'a Vehicle>,
    ) -> Vec<ScoredCandidate<'a>> {
        let permits = Semaphore::new(self.concurrency);

        let mut lookups = Vec::with_capacity(vehicles.len());
        for vehicle in vehicles {
            lookups.push(self.score_with_permit(&permits, parcel, vehicle));
        }

        let mut ranked = join_all(lookups).await;
        ranked.sort_by(compare_candidates);
        ranked
    }

    async fn score_with_permit<'a>(
        &self,
        permits: &Semaphore,
        parcel: &Parcel,
        vehicle: &'a Vehicle,
    ) -> ScoredCandidate<'a> {
        // The semaphore is never closed, so acquisition only waits.
        let _permit = permits.acquire().await.ok();
        self.score(parcel, vehicle).await
    }
}
