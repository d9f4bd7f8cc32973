use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::super::domain::{Parcel, Vehicle};
use super::super::geo::{DistanceStatus, GeoDistance, HaversineDistance, RouteEstimate};

/// Marginal cost of adding a parcel to a vehicle's run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub additional_km: f64,
    pub additional_minutes: f64,
    pub utilization_improvement_pct: f64,
    pub distance_source: DistanceStatus,
}

/// Computes [`Impact`] using the geospatial collaborator, degrading to a local
/// great-circle estimate when the lookup fails or exceeds its timeout.
pub struct ImpactEstimator<G> {
    geo: Arc<G>,
    timeout: Duration,
    fallback: HaversineDistance,
}

impl<G> ImpactEstimator<G>
where
    G: GeoDistance,
{
    pub fn new(geo: Arc<G>, timeout: Duration, fallback_speed_kmh: f64) -> Self {
        Self {
            geo,
            timeout,
            fallback: HaversineDistance::new(fallback_speed_kmh),
        }
    }

    pub async fn estimate(&self, parcel: &Parcel, vehicle: &Vehicle) -> Impact {
        let route = self.route(parcel, vehicle).await;

        Impact {
            additional_km: route.distance_km,
            additional_minutes: route.duration_minutes,
            utilization_improvement_pct: utilization_improvement(parcel, vehicle),
            distance_source: route.status,
        }
    }

    async fn route(&self, parcel: &Parcel, vehicle: &Vehicle) -> RouteEstimate {
        let origin = vehicle.location;
        let destination = parcel.destination;

        match tokio::time::timeout(self.timeout, self.geo.distance(origin, destination)).await {
            Ok(Ok(route)) => route,
            Ok(Err(err)) => {
                warn!(
                    vehicle = %vehicle.id.0,
                    parcel = %parcel.id.0,
                    error = %err,
                    "distance lookup failed, using great-circle estimate"
                );
                self.fallback.estimate(origin, destination)
            }
            Err(_) => {
                warn!(
                    vehicle = %vehicle.id.0,
                    parcel = %parcel.id.0,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "distance lookup timed out, using great-circle estimate"
                );
                self.fallback.estimate(origin, destination)
            }
        }
    }
}

/// Utilization after loading, bottlenecked on the scarcer axis, minus current utilization.
pub(crate) fn utilization_improvement(parcel: &Parcel, vehicle: &Vehicle) -> f64 {
    let weight_pct =
        (vehicle.current_load_weight_kg + parcel.weight_kg) / vehicle.max_weight_kg * 100.0;
    let volume_pct =
        (vehicle.current_load_volume_m3 + parcel.volume_m3) / vehicle.max_volume_m3 * 100.0;
    weight_pct.max(volume_pct) - vehicle.current_utilization_pct
}
