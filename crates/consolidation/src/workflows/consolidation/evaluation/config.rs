use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::super::domain::VehicleType;
use super::super::geo::DEFAULT_FALLBACK_SPEED_KMH;

/// Per-vehicle-type operating limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTypePolicy {
    pub minimum_trust: u8,
    pub sla_buffer_minutes: u32,
    pub minimum_score: u8,
}

/// Policy constants applied by the consolidation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub two_wheeler: VehicleTypePolicy,
    pub four_wheeler: VehicleTypePolicy,
    pub fallback_speed_kmh: f64,
    /// Upper bound on a single geospatial lookup, in milliseconds.
    pub lookup_timeout_ms: u64,
    pub max_concurrent_lookups: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            two_wheeler: VehicleTypePolicy {
                minimum_trust: 80,
                sla_buffer_minutes: 15,
                minimum_score: 60,
            },
            four_wheeler: VehicleTypePolicy {
                minimum_trust: 70,
                sla_buffer_minutes: 30,
                minimum_score: 50,
            },
            fallback_speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
            lookup_timeout_ms: 2_000,
            max_concurrent_lookups: 8,
        }
    }
}

impl PolicyConfig {
    pub fn for_type(&self, vehicle_type: VehicleType) -> &VehicleTypePolicy {
        match vehicle_type {
            VehicleType::TwoWheeler => &self.two_wheeler,
            VehicleType::FourWheeler => &self.four_wheeler,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms.max(1))
    }

    /// Permit count for the lookup semaphore, kept within what tokio can allocate.
    pub fn lookup_concurrency(&self) -> usize {
        self.max_concurrent_lookups.clamp(1, Semaphore::MAX_PERMITS)
    }
}
