use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for parcels awaiting consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParcelId(pub String);

/// Identifier wrapper for fleet vehicles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub String);

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Delivery urgency, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParcelPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl ParcelPriority {
    pub const fn label(self) -> &'static str {
        match self {
            ParcelPriority::Low => "low",
            ParcelPriority::Normal => "normal",
            ParcelPriority::High => "high",
            ParcelPriority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    TwoWheeler,
    FourWheeler,
}

impl VehicleType {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleType::TwoWheeler => "two_wheeler",
            VehicleType::FourWheeler => "four_wheeler",
        }
    }
}

/// Operational state reported by the fleet for a vehicle snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Idle,
    Dispatched,
    InTransit,
    Maintenance,
    Offline,
}

impl VehicleStatus {
    /// Only vehicles already on the road can absorb a missed parcel.
    pub const fn is_en_route(self) -> bool {
        match self {
            VehicleStatus::Dispatched | VehicleStatus::InTransit => true,
            VehicleStatus::Idle | VehicleStatus::Maintenance | VehicleStatus::Offline => false,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            VehicleStatus::Idle => "idle",
            VehicleStatus::Dispatched => "dispatched",
            VehicleStatus::InTransit => "in_transit",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::Offline => "offline",
        }
    }
}

/// A parcel that missed its originally assigned vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: ParcelId,
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub destination: Coordinates,
    pub sla_deadline: DateTime<Utc>,
    pub priority: ParcelPriority,
}

/// Point-in-time view of a vehicle handed to the engine by the fleet store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub registration: String,
    pub vehicle_type: VehicleType,
    pub status: VehicleStatus,
    pub location: Coordinates,
    pub spare_weight_kg: f64,
    pub spare_volume_m3: f64,
    pub current_load_weight_kg: f64,
    pub current_load_volume_m3: f64,
    pub max_weight_kg: f64,
    pub max_volume_m3: f64,
    pub current_utilization_pct: f64,
    pub trust_score: u8,
    pub max_deviation_km: f64,
    pub max_deviation_minutes: f64,
    pub allow_consolidation: bool,
}

impl Vehicle {
    pub fn fits(&self, parcel: &Parcel) -> bool {
        self.spare_weight_kg >= parcel.weight_kg && self.spare_volume_m3 >= parcel.volume_m3
    }
}

/// Everything a single evaluation needs. Evaluations share no state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub parcel: Parcel,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    /// Advisory-only evaluation: recorded but never acted upon.
    #[serde(default)]
    pub shadow_mode: bool,
}
