use std::collections::HashSet;

use super::domain::{DecisionContext, Parcel, ParcelId, Vehicle, VehicleId};

/// Input invariant violations. A context carrying any of these is refused outright.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("parcel {0} must weigh more than 0 kg")]
    NonPositiveWeight(ParcelId),
    #[error("parcel {0} has a negative or non-finite volume")]
    NegativeVolume(ParcelId),
    #[error("{subject} has malformed coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        subject: String,
        latitude: f64,
        longitude: f64,
    },
    #[error("vehicle {vehicle} trust score {found} exceeds 100")]
    TrustScoreOutOfRange { vehicle: VehicleId, found: u8 },
    #[error("vehicle {vehicle} declares invalid {field}")]
    InvalidCapacity {
        vehicle: VehicleId,
        field: &'static str,
    },
    #[error("vehicle {vehicle} current {axis} load {load} exceeds maximum {max}")]
    LoadExceedsCapacity {
        vehicle: VehicleId,
        axis: &'static str,
        load: f64,
        max: f64,
    },
    #[error("vehicle {vehicle} utilization {found} is outside 0..=100")]
    UtilizationOutOfRange { vehicle: VehicleId, found: f64 },
    #[error("vehicle {0} has a negative deviation allowance")]
    NegativeDeviationAllowance(VehicleId),
    #[error("vehicle {0} appears more than once in the candidate list")]
    DuplicateVehicle(VehicleId),
}

/// Guard run before any evaluation so the engine only ever sees sane snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextGuard;

impl ContextGuard {
    pub fn validate(&self, context: &DecisionContext) -> Result<(), ValidationError> {
        validate_parcel(&context.parcel)?;

        let mut seen = HashSet::with_capacity(context.vehicles.len());
        for vehicle in &context.vehicles {
            if !seen.insert(&vehicle.id) {
                return Err(ValidationError::DuplicateVehicle(vehicle.id.clone()));
            }
            validate_vehicle(vehicle)?;
        }

        Ok(())
    }
}

fn validate_parcel(parcel: &Parcel) -> Result<(), ValidationError> {
    if !parcel.weight_kg.is_finite() || parcel.weight_kg <= 0.0 {
        return Err(ValidationError::NonPositiveWeight(parcel.id.clone()));
    }
    if !parcel.volume_m3.is_finite() || parcel.volume_m3 < 0.0 {
        return Err(ValidationError::NegativeVolume(parcel.id.clone()));
    }
    if !parcel.destination.is_valid() {
        return Err(ValidationError::InvalidCoordinates {
            subject: format!("parcel {}", parcel.id.0),
            latitude: parcel.destination.latitude,
            longitude: parcel.destination.longitude,
        });
    }
    Ok(())
}

fn validate_vehicle(vehicle: &Vehicle) -> Result<(), ValidationError> {
    if !vehicle.location.is_valid() {
        return Err(ValidationError::InvalidCoordinates {
            subject: format!("vehicle {}", vehicle.id.0),
            latitude: vehicle.location.latitude,
            longitude: vehicle.location.longitude,
        });
    }

    if vehicle.trust_score > 100 {
        return Err(ValidationError::TrustScoreOutOfRange {
            vehicle: vehicle.id.clone(),
            found: vehicle.trust_score,
        });
    }

    let non_negative = [
        ("spare_weight_kg", vehicle.spare_weight_kg),
        ("spare_volume_m3", vehicle.spare_volume_m3),
        ("current_load_weight_kg", vehicle.current_load_weight_kg),
        ("current_load_volume_m3", vehicle.current_load_volume_m3),
    ];
    for (field, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidCapacity {
                vehicle: vehicle.id.clone(),
                field,
            });
        }
    }

    for (field, value) in [
        ("max_weight_kg", vehicle.max_weight_kg),
        ("max_volume_m3", vehicle.max_volume_m3),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::InvalidCapacity {
                vehicle: vehicle.id.clone(),
                field,
            });
        }
    }

    if vehicle.current_load_weight_kg > vehicle.max_weight_kg {
        return Err(ValidationError::LoadExceedsCapacity {
            vehicle: vehicle.id.clone(),
            axis: "weight",
            load: vehicle.current_load_weight_kg,
            max: vehicle.max_weight_kg,
        });
    }
    if vehicle.current_load_volume_m3 > vehicle.max_volume_m3 {
        return Err(ValidationError::LoadExceedsCapacity {
            vehicle: vehicle.id.clone(),
            axis: "volume",
            load: vehicle.current_load_volume_m3,
            max: vehicle.max_volume_m3,
        });
    }

    if !(0.0..=100.0).contains(&vehicle.current_utilization_pct) {
        return Err(ValidationError::UtilizationOutOfRange {
            vehicle: vehicle.id.clone(),
            found: vehicle.current_utilization_pct,
        });
    }

    if !(vehicle.max_deviation_km >= 0.0 && vehicle.max_deviation_minutes >= 0.0) {
        return Err(ValidationError::NegativeDeviationAllowance(
            vehicle.id.clone(),
        ));
    }

    Ok(())
}
