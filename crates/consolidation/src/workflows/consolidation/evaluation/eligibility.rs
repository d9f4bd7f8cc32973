use super::super::domain::{Parcel, Vehicle};
use super::config::PolicyConfig;

/// Hard constraints a vehicle must clear before it is worth scoring.
pub(crate) fn is_eligible(parcel: &Parcel, vehicle: &Vehicle, policy: &PolicyConfig) -> bool {
    vehicle.fits(parcel)
        && meets_trust(vehicle, policy)
        && vehicle.status.is_en_route()
        && vehicle.allow_consolidation
}

pub(crate) fn meets_trust(vehicle: &Vehicle, policy: &PolicyConfig) -> bool {
    vehicle.trust_score >= policy.for_type(vehicle.vehicle_type).minimum_trust
}

/// Order-preserving subsequence of `vehicles` that clears every hard constraint.
pub fn filter_eligible<'a>(
    parcel: &Parcel,
    vehicles: &'a [Vehicle],
    policy: &PolicyConfig,
) -> Vec<&'a Vehicle> {
    vehicles
        .iter()
        .filter(|vehicle| is_eligible(parcel, vehicle, policy))
        .collect()
}
