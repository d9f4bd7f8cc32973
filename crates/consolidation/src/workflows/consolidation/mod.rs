//! Consolidation of missed parcels onto vehicles already en route.
//!
//! A single evaluation filters the candidate fleet on hard constraints, scores the survivors
//! with a fixed five-factor heuristic, re-checks the best candidate against SLA and deviation
//! limits, and returns an ACCEPT/REJECT decision with a human-readable explanation. Every
//! decision is handed to a background recorder, including shadow-mode decisions.

pub mod domain;
pub mod evaluation;
pub mod geo;
pub mod recorder;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Coordinates, DecisionContext, Parcel, ParcelId, ParcelPriority, Vehicle, VehicleId,
    VehicleStatus, VehicleType,
};
pub use evaluation::{
    ConsolidationDecision, ConsolidationEngine, ConstraintChecks, Impact, PolicyConfig,
    ScoreBreakdown, VehicleTypePolicy,
};
pub use geo::{
    DistanceStatus, GeoDistance, GeoError, GeoProvider, HaversineDistance, OsrmDistanceClient,
    RouteEstimate,
};
pub use recorder::{
    AuditError, DecisionAuditLog, DecisionRecord, DecisionRecorder, RecorderError,
    RecorderSettings,
};
pub use router::consolidation_router;
pub use service::{ConsolidationService, ConsolidationServiceError};
pub use validation::{ContextGuard, ValidationError};
