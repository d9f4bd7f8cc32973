use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::workflows::consolidation::domain::{
    Coordinates, DecisionContext, Parcel, ParcelId, ParcelPriority, Vehicle, VehicleId,
    VehicleStatus, VehicleType,
};
use crate::workflows::consolidation::evaluation::{
    ConsolidationDecision, ConsolidationEngine, ConstraintChecks, PolicyConfig,
};
use crate::workflows::consolidation::geo::{DistanceStatus, GeoDistance, GeoError, RouteEstimate};
use crate::workflows::consolidation::recorder::{
    AuditError, DecisionAuditLog, DecisionRecord, DecisionRecorder, RecorderSettings,
};
use crate::workflows::consolidation::service::ConsolidationService;

pub(super) const DEPOT: Coordinates = Coordinates::new(12.9716, 77.5946);
pub(super) const DROP_OFF: Coordinates = Coordinates::new(12.9900, 77.5946);

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn parcel_due(deadline: DateTime<Utc>) -> Parcel {
    Parcel {
        id: ParcelId("parcel-001".to_string()),
        weight_kg: 2.5,
        volume_m3: 0.1,
        destination: DROP_OFF,
        sla_deadline: deadline,
        priority: ParcelPriority::Normal,
    }
}

/// The parcel from the reference walkthrough: due four hours from `now()`.
pub(super) fn parcel() -> Parcel {
    parcel_due(now() + chrono::Duration::hours(4))
}

/// The van from the reference walkthrough.
pub(super) fn four_wheeler(id: &str) -> Vehicle {
    Vehicle {
        id: VehicleId(id.to_string()),
        registration: format!("KA-01-{id}"),
        vehicle_type: VehicleType::FourWheeler,
        status: VehicleStatus::Dispatched,
        location: DEPOT,
        spare_weight_kg: 15.5,
        spare_volume_m3: 1.3,
        current_load_weight_kg: 25.0,
        current_load_volume_m3: 1.2,
        max_weight_kg: 50.0,
        max_volume_m3: 2.5,
        current_utilization_pct: 50.0,
        trust_score: 92,
        max_deviation_km: 10.0,
        max_deviation_minutes: 30.0,
        allow_consolidation: true,
    }
}

pub(super) fn two_wheeler(id: &str, trust_score: u8) -> Vehicle {
    Vehicle {
        id: VehicleId(id.to_string()),
        registration: format!("KA-05-{id}"),
        vehicle_type: VehicleType::TwoWheeler,
        status: VehicleStatus::InTransit,
        location: DEPOT,
        spare_weight_kg: 10.0,
        spare_volume_m3: 0.5,
        current_load_weight_kg: 5.0,
        current_load_volume_m3: 0.2,
        max_weight_kg: 15.0,
        max_volume_m3: 0.7,
        current_utilization_pct: 33.0,
        trust_score,
        max_deviation_km: 5.0,
        max_deviation_minutes: 20.0,
        allow_consolidation: true,
    }
}

pub(super) fn context(vehicles: Vec<Vehicle>) -> DecisionContext {
    DecisionContext {
        parcel: parcel(),
        vehicles,
        shadow_mode: false,
    }
}

/// Geospatial stub answering every lookup with the same road distance.
pub(super) struct FixedDistance {
    pub(super) km: f64,
    pub(super) minutes: f64,
}

impl FixedDistance {
    pub(super) fn walkthrough() -> Self {
        Self {
            km: 2.5,
            minutes: 8.0,
        }
    }
}

#[async_trait]
impl GeoDistance for FixedDistance {
    async fn distance(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        Ok(RouteEstimate {
            distance_km: self.km,
            duration_minutes: self.minutes,
            status: DistanceStatus::Ok,
        })
    }
}

pub(super) struct FailingDistance;

#[async_trait]
impl GeoDistance for FailingDistance {
    async fn distance(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        Err(GeoError::Api {
            status: 503,
            message: "routing backend offline".to_string(),
        })
    }
}

/// Never answers within the default lookup timeout.
pub(super) struct StalledDistance;

#[async_trait]
impl GeoDistance for StalledDistance {
    async fn distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        FixedDistance::walkthrough().distance(origin, destination).await
    }
}

/// Tracks the peak number of lookups in flight.
#[derive(Default)]
pub(super) struct CountingDistance {
    in_flight: AtomicUsize,
    pub(super) peak: AtomicUsize,
    pub(super) calls: AtomicUsize,
}

#[async_trait]
impl GeoDistance for CountingDistance {
    async fn distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        FixedDistance::walkthrough().distance(origin, destination).await
    }
}

pub(super) fn engine<G: GeoDistance>(geo: G) -> ConsolidationEngine<G> {
    ConsolidationEngine::new(Arc::new(geo), PolicyConfig::default())
}

pub(super) fn sample_decision() -> ConsolidationDecision {
    ConsolidationDecision::Reject {
        explanation: "no vehicle meets hard constraints".to_string(),
        constraints: ConstraintChecks::none_satisfied(),
        vehicle_id: None,
        score: None,
        impact: None,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAuditLog {
    records: Arc<Mutex<Vec<DecisionRecord>>>,
}

impl MemoryAuditLog {
    pub(super) fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().expect("audit mutex poisoned").clone()
    }
}

impl DecisionAuditLog for MemoryAuditLog {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .expect("audit mutex poisoned")
            .push(record);
        Ok(())
    }

    fn history(&self, parcel_id: &ParcelId) -> Result<Vec<DecisionRecord>, AuditError> {
        Ok(self
            .records()
            .into_iter()
            .filter(|record| &record.parcel_id == parcel_id)
            .collect())
    }
}

/// Rejects the first `failures` writes, then stores normally.
#[derive(Default)]
pub(super) struct FlakyAuditLog {
    pub(super) failures: usize,
    pub(super) attempts: AtomicUsize,
    pub(super) inner: MemoryAuditLog,
}

impl DecisionAuditLog for FlakyAuditLog {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(AuditError::Unavailable("ledger timeout".to_string()));
        }
        self.inner.record(record)
    }

    fn history(&self, parcel_id: &ParcelId) -> Result<Vec<DecisionRecord>, AuditError> {
        self.inner.history(parcel_id)
    }
}

pub(super) struct UnavailableAuditLog;

impl DecisionAuditLog for UnavailableAuditLog {
    fn record(&self, _record: DecisionRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _parcel_id: &ParcelId) -> Result<Vec<DecisionRecord>, AuditError> {
        Err(AuditError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service<G, L>(
    geo: G,
    log: Arc<L>,
) -> (ConsolidationService<G, L>, JoinHandle<()>)
where
    G: GeoDistance + 'static,
    L: DecisionAuditLog + 'static,
{
    let (recorder, handle) = DecisionRecorder::spawn(log.clone(), RecorderSettings::default());
    let service =
        ConsolidationService::new(Arc::new(geo), log, recorder, PolicyConfig::default());
    (service, handle)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
