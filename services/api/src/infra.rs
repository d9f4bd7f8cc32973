use metrics_exporter_prometheus::PrometheusHandle;
use parcel_consolidation::config::ConsolidationSettings;
use parcel_consolidation::workflows::consolidation::{
    AuditError, DecisionAuditLog, DecisionRecord, ParcelId, PolicyConfig, RecorderSettings,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local audit log keyed by parcel. Records are kept in arrival order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisionLog {
    records: Arc<Mutex<HashMap<ParcelId, Vec<DecisionRecord>>>>,
}

impl DecisionAuditLog for InMemoryDecisionLog {
    fn record(&self, record: DecisionRecord) -> Result<(), AuditError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| AuditError::Unavailable("decision log mutex poisoned".to_string()))?;
        guard
            .entry(record.parcel_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    fn history(&self, parcel_id: &ParcelId) -> Result<Vec<DecisionRecord>, AuditError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| AuditError::Unavailable("decision log mutex poisoned".to_string()))?;
        Ok(guard.get(parcel_id).cloned().unwrap_or_default())
    }
}

impl InMemoryDecisionLog {
    /// Every record across all parcels, ordered by recording time.
    pub(crate) fn all(&self) -> Vec<DecisionRecord> {
        let mut records: Vec<DecisionRecord> = match self.records.lock() {
            Ok(guard) => guard.values().flatten().cloned().collect(),
            Err(_) => Vec::new(),
        };
        records.sort_by_key(|record| record.recorded_at);
        records
    }
}

pub(crate) fn policy_from_settings(settings: &ConsolidationSettings) -> PolicyConfig {
    PolicyConfig {
        lookup_timeout_ms: u64::try_from(settings.geo_timeout.as_millis()).unwrap_or(u64::MAX),
        max_concurrent_lookups: settings.max_concurrent_lookups,
        ..PolicyConfig::default()
    }
}

pub(crate) fn recorder_settings(settings: &ConsolidationSettings) -> RecorderSettings {
    RecorderSettings {
        queue_capacity: settings.recorder_queue_capacity,
        max_retries: settings.recorder_max_retries,
        ..RecorderSettings::default()
    }
}
