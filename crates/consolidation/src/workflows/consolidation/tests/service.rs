use std::sync::Arc;

use super::common::*;
use crate::workflows::consolidation::domain::ParcelId;
use crate::workflows::consolidation::evaluation::PolicyConfig;
use crate::workflows::consolidation::recorder::{AuditError, DecisionAuditLog, DecisionRecord};
use crate::workflows::consolidation::service::ConsolidationServiceError;
use crate::workflows::consolidation::validation::ValidationError;

#[tokio::test]
async fn shadow_decisions_are_recorded_and_flagged() {
    let log = Arc::new(MemoryAuditLog::default());
    let (service, handle) = build_service(FixedDistance::walkthrough(), log.clone());

    let mut context = context(vec![four_wheeler("veh-a")]);
    context.shadow_mode = true;
    let decision = service
        .evaluate_at(context, now())
        .await
        .expect("valid context evaluates");
    drop(service);
    handle.await.expect("recorder task completes");

    let records = log.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].shadow_mode);
    assert_eq!(records[0].decision, decision);
    assert_eq!(records[0].parcel_id, ParcelId("parcel-001".to_string()));
}

#[tokio::test]
async fn shadow_flag_does_not_change_the_decision() {
    let log = Arc::new(MemoryAuditLog::default());
    let (service, _handle) = build_service(FixedDistance::walkthrough(), log);

    let live = context(vec![four_wheeler("veh-a"), two_wheeler("veh-b", 88)]);
    let mut shadow = live.clone();
    shadow.shadow_mode = true;

    let live = service.evaluate_at(live, now()).await.expect("live");
    let shadow = service.evaluate_at(shadow, now()).await.expect("shadow");

    assert_eq!(live, shadow);
}

#[tokio::test]
async fn invalid_context_is_refused_and_not_recorded() {
    let log = Arc::new(MemoryAuditLog::default());
    let (service, handle) = build_service(FixedDistance::walkthrough(), log.clone());

    let mut context = context(vec![four_wheeler("veh-a")]);
    context.parcel.weight_kg = -1.0;

    match service.evaluate_at(context, now()).await {
        Err(ConsolidationServiceError::Validation(ValidationError::NonPositiveWeight(id))) => {
            assert_eq!(id, ParcelId("parcel-001".to_string()));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    drop(service);
    handle.await.expect("recorder task completes");

    assert!(log.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn audit_outage_does_not_affect_the_decision() {
    let (service, handle) = build_service(
        FixedDistance::walkthrough(),
        Arc::new(UnavailableAuditLog),
    );

    let decision = service
        .evaluate_at(context(vec![four_wheeler("veh-a")]), now())
        .await
        .expect("decision survives audit outage");
    drop(service);
    handle.await.expect("recorder task completes");

    assert!(decision.is_accept());
    assert_eq!(decision.score(), Some(64));
}

#[tokio::test]
async fn history_reads_from_the_audit_log() {
    let log = Arc::new(MemoryAuditLog::default());
    let (service, _handle) = build_service(FixedDistance::walkthrough(), log.clone());

    for (raw, shadow_mode) in [("parcel-001", false), ("parcel-002", true), ("parcel-001", true)] {
        log.record(DecisionRecord {
            parcel_id: ParcelId(raw.to_string()),
            decision: sample_decision(),
            shadow_mode,
            recorded_at: now(),
        })
        .expect("memory log accepts records");
    }

    let history = service
        .history(&ParcelId("parcel-001".to_string()))
        .expect("history available");

    assert_eq!(history.len(), 2);
    assert!(!history[0].shadow_mode);
    assert!(history[1].shadow_mode);
}

#[tokio::test]
async fn history_propagates_audit_errors() {
    let (service, _handle) = build_service(
        FixedDistance::walkthrough(),
        Arc::new(UnavailableAuditLog),
    );

    match service.history(&ParcelId("parcel-001".to_string())) {
        Err(ConsolidationServiceError::Audit(AuditError::Unavailable(_))) => {}
        other => panic!("expected audit error, got {other:?}"),
    }
}

#[tokio::test]
async fn exposes_the_policy_it_was_built_with() {
    let (service, _handle) = build_service(
        FixedDistance::walkthrough(),
        Arc::new(MemoryAuditLog::default()),
    );

    assert_eq!(service.engine().policy(), &PolicyConfig::default());
    assert_eq!(service.engine().policy().lookup_concurrency(), 8);
}
