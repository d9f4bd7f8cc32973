use crate::infra::InMemoryDecisionLog;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use parcel_consolidation::error::AppError;
use parcel_consolidation::workflows::consolidation::{
    ConsolidationDecision, ConsolidationService, Coordinates, DecisionAuditLog, DecisionContext,
    DecisionRecorder, DistanceStatus, GeoDistance, GeoError, HaversineDistance, Parcel, ParcelId,
    ParcelPriority, PolicyConfig, RecorderSettings, RouteEstimate, Vehicle, VehicleId,
    VehicleStatus, VehicleType,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::error;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Decision context JSON file: `{ "parcel": .., "vehicles": [..], "shadow_mode": false }`
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Record the decision as shadow-mode regardless of the file contents
    #[arg(long)]
    pub(crate) shadow: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print each scenario's decision as JSON instead of prose.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs { input, shadow } = args;

    let raw = std::fs::read_to_string(&input)?;
    let mut context: DecisionContext = serde_json::from_str(&raw)?;
    context.shadow_mode |= shadow;

    let log = Arc::new(InMemoryDecisionLog::default());
    let (recorder, recorder_task) =
        DecisionRecorder::spawn(log.clone(), RecorderSettings::default());
    let service = ConsolidationService::new(
        Arc::new(HaversineDistance::default()),
        log,
        recorder,
        PolicyConfig::default(),
    );

    let decision = service.evaluate(context).await?;
    drop(service);
    finish_recording(recorder_task).await;

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

/// Waits for the recorder to flush its queue. Returns false when the worker panicked or was cancelled.
async fn finish_recording(recorder_task: JoinHandle<()>) -> bool {
    match recorder_task.await {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "decision recorder task did not finish cleanly");
            false
        }
    }
}

/// Road-distance stand-in that answers every lookup with the same detour.
struct ScriptedDistance {
    distance_km: f64,
    duration_minutes: f64,
}

impl ScriptedDistance {
    fn new(distance_km: f64, duration_minutes: f64) -> Self {
        Self {
            distance_km,
            duration_minutes,
        }
    }
}

#[async_trait]
impl GeoDistance for ScriptedDistance {
    async fn distance(
        &self,
        _origin: Coordinates,
        _destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        Ok(RouteEstimate {
            distance_km: self.distance_km,
            duration_minutes: self.duration_minutes,
            status: DistanceStatus::Ok,
        })
    }
}

#[derive(Debug, Serialize)]
struct ScenarioOutcome {
    scenario: &'static str,
    decision: ConsolidationDecision,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = Utc::now();
    let log = Arc::new(InMemoryDecisionLog::default());
    let (recorder, recorder_task) =
        DecisionRecorder::spawn(log.clone(), RecorderSettings::default());
    let service = ConsolidationService::new(
        Arc::new(ScriptedDistance::new(2.5, 8.0)),
        log.clone(),
        recorder,
        PolicyConfig::default(),
    );

    let scenarios = [
        ("van already passing the drop-off", walkthrough_context(now)),
        ("no vehicle clears the hard constraints", stranded_context(now)),
        ("deadline too tight for the van's buffer", rushed_context(now)),
    ];

    let mut outcomes = Vec::with_capacity(scenarios.len());
    for (scenario, context) in scenarios {
        let decision = service.evaluate_at(context, now).await?;
        outcomes.push(ScenarioOutcome { scenario, decision });
    }

    drop(service);
    finish_recording(recorder_task).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    println!("Parcel consolidation demo (road distance fixed at 2.5 km / 8 min)");
    for ScenarioOutcome { scenario, decision } in &outcomes {
        println!("\n{scenario}");
        println!("  outcome: {}", decision.outcome_label().to_uppercase());
        if let Some(score) = decision.score() {
            println!("  score: {score}/100");
        }
        let constraints = decision.constraints();
        println!(
            "  constraints: capacity={} sla={} deviation={} trust={}",
            constraints.capacity, constraints.sla, constraints.deviation, constraints.trust
        );
        println!("  {}", decision.explanation());
    }

    println!("\nAudit trail");
    for record in log.all() {
        println!("  {}", record.summary());
    }
    let recorded = log.history(&ParcelId("demo-parcel-1".to_string()))?;
    println!("  ({} record(s) for demo-parcel-1)", recorded.len());

    Ok(())
}

const HUB: Coordinates = Coordinates::new(12.9716, 77.5946);
const CUSTOMER: Coordinates = Coordinates::new(12.99, 77.6);

fn parcel(id: &str, deadline: DateTime<Utc>) -> Parcel {
    Parcel {
        id: ParcelId(id.to_string()),
        weight_kg: 2.5,
        volume_m3: 0.1,
        destination: CUSTOMER,
        sla_deadline: deadline,
        priority: ParcelPriority::Normal,
    }
}

fn van() -> Vehicle {
    Vehicle {
        id: VehicleId("van-7".to_string()),
        registration: "KA-01-AB-1234".to_string(),
        vehicle_type: VehicleType::FourWheeler,
        status: VehicleStatus::Dispatched,
        location: HUB,
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

fn scooter() -> Vehicle {
    Vehicle {
        id: VehicleId("scooter-2".to_string()),
        registration: "KA-05-XY-9876".to_string(),
        vehicle_type: VehicleType::TwoWheeler,
        status: VehicleStatus::InTransit,
        location: HUB,
        spare_weight_kg: 10.0,
        spare_volume_m3: 0.5,
        current_load_weight_kg: 5.0,
        current_load_volume_m3: 0.2,
        max_weight_kg: 15.0,
        max_volume_m3: 0.7,
        current_utilization_pct: 33.0,
        trust_score: 78,
        max_deviation_km: 5.0,
        max_deviation_minutes: 20.0,
        allow_consolidation: true,
    }
}

fn walkthrough_context(now: DateTime<Utc>) -> DecisionContext {
    DecisionContext {
        parcel: parcel("demo-parcel-1", now + Duration::hours(4)),
        vehicles: vec![van(), scooter()],
        shadow_mode: false,
    }
}

fn stranded_context(now: DateTime<Utc>) -> DecisionContext {
    let mut parked = van();
    parked.status = VehicleStatus::Idle;
    let mut opted_out = van();
    opted_out.id = VehicleId("van-9".to_string());
    opted_out.allow_consolidation = false;

    DecisionContext {
        parcel: parcel("demo-parcel-2", now + Duration::hours(4)),
        vehicles: vec![parked, opted_out, scooter()],
        shadow_mode: true,
    }
}

fn rushed_context(now: DateTime<Utc>) -> DecisionContext {
    DecisionContext {
        parcel: parcel("demo-parcel-3", now + Duration::minutes(20)),
        vehicles: vec![van()],
        shadow_mode: true,
    }
}
