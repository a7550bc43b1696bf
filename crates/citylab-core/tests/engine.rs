//! End-to-end runs of the simulation engine against the in-memory store.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use citylab_agents::{FALLBACK_CONFIDENCE, ReasoningProvider, StaticReasoning};
use citylab_core::{
    CityLabConfig, CityModel, EngineError, ModelOptions, RunControl, SimulationEngine,
    TICKS_PER_DAY, TICKS_PER_HOUR,
};
use citylab_db::MemoryStore;
use citylab_types::{ActionType, RunStatus};

use common::{REGISTRY_SIZE, ScriptedStore, SlowReasoning, city_data, collaborators, scenario};

fn per_tick(ticks: u64) -> usize {
    usize::try_from(ticks).unwrap() * REGISTRY_SIZE
}

fn scripted_reply() -> Option<Arc<dyn ReasoningProvider>> {
    Some(Arc::new(StaticReasoning::new(
        "Take the bus. Increase frequency on the busiest route and adopt congestion pricing.",
    )))
}

#[tokio::test]
async fn one_day_persists_hourly_snapshots_and_every_action() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = SimulationEngine::new(
        &CityLabConfig::default(),
        store.clone(),
        collaborators(None),
    );

    let run_id = engine.initialize(&scenario(42), &city_data()).await.unwrap();
    assert_eq!(store.agents(run_id).await.len(), REGISTRY_SIZE);
    assert_eq!(store.run(run_id).await.map(|r| r.status), Some(RunStatus::Running));

    let report = engine.run(1).await.unwrap();
    assert_eq!(report.ticks_executed, TICKS_PER_DAY);
    assert_eq!(report.snapshots_persisted, 24);
    assert_eq!(report.run.status, RunStatus::Completed);
    assert!(report.run.metrics.is_some());
    assert!(report.run.end_time.is_some());

    let snapshots = store.snapshots(run_id).await;
    let ticks: Vec<u64> = snapshots.iter().map(|s| s.tick).collect();
    let expected: Vec<u64> = (0..24).map(|hour| hour * TICKS_PER_HOUR).collect();
    assert_eq!(ticks, expected);

    let actions = store.actions(run_id).await;
    assert_eq!(actions.len(), per_tick(TICKS_PER_DAY));
    assert_eq!(u64::try_from(actions.len()).unwrap(), report.actions_persisted);
    assert!(actions.windows(2).all(|pair| match pair {
        [earlier, later] => earlier.tick <= later.tick,
        _ => true,
    }));

    let metrics = store.metrics(run_id).await;
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics.first().map(|m| m.tick), Some(TICKS_PER_DAY));
    assert_eq!(store.run(run_id).await.unwrap(), report.run);
}

#[tokio::test]
async fn same_seed_and_replies_reproduce_the_timeline() {
    let mut timelines = Vec::new();
    for _ in 0..2 {
        let store = Arc::new(MemoryStore::new());
        let mut engine = SimulationEngine::new(
            &CityLabConfig::default(),
            store.clone(),
            collaborators(scripted_reply()),
        );
        let run_id = engine.initialize(&scenario(7), &city_data()).await.unwrap();
        let report = engine.run(1).await.unwrap();
        timelines.push((
            serde_json::to_value(store.actions(run_id).await).unwrap(),
            serde_json::to_value(store.snapshots(run_id).await).unwrap(),
            serde_json::to_value(report.run.metrics).unwrap(),
        ));
    }
    assert_eq!(timelines.first(), timelines.last());
}

#[tokio::test(start_paused = true)]
async fn stalled_provider_falls_back_without_dropping_agents() {
    let options = ModelOptions {
        reasoning_timeout: Duration::from_millis(50),
        ..ModelOptions::default()
    };
    let slow: Arc<dyn ReasoningProvider> = Arc::new(SlowReasoning {
        delay: Duration::from_secs(60),
    });
    let mut model =
        CityModel::new(&scenario(3), &city_data(), options, collaborators(Some(slow))).unwrap();

    for tick in 0..3 {
        let summary = model.step().await.unwrap();
        assert_eq!(summary.tick, tick);
        assert_eq!(summary.actions.len(), REGISTRY_SIZE);
        if tick == 0 {
            assert!(summary.actions.iter().any(|action| action.prompt.is_some()));
        }
        for action in &summary.actions {
            assert_ne!(action.action_type, ActionType::Error);
            if action.prompt.is_some() {
                assert!((action.confidence - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);
            }
        }
    }
    assert_eq!(model.tick(), 3);
}

#[tokio::test]
async fn store_failure_marks_the_run_failed_and_keeps_earlier_ticks() {
    let memory = Arc::new(MemoryStore::new());
    let store = Arc::new(ScriptedStore::failing_at(memory.clone(), 500));
    let mut engine =
        SimulationEngine::new(&CityLabConfig::default(), store, collaborators(None));
    let run_id = engine.initialize(&scenario(42), &city_data()).await.unwrap();

    let err = engine.run(1).await.unwrap_err();
    assert!(matches!(err, EngineError::Persistence { .. }));

    let run = memory.run(run_id).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.unwrap().contains("disk full at tick 500"));
    assert_eq!(memory.actions(run_id).await.len(), per_tick(500));
    assert_eq!(memory.snapshots(run_id).await.len(), 9);
    assert!(memory.metrics(run_id).await.is_empty());
}

#[tokio::test]
async fn cancellation_stops_between_ticks() {
    let memory = Arc::new(MemoryStore::new());
    let control = RunControl::new();
    let store = Arc::new(ScriptedStore::cancelling_after(memory.clone(), 99, control.clone()));
    let mut engine = SimulationEngine::new(&CityLabConfig::default(), store, collaborators(None))
        .with_control(control);
    let run_id = engine.initialize(&scenario(42), &city_data()).await.unwrap();

    let report = engine.run(1).await.unwrap();
    assert_eq!(report.run.status, RunStatus::Cancelled);
    assert_eq!(report.ticks_executed, 100);
    assert_eq!(memory.actions(run_id).await.len(), per_tick(100));
    assert_eq!(memory.run(run_id).await.map(|r| r.status), Some(RunStatus::Cancelled));
}

#[tokio::test]
async fn bad_agent_configuration_leaves_the_run_pending() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = SimulationEngine::new(
        &CityLabConfig::default(),
        store.clone(),
        collaborators(None),
    );
    let mut broken = scenario(42);
    if let Some(first) = broken.agents.first_mut() {
        first.agent_type = String::from("mayor");
    }

    let err = engine.initialize(&broken, &city_data()).await.unwrap_err();
    assert!(matches!(err, EngineError::Initialization { .. }));

    let run = engine.run_record().unwrap().clone();
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(store.run(run.id).await.map(|r| r.status), Some(RunStatus::Pending));
    assert!(store.agents(run.id).await.is_empty());
    assert!(matches!(engine.run(1).await, Err(EngineError::NotInitialized)));
}

#[tokio::test]
async fn horizon_beyond_the_maximum_fails_the_run() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = SimulationEngine::new(
        &CityLabConfig::default(),
        store.clone(),
        collaborators(None),
    );
    let run_id = engine.initialize(&scenario(42), &city_data()).await.unwrap();

    let err = engine.run(31).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidHorizon {
            requested: 31,
            max: 30
        }
    ));
    let run = store.run(run_id).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.simulation_days, 31);
    assert!(store.actions(run_id).await.is_empty());
    assert!(matches!(
        engine.run(1).await,
        Err(EngineError::NotRunning {
            status: RunStatus::Failed
        })
    ));
}

#[tokio::test]
async fn lifecycle_guards_and_cleanup() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = SimulationEngine::new(
        &CityLabConfig::default(),
        store.clone(),
        collaborators(None),
    );
    assert!(matches!(engine.run(1).await, Err(EngineError::NotInitialized)));

    let run_id = engine.initialize(&scenario(42), &city_data()).await.unwrap();
    assert!(matches!(
        engine.initialize(&scenario(42), &city_data()).await,
        Err(EngineError::AlreadyInitialized { run_id: existing }) if existing == run_id
    ));

    engine.cleanup().await.unwrap();
    assert!(store.is_closed().await);
}
