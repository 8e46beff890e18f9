//! End-to-end task lifecycle tests against in-memory sinks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Barrier, Semaphore};

use tracksim::core::error::DeliveryError;
use tracksim::core::types::ObjectKind;
use tracksim::ingest::{ClassificationSuggestion, IngestBatch, IngestSink, RadarPoint};
use tracksim::simulation::RunExit;
use tracksim::{ControlOutcome, Orchestrator, SimulationConfig, TaskKind, TaskPhase};

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<IngestBatch>>,
    suggestions: Mutex<Vec<ClassificationSuggestion>>,
    radar_points: Mutex<Vec<RadarPoint>>,
}

impl RecordingSink {
    fn batches_for(&self, task: TaskKind) -> Vec<IngestBatch> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.task == task)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl IngestSink for RecordingSink {
    async fn send(&self, batch: &IngestBatch) -> Result<(), DeliveryError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    async fn suggest(&self, suggestion: &ClassificationSuggestion) -> Result<(), DeliveryError> {
        self.suggestions.lock().unwrap().push(suggestion.clone());
        Ok(())
    }

    async fn radar_point(&self, point: &RadarPoint) -> Result<(), DeliveryError> {
        self.radar_points.lock().unwrap().push(*point);
        Ok(())
    }
}

/// Holds every send until [`GateSink::open`] is called
struct GateSink {
    entered: AtomicUsize,
    gate: Semaphore,
}

impl GateSink {
    fn new() -> Self {
        Self {
            entered: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    fn open(&self) {
        self.gate.close();
    }
}

#[async_trait]
impl IngestSink for GateSink {
    async fn send(&self, _batch: &IngestBatch) -> Result<(), DeliveryError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        // A closed semaphore fails the acquire, which is the release signal
        let _ = self.gate.acquire().await;
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl IngestSink for FailingSink {
    async fn send(&self, _batch: &IngestBatch) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unreachable("connection refused".into()))
    }
}

fn fast_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.tick_interval_secs = 0.01;
    config.seed = Some(7);
    config
}

/// Dataset with one long route so the main simulation keeps running
fn write_dataset(name: &str, waypoints: usize) -> std::path::PathBuf {
    let points: Vec<String> = (0..waypoints)
        .map(|i| format!(r#"{{"lat": {}, "lon": 35.5, "altitude": 3000}}"#, 33.0 + i as f64 * 1e-4))
        .collect();
    let json = format!(
        r#"[{{"id": "flight-1", "name": "ELAL1", "platform": "airliner", "waypoints": [{}]}}]"#,
        points.join(",")
    );
    let path = std::env::temp_dir().join(format!("tracksim-{name}-{}.json", std::process::id()));
    std::fs::write(&path, json).unwrap();
    path
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_double_start_runs_one_loop() {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(fast_config(), sink.clone());

    assert_eq!(orchestrator.start(TaskKind::RandomRadar).unwrap(), ControlOutcome::Started);
    assert_eq!(orchestrator.start(TaskKind::RandomRadar).unwrap(), ControlOutcome::AlreadyRunning);

    wait_until(|| !sink.batches_for(TaskKind::RandomRadar).is_empty()).await;
    orchestrator.stop_and_wait(TaskKind::RandomRadar).await;

    // A single loop means a single tick 1
    let first_ticks = sink
        .batches_for(TaskKind::RandomRadar)
        .iter()
        .filter(|b| b.tick == 1)
        .count();
    assert_eq!(first_ticks, 1);
}

#[tokio::test]
async fn test_stop_when_idle() {
    let orchestrator = Orchestrator::new(fast_config(), Arc::new(RecordingSink::default()));
    assert_eq!(orchestrator.stop(TaskKind::DroneAttack), ControlOutcome::NotRunning);
    assert_eq!(orchestrator.status(TaskKind::DroneAttack), TaskPhase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_all_reports_running_subset() {
    let mut config = fast_config();
    let dataset = write_dataset("stop-all", 2000);
    config.scenario.dataset_path = dataset.clone();
    let orchestrator = Orchestrator::new(config, Arc::new(RecordingSink::default()));

    orchestrator.start(TaskKind::RandomRadar).unwrap();
    orchestrator.start(TaskKind::MainSimulation).unwrap();

    let outcome = orchestrator.stop_all();
    assert_eq!(
        outcome,
        ControlOutcome::StoppedSubset(vec![TaskKind::RandomRadar, TaskKind::MainSimulation])
    );

    orchestrator.shutdown().await;
    let status = orchestrator.status_all();
    assert_eq!(status.len(), 5);
    assert!(status.values().all(|phase| *phase == TaskPhase::Idle));
    std::fs::remove_file(dataset).ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_radar_batch_fills_polygon() {
    let config = fast_config();
    let polygon = config.radar.polygon.clone();
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(config, sink.clone());

    orchestrator.start(TaskKind::RandomRadar).unwrap();
    wait_until(|| !sink.batches_for(TaskKind::RandomRadar).is_empty()).await;
    orchestrator.shutdown().await;

    let first = &sink.batches_for(TaskKind::RandomRadar)[0];
    assert_eq!(first.tick, 1);
    assert_eq!(first.objects.len(), 75);
    for object in &first.objects {
        assert_eq!(object.kind, ObjectKind::RadarNoise);
        let [lon, lat, alt] = object.position;
        assert!(polygon.contains(&tracksim::core::types::GeoPosition::new(lat, lon, alt)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drone_attack_stops_itself() {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(fast_config(), sink.clone());

    orchestrator.start(TaskKind::DroneAttack).unwrap();
    wait_until(|| orchestrator.last_run(TaskKind::DroneAttack).is_some()).await;
    assert_eq!(orchestrator.status(TaskKind::DroneAttack), TaskPhase::Idle);

    let batches = sink.batches_for(TaskKind::DroneAttack);
    let drone_tracks: usize = batches
        .iter()
        .map(|b| b.hints().filter(|h| *h == "drone").count())
        .sum();
    assert_eq!(drone_tracks, 1);

    // Approach reports go to the radar-point endpoint only
    assert_eq!(batches.iter().map(|b| b.tick).collect::<Vec<_>>(), vec![5]);
    let points = sink.radar_points.lock().unwrap().clone();
    assert_eq!(points.len(), 4);
    let suggestions = sink.suggestions.lock().unwrap().clone();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].id, batches[0].objects[0].id);
    assert_eq!(suggestions[0].classification.suggested_identification, "drone");
    assert_eq!(
        orchestrator.last_run(TaskKind::DroneAttack).unwrap().exit,
        RunExit::Completed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_sink_does_not_stop_ticking() {
    let mut config = fast_config();
    config.radar.batch_every_ticks = 1;
    config.radar.batch_size = 5;
    let orchestrator = Orchestrator::new(config, Arc::new(FailingSink));

    orchestrator.start(TaskKind::RandomRadar).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(orchestrator.status(TaskKind::RandomRadar), TaskPhase::Running);
    orchestrator.stop_and_wait(TaskKind::RandomRadar).await;

    let run = orchestrator.last_run(TaskKind::RandomRadar).unwrap();
    assert!(run.ticks > 2, "{run:?}");
    assert_eq!(run.batches_sent, 0);
    assert_eq!(run.failed_sends, run.ticks);
    assert!(run.retired > 0);
}

#[tokio::test]
async fn test_missing_dataset_keeps_task_idle() {
    let mut config = fast_config();
    config.scenario.dataset_path = "/nonexistent/flights.json".into();
    let orchestrator = Orchestrator::new(config, Arc::new(RecordingSink::default()));

    let err = orchestrator.start(TaskKind::MainSimulation).unwrap_err();
    assert!(err.to_string().contains("flights.json"));
    assert_eq!(orchestrator.status(TaskKind::MainSimulation), TaskPhase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scripted_route_completes() {
    let mut config = fast_config();
    let dataset = write_dataset("short", 3);
    config.scenario.dataset_path = dataset.clone();
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(config, sink.clone());

    orchestrator.start(TaskKind::MainSimulation).unwrap();
    wait_until(|| orchestrator.last_run(TaskKind::MainSimulation).is_some()).await;
    std::fs::remove_file(dataset).ok();

    let batches = sink.batches_for(TaskKind::MainSimulation);
    let ticks: Vec<u64> = batches.iter().map(|b| b.tick).collect();
    assert_eq!(ticks, vec![1, 2, 3, 4]);
    assert_eq!(batches[0].objects[0].name.as_deref(), Some("ELAL1"));
    let last = batches.last().unwrap();
    assert!(last.objects.is_empty());
    assert_eq!(last.removed.len(), 1);
    assert_eq!(
        orchestrator.last_run(TaskKind::MainSimulation).unwrap().exit,
        RunExit::Completed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_sink_still_expires_idle_objects() {
    let mut config = fast_config();
    config.radar.batch_every_ticks = 1000;
    config.radar.batch_size = 5;
    config.inactivity_timeout_secs = 0.05;
    let orchestrator = Orchestrator::new(config, Arc::new(FailingSink));

    orchestrator.start(TaskKind::RandomRadar).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    orchestrator.stop_and_wait(TaskKind::RandomRadar).await;

    let run = orchestrator.last_run(TaskKind::RandomRadar).unwrap();
    assert!(run.ticks > 8, "{run:?}");
    assert_eq!(run.expired, 5, "{run:?}");
    assert_eq!(run.batches_sent, 0);
    // One failed send for the batch and one for the sweep
    assert_eq!(run.failed_sends, 2, "{run:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_while_stopping() {
    let sink = Arc::new(GateSink::new());
    let orchestrator = Orchestrator::new(fast_config(), sink.clone());

    orchestrator.start(TaskKind::RandomRadar).unwrap();
    wait_until(|| sink.entered.load(Ordering::SeqCst) > 0).await;

    // The loop is stuck in a send, so it cannot exit yet
    assert_eq!(orchestrator.stop(TaskKind::RandomRadar), ControlOutcome::Stopped);
    assert_eq!(orchestrator.status(TaskKind::RandomRadar), TaskPhase::Stopping);
    assert_eq!(orchestrator.stop(TaskKind::RandomRadar), ControlOutcome::AlreadyStopping);
    assert_eq!(orchestrator.stop_all(), ControlOutcome::StoppedSubset(vec![]));
    assert_eq!(
        orchestrator.start(TaskKind::RandomRadar).unwrap(),
        ControlOutcome::AlreadyRunning
    );

    sink.open();
    assert_eq!(
        orchestrator.stop_and_wait(TaskKind::RandomRadar).await,
        ControlOutcome::AlreadyStopping
    );
    assert_eq!(orchestrator.status(TaskKind::RandomRadar), TaskPhase::Idle);
    assert_eq!(
        orchestrator.last_run(TaskKind::RandomRadar).unwrap().exit,
        RunExit::Cancelled
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_launch_one_loop() {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Arc::new(Orchestrator::new(fast_config(), sink.clone()));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                orchestrator.start(TaskKind::RandomRadar).unwrap()
            })
        })
        .collect();

    let mut started = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ControlOutcome::Started => started += 1,
            other => assert_eq!(other, ControlOutcome::AlreadyRunning),
        }
    }
    assert_eq!(started, 1);

    wait_until(|| !sink.batches_for(TaskKind::RandomRadar).is_empty()).await;
    orchestrator.shutdown().await;
    let first_ticks = sink
        .batches_for(TaskKind::RandomRadar)
        .iter()
        .filter(|b| b.tick == 1)
        .count();
    assert_eq!(first_ticks, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_all_racing_start() {
    let orchestrator = Arc::new(Orchestrator::new(fast_config(), Arc::new(RecordingSink::default())));

    for round in 0..20 {
        let kind = if round % 2 == 0 {
            TaskKind::RandomRadar
        } else {
            TaskKind::RandomRadarDecoy
        };
        let barrier = Arc::new(Barrier::new(2));

        let starter = {
            let orchestrator = Arc::clone(&orchestrator);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                orchestrator.start(kind).unwrap()
            })
        };
        let stopper = {
            let orchestrator = Arc::clone(&orchestrator);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                orchestrator.stop_all()
            })
        };

        let started = starter.await.unwrap();
        let ControlOutcome::StoppedSubset(stopped) = stopper.await.unwrap() else {
            panic!("stop_all must report a subset");
        };
        assert_eq!(started, ControlOutcome::Started, "round {round}");
        assert!(stopped.iter().all(|k| *k == kind), "round {round}: {stopped:?}");

        // Running exactly when the stop missed the start
        let running = orchestrator.status(kind) == TaskPhase::Running;
        assert_eq!(running, !stopped.contains(&kind), "round {round}");

        orchestrator.shutdown().await;
        assert!(orchestrator.status_all().values().all(|p| *p == TaskPhase::Idle), "round {round}");
    }
}
