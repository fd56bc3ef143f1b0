//! End-to-end verification tests.
//!
//! Exercises the service against the fixed scenarios, the serialized report,
//! the concurrent batch path and the observer hooks.

use std::sync::{Arc, Mutex};

use deconflict_core::{scenarios, SafetyRules, Trajectory, Waypoint};
use deconflict_service::verification::BatchSummary;
use deconflict_service::{
    Config, VerificationObserver, VerificationResult, VerificationService, VerificationStatus,
};
use tracing_subscriber::fmt::MakeWriter;

fn rules() -> SafetyRules {
    SafetyRules::new(10.0, 1.0).unwrap()
}

fn straight(id: &str, from: (f64, f64), to: (f64, f64), t0: f64, t1: f64) -> Trajectory {
    Trajectory::new(
        id,
        vec![
            Waypoint::new(from.0, from.1, 120.0, t0),
            Waypoint::new(to.0, to.1, 120.0, t1),
        ],
        12.0,
        1,
    )
    .unwrap()
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl VerificationObserver for RecordingObserver {
    fn schedule_added(&self, trajectory: &Trajectory, replaced: bool) {
        self.push(format!("added:{}:{}", trajectory.id(), replaced));
    }

    fn schedule_removed(&self, trajectory_id: &str) {
        self.push(format!("removed:{}", trajectory_id));
    }

    fn verification_completed(&self, result: &VerificationResult) {
        self.push(format!("verified:{}:{}", result.mission_id(), result.status));
    }

    fn batch_completed(&self, summary: &BatchSummary) {
        self.push(format!("batch:{}:{}", summary.missions, summary.conflicted));
    }
}

#[test]
fn test_scenarios_through_service() {
    for scenario in scenarios::all(10.0).unwrap() {
        let service = VerificationService::new(scenario.scheduled.clone(), rules()).unwrap();
        let result = service.verify(&scenario.primary);
        assert_eq!(
            !result.is_clear(),
            scenario.expect_conflict,
            "scenario: {}",
            scenario.name
        );
    }
}

#[test]
fn test_multiple_drones_reports_each_flight() {
    let (primary, scheduled) = scenarios::multiple_drones().unwrap();
    let service = VerificationService::new(scheduled, rules()).unwrap();
    let result = service.verify(&primary);

    let report = result.to_report();
    assert_eq!(report.summary.total_conflicts, 3);
    assert_eq!(
        report.summary.conflicting_flights,
        vec!["SIM-1", "SIM-2", "SIM-3"]
    );
}

#[test]
fn test_json_report_shape() {
    let service = VerificationService::new(
        vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)],
        rules(),
    )
    .unwrap();
    let result = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(json["status"], "CONFLICT_DETECTED");
    assert_eq!(json["is_clear"], false);
    assert_eq!(json["primary_mission"]["id"], "P");
    assert_eq!(json["primary_mission"]["num_waypoints"], 2);
    assert_eq!(json["primary_mission"]["duration_seconds"], 100.0);
    assert_eq!(json["primary_mission"]["total_distance_meters"], 1000.0);
    assert_eq!(json["primary_mission"]["start_time"], 0.0);
    assert_eq!(json["primary_mission"]["end_time"], 100.0);

    let conflict = &json["conflicts"][0];
    assert_eq!(conflict["conflicting_flight"], "S1");
    assert_eq!(conflict["location"].as_array().unwrap().len(), 3);
    assert!(conflict["time"].is_number());
    assert!(conflict["distance"].is_number());
    assert!(conflict["severity"].is_number());

    assert_eq!(json["summary"]["total_conflicts"], 1);
    assert_eq!(json["summary"]["conflicting_flights"][0], "S1");
}

#[test]
fn test_detailed_report_text() {
    let service = VerificationService::new(
        vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)],
        rules(),
    )
    .unwrap();

    let conflicted = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));
    let text = conflicted.to_string();
    assert!(text.contains("MISSION VERIFICATION REPORT: P"));
    assert!(text.contains("CONFLICT DETECTED - MISSION NOT SAFE"));
    assert!(text.contains("Conflict #1:"));
    assert!(text.contains("Conflicting Flight: S1"));

    let clear = service.verify(&straight("Q", (0.0, 5000.0), (1000.0, 5000.0), 0.0, 100.0));
    let text = clear.to_string();
    assert!(text.contains("STATUS: CLEAR TO PROCEED"));
    assert!(text.contains("Total Distance: 1000.0m"));
}

#[test]
fn test_trajectory_records_load() {
    let json = serde_json::json!([
        {
            "uav_id": "S1",
            "speed": 10.0,
            "waypoints": [
                {"x": 500.0, "y": -500.0, "z": 120.0, "time": 0.0},
                {"x": 500.0, "y": 500.0, "z": 120.0, "time": 100.0}
            ]
        }
    ]);
    let schedules: Vec<Trajectory> = serde_json::from_value(json).unwrap();
    assert_eq!(schedules[0].priority(), 1);

    let service = VerificationService::new(schedules, rules()).unwrap();
    let result = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));
    assert_eq!(result.status, VerificationStatus::ConflictDetected);

    let invalid = serde_json::json!({
        "id": "BAD",
        "speed": 10.0,
        "waypoints": [{"x": 0.0, "y": 0.0, "z": 0.0, "time": 0.0}]
    });
    assert!(serde_json::from_value::<Trajectory>(invalid).is_err());
}

#[test]
fn test_observer_sees_lifecycle() {
    let observer = Arc::new(RecordingObserver::default());
    let service = VerificationService::new(vec![], rules())
        .unwrap()
        .with_observer(observer.clone());

    service.add_scheduled(straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0));
    service.add_scheduled(straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0));
    service.batch_verify(&[straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0)]);
    service.remove_scheduled("S1");
    service.remove_scheduled("S1");

    assert_eq!(
        observer.events(),
        vec![
            "added:S1:false",
            "added:S1:true",
            "verified:P:CONFLICT_DETECTED",
            "batch:1:1",
            "removed:S1",
        ]
    );
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_trace_events_config_logs_conflicts() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let config = Config::from_lookup(|key| match key {
        "DECONFLICT_TRACE_EVENTS" => Some("1".to_string()),
        _ => None,
    });
    assert!(config.trace_events);

    tracing::subscriber::with_default(subscriber, || {
        let service = VerificationService::from_config(vec![], &config).unwrap();
        service.add_scheduled(straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0));
        assert!(!service
            .verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0))
            .is_clear());
        assert!(service
            .verify(&straight("Q", (0.0, 9000.0), (1000.0, 9000.0), 0.0, 100.0))
            .is_clear());
    });

    let output = logs.contents();
    assert!(output.contains("Scheduled trajectory registered"));
    assert!(output.contains("Conflict detected"));
    assert!(output.contains("conflicting_flight=S1"));
    assert!(output.contains("Mission clear"));
}

#[test]
fn test_default_config_stays_silent() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let service = VerificationService::from_config(vec![], &Config::default()).unwrap();
        service.add_scheduled(straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0));
        service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));
    });

    assert!(logs.contents().is_empty());
}

#[test]
fn test_snapshot_survives_concurrent_edits() {
    let service = Arc::new(
        VerificationService::new(
            vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)],
            rules(),
        )
        .unwrap(),
    );
    let snapshot = service.schedule_snapshot();

    let writer = {
        let service = Arc::clone(&service);
        std::thread::spawn(move || {
            for i in 0..50 {
                service.add_scheduled(straight(
                    &format!("X{i}"),
                    (0.0, 9000.0),
                    (10.0, 9000.0),
                    0.0,
                    10.0,
                ));
            }
            service.remove_scheduled("S1");
        })
    };
    writer.join().unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(service.scheduled_count(), 50);
    let result = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));
    assert!(result.is_clear());
}

#[test]
fn test_statistics_and_status() {
    let service = VerificationService::new(
        vec![
            straight("A", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0),
            straight("B", (0.0, 100.0), (3000.0, 100.0), 0.0, 300.0),
        ],
        rules(),
    )
    .unwrap();

    let stats = service.get_statistics();
    assert_eq!(stats.num_schedules, 2);
    assert_eq!(stats.total_distance_m, 4000.0);
    assert_eq!(stats.avg_duration_s, 200.0);

    let status = service.airspace_status().to_string();
    assert!(status.contains("Scheduled Flights: 2 active flights"));
    assert!(status.contains("Safety Buffer: 10m"));
}

#[tokio::test]
async fn test_concurrent_batch_matches_sequential() {
    let (primary, scheduled) = scenarios::multiple_drones().unwrap();
    let service = VerificationService::new(scheduled, rules()).unwrap();

    let missions = vec![
        primary,
        straight("AWAY", (0.0, 9000.0), (1000.0, 9000.0), 0.0, 100.0),
        straight("LATE", (1000.0, 1000.0), (5000.0, 5000.0), 1000.0, 1300.0),
    ];

    let sequential = service.batch_verify(&missions);
    let concurrent = service.batch_verify_concurrent(missions).await.unwrap();

    assert_eq!(sequential, concurrent);
    assert!(!concurrent["PRIMARY"].is_clear());
    assert!(concurrent["AWAY"].is_clear());
    assert!(concurrent["LATE"].is_clear());
}

#[tokio::test]
async fn test_concurrent_batch_repeated_id_keeps_last() {
    let service = VerificationService::new(
        vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)],
        rules(),
    )
    .unwrap();

    let missions = vec![
        straight("M", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0),
        straight("M", (0.0, 9000.0), (1000.0, 9000.0), 0.0, 100.0),
    ];
    let results = service.batch_verify_concurrent(missions).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results["M"].is_clear());
}
