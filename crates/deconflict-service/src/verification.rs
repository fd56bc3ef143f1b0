//! Mission verification against the registered schedule.
//!
//! A verification takes one snapshot of the schedule and checks the primary
//! mission against each scheduled trajectory in registration order. Conflicts
//! are reported in that per-pair order; use
//! [`VerificationResult::earliest_conflict`] for the time-first one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use deconflict_core::{Conflict, ConflictDetector, Position, RulesError, SafetyRules, Trajectory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::observer::{NoopObserver, TracingObserver, VerificationObserver};
use crate::report::{AirspaceStatus, ScheduleStatistics};
use crate::state::ScheduleStore;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid safety rules: {0}")]
    Rules(#[from] RulesError),
    #[error("verification worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Clear,
    ConflictDetected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Clear => write!(f, "CLEAR"),
            VerificationStatus::ConflictDetected => write!(f, "CONFLICT_DETECTED"),
        }
    }
}

/// Per-conflict projection seen from the primary mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetail {
    /// Midpoint of the two vehicles at closest approach
    pub location: Position,
    pub time: f64,
    pub conflicting_flight: String,
    pub distance: f64,
    pub severity: f64,
}

impl ConflictDetail {
    fn new(conflict: &Conflict, conflicting_flight: &str) -> Self {
        Self {
            location: conflict.midpoint(),
            time: conflict.time_s,
            conflicting_flight: conflicting_flight.to_string(),
            distance: conflict.distance_m,
            severity: conflict.severity,
        }
    }
}

/// Outcome of verifying one primary mission.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub primary: Trajectory,
    pub conflicts: Vec<Conflict>,
    pub conflict_details: Vec<ConflictDetail>,
}

impl VerificationResult {
    fn new(
        primary: Trajectory,
        conflicts: Vec<Conflict>,
        conflict_details: Vec<ConflictDetail>,
    ) -> Self {
        let status = if conflicts.is_empty() {
            VerificationStatus::Clear
        } else {
            VerificationStatus::ConflictDetected
        };
        Self {
            status,
            primary,
            conflicts,
            conflict_details,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.status == VerificationStatus::Clear
    }

    pub fn mission_id(&self) -> &str {
        self.primary.id()
    }

    /// Conflict with the earliest closest-approach time. Ties go to the
    /// first-reported one.
    pub fn earliest_conflict(&self) -> Option<&Conflict> {
        self.conflicts
            .iter()
            .reduce(|best, c| if c.time_s < best.time_s { c } else { best })
    }

    /// One-line outcome.
    pub fn summary(&self) -> String {
        if self.is_clear() {
            format!("MISSION CLEAR - No conflicts detected for {}", self.mission_id())
        } else {
            format!(
                "CONFLICT DETECTED - {} conflict(s) detected for {}",
                self.conflicts.len(),
                self.mission_id()
            )
        }
    }
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub missions: usize,
    pub clear: usize,
    pub conflicted: usize,
    pub total_conflicts: usize,
}

impl BatchSummary {
    fn from_results(results: &BTreeMap<String, VerificationResult>) -> Self {
        results.values().fold(Self::default(), |mut acc, result| {
            acc.missions += 1;
            if result.is_clear() {
                acc.clear += 1;
            } else {
                acc.conflicted += 1;
            }
            acc.total_conflicts += result.conflicts.len();
            acc
        })
    }
}

/// Check `primary` against each trajectory in `schedule`.
fn evaluate(
    detector: &ConflictDetector,
    schedule: &[Trajectory],
    primary: &Trajectory,
) -> VerificationResult {
    let mut conflicts = Vec::new();
    let mut details = Vec::new();

    for scheduled in schedule {
        if let Some(conflict) = detector.check_pair(primary, scheduled) {
            details.push(ConflictDetail::new(&conflict, scheduled.id()));
            conflicts.push(conflict);
        }
    }

    VerificationResult::new(primary.clone(), conflicts, details)
}

/// Go/no-go authority for proposed missions.
pub struct VerificationService {
    schedule: ScheduleStore,
    detector: ConflictDetector,
    observer: Arc<dyn VerificationObserver>,
}

impl VerificationService {
    pub fn new(schedules: Vec<Trajectory>, rules: SafetyRules) -> Result<Self, RulesError> {
        Ok(Self {
            schedule: ScheduleStore::new(schedules),
            detector: ConflictDetector::new(rules)?,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn from_config(schedules: Vec<Trajectory>, config: &Config) -> Result<Self, RulesError> {
        let service = Self::new(schedules, config.rules.clone())?;
        Ok(if config.trace_events {
            service.with_observer(Arc::new(TracingObserver))
        } else {
            service
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn VerificationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub fn safety_distance_m(&self) -> f64 {
        self.detector.safety_distance_m()
    }

    /// Verify one mission against a point-in-time view of the schedule.
    pub fn verify(&self, primary: &Trajectory) -> VerificationResult {
        let snapshot = self.schedule.snapshot();
        self.verify_against(&snapshot, primary)
    }

    fn verify_against(&self, snapshot: &[Trajectory], primary: &Trajectory) -> VerificationResult {
        self.observer.verification_started(primary, snapshot.len());
        let result = evaluate(&self.detector, snapshot, primary);
        self.observer.verification_completed(&result);
        result
    }

    /// Verify several missions against one snapshot, keyed by mission id.
    /// A repeated id keeps the later mission's result.
    pub fn batch_verify(&self, missions: &[Trajectory]) -> BTreeMap<String, VerificationResult> {
        let snapshot = self.schedule.snapshot();
        let results: BTreeMap<String, VerificationResult> = missions
            .iter()
            .map(|mission| (mission.id().to_string(), self.verify_against(&snapshot, mission)))
            .collect();

        self.observer.batch_completed(&BatchSummary::from_results(&results));
        results
    }

    /// [`batch_verify`](Self::batch_verify) with each mission evaluated on
    /// the blocking pool.
    pub async fn batch_verify_concurrent(
        &self,
        missions: Vec<Trajectory>,
    ) -> Result<BTreeMap<String, VerificationResult>, VerifyError> {
        let snapshot = self.schedule.snapshot();

        let handles: Vec<_> = missions
            .into_iter()
            .map(|mission| {
                self.observer.verification_started(&mission, snapshot.len());
                let detector = self.detector.clone();
                let snapshot = Arc::clone(&snapshot);
                tokio::task::spawn_blocking(move || evaluate(&detector, &snapshot, &mission))
            })
            .collect();

        let mut results = BTreeMap::new();
        for handle in handles {
            let result = handle.await?;
            self.observer.verification_completed(&result);
            results.insert(result.mission_id().to_string(), result);
        }

        self.observer.batch_completed(&BatchSummary::from_results(&results));
        Ok(results)
    }

    /// Register a scheduled trajectory. An entry with the same id is replaced
    /// and returned.
    pub fn add_scheduled(&self, trajectory: Trajectory) -> Option<Trajectory> {
        let added = trajectory.clone();
        let replaced = self.schedule.insert(trajectory);
        self.observer.schedule_added(&added, replaced.is_some());
        replaced
    }

    pub fn remove_scheduled(&self, trajectory_id: &str) -> Option<Trajectory> {
        let removed = self.schedule.remove(trajectory_id);
        if removed.is_some() {
            self.observer.schedule_removed(trajectory_id);
        }
        removed
    }

    pub fn scheduled_count(&self) -> usize {
        self.schedule.len()
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        self.schedule.ids()
    }

    pub fn schedule_snapshot(&self) -> Arc<Vec<Trajectory>> {
        self.schedule.snapshot()
    }

    pub fn get_statistics(&self) -> ScheduleStatistics {
        ScheduleStatistics::from_schedules(&self.schedule.snapshot())
    }

    pub fn airspace_status(&self) -> AirspaceStatus {
        AirspaceStatus {
            statistics: self.get_statistics(),
            safety_distance_m: self.safety_distance_m(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deconflict_core::Waypoint;

    fn straight(id: &str, from: (f64, f64), to: (f64, f64), t0: f64, t1: f64) -> Trajectory {
        Trajectory::new(
            id,
            vec![
                Waypoint::new(from.0, from.1, 100.0, t0),
                Waypoint::new(to.0, to.1, 100.0, t1),
            ],
            10.0,
            1,
        )
        .unwrap()
    }

    fn service(schedules: Vec<Trajectory>) -> VerificationService {
        VerificationService::new(schedules, SafetyRules::new(10.0, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_schedule_is_clear() {
        let service = service(vec![]);
        let result = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));

        assert!(result.is_clear());
        assert_eq!(result.status, VerificationStatus::Clear);
        assert!(result.conflict_details.is_empty());
        assert!(result.summary().starts_with("MISSION CLEAR"));
    }

    #[test]
    fn test_crossing_conflict_detail() {
        let service = service(vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)]);
        let result = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));

        assert_eq!(result.status, VerificationStatus::ConflictDetected);
        assert_eq!(result.conflicts.len(), 1);
        let detail = &result.conflict_details[0];
        assert_eq!(detail.conflicting_flight, "S1");
        assert!((detail.time - 50.0).abs() < 1e-9);
        assert!(detail.distance < 1.0);
        assert!((detail.location.0 - 500.0).abs() < 1.0);
        assert!(result.summary().contains("1 conflict(s)"));
    }

    #[test]
    fn test_results_in_registration_order() {
        let late = straight("LATE", (800.0, -500.0), (800.0, 500.0), 30.0, 130.0);
        let early = straight("EARLY", (200.0, -500.0), (200.0, 500.0), -30.0, 70.0);
        let service = service(vec![late, early]);
        let result = service.verify(&straight("P", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0));

        let order: Vec<&str> = result
            .conflict_details
            .iter()
            .map(|d| d.conflicting_flight.as_str())
            .collect();
        assert_eq!(order, vec!["LATE", "EARLY"]);
        assert_eq!(result.earliest_conflict().unwrap().trajectory2_id, "EARLY");
    }

    #[test]
    fn test_add_replace_remove() {
        let service = service(vec![]);
        assert!(service
            .add_scheduled(straight("S1", (0.0, 0.0), (10.0, 0.0), 0.0, 10.0))
            .is_none());
        let replaced = service.add_scheduled(straight("S1", (0.0, 50.0), (10.0, 50.0), 0.0, 10.0));
        assert!(replaced.is_some());
        assert_eq!(service.scheduled_count(), 1);

        assert!(service.remove_scheduled("missing").is_none());
        assert_eq!(service.scheduled_count(), 1);
        assert!(service.remove_scheduled("S1").is_some());
        assert_eq!(service.scheduled_count(), 0);
    }

    #[test]
    fn test_batch_keyed_by_id() {
        let service = service(vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)]);
        let missions = vec![
            straight("CROSS", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0),
            straight("AWAY", (0.0, 5000.0), (1000.0, 5000.0), 0.0, 100.0),
        ];
        let results = service.batch_verify(&missions);

        assert_eq!(results.len(), 2);
        assert!(!results["CROSS"].is_clear());
        assert!(results["AWAY"].is_clear());
    }

    #[test]
    fn test_batch_summary_counts() {
        let service = service(vec![straight("S1", (500.0, -500.0), (500.0, 500.0), 0.0, 100.0)]);
        let results = service.batch_verify(&[
            straight("CROSS", (0.0, 0.0), (1000.0, 0.0), 0.0, 100.0),
            straight("AWAY", (0.0, 5000.0), (1000.0, 5000.0), 0.0, 100.0),
        ]);
        let summary = BatchSummary::from_results(&results);

        assert_eq!(summary.missions, 2);
        assert_eq!(summary.clear, 1);
        assert_eq!(summary.conflicted, 1);
        assert_eq!(summary.total_conflicts, 1);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let rules = SafetyRules {
            safety_distance_m: -1.0,
            ..SafetyRules::default()
        };
        assert!(VerificationService::new(vec![], rules).is_err());
    }
}
