//! Serialized and human-readable views of verification output.

use std::fmt;

use deconflict_core::Trajectory;
use serde::{Deserialize, Serialize};

use crate::verification::{ConflictDetail, VerificationResult, VerificationStatus};

const RULE_WIDTH: usize = 70;

/// Serialized form of a [`VerificationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    pub is_clear: bool,
    pub primary_mission: MissionSummary,
    pub conflicts: Vec<ConflictDetail>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSummary {
    pub id: String,
    pub num_waypoints: usize,
    pub duration_seconds: f64,
    pub total_distance_meters: f64,
    pub start_time: f64,
    pub end_time: f64,
}

impl From<&Trajectory> for MissionSummary {
    fn from(trajectory: &Trajectory) -> Self {
        Self {
            id: trajectory.id().to_string(),
            num_waypoints: trajectory.waypoints().len(),
            duration_seconds: trajectory.duration(),
            total_distance_meters: trajectory.total_distance(),
            start_time: trajectory.start_time(),
            end_time: trajectory.end_time(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_conflicts: usize,
    /// Distinct opposing flights in first-reported order
    pub conflicting_flights: Vec<String>,
}

impl VerificationResult {
    pub fn to_report(&self) -> VerificationReport {
        let mut conflicting_flights: Vec<String> = Vec::new();
        for detail in &self.conflict_details {
            if !conflicting_flights.contains(&detail.conflicting_flight) {
                conflicting_flights.push(detail.conflicting_flight.clone());
            }
        }

        VerificationReport {
            status: self.status,
            is_clear: self.is_clear(),
            primary_mission: MissionSummary::from(&self.primary),
            conflicts: self.conflict_details.clone(),
            summary: ReportSummary {
                total_conflicts: self.conflicts.len(),
                conflicting_flights,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_report())
    }
}

/// Detailed multi-line report.
impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(f, "MISSION VERIFICATION REPORT: {}", self.mission_id())?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;

        if self.is_clear() {
            writeln!(f, "STATUS: CLEAR TO PROCEED")?;
            writeln!(f)?;
            writeln!(f, "Mission Duration: {:.1}s", self.primary.duration())?;
            writeln!(f, "Number of Waypoints: {}", self.primary.waypoints().len())?;
            writeln!(f, "Total Distance: {:.1}m", self.primary.total_distance())?;
        } else {
            writeln!(f, "STATUS: CONFLICT DETECTED - MISSION NOT SAFE")?;
            writeln!(f)?;
            writeln!(f, "Number of Conflicts: {}", self.conflicts.len())?;
            writeln!(f)?;
            writeln!(f, "CONFLICT DETAILS:")?;
            writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;

            for (i, detail) in self.conflict_details.iter().enumerate() {
                let (x, y, z) = detail.location;
                writeln!(f)?;
                writeln!(f, "Conflict #{}:", i + 1)?;
                writeln!(f, "  Location: ({x:.1}, {y:.1}, {z:.1})")?;
                writeln!(f, "  Time: {:.1}s", detail.time)?;
                writeln!(f, "  Conflicting Flight: {}", detail.conflicting_flight)?;
                writeln!(f, "  Minimum Distance: {:.1}m", detail.distance)?;
                writeln!(f, "  Severity: {:.2}", detail.severity)?;
            }
        }

        writeln!(f)?;
        write!(f, "{rule}")
    }
}

/// Aggregate figures for the registered schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatistics {
    pub num_schedules: usize,
    pub total_waypoints: usize,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub avg_waypoints: f64,
    pub avg_distance_m: f64,
    pub avg_duration_s: f64,
}

impl ScheduleStatistics {
    pub fn from_schedules(schedules: &[Trajectory]) -> Self {
        if schedules.is_empty() {
            return Self::default();
        }

        let total_waypoints: usize = schedules.iter().map(|t| t.waypoints().len()).sum();
        let total_distance_m: f64 = schedules.iter().map(Trajectory::total_distance).sum();
        let total_duration_s: f64 = schedules.iter().map(Trajectory::duration).sum();
        let count = schedules.len() as f64;

        Self {
            num_schedules: schedules.len(),
            total_waypoints,
            total_distance_m,
            total_duration_s,
            avg_waypoints: total_waypoints as f64 / count,
            avg_distance_m: total_distance_m / count,
            avg_duration_s: total_duration_s / count,
        }
    }
}

/// Snapshot of the airspace as seen by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirspaceStatus {
    pub statistics: ScheduleStatistics,
    pub safety_distance_m: f64,
}

impl fmt::Display for AirspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let stats = &self.statistics;
        writeln!(f, "{rule}")?;
        writeln!(f, "AIRSPACE STATUS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Scheduled Flights: {} active flights", stats.num_schedules)?;
        writeln!(f, "Total Waypoints: {}", stats.total_waypoints)?;
        writeln!(f, "Total Flight Distance: {:.1} km", stats.total_distance_m / 1000.0)?;
        writeln!(f, "Average Flight Duration: {:.1}s", stats.avg_duration_s)?;
        writeln!(f, "Safety Buffer: {}m", self.safety_distance_m)?;
        write!(f, "{rule}")
    }
}
