//! Piecewise-linear space-time trajectories.
//!
//! A [`Trajectory`] is validated once at construction and immutable after
//! that. Detection code trusts its invariants and never re-checks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Bounds, Position, Waypoint};
use crate::spatial::lerp;

/// Reasons a trajectory is rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("trajectory must have at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("nominal speed must be positive and finite, got {0}")]
    NonPositiveSpeed(f64),
    #[error("priority must be at least 1, got {0}")]
    InvalidPriority(u32),
    #[error("waypoint {index} has a non-finite coordinate or time")]
    NonFiniteWaypoint { index: usize },
    #[error("waypoint {index} is earlier than the waypoint before it")]
    TimeNotMonotonic { index: usize },
}

/// Ordered, piecewise-linear space-time path of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryRecord", into = "TrajectoryRecord")]
pub struct Trajectory {
    id: String,
    waypoints: Vec<Waypoint>,
    speed_mps: f64,
    priority: u32,
    created_at: DateTime<Utc>,
}

/// External record form of a trajectory, as exchanged with loaders and
/// reporting tools. Deserializing a [`Trajectory`] goes through this record
/// and the same validation as [`Trajectory::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    #[serde(alias = "uav_id")]
    pub id: String,
    pub waypoints: Vec<Waypoint>,
    pub speed: f64,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "Utc::now", alias = "start_time")]
    pub created_at: DateTime<Utc>,
}

fn default_priority() -> u32 {
    1
}

impl TryFrom<TrajectoryRecord> for Trajectory {
    type Error = TrajectoryError;

    fn try_from(record: TrajectoryRecord) -> Result<Self, Self::Error> {
        Trajectory::new(record.id, record.waypoints, record.speed, record.priority)
            .map(|trajectory| trajectory.with_created_at(record.created_at))
    }
}

impl From<Trajectory> for TrajectoryRecord {
    fn from(trajectory: Trajectory) -> Self {
        Self {
            id: trajectory.id,
            waypoints: trajectory.waypoints,
            speed: trajectory.speed_mps,
            priority: trajectory.priority,
            created_at: trajectory.created_at,
        }
    }
}

impl Trajectory {
    /// Build a validated trajectory stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        waypoints: Vec<Waypoint>,
        speed_mps: f64,
        priority: u32,
    ) -> Result<Self, TrajectoryError> {
        if waypoints.len() < 2 {
            return Err(TrajectoryError::TooFewWaypoints(waypoints.len()));
        }
        if !(speed_mps > 0.0) || !speed_mps.is_finite() {
            return Err(TrajectoryError::NonPositiveSpeed(speed_mps));
        }
        if priority < 1 {
            return Err(TrajectoryError::InvalidPriority(priority));
        }
        if let Some(index) = waypoints.iter().position(|wp| !wp.is_finite()) {
            return Err(TrajectoryError::NonFiniteWaypoint { index });
        }
        if let Some(index) = waypoints
            .windows(2)
            .position(|pair| pair[1].time < pair[0].time)
        {
            return Err(TrajectoryError::TimeNotMonotonic { index: index + 1 });
        }

        Ok(Self {
            id: id.into(),
            waypoints,
            speed_mps,
            priority,
            created_at: Utc::now(),
        })
    }

    /// Override the creation timestamp (used when loading stored records).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Nominal cruise speed. Informational: detection derives motion from waypoint deltas.
    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn first(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn last(&self) -> &Waypoint {
        &self.waypoints[self.waypoints.len() - 1]
    }

    pub fn start_time(&self) -> f64 {
        self.first().time
    }

    pub fn end_time(&self) -> f64 {
        self.last().time
    }

    /// Seconds between the first and last waypoint.
    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// Path length in meters, summed over consecutive segments.
    pub fn total_distance(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::around(&self.waypoints)
    }

    /// Whether the vehicle is flying at time `t`.
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.start_time() && t <= self.end_time()
    }

    /// Index `i` of the earliest segment `[i, i + 1]` whose time range contains `t`.
    /// Caller guarantees `t` is inside the trajectory's span.
    fn segment_index(&self, t: f64) -> usize {
        let before = self.waypoints.partition_point(|wp| wp.time < t);
        before.saturating_sub(1).min(self.waypoints.len() - 2)
    }

    /// Position at time `t`, or `None` when the vehicle is not flying.
    ///
    /// Queries at a waypoint's time return that waypoint's position exactly.
    /// Zero-duration segments resolve to their first waypoint.
    pub fn position_at(&self, t: f64) -> Option<Position> {
        if !self.is_active_at(t) {
            return None;
        }

        let index = self.segment_index(t);
        let start = &self.waypoints[index];
        let end = &self.waypoints[index + 1];

        if t == start.time {
            return Some(start.position());
        }
        if t == end.time {
            return Some(end.position());
        }

        let span = end.time - start.time;
        if span <= 0.0 {
            return Some(start.position());
        }

        let ratio = (t - start.time) / span;
        Some(lerp(start.position(), end.position(), ratio))
    }

    /// Velocity (m/s per axis) of the segment flown at time `t`.
    pub fn velocity_at(&self, t: f64) -> Option<(f64, f64, f64)> {
        if !self.is_active_at(t) {
            return None;
        }

        let index = self.segment_index(t);
        let start = &self.waypoints[index];
        let end = &self.waypoints[index + 1];
        let dt = end.time - start.time;
        if dt <= 0.0 {
            return Some((0.0, 0.0, 0.0));
        }

        Some((
            (end.x - start.x) / dt,
            (end.y - start.y) / dt,
            (end.z - start.z) / dt,
        ))
    }

    /// Fastest chord speed over any segment, never below the nominal speed.
    pub fn max_segment_speed(&self) -> f64 {
        self.waypoints
            .windows(2)
            .filter_map(|pair| {
                let dt = pair[1].time - pair[0].time;
                (dt > 0.0).then(|| pair[0].distance_to(&pair[1]) / dt)
            })
            .fold(self.speed_mps.max(0.0), f64::max)
    }
}

impl std::fmt::Display for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trajectory({}, {} waypoints, {:.1}s)",
            self.id,
            self.waypoints.len(),
            self.duration()
        )
    }
}
