//! 4D conflict detection between planned trajectories.
//!
//! Each pair of trajectories is sampled over the time window in which both
//! are flying. The sampling step adapts to how fast the pair can close on
//! each other, and the single closest sampled approach is reported as a
//! [`Conflict`] when it falls inside the safety distance.
//!
//! Sampling is discrete: a closest approach that falls strictly between two
//! samples is measured at the nearest sample, and a pair yields at most one
//! conflict even when the paths come close more than once.

use serde::{Deserialize, Serialize};

use crate::models::Position;
use crate::rules::{RulesError, SafetyRules};
use crate::spatial::{midpoint, weighted_distance};
use crate::trajectory::Trajectory;

/// Overlap windows shorter than this are checked at a single instant.
const TIME_EPSILON_S: f64 = 1e-6;
/// Floor on the configured time step.
const MIN_BASE_STEP_S: f64 = 1e-3;
/// Closing speeds at or below this fall back to the nominal step.
const MIN_RELATIVE_SPEED_MPS: f64 = 1e-6;
/// Minimum samples taken while a pair closes across the safety distance.
const SAMPLES_PER_SAFETY_CROSSING: f64 = 4.0;
/// The adaptive step never drops below this fraction of the nominal step.
const MIN_STEP_FRACTION: f64 = 0.1;
/// Upper bound on samples taken for one pair.
pub const MAX_SAMPLES_PER_PAIR: usize = 1_000_000;
/// Severity above which a conflict counts as critical.
pub const CRITICAL_SEVERITY: f64 = 0.8;

/// Closest sampled approach between two trajectories.
#[derive(Debug, Clone, Copy)]
struct ClosestApproach {
    distance_m: f64,
    time_s: f64,
    pos1: Position,
    pos2: Position,
}

/// Detected loss of separation between two trajectories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub trajectory1_id: String,
    pub trajectory2_id: String,
    /// Time of closest approach (seconds)
    pub time_s: f64,
    pub position1: Position,
    pub position2: Position,
    /// Weighted separation at closest approach (meters)
    pub distance_m: f64,
    /// 0 at the safety distance, approaching 1 as separation approaches 0
    pub severity: f64,
}

impl Conflict {
    pub fn involves(&self, trajectory_id: &str) -> bool {
        self.trajectory1_id == trajectory_id || self.trajectory2_id == trajectory_id
    }

    /// Identifier of the other party, if `trajectory_id` is one of the pair.
    pub fn other_id(&self, trajectory_id: &str) -> Option<&str> {
        if self.trajectory1_id == trajectory_id {
            Some(&self.trajectory2_id)
        } else if self.trajectory2_id == trajectory_id {
            Some(&self.trajectory1_id)
        } else {
            None
        }
    }

    /// Midpoint between the two vehicles at closest approach.
    pub fn midpoint(&self) -> Position {
        midpoint(self.position1, self.position2)
    }

    pub fn is_critical(&self) -> bool {
        self.severity > CRITICAL_SEVERITY
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Conflict({} vs {}, t={:.1}s, dist={:.1}m, severity={:.2})",
            self.trajectory1_id, self.trajectory2_id, self.time_s, self.distance_m, self.severity
        )
    }
}

/// Symmetric pairwise conflict flags for a set of trajectories, indexed by
/// position in the input slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRecord")]
pub struct ConflictMatrix {
    size: usize,
    cells: Vec<bool>,
}

#[derive(Deserialize)]
struct MatrixRecord {
    size: usize,
    cells: Vec<bool>,
}

impl TryFrom<MatrixRecord> for ConflictMatrix {
    type Error = String;

    fn try_from(record: MatrixRecord) -> Result<Self, Self::Error> {
        let expected = record
            .size
            .checked_mul(record.size)
            .ok_or_else(|| format!("matrix size {} is too large", record.size))?;
        if record.cells.len() != expected {
            return Err(format!(
                "matrix of size {} needs {} cells, got {}",
                record.size,
                expected,
                record.cells.len()
            ));
        }
        Ok(Self {
            size: record.size,
            cells: record.cells,
        })
    }
}

impl ConflictMatrix {
    fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    fn mark(&mut self, i: usize, j: usize) {
        self.cells[i * self.size + j] = true;
        self.cells[j * self.size + i] = true;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether trajectories `i` and `j` conflict. Out-of-range indices read as false.
    pub fn get(&self, i: usize, j: usize) -> bool {
        if i >= self.size || j >= self.size {
            return false;
        }
        self.cells.get(i * self.size + j).copied().unwrap_or(false)
    }

    /// Rows of the matrix, one `Vec<bool>` per trajectory.
    pub fn rows(&self) -> Vec<Vec<bool>> {
        self.cells
            .chunks(self.size.max(1))
            .take(self.size)
            .map(<[bool]>::to_vec)
            .collect()
    }

    pub fn conflict_count(&self, i: usize) -> usize {
        (0..self.size).filter(|&j| self.get(i, j)).count()
    }
}

/// Summary figures over a list of conflicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictStatistics {
    pub total_conflicts: usize,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub avg_distance_m: f64,
    pub min_severity: f64,
    pub max_severity: f64,
    pub avg_severity: f64,
    /// Conflicts with severity above [`CRITICAL_SEVERITY`]
    pub critical_conflicts: usize,
}

/// Pairwise 4D conflict detector.
///
/// Stateless apart from its rules: every call is deterministic and leaves
/// nothing behind.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    rules: SafetyRules,
}

impl ConflictDetector {
    /// Create a detector from validated rules.
    pub fn new(rules: SafetyRules) -> Result<Self, RulesError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &SafetyRules {
        &self.rules
    }

    pub fn safety_distance_m(&self) -> f64 {
        self.rules.safety_distance_m
    }

    /// Weighted separation between two positions under these rules.
    pub fn separation(&self, pos1: Position, pos2: Position) -> f64 {
        weighted_distance(pos1, pos2, self.rules.vertical_weight)
    }

    /// 0 at the safety distance, 1 at zero separation.
    pub fn severity(&self, distance_m: f64) -> f64 {
        (1.0 - distance_m / self.rules.safety_distance_m).clamp(0.0, 1.0)
    }

    fn base_step(&self) -> f64 {
        self.rules.time_step_s.max(MIN_BASE_STEP_S)
    }

    /// Sampling step for a pair, shrinking with their combined top speed.
    ///
    /// Aims for at least four samples while the pair could be crossing the
    /// safety distance, bounded to `[0.1 * step, step]` of the nominal step.
    pub fn effective_time_step(&self, trajectory1: &Trajectory, trajectory2: &Trajectory) -> f64 {
        let base_step = self.base_step();
        let relative_speed = trajectory1.max_segment_speed() + trajectory2.max_segment_speed();
        if relative_speed <= MIN_RELATIVE_SPEED_MPS {
            return base_step;
        }

        let desired_step =
            self.rules.safety_distance_m / (relative_speed * SAMPLES_PER_SAFETY_CROSSING);
        let min_step = base_step * MIN_STEP_FRACTION;
        base_step.min(desired_step.max(min_step))
    }

    /// Sample times covering the pair's overlap window, or `None` when the
    /// two trajectories are never airborne together.
    ///
    /// Samples are produced lazily. A window that would need more than
    /// [`MAX_SAMPLES_PER_PAIR`] samples at the effective step is spread over
    /// exactly that many instead.
    fn sample_times(
        &self,
        trajectory1: &Trajectory,
        trajectory2: &Trajectory,
    ) -> Option<impl Iterator<Item = f64>> {
        let t_start = trajectory1.start_time().max(trajectory2.start_time());
        let t_end = trajectory1.end_time().min(trajectory2.end_time());

        if t_start - t_end > TIME_EPSILON_S {
            return None;
        }

        let span = t_end - t_start;
        let sample_count = if span.abs() <= TIME_EPSILON_S {
            1
        } else {
            let step = self.effective_time_step(trajectory1, trajectory2);
            let steps = (span.max(step) / step).ceil();
            if steps >= (MAX_SAMPLES_PER_PAIR - 1) as f64 {
                MAX_SAMPLES_PER_PAIR
            } else {
                (steps as usize + 1).max(2)
            }
        };
        let last = sample_count - 1;

        Some((0..sample_count).map(move |i| {
            if i == 0 {
                t_start
            } else if i == last {
                t_end
            } else {
                t_start + span * (i as f64 / last as f64)
            }
        }))
    }

    fn closest_approach(
        &self,
        trajectory1: &Trajectory,
        trajectory2: &Trajectory,
    ) -> Option<ClosestApproach> {
        let times = self.sample_times(trajectory1, trajectory2)?;
        let mut best: Option<ClosestApproach> = None;

        for t in times {
            // Only rounding at a shared boundary can put a sample outside a span.
            let (Some(pos1), Some(pos2)) = (trajectory1.position_at(t), trajectory2.position_at(t))
            else {
                continue;
            };

            let distance = self.separation(pos1, pos2);
            let replace = best
                .as_ref()
                .map(|best| distance < best.distance_m)
                .unwrap_or(true);
            if replace {
                best = Some(ClosestApproach {
                    distance_m: distance,
                    time_s: t,
                    pos1,
                    pos2,
                });
            }
        }

        best
    }

    /// Check one pair. Returns the conflict at their closest sampled approach,
    /// if that approach is strictly inside the safety distance.
    pub fn check_pair(
        &self,
        trajectory1: &Trajectory,
        trajectory2: &Trajectory,
    ) -> Option<Conflict> {
        let best = self.closest_approach(trajectory1, trajectory2)?;
        if best.distance_m >= self.rules.safety_distance_m {
            return None;
        }

        Some(Conflict {
            trajectory1_id: trajectory1.id().to_string(),
            trajectory2_id: trajectory2.id().to_string(),
            time_s: best.time_s,
            position1: best.pos1,
            position2: best.pos2,
            distance_m: best.distance_m,
            severity: self.severity(best.distance_m),
        })
    }

    /// Conflicts of every unordered pair, tagged with the pair's indices.
    fn pairwise(&self, trajectories: &[Trajectory]) -> Vec<(usize, usize, Conflict)> {
        let mut found = Vec::new();
        for i in 0..trajectories.len() {
            for j in (i + 1)..trajectories.len() {
                if let Some(conflict) = self.check_pair(&trajectories[i], &trajectories[j]) {
                    found.push((i, j, conflict));
                }
            }
        }
        found
    }

    /// Check every unordered pair once and return all conflicts ordered by
    /// time of closest approach. Ties keep pair evaluation order.
    pub fn find_conflicts(&self, trajectories: &[Trajectory]) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self
            .pairwise(trajectories)
            .into_iter()
            .map(|(_, _, conflict)| conflict)
            .collect();
        conflicts.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        conflicts
    }

    /// Conflicts among trajectories still flying after `current_time`.
    ///
    /// With a look-ahead window configured, only conflicts whose closest
    /// approach falls within `[current_time, current_time + lookahead]` are kept.
    pub fn predict_conflicts(
        &self,
        trajectories: &[Trajectory],
        current_time: f64,
    ) -> Vec<Conflict> {
        let airborne: Vec<Trajectory> = trajectories
            .iter()
            .filter(|trajectory| trajectory.end_time() > current_time)
            .cloned()
            .collect();

        let mut conflicts = self.find_conflicts(&airborne);
        if let Some(lookahead) = self.rules.lookahead_s {
            let horizon = current_time + lookahead;
            conflicts.retain(|c| c.time_s >= current_time && c.time_s <= horizon);
        }
        conflicts
    }

    /// True if the pair stays inside the safety distance at every nominal-step
    /// sample from `start_time` through `end_time`.
    ///
    /// A sample where either vehicle is not flying breaks continuity. An empty
    /// window (`start_time > end_time`) is not a continuous conflict.
    pub fn check_continuous_conflict(
        &self,
        trajectory1: &Trajectory,
        trajectory2: &Trajectory,
        start_time: f64,
        end_time: f64,
    ) -> bool {
        if !(start_time <= end_time) {
            return false;
        }

        let step = self.base_step();
        let in_conflict = |t: f64| match (trajectory1.position_at(t), trajectory2.position_at(t)) {
            (Some(pos1), Some(pos2)) => self.separation(pos1, pos2) < self.rules.safety_distance_m,
            _ => false,
        };

        let mut k = 0usize;
        loop {
            let t = start_time + k as f64 * step;
            if t > end_time - TIME_EPSILON_S {
                break;
            }
            if !in_conflict(t) {
                return false;
            }
            k += 1;
        }

        in_conflict(end_time)
    }

    /// Symmetric boolean conflict matrix with a false diagonal.
    pub fn get_conflict_matrix(&self, trajectories: &[Trajectory]) -> ConflictMatrix {
        let mut matrix = ConflictMatrix::new(trajectories.len());
        for (i, j, _) in self.pairwise(trajectories) {
            matrix.mark(i, j);
        }
        matrix
    }

    /// Distance and severity figures over `conflicts`; all zeros when empty.
    pub fn get_statistics(&self, conflicts: &[Conflict]) -> ConflictStatistics {
        if conflicts.is_empty() {
            return ConflictStatistics::default();
        }

        let count = conflicts.len() as f64;
        let mut stats = ConflictStatistics {
            total_conflicts: conflicts.len(),
            min_distance_m: f64::INFINITY,
            max_distance_m: f64::NEG_INFINITY,
            min_severity: f64::INFINITY,
            max_severity: f64::NEG_INFINITY,
            ..ConflictStatistics::default()
        };

        for conflict in conflicts {
            stats.min_distance_m = stats.min_distance_m.min(conflict.distance_m);
            stats.max_distance_m = stats.max_distance_m.max(conflict.distance_m);
            stats.min_severity = stats.min_severity.min(conflict.severity);
            stats.max_severity = stats.max_severity.max(conflict.severity);
            stats.avg_distance_m += conflict.distance_m;
            stats.avg_severity += conflict.severity;
            if conflict.is_critical() {
                stats.critical_conflicts += 1;
            }
        }
        stats.avg_distance_m /= count;
        stats.avg_severity /= count;

        stats
    }
}
