pub mod conflict;
pub mod models;
pub mod rules;
pub mod scenarios;
pub mod spatial;
pub mod trajectory;

pub use conflict::{
    Conflict, ConflictDetector, ConflictMatrix, ConflictStatistics, CRITICAL_SEVERITY,
    MAX_SAMPLES_PER_PAIR,
};
pub use models::{Bounds, Position, Waypoint};
pub use rules::{RulesError, SafetyRules};
pub use scenarios::Scenario;
pub use spatial::{euclidean_distance, midpoint, weighted_distance};
pub use trajectory::{Trajectory, TrajectoryError, TrajectoryRecord};
