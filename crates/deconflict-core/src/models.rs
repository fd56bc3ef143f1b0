//! Core data models shared by the trajectory and conflict modules.

use serde::{Deserialize, Serialize};

/// Position in the local airspace frame (x east, y north, z altitude), meters.
pub type Position = (f64, f64, f64);

/// A single space-time control point of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// East, meters
    pub x: f64,
    /// North, meters
    pub y: f64,
    /// Altitude, meters
    pub z: f64,
    /// Seconds from the start of the shared schedule
    pub time: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64, time: f64) -> Self {
        Self { x, y, z, time }
    }

    pub fn position(&self) -> Position {
        (self.x, self.y, self.z)
    }

    /// Euclidean distance to another waypoint, ignoring time.
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        crate::spatial::euclidean_distance(self.position(), other.position())
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.time.is_finite()
    }
}

/// Axis-aligned bounding box of a trajectory, as (min, max) per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub z: (f64, f64),
}

impl Bounds {
    pub(crate) fn around(waypoints: &[Waypoint]) -> Self {
        let mut bounds = Self {
            x: (f64::INFINITY, f64::NEG_INFINITY),
            y: (f64::INFINITY, f64::NEG_INFINITY),
            z: (f64::INFINITY, f64::NEG_INFINITY),
        };
        for wp in waypoints {
            bounds.x = (bounds.x.0.min(wp.x), bounds.x.1.max(wp.x));
            bounds.y = (bounds.y.0.min(wp.y), bounds.y.1.max(wp.y));
            bounds.z = (bounds.z.0.min(wp.z), bounds.z.1.max(wp.z));
        }
        bounds
    }
}
