//! Distance metrics in the local Cartesian airspace frame.

use crate::models::Position;

/// Plain 3D Euclidean distance in meters.
pub fn euclidean_distance(a: Position, b: Position) -> f64 {
    weighted_distance(a, b, 1.0)
}

/// Separation metric used for conflict classification.
///
/// The vertical component is scaled by `vertical_weight` before the norm is
/// taken, so with a weight above 1 two vehicles stacked on top of each other
/// read as further apart than the same offset measured horizontally:
///
/// `d = sqrt(dx² + dy² + (dz·w)²)`
pub fn weighted_distance(a: Position, b: Position, vertical_weight: f64) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = (a.2 - b.2) * vertical_weight;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Midpoint of two positions, used as the display location of a conflict.
pub fn midpoint(a: Position, b: Position) -> Position {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0, (a.2 + b.2) / 2.0)
}

/// Linear blend from `a` towards `b` by `ratio` in [0, 1].
pub(crate) fn lerp(a: Position, b: Position, ratio: f64) -> Position {
    (
        a.0 + ratio * (b.0 - a.0),
        a.1 + ratio * (b.1 - a.1),
        a.2 + ratio * (b.2 - a.2),
    )
}
