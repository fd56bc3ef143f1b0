//! Pre-defined encounter scenarios for exercising the detector.
//!
//! Every scenario is laid out around the airspace center (5000, 5000) at
//! 200m unless noted, and carries the outcome expected under the default
//! vertical weight and the safety distance it was built for.

use crate::models::Waypoint;
use crate::trajectory::{Trajectory, TrajectoryError};

const CENTER: f64 = 5000.0;
const ALTITUDE_M: f64 = 200.0;
const CRUISE_SPEED_MPS: f64 = 15.0;

/// A primary and a single scheduled flight.
pub type Encounter = Result<(Trajectory, Trajectory), TrajectoryError>;

/// A named primary mission against one or more scheduled trajectories.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub primary: Trajectory,
    pub scheduled: Vec<Trajectory>,
    pub expect_conflict: bool,
}

impl Scenario {
    fn pair(
        name: &str,
        primary: Trajectory,
        scheduled: Trajectory,
        expect_conflict: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            primary,
            scheduled: vec![scheduled],
            expect_conflict,
        }
    }
}

fn flight(
    id: &str,
    points: &[(f64, f64, f64, f64)],
    speed_mps: f64,
) -> Result<Trajectory, TrajectoryError> {
    let waypoints = points
        .iter()
        .map(|&(x, y, z, t)| Waypoint::new(x, y, z, t))
        .collect();
    Trajectory::new(id, waypoints, speed_mps, 1)
}

/// Two north-bound parallel tracks `separation_m` apart, the second flown
/// `time_offset_s` later.
pub fn parallel_paths(separation_m: f64, time_offset_s: f64) -> Encounter {
    let track = |x: f64, offset: f64| -> Vec<(f64, f64, f64, f64)> {
        (0..5)
            .map(|i| (x, 3000.0 + 1000.0 * i as f64, ALTITUDE_M, offset + 50.0 * i as f64))
            .collect()
    };
    Ok((
        flight("PRIMARY", &track(CENTER, 0.0), CRUISE_SPEED_MPS)?,
        flight("SIMULATED", &track(CENTER + separation_m, time_offset_s), CRUISE_SPEED_MPS)?,
    ))
}

/// West-east and south-north tracks through the center; the primary is
/// over the center at t=100, the other `time_offset_s` later.
pub fn crossing_paths(time_offset_s: f64) -> Encounter {
    let west_east: Vec<_> = (0..5)
        .map(|i| (3000.0 + 1000.0 * i as f64, CENTER, ALTITUDE_M, 50.0 * i as f64))
        .collect();
    let south_north: Vec<_> = (0..5)
        .map(|i| (CENTER, 3000.0 + 1000.0 * i as f64, ALTITUDE_M, time_offset_s + 50.0 * i as f64))
        .collect();
    Ok((
        flight("PRIMARY", &west_east, CRUISE_SPEED_MPS)?,
        flight("SIMULATED", &south_north, CRUISE_SPEED_MPS)?,
    ))
}

/// A reciprocal track offset laterally by `separation_m`; the flights pass
/// abeam at t=50.
pub fn near_miss(separation_m: f64) -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[(CENTER, CENTER, ALTITUDE_M, 0.0), (CENTER + 1000.0, CENTER, ALTITUDE_M, 100.0)],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIMULATED",
            &[
                (CENTER + 1000.0, CENTER + separation_m, ALTITUDE_M, 0.0),
                (CENTER, CENTER + separation_m, ALTITUDE_M, 100.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
    ))
}

/// Both flights pass the center, `time_gap_s` apart.
pub fn same_waypoint(time_gap_s: f64) -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[
                (CENTER - 1000.0, CENTER, ALTITUDE_M, 0.0),
                (CENTER, CENTER, ALTITUDE_M, 100.0),
                (CENTER + 1000.0, CENTER, ALTITUDE_M, 200.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIMULATED",
            &[
                (CENTER, CENTER - 1000.0, ALTITUDE_M, time_gap_s - 100.0),
                (CENTER, CENTER, ALTITUDE_M, time_gap_s),
                (CENTER, CENTER + 1000.0, ALTITUDE_M, time_gap_s + 100.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
    ))
}

/// Same track flown in opposite directions.
pub fn head_on(time_offset_s: f64) -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[
                (3000.0, CENTER, ALTITUDE_M, 0.0),
                (CENTER, CENTER, ALTITUDE_M, 100.0),
                (7000.0, CENTER, ALTITUDE_M, 200.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIMULATED",
            &[
                (7000.0, CENTER, ALTITUDE_M, time_offset_s),
                (CENTER, CENTER, ALTITUDE_M, time_offset_s + 100.0),
                (3000.0, CENTER, ALTITUDE_M, time_offset_s + 200.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
    ))
}

/// Identical ground tracks, `vertical_separation_m` apart in altitude.
pub fn vertical_stacking(vertical_separation_m: f64) -> Encounter {
    let track = |id: &str, z: f64| {
        flight(
            id,
            &[
                (CENTER - 1000.0, CENTER, z, 0.0),
                (CENTER, CENTER, z, 50.0),
                (CENTER + 1000.0, CENTER, z, 100.0),
            ],
            CRUISE_SPEED_MPS,
        )
    };
    Ok((
        track("PRIMARY", ALTITUDE_M)?,
        track("SIMULATED", ALTITUDE_M + vertical_separation_m)?,
    ))
}

/// 80 m/s tracks that cross the center at the same instant.
pub fn fast_crossing() -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[(3000.0, CENTER, ALTITUDE_M, 0.0), (7000.0, CENTER, ALTITUDE_M, 50.0)],
            80.0,
        )?,
        flight(
            "SIMULATED",
            &[(CENTER, 3000.0, ALTITUDE_M, 0.0), (CENTER, 7000.0, ALTITUDE_M, 50.0)],
            80.0,
        )?,
    ))
}

/// A bent track whose closest approach is exactly `offset_m` from a straight one.
pub fn grazing(offset_m: f64) -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[
                (CENTER - 1000.0, CENTER, ALTITUDE_M, 0.0),
                (CENTER + 1000.0, CENTER, ALTITUDE_M, 100.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIMULATED",
            &[
                (CENTER - 500.0, CENTER + offset_m * 2.0, ALTITUDE_M, 0.0),
                (CENTER, CENTER + offset_m, ALTITUDE_M, 50.0),
                (CENTER + 500.0, CENTER + offset_m * 2.0, ALTITUDE_M, 100.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
    ))
}

/// The second flight departs from the point where the first one lands,
/// `time_gap_s` after it arrives.
pub fn handoff(time_gap_s: f64) -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[(CENTER - 1000.0, CENTER, ALTITUDE_M, 0.0), (CENTER, CENTER, ALTITUDE_M, 100.0)],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIMULATED",
            &[
                (CENTER, CENTER, ALTITUDE_M, 100.0 + time_gap_s),
                (CENTER + 1000.0, CENTER, ALTITUDE_M, 200.0 + time_gap_s),
            ],
            CRUISE_SPEED_MPS,
        )?,
    ))
}

/// A zigzag primary that crosses a straight track twice, at t=100 and t=200.
pub fn sequential_crossings() -> Encounter {
    Ok((
        flight(
            "PRIMARY",
            &[
                (0.0, 1000.0, 150.0, 50.0),
                (1000.0, 1000.0, 150.0, 150.0),
                (1000.0, 2000.0, 150.0, 175.0),
                (0.0, 2000.0, 150.0, 225.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIM-MULTI",
            &[(500.0, 0.0, 150.0, 0.0), (500.0, 3000.0, 150.0, 300.0)],
            10.0,
        )?,
    ))
}

/// A diagonal primary crossed by three scheduled flights at t=75, 150 and 300.
pub fn multiple_drones() -> Result<(Trajectory, Vec<Trajectory>), TrajectoryError> {
    let primary = flight(
        "PRIMARY",
        &[
            (1000.0, 1000.0, ALTITUDE_M, 0.0),
            (3000.0, 3000.0, ALTITUDE_M, 150.0),
            (5000.0, 5000.0, ALTITUDE_M, 300.0),
        ],
        CRUISE_SPEED_MPS,
    )?;
    let scheduled = vec![
        flight(
            "SIM-1",
            &[
                (2000.0, 1000.0, ALTITUDE_M, 0.0),
                (2000.0, 2000.0, ALTITUDE_M, 75.0),
                (2000.0, 3000.0, ALTITUDE_M, 150.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIM-2",
            &[
                (4000.0, 2000.0, ALTITUDE_M, 100.0),
                (3000.0, 3000.0, ALTITUDE_M, 150.0),
                (2000.0, 4000.0, ALTITUDE_M, 200.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
        flight(
            "SIM-3",
            &[
                (5000.0, 4000.0, ALTITUDE_M, 200.0),
                (5000.0, 5000.0, ALTITUDE_M, 300.0),
                (5000.0, 6000.0, ALTITUDE_M, 400.0),
            ],
            CRUISE_SPEED_MPS,
        )?,
    ];
    Ok((primary, scheduled))
}

/// Every scenario with its expected outcome for `safety_distance_m`.
pub fn all(safety_distance_m: f64) -> Result<Vec<Scenario>, TrajectoryError> {
    let (p, s) = parallel_paths(safety_distance_m * 0.5, 300.0)?;
    let mut scenarios = vec![Scenario::pair("Parallel paths, different times", p, s, false)];

    let (p, s) = crossing_paths(200.0)?;
    scenarios.push(Scenario::pair("Crossing paths, different times", p, s, false));
    let (p, s) = crossing_paths(0.0)?;
    scenarios.push(Scenario::pair("Crossing paths, simultaneous", p, s, true));

    let (p, s) = near_miss(safety_distance_m + 5.0)?;
    scenarios.push(Scenario::pair("Near miss outside buffer", p, s, false));

    let (p, s) = same_waypoint(600.0)?;
    scenarios.push(Scenario::pair("Same waypoint, different times", p, s, false));

    let (p, s) = head_on(300.0)?;
    scenarios.push(Scenario::pair("Head-on with time offset", p, s, false));
    let (p, s) = head_on(0.0)?;
    scenarios.push(Scenario::pair("Head-on simultaneous", p, s, true));

    // Weighted vertical separation is 1.5x the altitude gap.
    let (p, s) = vertical_stacking(safety_distance_m * 2.0)?;
    scenarios.push(Scenario::pair("Vertical stacking (sufficient)", p, s, false));
    let (p, s) = vertical_stacking(safety_distance_m * 0.5)?;
    scenarios.push(Scenario::pair("Vertical stacking (insufficient)", p, s, true));

    let (p, s) = fast_crossing()?;
    scenarios.push(Scenario::pair("Fast crossing", p, s, true));

    let (p, s) = grazing(safety_distance_m)?;
    scenarios.push(Scenario::pair("Grazing at exact buffer", p, s, false));

    let (p, s) = handoff(10.0)?;
    scenarios.push(Scenario::pair("Start/end handoff with gap", p, s, false));
    let (p, s) = handoff(0.0)?;
    scenarios.push(Scenario::pair("Start/end immediate handoff", p, s, true));

    let (p, s) = sequential_crossings()?;
    scenarios.push(Scenario::pair("Sequential crossings", p, s, true));

    let (primary, scheduled) = multiple_drones()?;
    scenarios.push(Scenario {
        name: "Multiple drones".to_string(),
        primary,
        scheduled,
        expect_conflict: true,
    });

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictDetector;
    use crate::rules::SafetyRules;

    #[test]
    fn test_every_scenario_matches_expectation() {
        let detector = ConflictDetector::new(SafetyRules::new(10.0, 1.0).unwrap()).unwrap();

        for scenario in all(10.0).unwrap() {
            let found = scenario
                .scheduled
                .iter()
                .any(|s| detector.check_pair(&scenario.primary, s).is_some());
            assert_eq!(found, scenario.expect_conflict, "scenario: {}", scenario.name);
        }
    }

    #[test]
    fn test_multiple_drones_each_conflict() {
        let detector = ConflictDetector::default();
        let (primary, scheduled) = multiple_drones().unwrap();
        for other in &scheduled {
            assert!(detector.check_pair(&primary, other).is_some(), "{}", other.id());
        }
    }

    #[test]
    fn test_handoff_conflict_at_handoff_instant() {
        let detector = ConflictDetector::default();
        let (primary, scheduled) = handoff(0.0).unwrap();
        let conflict = detector.check_pair(&primary, &scheduled).unwrap();
        assert_eq!(conflict.time_s, 100.0);
        assert_eq!(conflict.distance_m, 0.0);
    }
}
