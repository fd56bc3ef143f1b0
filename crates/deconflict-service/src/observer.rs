//! Lifecycle events emitted by the verification service.
//!
//! The service never logs directly. Hosts inject a [`VerificationObserver`];
//! [`TracingObserver`] forwards everything to `tracing` with structured
//! fields, and [`NoopObserver`] drops it.

use deconflict_core::Trajectory;

use crate::verification::{BatchSummary, VerificationResult};

/// Receives service events. Every method defaults to doing nothing.
pub trait VerificationObserver: Send + Sync {
    fn schedule_added(&self, _trajectory: &Trajectory, _replaced: bool) {}

    fn schedule_removed(&self, _trajectory_id: &str) {}

    fn verification_started(&self, _primary: &Trajectory, _scheduled_count: usize) {}

    fn verification_completed(&self, _result: &VerificationResult) {}

    fn batch_completed(&self, _summary: &BatchSummary) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl VerificationObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VerificationObserver for TracingObserver {
    fn schedule_added(&self, trajectory: &Trajectory, replaced: bool) {
        tracing::debug!(
            trajectory_id = %trajectory.id(),
            waypoints = trajectory.waypoints().len(),
            replaced,
            "Scheduled trajectory registered"
        );
    }

    fn schedule_removed(&self, trajectory_id: &str) {
        tracing::debug!(trajectory_id, "Scheduled trajectory removed");
    }

    fn verification_started(&self, primary: &Trajectory, scheduled_count: usize) {
        tracing::debug!(
            mission_id = %primary.id(),
            scheduled_count,
            "Verifying mission"
        );
    }

    fn verification_completed(&self, result: &VerificationResult) {
        if result.is_clear() {
            tracing::info!(mission_id = %result.mission_id(), "Mission clear");
            return;
        }

        for detail in &result.conflict_details {
            tracing::warn!(
                mission_id = %result.mission_id(),
                conflicting_flight = %detail.conflicting_flight,
                time_s = detail.time,
                distance_m = detail.distance,
                severity = detail.severity,
                "Conflict detected"
            );
        }
    }

    fn batch_completed(&self, summary: &BatchSummary) {
        tracing::info!(
            missions = summary.missions,
            clear = summary.clear,
            conflicted = summary.conflicted,
            total_conflicts = summary.total_conflicts,
            "Batch verification complete"
        );
    }
}
