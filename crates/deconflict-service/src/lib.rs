//! Verification authority for proposed missions against scheduled traffic.

pub mod config;
pub mod observer;
pub mod report;
pub mod state;
pub mod verification;

pub use config::Config;
pub use observer::{NoopObserver, TracingObserver, VerificationObserver};
pub use report::{AirspaceStatus, ScheduleStatistics, VerificationReport};
pub use state::ScheduleStore;
pub use verification::{
    ConflictDetail, VerificationResult, VerificationService, VerificationStatus, VerifyError,
};
