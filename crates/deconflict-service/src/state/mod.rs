//! Schedule state.

mod store;

pub use store::ScheduleStore;
