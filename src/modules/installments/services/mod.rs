pub mod charging_engine;
pub mod grace_controller;
pub mod money;
pub mod schedule_builder;

pub use charging_engine::{ChargingEngine, DueRunSummary};
pub use grace_controller::{CancelRunSummary, GraceController, RetryRunSummary};
pub use schedule_builder::{build_entries, NewSchedule, ScheduleBuilder};
