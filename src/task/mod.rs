mod base;
mod export;
mod job;
mod switch;
mod validate;

pub use base::{DistrictSummary, ScenarioBaseTask};
pub use export::{ExportScenarioTask, ExportSummary, ELECTORATES_TABLE, MESHBLOCKS_TABLE, USER_LOG_TABLE};
pub use job::{run_job, spawn, BackgroundJob, Canceled, TaskControl, TaskHandle, TaskOutcome};
pub use switch::{SwitchResult, SwitchScenarioTask};
pub use validate::{ValidateScenarioTask, ValidationReport, ValidationResult};
