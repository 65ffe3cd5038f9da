#![doc = "Districtor public API: electorate redistricting over meshblocks and scenarios"]
mod common;
mod district;
mod geom;
mod layer;
mod project;
mod queue;
mod redistrict;
mod scenario;
mod session;
mod stats;
mod task;
mod types;

#[cfg(test)]
mod test_support;

#[doc(inline)]
pub use types::{AttrValue, DistrictId, DistrictType, FeatureId, MeshblockNumber, PerType, ScenarioId};

#[doc(inline)]
pub use common::{JsonFileSettings, MemorySettings, ProjectConfig, SettingsStore, CONFIG_FILE};

#[doc(inline)]
pub use geom::{dissolve, make_valid, part_count, patch};

#[doc(inline)]
pub use layer::{
    AssignmentChange, AttributeChangeMap, AuditEntry, AuditLog, District, DistrictField, DistrictLayer,
    GeometryChangeMap, Meshblock, MeshblockLayer,
};

#[doc(inline)]
pub use district::{
    exceeds_tolerance, format_variance, quota_variance, DistrictRegistry, LinzElectoralDistrictRegistry,
    VectorLayerDistrictRegistry, MAX_RECENT_DISTRICTS, QUOTA_TOLERANCE_PERCENT,
};

#[doc(inline)]
pub use redistrict::{
    edit_group, BasicRedistrictHandler, DistrictFilter, EditGroup, LinzRedistrictHandler, PendingChanges,
    RedistrictEvent, RedistrictHandler, DISTRICT_ID_FIELD, DISTRICT_TYPE_FIELD,
};

#[doc(inline)]
pub use queue::ElectorateChangeQueue;

#[doc(inline)]
pub use scenario::{AssignmentRow, MeshblockAssignment, Scenario, ScenarioRegistry};

#[doc(inline)]
pub use task::{
    run_job, spawn, BackgroundJob, Canceled, DistrictSummary, ExportScenarioTask, ExportSummary,
    ScenarioBaseTask, SwitchResult, SwitchScenarioTask, TaskControl, TaskHandle, TaskOutcome,
    ValidateScenarioTask, ValidationReport, ValidationResult, ELECTORATES_TABLE, MESHBLOCKS_TABLE, USER_LOG_TABLE,
};

#[doc(inline)]
pub use stats::{
    stats_attribute_changes, PollResult, StatsApi, StatsRequestQueue, StatsResponse, StatsResult,
    IN_PROGRESS_PREFIX, POLL_INTERVAL,
};

#[doc(inline)]
pub use session::RedistrictSession;

#[doc(inline)]
pub use project::{load_project, save_project, ELECTORATES_FILE, MESHBLOCKS_FILE, SCENARIOS_FILE, USER_LOG_FILE};
