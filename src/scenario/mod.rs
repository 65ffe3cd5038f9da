mod registry;

pub use registry::{AssignmentRow, MeshblockAssignment, Scenario, ScenarioRegistry};
