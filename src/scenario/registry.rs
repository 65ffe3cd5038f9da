use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{DistrictId, DistrictType, MeshblockNumber, PerType, ScenarioId};

/// A named snapshot of the complete meshblock-to-district assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub created: DateTime<Utc>,
    pub created_by: String,
}

/// Assignments of one meshblock within one scenario.
pub type MeshblockAssignment = PerType<Option<DistrictId>>;

/// Registry of scenarios and their meshblock assignment rows.
///
/// The assignment rows are the canonical state from which district geometry
/// and population are derived.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
    assignments: BTreeMap<(ScenarioId, MeshblockNumber), MeshblockAssignment>,
    user: String, // Acting user, stamped on new scenarios
}

impl ScenarioRegistry {
    pub fn new(user: &str) -> Self {
        Self { user: user.to_string(), ..Default::default() }
    }

    #[inline] pub fn user(&self) -> &str { &self.user }

    pub fn set_user(&mut self, user: &str) { self.user = user.to_string() }

    /// Scenario ids in creation order.
    pub fn scenario_list(&self) -> Vec<ScenarioId> {
        self.scenarios.iter().map(|scenario| scenario.id).collect()
    }

    /// Map from scenario name to id, sorted by name.
    pub fn scenario_titles(&self) -> BTreeMap<String, ScenarioId> {
        self.scenarios.iter().map(|scenario| (scenario.name.clone(), scenario.id)).collect()
    }

    #[inline]
    pub fn scenarios(&self) -> &[Scenario] { &self.scenarios }

    pub fn get_scenario(&self, id: ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.id == id)
    }

    /// Name of a scenario, falling back to the id's string form.
    pub fn get_scenario_name(&self, id: ScenarioId) -> String {
        self.get_scenario(id).map_or_else(|| id.to_string(), |scenario| scenario.name.clone())
    }

    pub fn scenario_name_exists(&self, name: &str) -> bool {
        self.scenarios.iter().any(|scenario| scenario.name == name)
    }

    pub fn scenario_exists(&self, id: ScenarioId) -> bool {
        self.get_scenario(id).is_some()
    }

    /// Create an empty scenario stamped with the current time and user.
    pub fn create_scenario(&mut self, name: &str) -> Result<ScenarioId> {
        ensure!(!self.scenario_name_exists(name), "A scenario with the name '{name}' already exists");
        let id = self.next_id();
        self.scenarios.push(Scenario {
            id,
            name: name.to_string(),
            created: Utc::now(),
            created_by: self.user.clone(),
        });
        Ok(id)
    }

    /// Copy `source_id`'s assignments into a new scenario called `new_name`.
    pub fn branch_scenario(&mut self, source_id: ScenarioId, new_name: &str) -> Result<ScenarioId> {
        ensure!(!self.scenario_name_exists(new_name), "A scenario with the name '{new_name}' already exists");
        ensure!(self.scenario_exists(source_id), "Source scenario {source_id} does not exist");

        let rows: Vec<(MeshblockNumber, MeshblockAssignment)> = self.scenario_assignments(source_id)
            .map(|(number, assignment)| (number, assignment.clone()))
            .collect();

        let id = self.create_scenario(new_name)?;
        let count = rows.len();
        for (number, assignment) in rows {
            self.assignments.insert((id, number), assignment);
        }
        info!(source = source_id, id, rows = count, name = new_name, "branched scenario");
        Ok(id)
    }

    /// Copy a scenario from another registry, keeping meshblock numbers as they are.
    pub fn import_scenario_from_other_registry(
        &mut self,
        source: &ScenarioRegistry,
        source_scenario_id: ScenarioId,
        new_scenario_name: &str,
    ) -> Result<ScenarioId> {
        self.import_scenario_with_concordance(source, source_scenario_id, new_scenario_name, Some)
    }

    /// Copy a scenario from another registry, translating each source meshblock
    /// number with `translate`. Rows without a translation are skipped.
    pub fn import_scenario_with_concordance(
        &mut self,
        source: &ScenarioRegistry,
        source_scenario_id: ScenarioId,
        new_scenario_name: &str,
        translate: impl Fn(MeshblockNumber) -> Option<MeshblockNumber>,
    ) -> Result<ScenarioId> {
        ensure!(
            !self.scenario_name_exists(new_scenario_name),
            "A scenario with the name '{new_scenario_name}' already exists"
        );
        ensure!(
            source.scenario_exists(source_scenario_id),
            "Source scenario {source_scenario_id} does not exist"
        );

        let id = self.create_scenario(new_scenario_name)?;
        let mut skipped = 0usize;
        for (number, assignment) in source.scenario_assignments(source_scenario_id) {
            match translate(number) {
                Some(target) => { self.assignments.insert((id, target), assignment.clone()); }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, scenario = id, "meshblocks without a concordance entry were not imported");
        }
        Ok(id)
    }

    /// Set one meshblock's assignment for one type within a scenario.
    pub fn set_assignment(&mut self, scenario_id: ScenarioId, number: MeshblockNumber, ty: DistrictType, district: Option<DistrictId>) -> Result<()> {
        ensure!(self.scenario_exists(scenario_id), "Scenario {scenario_id} does not exist");
        self.assignments.entry((scenario_id, number)).or_default().set(ty, district);
        Ok(())
    }

    /// Replace all of one meshblock's assignments within a scenario.
    pub fn set_meshblock_assignment(&mut self, scenario_id: ScenarioId, number: MeshblockNumber, assignment: MeshblockAssignment) -> Result<()> {
        ensure!(self.scenario_exists(scenario_id), "Scenario {scenario_id} does not exist");
        self.assignments.insert((scenario_id, number), assignment);
        Ok(())
    }

    pub fn meshblock_assignment(&self, scenario_id: ScenarioId, number: MeshblockNumber) -> Option<&MeshblockAssignment> {
        self.assignments.get(&(scenario_id, number))
    }

    /// All assignment rows of a scenario, ordered by meshblock number.
    pub fn scenario_assignments(&self, scenario_id: ScenarioId) -> impl Iterator<Item = (MeshblockNumber, &MeshblockAssignment)> {
        self.assignments
            .range((scenario_id, MeshblockNumber::MIN)..=(scenario_id, MeshblockNumber::MAX))
            .map(|((_, number), assignment)| (*number, assignment))
    }

    /// Meshblocks assigned to `district_id` of type `district_type` in `scenario_id`.
    pub fn electorate_meshblocks(&self, district_id: &DistrictId, district_type: DistrictType, scenario_id: ScenarioId) -> Vec<MeshblockNumber> {
        self.scenario_assignments(scenario_id)
            .filter(|(_, assignment)| assignment.get(district_type).as_ref() == Some(district_id))
            .map(|(number, _)| number)
            .collect()
    }

    pub fn electorate_has_meshblocks(&self, district_id: &DistrictId, district_type: DistrictType, scenario_id: ScenarioId) -> bool {
        self.scenario_assignments(scenario_id)
            .any(|(_, assignment)| assignment.get(district_type).as_ref() == Some(district_id))
    }

    /// Next unused id: one more than the largest existing id.
    fn next_id(&self) -> ScenarioId {
        self.scenarios.iter().map(|scenario| scenario.id).max().map_or(1, |max| max + 1)
    }

    /// Flatten into the persisted row format.
    pub fn to_rows(&self) -> (Vec<Scenario>, Vec<AssignmentRow>) {
        let rows = self.assignments.iter()
            .map(|((scenario_id, meshblock_number), districts)| AssignmentRow {
                scenario_id: *scenario_id,
                meshblock_number: *meshblock_number,
                districts: districts.clone(),
            })
            .collect();
        (self.scenarios.clone(), rows)
    }

    /// Rebuild from the persisted row format.
    pub fn from_rows(user: &str, scenarios: Vec<Scenario>, rows: Vec<AssignmentRow>) -> Result<Self> {
        let mut registry = Self::new(user);
        for scenario in scenarios {
            ensure!(!registry.scenario_exists(scenario.id), "Duplicate scenario id {}", scenario.id);
            ensure!(!registry.scenario_name_exists(&scenario.name), "Duplicate scenario name '{}'", scenario.name);
            registry.scenarios.push(scenario);
        }
        for row in rows {
            registry.set_meshblock_assignment(row.scenario_id, row.meshblock_number, row.districts)?;
        }
        Ok(registry)
    }
}

/// Persisted assignment row: one per (scenario, meshblock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub scenario_id: ScenarioId,
    pub meshblock_number: MeshblockNumber,
    #[serde(flatten)]
    pub districts: MeshblockAssignment,
}
