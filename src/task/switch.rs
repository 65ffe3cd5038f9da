use std::collections::{BTreeMap, HashMap};

use anyhow::{ensure, Context, Result};
use tracing::info;

use crate::{
    layer::{AttributeChangeMap, DistrictField, DistrictLayer, GeometryChangeMap, MeshblockLayer},
    queue::ElectorateChangeQueue,
    scenario::{MeshblockAssignment, ScenarioRegistry},
    types::{AttrValue, MeshblockNumber, ScenarioId},
};
use super::{base::ScenarioBaseTask, job::{BackgroundJob, TaskControl}};

/// Makes a scenario the live one.
#[derive(Debug, Clone)]
pub struct SwitchScenarioTask {
    base: ScenarioBaseTask,
    scenario_name: String,
    assignments: HashMap<MeshblockNumber, MeshblockAssignment>,
}

/// Computed state of the district layer for the new scenario.
#[derive(Debug, Clone)]
pub struct SwitchResult {
    pub scenario_id: ScenarioId,
    pub attributes: AttributeChangeMap,
    pub geometries: GeometryChangeMap,
    pub assignments: HashMap<MeshblockNumber, MeshblockAssignment>,
}

impl SwitchScenarioTask {
    pub fn prepare(
        scenario_id: ScenarioId,
        scenarios: &ScenarioRegistry,
        meshblocks: &MeshblockLayer,
        districts: &DistrictLayer,
    ) -> Result<Self> {
        let base = ScenarioBaseTask::prepare(scenario_id, scenarios, meshblocks, districts)?;
        let assignments = scenarios.scenario_assignments(scenario_id)
            .map(|(number, assignment)| (number, assignment.clone()))
            .collect();
        Ok(Self { base, scenario_name: scenarios.get_scenario_name(scenario_id), assignments })
    }
}

impl BackgroundJob for SwitchScenarioTask {
    type Output = SwitchResult;

    fn description(&self) -> String { format!("Switching to scenario '{}'", self.scenario_name) }

    fn run(&mut self, control: &TaskControl) -> Result<SwitchResult> {
        let summaries = self.base.compute(control)?;
        let scenario_id = self.base.scenario_id();

        let mut attributes = AttributeChangeMap::new();
        let mut geometries = GeometryChangeMap::new();
        for summary in summaries {
            attributes.insert(summary.fid, BTreeMap::from([
                (DistrictField::EstimatedPop, AttrValue::Int(summary.population)),
                (DistrictField::ScenarioId, AttrValue::Int(scenario_id)),
                (DistrictField::StatsPop, AttrValue::Null),
                (DistrictField::StatsVarYear1, AttrValue::Null),
                (DistrictField::StatsVarYear2, AttrValue::Null),
                (DistrictField::Invalid, AttrValue::Null),
                (DistrictField::InvalidReason, AttrValue::Null),
            ]));
            geometries.insert(summary.fid, summary.geometry);
        }
        control.check()?;

        Ok(SwitchResult { scenario_id, attributes, geometries, assignments: std::mem::take(&mut self.assignments) })
    }
}

impl SwitchResult {
    /// Write the result into the live layers: one change-map call on the
    /// district layer, then the meshblock assignment cache. Both undo
    /// histories are cleared.
    pub fn apply(&self, districts: &mut DistrictLayer, meshblocks: &mut MeshblockLayer, queue: &mut ElectorateChangeQueue) -> Result<()> {
        ensure!(!meshblocks.has_open_command(), "[SwitchResult.apply] cannot switch scenario while an edit group is open");
        districts.apply_changes(&self.attributes, &self.geometries)
            .with_context(|| format!("[SwitchResult.apply] failed to update electorates for scenario {}", self.scenario_id))?;
        meshblocks.refresh_assignments(&self.assignments)?;
        queue.clear();
        info!(scenario = self.scenario_id, districts = self.attributes.len(), "switched scenario");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::Area;

    use super::*;
    use crate::{
        layer::{District, Meshblock},
        task::run_job,
        test_support::square,
        types::{DistrictId, DistrictType, PerType},
    };

    #[test]
    fn switch_recomputes_and_clears_stale_fields() {
        let mut meshblocks = MeshblockLayer::new(vec![
            Meshblock::new(1, square(0.0, 0.0)),
            Meshblock::new(2, square(1.0, 0.0)),
        ]).unwrap();
        let mut districts = DistrictLayer::new();
        let mut district = District::new(DistrictId::from(4), DistrictType::Maori, "M04", "Four");
        district.stats_pop = Some(1234);
        district.invalid = Some(true);
        let fid = districts.add_district(district).unwrap();

        let mut scenarios = ScenarioRegistry::new("tester");
        let id = scenarios.create_scenario("Base").unwrap();
        for number in [1, 2] {
            scenarios.set_meshblock_assignment(id, number, PerType::new(None, None, Some(DistrictId::from(4)))).unwrap();
        }

        let task = SwitchScenarioTask::prepare(id, &scenarios, &meshblocks, &districts).unwrap();
        let result = run_job(task, &TaskControl::new()).into_result().unwrap();
        let mut queue = ElectorateChangeQueue::new();
        result.apply(&mut districts, &mut meshblocks, &mut queue).unwrap();

        let district = districts.get(fid).unwrap();
        assert_eq!(district.scenario_id, Some(id));
        assert_eq!(district.stats_pop, None);
        assert_eq!(district.invalid, None);
        assert!((district.geometry.as_ref().unwrap().unsigned_area() - 2.0).abs() < 1e-9);
        assert_eq!(meshblocks.assignment(2, DistrictType::Maori), Some(&DistrictId::from(4)));
    }

    #[test]
    fn canceled_switch_leaves_layers_untouched() {
        let meshblocks = MeshblockLayer::new(vec![Meshblock::new(1, square(0.0, 0.0))]).unwrap();
        let mut districts = DistrictLayer::new();
        let fid = districts.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "One")).unwrap();
        let mut scenarios = ScenarioRegistry::new("tester");
        let id = scenarios.create_scenario("Base").unwrap();

        let task = SwitchScenarioTask::prepare(id, &scenarios, &meshblocks, &districts).unwrap();
        let control = TaskControl::new();
        control.cancel();
        assert!(run_job(task, &control).is_canceled());
        assert_eq!(districts.get(fid).unwrap().scenario_id, None);
    }
}
