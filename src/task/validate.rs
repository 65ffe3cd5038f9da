use std::collections::BTreeMap;

use anyhow::{Context, Result};
use geo::MultiPolygon;
use tracing::{info, warn};

use crate::{
    district::{exceeds_tolerance, format_variance, quota_variance, QUOTA_TOLERANCE_PERCENT},
    layer::{AttributeChangeMap, DistrictField, DistrictLayer, GeometryChangeMap, MeshblockLayer},
    scenario::ScenarioRegistry,
    types::{AttrValue, DistrictId, DistrictType, FeatureId, PerType, ScenarioId},
};
use super::{base::{DistrictSummary, ScenarioBaseTask}, job::{BackgroundJob, TaskControl}};

/// One rule violation found by validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub fid: FeatureId,
    pub district_id: DistrictId,
    pub district_type: DistrictType,
    pub name: String,
    pub geometry: Option<MultiPolygon<f64>>,
    pub error: String,
}

/// Outcome of a validation run: every violation plus the flags to write back.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub scenario_id: ScenarioId,
    pub results: Vec<ValidationResult>,
    pub attributes: AttributeChangeMap,
}

impl ValidationReport {
    #[inline] pub fn is_valid(&self) -> bool { self.results.is_empty() }

    /// Write the invalid flag and reason of every district in one change-map call.
    pub fn apply(&self, districts: &mut DistrictLayer) -> Result<()> {
        districts.apply_changes(&self.attributes, &GeometryChangeMap::new())
            .with_context(|| format!("[ValidationReport.apply] failed to flag electorates of scenario {}", self.scenario_id))
    }
}

/// Checks each district of a scenario against its quota and for contiguity.
#[derive(Debug, Clone)]
pub struct ValidateScenarioTask {
    base: ScenarioBaseTask,
    scenario_name: String,
    quotas: PerType<Option<i64>>,
}

impl ValidateScenarioTask {
    pub fn prepare(
        scenario_id: ScenarioId,
        scenarios: &ScenarioRegistry,
        meshblocks: &MeshblockLayer,
        districts: &DistrictLayer,
        quotas: PerType<Option<i64>>,
    ) -> Result<Self> {
        let base = ScenarioBaseTask::prepare(scenario_id, scenarios, meshblocks, districts)?;
        Ok(Self { base, scenario_name: scenarios.get_scenario_name(scenario_id), quotas })
    }

    /// Messages for every rule `summary` breaks.
    fn violations(&self, summary: &DistrictSummary) -> Vec<String> {
        let mut errors = Vec::new();
        match (*self.quotas.get(summary.ty)).and_then(|quota| quota_variance(summary.population, quota)) {
            Some(variance) if exceeds_tolerance(variance) => errors.push(format!(
                "Population {} is outside quota tolerance: variance {}% exceeds {QUOTA_TOLERANCE_PERCENT}%",
                summary.population, format_variance(variance)
            )),
            Some(_) => {}
            None => warn!(ty = %summary.ty, district = %summary.district_id, "no positive quota configured, skipping quota check"),
        }
        let parts = summary.part_count();
        if parts > 1 {
            errors.push(format!("Electorate is not contiguous ({parts} parts)"));
        }
        errors
    }
}

impl BackgroundJob for ValidateScenarioTask {
    type Output = ValidationReport;

    fn description(&self) -> String { format!("Validating scenario '{}'", self.scenario_name) }

    fn run(&mut self, control: &TaskControl) -> Result<ValidationReport> {
        let summaries = self.base.compute(control)?;
        let mut results = Vec::new();
        let mut attributes = AttributeChangeMap::new();

        for summary in summaries {
            let errors = self.violations(&summary);
            let reason = (!errors.is_empty()).then(|| errors.join("; "));
            attributes.insert(summary.fid, BTreeMap::from([
                (DistrictField::Invalid, AttrValue::Bool(reason.is_some())),
                (DistrictField::InvalidReason, reason.into()),
            ]));
            results.extend(errors.into_iter().map(|error| ValidationResult {
                fid: summary.fid,
                district_id: summary.district_id.clone(),
                district_type: summary.ty,
                name: summary.name.clone(),
                geometry: summary.geometry.clone(),
                error,
            }));
        }
        control.check()?;

        info!(scenario = self.base.scenario_id(), violations = results.len(), "validation finished");
        Ok(ValidationReport { scenario_id: self.base.scenario_id(), results, attributes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{layer::{District, Meshblock}, task::run_job, test_support::square};

    #[test]
    fn split_district_collects_both_reasons() {
        let meshblocks = MeshblockLayer::new(vec![
            {
                let mut meshblock = Meshblock::new(1, square(0.0, 0.0));
                meshblock.offline_pop.gn = Some(900);
                meshblock
            },
            Meshblock::new(2, square(4.0, 0.0)),
        ]).unwrap();
        let mut districts = DistrictLayer::new();
        let fid = districts.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "One")).unwrap();
        let mut scenarios = ScenarioRegistry::new("tester");
        let id = scenarios.create_scenario("Base").unwrap();
        for number in [1, 2] {
            scenarios.set_assignment(id, number, DistrictType::GeneralNorth, Some(DistrictId::from(1))).unwrap();
        }

        let task = ValidateScenarioTask::prepare(id, &scenarios, &meshblocks, &districts, PerType::new(Some(1000), None, None)).unwrap();
        let report = run_job(task, &TaskControl::new()).into_result().unwrap();
        assert_eq!(report.results.len(), 2);

        report.apply(&mut districts).unwrap();
        let district = districts.get(fid).unwrap();
        assert_eq!(district.invalid, Some(true));
        let reason = district.invalid_reason.as_deref().unwrap();
        assert!(reason.contains("quota") && reason.contains("contiguous"));
        assert!(reason.contains("; "));
    }

    #[test]
    fn zero_quota_skips_the_quota_check() {
        let mut meshblock = Meshblock::new(1, square(0.0, 0.0));
        meshblock.offline_pop.gn = Some(900);
        let meshblocks = MeshblockLayer::new(vec![meshblock]).unwrap();
        let mut districts = DistrictLayer::new();
        let fid = districts.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "One")).unwrap();
        let mut scenarios = ScenarioRegistry::new("tester");
        let id = scenarios.create_scenario("Base").unwrap();
        scenarios.set_assignment(id, 1, DistrictType::GeneralNorth, Some(DistrictId::from(1))).unwrap();

        let task = ValidateScenarioTask::prepare(id, &scenarios, &meshblocks, &districts, PerType::new(Some(0), None, None)).unwrap();
        let report = run_job(task, &TaskControl::new()).into_result().unwrap();
        assert!(report.is_valid());
        assert_eq!(report.attributes[&fid][&DistrictField::Invalid], AttrValue::Bool(false));
    }
}
