use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use anyhow::{ensure, Result};
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    geom::{dissolve, part_count},
    layer::{DistrictLayer, MeshblockLayer},
    scenario::ScenarioRegistry,
    types::{DistrictId, DistrictType, FeatureId, MeshblockNumber, ScenarioId},
};
use super::job::TaskControl;

/// A member meshblock of one district, copied out of the live layer.
#[derive(Debug, Clone)]
struct Member {
    geometry: MultiPolygon<f64>,
    population: Option<i64>,
}

/// Everything needed to rebuild one district.
#[derive(Debug, Clone)]
struct DistrictInput {
    fid: FeatureId,
    district_id: DistrictId,
    ty: DistrictType,
    code: String,
    name: String,
    members: Vec<Member>,
}

/// Recomputed geometry and population of one district.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictSummary {
    pub fid: FeatureId,
    pub district_id: DistrictId,
    pub ty: DistrictType,
    pub code: String,
    pub name: String,
    pub geometry: Option<MultiPolygon<f64>>,
    pub population: i64,
    pub meshblock_count: usize,
}

impl DistrictSummary {
    /// Number of disjoint parts of the geometry (0 when empty).
    #[inline]
    pub fn part_count(&self) -> usize { self.geometry.as_ref().map_or(0, part_count) }
}

/// Shared two-phase recomputation of every district of a scenario.
///
/// [`prepare`](Self::prepare) copies the member geometries and populations out
/// of the live layers on the calling thread; [`compute`](Self::compute) can
/// then run anywhere.
#[derive(Debug, Clone)]
pub struct ScenarioBaseTask {
    scenario_id: ScenarioId,
    districts: Vec<DistrictInput>,
}

impl ScenarioBaseTask {
    pub fn prepare(
        scenario_id: ScenarioId,
        scenarios: &ScenarioRegistry,
        meshblocks: &MeshblockLayer,
        districts: &DistrictLayer,
    ) -> Result<Self> {
        ensure!(scenarios.scenario_exists(scenario_id), "[ScenarioBaseTask.prepare] scenario {scenario_id} does not exist");

        let mut members: AHashMap<(DistrictType, &DistrictId), Vec<MeshblockNumber>> = AHashMap::new();
        for (number, assignment) in scenarios.scenario_assignments(scenario_id) {
            for (ty, district) in assignment.iter() {
                if let Some(district) = district {
                    members.entry((ty, district)).or_default().push(number);
                }
            }
        }

        let inputs: Vec<DistrictInput> = districts.districts().map(|district| {
            let numbers = members.remove(&(district.ty, &district.district_id)).unwrap_or_default();
            DistrictInput {
                fid: district.fid,
                district_id: district.district_id.clone(),
                ty: district.ty,
                code: district.code.clone(),
                name: district.name.clone(),
                members: numbers.iter()
                    .filter_map(|&number| meshblocks.get(number))
                    .map(|meshblock| Member {
                        geometry: meshblock.geometry.clone(),
                        population: *meshblock.offline_pop.get(district.ty),
                    })
                    .collect(),
            }
        }).collect();

        for ((ty, district), numbers) in &members {
            warn!(scenario = scenario_id, ty = %ty, district = %district, meshblocks = numbers.len(),
                "meshblocks assigned to a district missing from the electorate layer");
        }
        debug!(scenario = scenario_id, districts = inputs.len(), "scenario task prepared");

        Ok(Self { scenario_id, districts: inputs })
    }

    #[inline] pub fn scenario_id(&self) -> ScenarioId { self.scenario_id }

    #[inline] pub fn len(&self) -> usize { self.districts.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.districts.is_empty() }

    /// Dissolve each district's members and sum their population.
    /// Cancellation is checked before each district.
    pub fn compute(&self, control: &TaskControl) -> Result<Vec<DistrictSummary>> {
        let total = self.districts.len().max(1);
        let done = AtomicUsize::new(0);

        self.districts.par_iter().map(|input| {
            control.check()?;
            let summary = DistrictSummary {
                fid: input.fid,
                district_id: input.district_id.clone(),
                ty: input.ty,
                code: input.code.clone(),
                name: input.name.clone(),
                geometry: dissolve(input.members.iter().map(|member| &member.geometry)),
                population: input.members.iter().filter_map(|member| member.population).sum(),
                meshblock_count: input.members.len(),
            };
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            control.set_progress(finished as f64 * 100.0 / total as f64);
            Ok(summary)
        }).collect()
    }
}
