use std::{path::Path, sync::Arc};

use anyhow::{ensure, Result};
use tracing::{debug, info};

use crate::{
    common::{ProjectConfig, SettingsStore},
    district::{DistrictRegistry, LinzElectoralDistrictRegistry},
    layer::{AuditLog, DistrictLayer, GeometryChangeMap, MeshblockLayer},
    queue::ElectorateChangeQueue,
    redistrict::{edit_group, LinzRedistrictHandler, RedistrictHandler},
    scenario::ScenarioRegistry,
    stats::{stats_attribute_changes, StatsResult},
    task::{run_job, ExportScenarioTask, ExportSummary, SwitchResult, SwitchScenarioTask, TaskControl, ValidateScenarioTask, ValidationReport},
    types::{DistrictId, DistrictType, FeatureId, MeshblockNumber, ScenarioId},
};

/// A redistricting session over one project.
///
/// Owns the meshblock and electorate layers, the audit log, the electorate
/// change queue and the scenario registry, and keeps them consistent:
/// meshblock undo/redo drives the change queue, and the live scenario's
/// assignment rows follow the meshblock layer.
#[derive(Debug)]
pub struct RedistrictSession {
    meshblocks: MeshblockLayer,
    districts: DistrictLayer,
    audit: AuditLog,
    queue: ElectorateChangeQueue,
    scenarios: ScenarioRegistry,
    config: ProjectConfig,
    settings: Arc<dyn SettingsStore>,
}

impl RedistrictSession {
    pub fn new(
        meshblocks: MeshblockLayer,
        districts: DistrictLayer,
        audit: AuditLog,
        scenarios: ScenarioRegistry,
        config: ProjectConfig,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self { meshblocks, districts, audit, queue: ElectorateChangeQueue::new(), scenarios, config, settings }
    }

    #[inline] pub fn meshblocks(&self) -> &MeshblockLayer { &self.meshblocks }

    #[inline] pub fn districts(&self) -> &DistrictLayer { &self.districts }

    #[inline] pub fn audit(&self) -> &AuditLog { &self.audit }

    #[inline] pub fn queue(&self) -> &ElectorateChangeQueue { &self.queue }

    #[inline] pub fn scenarios(&self) -> &ScenarioRegistry { &self.scenarios }

    #[inline] pub fn scenarios_mut(&mut self) -> &mut ScenarioRegistry { &mut self.scenarios }

    #[inline] pub fn config(&self) -> &ProjectConfig { &self.config }

    #[inline] pub fn settings(&self) -> &Arc<dyn SettingsStore> { &self.settings }

    /// The scenario currently shown by the electorate layer.
    pub fn live_scenario(&self) -> Option<ScenarioId> {
        self.districts.districts().find_map(|district| district.scenario_id)
    }

    /// Registry of the districts of one type, with that type's quota.
    pub fn district_registry(&self, ty: DistrictType) -> LinzElectoralDistrictRegistry {
        LinzElectoralDistrictRegistry::from_layer(&self.districts, ty, *self.config.quotas.get(ty), self.settings.clone())
    }

    pub fn start_editing(&mut self) { self.meshblocks.start_editing() }

    /// Handler for interactive redistricting of one district type.
    pub fn linz_handler(&mut self, ty: DistrictType) -> LinzRedistrictHandler<'_> {
        let user = self.scenarios.user().to_string();
        LinzRedistrictHandler::new(&mut self.meshblocks, &mut self.districts, &mut self.audit, &mut self.queue, ty, &user)
    }

    /// Move `meshblocks` into `district` as one undoable step.
    pub fn redistrict(&mut self, ty: DistrictType, label: &str, meshblocks: &[MeshblockNumber], district: &DistrictId) -> Result<()> {
        let registry = self.district_registry(ty);
        ensure!(
            registry.district_list().contains(district),
            "[session.redistrict] {} electorate {district} does not exist", ty.title()
        );
        {
            let mut handler = self.linz_handler(ty);
            let mut group = edit_group(&mut handler, label)?;
            group.assign_district(meshblocks, district)?;
            group.commit()?;
        }
        registry.push_recent_district(district)?;
        self.sync_live_scenario()
    }

    /// Undo one redistricting step on both layers.
    /// If the electorates cannot follow, the meshblock step is reverted.
    pub fn undo(&mut self) -> Result<bool> {
        if !self.meshblocks.undo() { return Ok(false) }
        if let Err(err) = self.sync_queue() {
            self.meshblocks.redo();
            return Err(err.context("[session.undo] electorates could not be undone"));
        }
        self.sync_live_scenario()?;
        Ok(true)
    }

    /// Redo one redistricting step on both layers.
    /// If the electorates cannot follow, the meshblock step is reverted.
    pub fn redo(&mut self) -> Result<bool> {
        if !self.meshblocks.redo() { return Ok(false) }
        if let Err(err) = self.sync_queue() {
            self.meshblocks.undo();
            return Err(err.context("[session.redo] electorates could not be redone"));
        }
        self.sync_live_scenario()?;
        Ok(true)
    }

    fn sync_queue(&mut self) -> Result<()> {
        let index = self.meshblocks.undo_index();
        self.queue.sync_to_external_index(index, &mut self.districts, &mut self.audit)?;
        debug!(index, "electorates synced to meshblock undo position");
        Ok(())
    }

    /// Keep every change and leave edit mode.
    pub fn commit_changes(&mut self) -> Result<()> {
        self.meshblocks.commit_changes()?;
        self.queue.clear();
        Ok(())
    }

    /// Revert every change since editing started on both layers.
    pub fn rollback_changes(&mut self) -> Result<()> {
        self.meshblocks.rollback_changes();
        self.queue.rollback(&mut self.districts, &mut self.audit)?;
        self.sync_live_scenario()
    }

    /// Copy the meshblock layer's assignments into the live scenario's rows.
    pub fn sync_live_scenario(&mut self) -> Result<()> {
        let Some(live) = self.live_scenario() else { return Ok(()) };
        if !self.scenarios.scenario_exists(live) { return Ok(()) }
        for meshblock in self.meshblocks.meshblocks() {
            self.scenarios.set_meshblock_assignment(live, meshblock.number, meshblock.districts.clone())?;
        }
        Ok(())
    }

    pub fn prepare_switch(&self, scenario_id: ScenarioId) -> Result<SwitchScenarioTask> {
        SwitchScenarioTask::prepare(scenario_id, &self.scenarios, &self.meshblocks, &self.districts)
    }

    pub fn apply_switch(&mut self, result: &SwitchResult) -> Result<()> {
        result.apply(&mut self.districts, &mut self.meshblocks, &mut self.queue)
    }

    /// Switch to a scenario on the current thread.
    pub fn switch_scenario(&mut self, scenario_id: ScenarioId) -> Result<()> {
        let task = self.prepare_switch(scenario_id)?;
        let result = run_job(task, &TaskControl::new()).into_result()?;
        self.apply_switch(&result)
    }

    pub fn prepare_validation(&self, scenario_id: ScenarioId) -> Result<ValidateScenarioTask> {
        ValidateScenarioTask::prepare(scenario_id, &self.scenarios, &self.meshblocks, &self.districts, self.config.quotas.clone())
    }

    /// Flag the electorates with a report. Only the live scenario's report can be applied.
    pub fn apply_validation(&mut self, report: &ValidationReport) -> Result<()> {
        ensure!(
            self.live_scenario() == Some(report.scenario_id),
            "[session.apply_validation] scenario {} is not live; switch to it before flagging electorates",
            report.scenario_id
        );
        report.apply(&mut self.districts)
    }

    /// Validate a scenario on the current thread. The electorates are flagged
    /// only when the scenario is live; otherwise only the report is returned.
    pub fn validate_scenario(&mut self, scenario_id: ScenarioId) -> Result<ValidationReport> {
        let task = self.prepare_validation(scenario_id)?;
        let report = run_job(task, &TaskControl::new()).into_result()?;
        if self.live_scenario() == Some(scenario_id) {
            self.apply_validation(&report)?;
        } else {
            debug!(scenario = scenario_id, "validated scenario is not live, electorates left unflagged");
        }
        Ok(report)
    }

    pub fn prepare_export(&self, scenario_id: ScenarioId, destination: &Path) -> Result<ExportScenarioTask> {
        ExportScenarioTask::prepare(scenario_id, &self.scenarios, &self.meshblocks, &self.districts, &self.audit, destination)
    }

    /// Export a scenario on the current thread.
    pub fn export_scenario(&self, scenario_id: ScenarioId, destination: &Path) -> Result<ExportSummary> {
        let task = self.prepare_export(scenario_id, destination)?;
        run_job(task, &TaskControl::new()).into_result()
    }

    /// Branch `source` into a new scenario named `name`.
    pub fn branch_scenario(&mut self, source: ScenarioId, name: &str) -> Result<ScenarioId> {
        self.scenarios.branch_scenario(source, name)
    }

    /// Write completed statistics onto their electorates.
    pub fn apply_stats(&mut self, results: &[(FeatureId, StatsResult)]) -> Result<()> {
        self.districts.apply_changes(&stats_attribute_changes(results), &GeometryChangeMap::new())?;
        info!(districts = results.len(), "statistics applied");
        Ok(())
    }
}
