use std::collections::{BTreeMap, BTreeSet, HashSet};

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    geom::patch,
    layer::{AttributeChangeMap, AuditEntry, AuditLog, DistrictField, DistrictLayer, GeometryChangeMap, Meshblock, MeshblockLayer},
    queue::ElectorateChangeQueue,
    types::{AttrValue, DistrictId, DistrictType, MeshblockNumber},
};
use super::{filter::DistrictFilter, handler::{BasicRedistrictHandler, RedistrictHandler}};

/// Meshblocks added to and removed from one district within an open edit group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub added: BTreeSet<MeshblockNumber>,
    pub removed: BTreeSet<MeshblockNumber>,
}

impl PendingChanges {
    #[inline] pub fn is_empty(&self) -> bool { self.added.is_empty() && self.removed.is_empty() }
}

/// Notification sent to listeners once an edit group has been committed.
#[derive(Debug, Clone, PartialEq)]
pub struct RedistrictEvent {
    pub district_type: DistrictType,
    pub label: String,
    pub affected_districts: Vec<DistrictId>,
    pub changes: Vec<AuditEntry>,
}

/// Redistrict handler that keeps the electorate layer in step with meshblock edits.
///
/// While an edit group is open it tracks, per district, which meshblocks were
/// added and removed. On commit only those districts are recomputed, the
/// result is pushed onto the [`ElectorateChangeQueue`] together with audit log
/// rows, and listeners are notified.
pub struct LinzRedistrictHandler<'a> {
    base: BasicRedistrictHandler<'a>,
    districts: &'a mut DistrictLayer,
    audit: &'a mut AuditLog,
    queue: &'a mut ElectorateChangeQueue,
    user: String,
    group_label: Option<String>,
    pending_affected_districts: BTreeMap<DistrictId, PendingChanges>,
    pending_log: Vec<AuditEntry>,
    listeners: Vec<Box<dyn FnMut(&RedistrictEvent) + 'a>>,
}

impl<'a> LinzRedistrictHandler<'a> {
    pub fn new(
        meshblocks: &'a mut MeshblockLayer,
        districts: &'a mut DistrictLayer,
        audit: &'a mut AuditLog,
        queue: &'a mut ElectorateChangeQueue,
        ty: DistrictType,
        user: &str,
    ) -> Self {
        Self {
            base: BasicRedistrictHandler::new(meshblocks, ty),
            districts,
            audit,
            queue,
            user: user.to_string(),
            group_label: None,
            pending_affected_districts: BTreeMap::new(),
            pending_log: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Register a callback fired after each committed edit group.
    pub fn on_redistrict(&mut self, listener: impl FnMut(&RedistrictEvent) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    #[inline] pub fn is_group_open(&self) -> bool { self.group_label.is_some() }

    #[inline]
    pub fn pending_affected_districts(&self) -> &BTreeMap<DistrictId, PendingChanges> { &self.pending_affected_districts }

    /// Districts with a net change in the open edit group.
    pub fn get_affected_districts(&self) -> Vec<DistrictId> {
        self.pending_affected_districts.iter()
            .filter(|(_, changes)| !changes.is_empty())
            .map(|(district, _)| district.clone())
            .collect()
    }

    /// Filter selecting exactly the affected districts.
    pub fn create_affected_district_filter(&self) -> DistrictFilter {
        DistrictFilter::new(self.base.district_type(), self.get_affected_districts())
    }

    /// Meshblocks added to `district` in the open edit group.
    pub fn get_added_meshblocks(&self, district: &DistrictId) -> Vec<&Meshblock> {
        self.tracked_meshblocks(district, |changes| &changes.added)
    }

    /// Meshblocks removed from `district` in the open edit group.
    pub fn get_removed_meshblocks(&self, district: &DistrictId) -> Vec<&Meshblock> {
        self.tracked_meshblocks(district, |changes| &changes.removed)
    }

    fn tracked_meshblocks(&self, district: &DistrictId, select: impl Fn(&PendingChanges) -> &BTreeSet<MeshblockNumber>) -> Vec<&Meshblock> {
        let layer = self.base.layer();
        self.pending_affected_districts.get(district)
            .map(|changes| select(changes).iter().filter_map(|&number| layer.get(number)).collect())
            .unwrap_or_default()
    }

    /// Record a move of `number` from `old` to `new`, cancelling out earlier opposite moves.
    fn track(&mut self, number: MeshblockNumber, old: Option<&DistrictId>, new: &DistrictId) {
        let target = self.pending_affected_districts.entry(new.clone()).or_default();
        if !target.removed.remove(&number) {
            target.added.insert(number);
        }
        if let Some(old) = old {
            let source = self.pending_affected_districts.entry(old.clone()).or_default();
            if !source.added.remove(&number) {
                source.removed.insert(number);
            }
        }
    }

    fn clear_pending(&mut self) {
        self.group_label = None;
        self.pending_affected_districts.clear();
        self.pending_log.clear();
    }

    /// Recompute geometry and population of the affected districts from their
    /// current state plus the tracked additions and removals.
    fn district_changes(&self) -> (AttributeChangeMap, GeometryChangeMap) {
        let ty = self.base.district_type();
        let mut attributes = AttributeChangeMap::new();
        let mut geometries = GeometryChangeMap::new();

        let filter = self.create_affected_district_filter();
        for district in filter.select(&*self.districts) {
            let added = self.get_added_meshblocks(&district.district_id);
            let removed = self.get_removed_meshblocks(&district.district_id);

            let geometry = patch(
                district.geometry.as_ref(),
                added.iter().map(|meshblock| &meshblock.geometry),
                removed.iter().map(|meshblock| &meshblock.geometry),
            );
            let population = |meshblocks: &[&Meshblock]| -> i64 {
                meshblocks.iter().filter_map(|meshblock| *meshblock.offline_pop.get(ty)).sum()
            };
            let estimated_pop = district.estimated_pop.unwrap_or(0) + population(&added) - population(&removed);

            attributes.insert(district.fid, BTreeMap::from([
                (DistrictField::EstimatedPop, AttrValue::Int(estimated_pop)),
                (DistrictField::StatsPop, AttrValue::Null),
                (DistrictField::StatsVarYear1, AttrValue::Null),
                (DistrictField::StatsVarYear2, AttrValue::Null),
                (DistrictField::Invalid, AttrValue::Null),
                (DistrictField::InvalidReason, AttrValue::Null),
            ]));
            geometries.insert(district.fid, geometry);
        }
        for missing in filter.ids.iter().filter(|&id| self.districts.find(ty, id).is_none()) {
            warn!(district = %missing, ty = %ty, "meshblocks moved into a district with no feature");
        }
        (attributes, geometries)
    }
}

impl RedistrictHandler for LinzRedistrictHandler<'_> {
    fn district_type(&self) -> DistrictType { self.base.district_type() }

    fn begin_edit_group(&mut self, label: &str) -> Result<()> {
        self.base.begin_edit_group(label)?;
        self.pending_affected_districts.clear();
        self.pending_log.clear();
        self.group_label = Some(label.to_string());
        Ok(())
    }

    fn end_edit_group(&mut self) -> Result<()> {
        let Some(label) = self.group_label.clone() else { bail!("No edit group is open") };

        if self.base.pending_change_count() == 0 {
            self.base.end_edit_group()?;
            self.clear_pending();
            return Ok(());
        }

        let (attributes, geometries) = self.district_changes();
        let log = std::mem::take(&mut self.pending_log);
        if let Err(err) = self.queue.push(self.districts, self.audit, attributes, geometries, log.clone()) {
            self.discard_edit_group();
            return Err(err.context(format!("Failed to update electorates for '{label}'")));
        }
        self.base.end_edit_group()?;

        let event = RedistrictEvent {
            district_type: self.base.district_type(),
            label,
            affected_districts: self.get_affected_districts(),
            changes: log,
        };
        self.clear_pending();
        info!(
            label = %event.label,
            ty = %event.district_type,
            districts = event.affected_districts.len(),
            meshblocks = event.changes.len(),
            "redistrict committed"
        );
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
        Ok(())
    }

    fn discard_edit_group(&mut self) {
        self.base.discard_edit_group();
        self.clear_pending();
    }

    /// Outside an edit group the call is wrapped in its own group.
    fn assign_district(&mut self, meshblocks: &[MeshblockNumber], district: &DistrictId) -> Result<()> {
        if !self.is_group_open() {
            self.begin_edit_group("Redistrict")?;
            return match self.assign_district(meshblocks, district) {
                Ok(()) => self.end_edit_group(),
                Err(err) => { self.discard_edit_group(); Err(err) }
            };
        }

        let ty = self.base.district_type();
        let mut seen = HashSet::new();
        let moves: Vec<(MeshblockNumber, Option<DistrictId>)> = meshblocks.iter()
            .filter(|&&number| seen.insert(number))
            .filter_map(|&number| {
                let old = self.base.layer().assignment(number, ty).cloned();
                (old.as_ref() != Some(district)).then_some((number, old))
            })
            .collect();

        let numbers: Vec<MeshblockNumber> = moves.iter().map(|(number, _)| *number).collect();
        self.base.assign_district(&numbers, district)?;

        let timestamp = Utc::now();
        for (number, old) in moves {
            self.track(number, old.as_ref(), district);
            self.pending_log.push(AuditEntry {
                timestamp,
                username: self.user.clone(),
                meshblock_number: number,
                district_type: ty,
                from_district: old,
                to_district: district.clone(),
            });
        }
        Ok(())
    }
}
