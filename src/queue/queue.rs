use anyhow::Result;
use tracing::{debug, warn};

use crate::layer::{AttributeChangeMap, AuditEntry, AuditLog, DistrictLayer, GeometryChangeMap};

/// One undoable change to the district layer.
#[derive(Debug, Clone)]
struct QueueEntry {
    attributes: AttributeChangeMap,
    prev_attributes: AttributeChangeMap,
    geometries: GeometryChangeMap,
    prev_geometries: GeometryChangeMap,
    log_entries: Vec<AuditEntry>,
    log_ids: Vec<u64>, // Audit rows currently holding `log_entries`
}

/// Undo/redo log of district layer changes.
///
/// Each entry corresponds to one edit command on the meshblock layer, so the
/// queue's `position` tracks the meshblock layer's undo index and can be
/// synced to it after the meshblock layer is undone or redone.
#[derive(Debug, Default)]
pub struct ElectorateChangeQueue {
    entries: Vec<QueueEntry>,
    position: usize, // Number of entries currently applied
    blocked: bool,
}

impl ElectorateChangeQueue {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn position(&self) -> usize { self.position }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[inline] pub fn is_blocked(&self) -> bool { self.blocked }

    /// While blocked, [`sync_to_external_index`](Self::sync_to_external_index) does nothing.
    pub fn set_blocked(&mut self, blocked: bool) { self.blocked = blocked }

    /// Forget all history without touching the layers.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
    }

    /// Apply a change to the district layer, append its audit rows and record it.
    /// Any redo tail is dropped.
    pub fn push(
        &mut self,
        districts: &mut DistrictLayer,
        audit: &mut AuditLog,
        attributes: AttributeChangeMap,
        geometries: GeometryChangeMap,
        log_entries: Vec<AuditEntry>,
    ) -> Result<()> {
        let prev_attributes = districts.snapshot_attributes(&attributes)?;
        let prev_geometries = districts.snapshot_geometries(&geometries)?;
        districts.apply_changes(&attributes, &geometries)?;
        let log_ids = audit.add_entries(&log_entries);

        self.entries.truncate(self.position);
        self.entries.push(QueueEntry {
            attributes,
            prev_attributes,
            geometries,
            prev_geometries,
            log_entries,
            log_ids,
        });
        self.position = self.entries.len();
        debug!(position = self.position, "electorate change pushed");
        Ok(())
    }

    /// Undo the most recent applied entry. Returns false if there is none.
    pub fn back(&mut self, districts: &mut DistrictLayer, audit: &mut AuditLog) -> Result<bool> {
        if self.position == 0 { return Ok(false) }
        let entry = &mut self.entries[self.position - 1];
        districts.apply_changes(&entry.prev_attributes, &entry.prev_geometries)?;
        audit.remove_entries(&entry.log_ids);
        entry.log_ids.clear();
        self.position -= 1;
        debug!(position = self.position, "electorate change undone");
        Ok(true)
    }

    /// Reapply the next undone entry. Returns false if there is none.
    pub fn forward(&mut self, districts: &mut DistrictLayer, audit: &mut AuditLog) -> Result<bool> {
        if self.position >= self.entries.len() { return Ok(false) }
        let entry = &mut self.entries[self.position];
        districts.apply_changes(&entry.attributes, &entry.geometries)?;
        entry.log_ids = audit.add_entries(&entry.log_entries);
        self.position += 1;
        debug!(position = self.position, "electorate change redone");
        Ok(true)
    }

    /// Step back or forward one entry at a time until `position == index`.
    pub fn sync_to_external_index(&mut self, index: usize, districts: &mut DistrictLayer, audit: &mut AuditLog) -> Result<()> {
        if self.blocked { return Ok(()) }
        self.blocked = true;
        let result = self.step_towards(index, districts, audit);
        self.blocked = false;
        result
    }

    /// Undo every entry.
    pub fn rollback(&mut self, districts: &mut DistrictLayer, audit: &mut AuditLog) -> Result<()> {
        self.sync_to_external_index(0, districts, audit)
    }

    fn step_towards(&mut self, index: usize, districts: &mut DistrictLayer, audit: &mut AuditLog) -> Result<()> {
        while self.position > index {
            if !self.back(districts, audit)? { break }
        }
        while self.position < index {
            if !self.forward(districts, audit)? {
                warn!(index, position = self.position, "external undo index is past the end of the electorate queue");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::{
        layer::{District, DistrictField},
        test_support::square,
        types::{AttrValue, DistrictId, DistrictType, FeatureId},
    };

    fn setup() -> (DistrictLayer, AuditLog, FeatureId) {
        let mut districts = DistrictLayer::new();
        let mut district = District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "Northland");
        district.geometry = Some(square(0.0, 0.0));
        district.estimated_pop = Some(100);
        let fid = districts.add_district(district).unwrap();
        (districts, AuditLog::new(), fid)
    }

    fn change(fid: FeatureId, pop: i64, x: f64) -> (AttributeChangeMap, GeometryChangeMap, Vec<AuditEntry>) {
        (
            AttributeChangeMap::from([(fid, BTreeMap::from([(DistrictField::EstimatedPop, AttrValue::Int(pop))]))]),
            GeometryChangeMap::from([(fid, Some(square(x, 0.0)))]),
            vec![AuditEntry {
                timestamp: Utc::now(),
                username: "tester".into(),
                meshblock_number: 7,
                district_type: DistrictType::GeneralNorth,
                from_district: Some(DistrictId::from(2)),
                to_district: DistrictId::from(1),
            }],
        )
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let (mut districts, mut audit, fid) = setup();
        let mut queue = ElectorateChangeQueue::new();
        let (attributes, geometries, log) = change(fid, 250, 3.0);
        queue.push(&mut districts, &mut audit, attributes, geometries, log).unwrap();

        let after = districts.get(fid).unwrap().clone();
        assert_eq!(after.estimated_pop, Some(250));
        assert_eq!(audit.len(), 1);

        assert!(queue.back(&mut districts, &mut audit).unwrap());
        let restored = districts.get(fid).unwrap();
        assert_eq!(restored.estimated_pop, Some(100));
        assert_eq!(restored.geometry, Some(square(0.0, 0.0)));
        assert!(audit.is_empty());

        assert!(queue.forward(&mut districts, &mut audit).unwrap());
        assert_eq!(districts.get(fid).unwrap(), &after);
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn ends_of_the_stack_report_false() {
        let (mut districts, mut audit, fid) = setup();
        let mut queue = ElectorateChangeQueue::new();
        assert!(!queue.back(&mut districts, &mut audit).unwrap());
        let (attributes, geometries, log) = change(fid, 1, 1.0);
        queue.push(&mut districts, &mut audit, attributes, geometries, log).unwrap();
        assert!(!queue.forward(&mut districts, &mut audit).unwrap());
    }

    #[test]
    fn sync_walks_to_external_index() {
        let (mut districts, mut audit, fid) = setup();
        let mut queue = ElectorateChangeQueue::new();
        for (pop, x) in [(1, 1.0), (2, 2.0), (3, 3.0)] {
            let (attributes, geometries, log) = change(fid, pop, x);
            queue.push(&mut districts, &mut audit, attributes, geometries, log).unwrap();
        }

        queue.sync_to_external_index(1, &mut districts, &mut audit).unwrap();
        assert_eq!(queue.position(), 1);
        assert_eq!(districts.get(fid).unwrap().estimated_pop, Some(1));
        assert_eq!(audit.len(), 1);

        queue.sync_to_external_index(3, &mut districts, &mut audit).unwrap();
        assert_eq!(districts.get(fid).unwrap().estimated_pop, Some(3));
        assert_eq!(audit.len(), 3);

        queue.rollback(&mut districts, &mut audit).unwrap();
        assert_eq!(districts.get(fid).unwrap().estimated_pop, Some(100));
        assert!(audit.is_empty());
    }

    #[test]
    fn blocked_queue_ignores_sync() {
        let (mut districts, mut audit, fid) = setup();
        let mut queue = ElectorateChangeQueue::new();
        let (attributes, geometries, log) = change(fid, 5, 1.0);
        queue.push(&mut districts, &mut audit, attributes, geometries, log).unwrap();

        queue.set_blocked(true);
        queue.sync_to_external_index(0, &mut districts, &mut audit).unwrap();
        assert_eq!(queue.position(), 1);
        queue.set_blocked(false);
        queue.sync_to_external_index(0, &mut districts, &mut audit).unwrap();
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn push_after_undo_drops_redo_tail() {
        let (mut districts, mut audit, fid) = setup();
        let mut queue = ElectorateChangeQueue::new();
        for pop in [1, 2] {
            let (attributes, geometries, log) = change(fid, pop, 1.0);
            queue.push(&mut districts, &mut audit, attributes, geometries, log).unwrap();
        }
        queue.back(&mut districts, &mut audit).unwrap();
        let (attributes, geometries, log) = change(fid, 9, 1.0);
        queue.push(&mut districts, &mut audit, attributes, geometries, log).unwrap();
        assert_eq!(queue.len(), 2);
        assert!(!queue.forward(&mut districts, &mut audit).unwrap());
    }

    #[test]
    fn failed_push_records_nothing() {
        let (mut districts, mut audit, fid) = setup();
        districts.set_read_only(true);
        let mut queue = ElectorateChangeQueue::new();
        let (attributes, geometries, log) = change(fid, 5, 1.0);
        assert!(queue.push(&mut districts, &mut audit, attributes, geometries, log).is_err());
        assert!(queue.is_empty());
        assert!(audit.is_empty());
    }
}
