use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DistrictId, DistrictType, MeshblockNumber};

/// One row of the redistricting audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub meshblock_number: MeshblockNumber,
    pub district_type: DistrictType,
    pub from_district: Option<DistrictId>,
    pub to_district: DistrictId,
}

/// Append-only (except for undo) log of meshblock reassignments.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    rows: BTreeMap<u64, AuditEntry>,
    next_id: u64,
}

impl AuditLog {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn get(&self, id: u64) -> Option<&AuditEntry> { self.rows.get(&id) }

    /// Rows in insertion order with their ids.
    #[inline]
    pub fn entries(&self) -> impl Iterator<Item = (u64, &AuditEntry)> {
        self.rows.iter().map(|(id, entry)| (*id, entry))
    }

    /// Append rows, returning the ids generated for them.
    pub fn add_entries(&mut self, entries: &[AuditEntry]) -> Vec<u64> {
        entries.iter().map(|entry| {
            self.next_id += 1;
            self.rows.insert(self.next_id, entry.clone());
            self.next_id
        }).collect()
    }

    /// Delete rows by id; returns how many were present.
    pub fn remove_entries(&mut self, ids: &[u64]) -> usize {
        ids.iter().filter(|id| self.rows.remove(id).is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(number: MeshblockNumber) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            username: "tester".into(),
            meshblock_number: number,
            district_type: DistrictType::GeneralNorth,
            from_district: None,
            to_district: DistrictId::from(1),
        }
    }

    #[test]
    fn ids_are_never_reused() {
        let mut log = AuditLog::new();
        let first = log.add_entries(&[entry(1), entry(2)]);
        assert_eq!(log.remove_entries(&first), 2);
        let second = log.add_entries(&[entry(3)]);
        assert!(second[0] > first[1]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.remove_entries(&first), 0);
    }
}
