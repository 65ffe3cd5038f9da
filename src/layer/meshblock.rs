use std::collections::HashMap;

use ahash::AHashMap;
use anyhow::{bail, ensure, Context, Result};
use geo::MultiPolygon;

use crate::types::{DistrictId, DistrictType, MeshblockNumber, PerType};
use super::edit::{EditBuffer, EditCommand};

/// Smallest geographic unit carrying a district assignment and population estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Meshblock {
    pub number: MeshblockNumber,
    pub geometry: MultiPolygon<f64>,
    pub districts: PerType<Option<DistrictId>>,  // Current assignment per type
    pub offline_pop: PerType<Option<i64>>,       // Offline population estimate per type
}

impl Meshblock {
    pub fn new(number: MeshblockNumber, geometry: MultiPolygon<f64>) -> Self {
        Self {
            number,
            geometry,
            districts: PerType::default(),
            offline_pop: PerType::default(),
        }
    }
}

/// A single assignment change, kept for undo/redo.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentChange {
    pub number: MeshblockNumber,
    pub ty: DistrictType,
    pub old: Option<DistrictId>,
    pub new: Option<DistrictId>,
}

/// The live meshblock layer and its edit session.
///
/// The assignment attributes here cache the live scenario's assignments.
#[derive(Debug, Default)]
pub struct MeshblockLayer {
    meshblocks: Vec<Meshblock>,
    index: AHashMap<MeshblockNumber, usize>, // Map between meshblock numbers and positions.
    edits: EditBuffer<AssignmentChange>,
}

impl MeshblockLayer {
    /// Build a layer from meshblocks with unique numbers.
    pub fn new(meshblocks: Vec<Meshblock>) -> Result<Self> {
        let mut index = AHashMap::with_capacity(meshblocks.len());
        for (i, meshblock) in meshblocks.iter().enumerate() {
            ensure!(
                index.insert(meshblock.number, i).is_none(),
                "[MeshblockLayer.new] duplicate meshblock number {}", meshblock.number
            );
        }
        Ok(Self { meshblocks, index, edits: EditBuffer::default() })
    }

    #[inline] pub fn len(&self) -> usize { self.meshblocks.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.meshblocks.is_empty() }

    #[inline] pub fn meshblocks(&self) -> &[Meshblock] { &self.meshblocks }

    #[inline]
    pub fn get(&self, number: MeshblockNumber) -> Option<&Meshblock> {
        self.index.get(&number).map(|&i| &self.meshblocks[i])
    }

    #[inline]
    pub fn contains(&self, number: MeshblockNumber) -> bool { self.index.contains_key(&number) }

    /// Current assignment of a meshblock for one district type.
    pub fn assignment(&self, number: MeshblockNumber, ty: DistrictType) -> Option<&DistrictId> {
        self.get(number).and_then(|meshblock| meshblock.districts.get(ty).as_ref())
    }

    /// Meshblocks currently assigned to `district` within `ty`.
    pub fn members<'a>(&'a self, ty: DistrictType, district: &'a DistrictId) -> impl Iterator<Item = &'a Meshblock> + 'a {
        self.meshblocks.iter()
            .filter(move |meshblock| meshblock.districts.get(ty).as_ref() == Some(district))
    }

    /// Whether assignments can currently be changed.
    #[inline] pub fn is_editable(&self) -> bool { self.edits.is_editing() }

    /// Position in the undo stack (number of applied edit commands).
    #[inline] pub fn undo_index(&self) -> usize { self.edits.index() }

    #[inline] pub fn undo_count(&self) -> usize { self.edits.len() }

    #[inline] pub fn has_open_command(&self) -> bool { self.edits.has_open_command() }

    /// Number of changes held by the open edit command.
    #[inline] pub fn open_command_len(&self) -> usize { self.edits.open_len() }

    pub fn start_editing(&mut self) { self.edits.start() }

    /// Keep all changes and leave edit mode.
    pub fn commit_changes(&mut self) -> Result<()> {
        ensure!(!self.edits.has_open_command(), "[MeshblockLayer.commit_changes] an edit command is still open");
        self.edits.stop();
        Ok(())
    }

    /// Revert every change made since editing started and leave edit mode.
    pub fn rollback_changes(&mut self) {
        self.destroy_edit_command();
        while self.undo() {}
        self.edits.stop();
    }

    pub fn begin_edit_command(&mut self, label: &str) -> Result<()> {
        self.edits.begin(label).context("[MeshblockLayer.begin_edit_command]")
    }

    /// Close the open command; returns whether it held any change.
    pub fn end_edit_command(&mut self) -> Result<bool> {
        self.edits.end().context("[MeshblockLayer.end_edit_command]")
    }

    /// Revert and drop the open command, if any.
    pub fn destroy_edit_command(&mut self) {
        if let Some(command) = self.edits.take_open() {
            for change in command.changes.iter().rev() {
                self.write_assignment(change.number, change.ty, change.old.clone());
            }
        }
    }

    /// Change one assignment. Outside an open command the change becomes its own undo step.
    pub fn change_assignment(&mut self, number: MeshblockNumber, ty: DistrictType, value: Option<DistrictId>) -> Result<()> {
        ensure!(self.edits.is_editing(), "Meshblock layer is not editable");
        let Some(&i) = self.index.get(&number) else {
            bail!("Meshblock {number} does not exist");
        };

        let old = std::mem::replace(self.meshblocks[i].districts.get_mut(ty), value.clone());
        let change = AssignmentChange { number, ty, old, new: value };
        if let Some(change) = self.edits.record(change) {
            self.edits.push(EditCommand { label: format!("Change {ty} of {number}"), changes: vec![change] });
        }
        Ok(())
    }

    /// Undo one command. Returns false at the start of the stack.
    pub fn undo(&mut self) -> bool {
        let Some(command) = self.edits.step_back() else { return false };
        for change in command.changes.iter().rev() {
            if let Some(&i) = self.index.get(&change.number) {
                self.meshblocks[i].districts.set(change.ty, change.old.clone());
            }
        }
        true
    }

    /// Redo one command. Returns false at the end of the stack.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.edits.step_forward() else { return false };
        for change in command.changes.iter() {
            if let Some(&i) = self.index.get(&change.number) {
                self.meshblocks[i].districts.set(change.ty, change.new.clone());
            }
        }
        true
    }

    /// Replace cached assignments wholesale. Not undoable; clears the undo history.
    pub fn refresh_assignments(&mut self, assignments: &HashMap<MeshblockNumber, PerType<Option<DistrictId>>>) -> Result<()> {
        ensure!(
            !self.edits.has_open_command(),
            "[MeshblockLayer.refresh_assignments] cannot refresh while an edit command is open"
        );
        for meshblock in self.meshblocks.iter_mut() {
            meshblock.districts = assignments.get(&meshblock.number).cloned().unwrap_or_default();
        }
        self.edits.clear();
        Ok(())
    }

    fn write_assignment(&mut self, number: MeshblockNumber, ty: DistrictType, value: Option<DistrictId>) {
        if let Some(&i) = self.index.get(&number) {
            self.meshblocks[i].districts.set(ty, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;

    fn layer() -> MeshblockLayer {
        let mut a = Meshblock::new(1, square(0.0, 0.0));
        a.districts.gn = Some(DistrictId::from(1));
        let mut b = Meshblock::new(2, square(1.0, 0.0));
        b.districts.gn = Some(DistrictId::from(1));
        MeshblockLayer::new(vec![a, b]).unwrap()
    }

    #[test]
    fn duplicate_numbers_are_rejected() {
        let a = Meshblock::new(1, square(0.0, 0.0));
        assert!(MeshblockLayer::new(vec![a.clone(), a]).is_err());
    }

    #[test]
    fn changes_require_edit_mode() {
        let mut layer = layer();
        assert!(layer.change_assignment(1, DistrictType::GeneralNorth, Some(DistrictId::from(2))).is_err());
        layer.start_editing();
        assert!(layer.change_assignment(1, DistrictType::GeneralNorth, Some(DistrictId::from(2))).is_ok());
        assert!(layer.change_assignment(99, DistrictType::GeneralNorth, None).is_err());
    }

    #[test]
    fn command_undoes_as_one_step() {
        let mut layer = layer();
        layer.start_editing();
        layer.begin_edit_command("move").unwrap();
        layer.change_assignment(1, DistrictType::GeneralNorth, Some(DistrictId::from(2))).unwrap();
        layer.change_assignment(2, DistrictType::GeneralNorth, Some(DistrictId::from(2))).unwrap();
        assert!(layer.end_edit_command().unwrap());
        assert_eq!(layer.undo_index(), 1);

        assert!(layer.undo());
        assert_eq!(layer.assignment(1, DistrictType::GeneralNorth), Some(&DistrictId::from(1)));
        assert_eq!(layer.assignment(2, DistrictType::GeneralNorth), Some(&DistrictId::from(1)));
        assert!(!layer.undo());

        assert!(layer.redo());
        assert_eq!(layer.assignment(2, DistrictType::GeneralNorth), Some(&DistrictId::from(2)));
    }

    #[test]
    fn destroy_reverts_open_command() {
        let mut layer = layer();
        layer.start_editing();
        layer.begin_edit_command("move").unwrap();
        layer.change_assignment(1, DistrictType::GeneralNorth, None).unwrap();
        layer.destroy_edit_command();
        assert_eq!(layer.assignment(1, DistrictType::GeneralNorth), Some(&DistrictId::from(1)));
        assert_eq!(layer.undo_index(), 0);
    }

    #[test]
    fn rollback_reverts_everything() {
        let mut layer = layer();
        layer.start_editing();
        layer.change_assignment(1, DistrictType::GeneralNorth, Some(DistrictId::from(5))).unwrap();
        layer.change_assignment(2, DistrictType::GeneralNorth, Some(DistrictId::from(5))).unwrap();
        layer.rollback_changes();
        assert!(!layer.is_editable());
        assert_eq!(layer.assignment(1, DistrictType::GeneralNorth), Some(&DistrictId::from(1)));
        assert_eq!(layer.assignment(2, DistrictType::GeneralNorth), Some(&DistrictId::from(1)));
    }
}
