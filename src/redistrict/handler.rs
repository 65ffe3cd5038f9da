use anyhow::{bail, ensure, Result};

use crate::{layer::MeshblockLayer, types::{DistrictId, DistrictType, MeshblockNumber}};

/// Applies meshblock-to-district reassignments to a backing store.
pub trait RedistrictHandler {
    /// District type whose assignments this handler changes.
    fn district_type(&self) -> DistrictType;

    /// Open a transactional scope labelled for undo.
    fn begin_edit_group(&mut self, label: &str) -> Result<()>;

    /// Commit every reassignment made since the matching begin.
    fn end_edit_group(&mut self) -> Result<()>;

    /// Roll back every reassignment made since the matching begin.
    fn discard_edit_group(&mut self);

    /// Assign `meshblocks` to `district`. Either every meshblock is reassigned or none is.
    fn assign_district(&mut self, meshblocks: &[MeshblockNumber], district: &DistrictId) -> Result<()>;
}

/// Unconditional handler writing straight to the meshblock layer's edit buffer.
#[derive(Debug)]
pub struct BasicRedistrictHandler<'a> {
    layer: &'a mut MeshblockLayer,
    ty: DistrictType,
}

impl<'a> BasicRedistrictHandler<'a> {
    pub fn new(layer: &'a mut MeshblockLayer, ty: DistrictType) -> Self {
        Self { layer, ty }
    }

    #[inline] pub fn layer(&self) -> &MeshblockLayer { &*self.layer }

    /// Number of assignment changes held by the open group.
    #[inline] pub(crate) fn pending_change_count(&self) -> usize { self.layer.open_command_len() }
}

impl RedistrictHandler for BasicRedistrictHandler<'_> {
    fn district_type(&self) -> DistrictType { self.ty }

    fn begin_edit_group(&mut self, label: &str) -> Result<()> {
        self.layer.begin_edit_command(label)
    }

    fn end_edit_group(&mut self) -> Result<()> {
        self.layer.end_edit_command()?;
        Ok(())
    }

    fn discard_edit_group(&mut self) {
        self.layer.destroy_edit_command();
    }

    fn assign_district(&mut self, meshblocks: &[MeshblockNumber], district: &DistrictId) -> Result<()> {
        ensure!(self.layer.is_editable(), "Cannot redistrict: the meshblock layer is not editable");
        if let Some(missing) = meshblocks.iter().find(|&&number| !self.layer.contains(number)) {
            bail!("Cannot redistrict: meshblock {missing} does not exist");
        }
        for &number in meshblocks {
            self.layer.change_assignment(number, self.ty, Some(district.clone()))?;
        }
        Ok(())
    }
}
