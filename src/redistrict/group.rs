use std::ops::{Deref, DerefMut};

use anyhow::Result;

use super::handler::RedistrictHandler;

/// Scoped edit group. Dropping it without [`EditGroup::commit`] discards
/// every reassignment made through it.
pub struct EditGroup<'h, H: RedistrictHandler + ?Sized> {
    handler: &'h mut H,
    open: bool,
}

impl<'h, H: RedistrictHandler + ?Sized> EditGroup<'h, H> {
    pub fn begin(handler: &'h mut H, label: &str) -> Result<Self> {
        handler.begin_edit_group(label)?;
        Ok(Self { handler, open: true })
    }

    pub fn commit(mut self) -> Result<()> {
        self.open = false;
        self.handler.end_edit_group()
    }

    pub fn discard(mut self) {
        self.open = false;
        self.handler.discard_edit_group();
    }
}

impl<H: RedistrictHandler + ?Sized> Deref for EditGroup<'_, H> {
    type Target = H;
    fn deref(&self) -> &H { self.handler }
}

impl<H: RedistrictHandler + ?Sized> DerefMut for EditGroup<'_, H> {
    fn deref_mut(&mut self) -> &mut H { self.handler }
}

impl<H: RedistrictHandler + ?Sized> Drop for EditGroup<'_, H> {
    fn drop(&mut self) {
        if self.open {
            self.handler.discard_edit_group();
        }
    }
}

/// Open an edit group on `handler`, see [`EditGroup`].
pub fn edit_group<'h, H: RedistrictHandler + ?Sized>(handler: &'h mut H, label: &str) -> Result<EditGroup<'h, H>> {
    EditGroup::begin(handler, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layer::{Meshblock, MeshblockLayer},
        redistrict::BasicRedistrictHandler,
        test_support::square,
        types::{DistrictId, DistrictType},
    };

    fn layer() -> MeshblockLayer {
        let mut meshblock = Meshblock::new(1, square(0.0, 0.0));
        meshblock.districts.m = Some(DistrictId::from(1));
        let mut layer = MeshblockLayer::new(vec![meshblock]).unwrap();
        layer.start_editing();
        layer
    }

    #[test]
    fn early_exit_discards() {
        let mut layer = layer();
        let mut handler = BasicRedistrictHandler::new(&mut layer, DistrictType::Maori);
        let result: Result<()> = (|| {
            let mut group = edit_group(&mut handler, "move")?;
            group.assign_district(&[1], &DistrictId::from(2))?;
            group.assign_district(&[7], &DistrictId::from(2))?;
            group.commit()
        })();
        assert!(result.is_err());
        assert_eq!(layer.assignment(1, DistrictType::Maori), Some(&DistrictId::from(1)));
        assert!(!layer.has_open_command());
    }

    #[test]
    fn commit_keeps_changes() {
        let mut layer = layer();
        let mut handler = BasicRedistrictHandler::new(&mut layer, DistrictType::Maori);
        let mut group = edit_group(&mut handler, "move").unwrap();
        group.assign_district(&[1], &DistrictId::from(2)).unwrap();
        group.commit().unwrap();
        assert_eq!(layer.assignment(1, DistrictType::Maori), Some(&DistrictId::from(2)));
        assert_eq!(layer.undo_index(), 1);
    }
}
