use serde::{Deserialize, Serialize};

use super::DistrictType;

/// One value per district type, e.g. a meshblock's assignment or population per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerType<T> {
    pub gn: T,
    pub gs: T,
    pub m: T,
}

impl<T> PerType<T> {
    pub fn new(gn: T, gs: T, m: T) -> Self { Self { gn, gs, m } }

    pub fn get(&self, ty: DistrictType) -> &T {
        match ty {
            DistrictType::GeneralNorth => &self.gn,
            DistrictType::GeneralSouth => &self.gs,
            DistrictType::Maori => &self.m,
        }
    }

    pub fn get_mut(&mut self, ty: DistrictType) -> &mut T {
        match ty {
            DistrictType::GeneralNorth => &mut self.gn,
            DistrictType::GeneralSouth => &mut self.gs,
            DistrictType::Maori => &mut self.m,
        }
    }

    pub fn set(&mut self, ty: DistrictType, value: T) { *self.get_mut(ty) = value }

    /// Iterate `(type, value)` pairs in [`DistrictType::order`].
    pub fn iter(&self) -> impl Iterator<Item = (DistrictType, &T)> {
        DistrictType::order().into_iter().map(move |ty| (ty, self.get(ty)))
    }
}
