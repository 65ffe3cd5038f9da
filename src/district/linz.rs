use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::{common::SettingsStore, layer::DistrictLayer, types::{DistrictId, DistrictType}};
use super::registry::{DistrictRegistry, VectorLayerDistrictRegistry};

/// Electorate registry for one district type, carrying that type's quota.
#[derive(Debug, Clone)]
pub struct LinzElectoralDistrictRegistry {
    inner: VectorLayerDistrictRegistry,
    ty: DistrictType,
    quota: Option<i64>,
    codes: Vec<(DistrictId, String)>,
}

impl LinzElectoralDistrictRegistry {
    pub fn from_layer(layer: &DistrictLayer, ty: DistrictType, quota: Option<i64>, settings: Arc<dyn SettingsStore>) -> Self {
        let name = format!("linz_{}", ty.column_prefix());
        let mut registry = Self {
            inner: VectorLayerDistrictRegistry::from_layer(&name, layer, ty, settings),
            ty,
            quota,
            codes: Vec::new(),
        };
        registry.refresh(layer);
        registry
    }

    /// Re-read districts and codes from `layer`.
    pub fn refresh(&mut self, layer: &DistrictLayer) {
        self.inner.refresh(layer, self.ty);
        self.codes = layer.districts_of_type(self.ty)
            .map(|district| (district.district_id.clone(), district.code.clone()))
            .collect();
    }

    #[inline] pub fn district_type(&self) -> DistrictType { self.ty }

    /// Human title of this registry's district type.
    #[inline] pub fn district_type_title(&self) -> &'static str { self.ty.title() }

    /// Type of a district, `None` if the id is not in this registry.
    pub fn get_district_type(&self, id: &DistrictId) -> Option<DistrictType> {
        self.inner.contains(id).then_some(self.ty)
    }

    pub fn get_district_code(&self, id: &DistrictId) -> Option<&str> {
        self.codes.iter().find(|(district, _)| district == id).map(|(_, code)| code.as_str())
    }

    /// Target population for a district type.
    pub fn get_quota_for_district_type(&self, ty: DistrictType) -> Result<i64> {
        if ty != self.ty {
            return Err(anyhow!("[LinzElectoralDistrictRegistry] registry holds {} districts, not {ty}", self.ty));
        }
        match self.quota {
            Some(quota) if quota > 0 => Ok(quota),
            Some(quota) => Err(anyhow!("[LinzElectoralDistrictRegistry] quota for {ty} must be positive, got {quota}")),
            None => Err(anyhow!("[LinzElectoralDistrictRegistry] no quota configured for {ty}")),
        }
    }
}

impl DistrictRegistry for LinzElectoralDistrictRegistry {
    fn name(&self) -> &str { self.inner.name() }

    fn settings(&self) -> &dyn SettingsStore { self.inner.settings() }

    fn district_list(&self) -> Vec<DistrictId> { self.inner.district_list() }

    fn district_title(&self, id: &DistrictId) -> Option<String> { self.inner.district_title(id) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::MemorySettings, layer::District};

    fn layer() -> DistrictLayer {
        let mut layer = DistrictLayer::new();
        layer.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "Northland")).unwrap();
        layer.add_district(District::new(DistrictId::from(1), DistrictType::Maori, "M01", "Te Tai Tokerau")).unwrap();
        layer.add_district(District::new(DistrictId::from(2), DistrictType::GeneralNorth, "N02", "Whangārei")).unwrap();
        layer
    }

    #[test]
    fn registry_is_scoped_to_one_type() {
        let registry = LinzElectoralDistrictRegistry::from_layer(&layer(), DistrictType::GeneralNorth, Some(60000), Arc::new(MemorySettings::new()));
        assert_eq!(registry.district_list(), vec![DistrictId::from(1), DistrictId::from(2)]);
        assert_eq!(registry.get_district_title(&DistrictId::from(1)), "Northland");
        assert_eq!(registry.get_district_code(&DistrictId::from(2)), Some("N02"));
        assert_eq!(registry.get_district_type(&DistrictId::from(9)), None);
    }

    #[test]
    fn quota_lookup() {
        let registry = LinzElectoralDistrictRegistry::from_layer(&layer(), DistrictType::Maori, Some(62000), Arc::new(MemorySettings::new()));
        assert_eq!(registry.get_quota_for_district_type(DistrictType::Maori).unwrap(), 62000);
        assert!(registry.get_quota_for_district_type(DistrictType::GeneralNorth).is_err());

        let missing = LinzElectoralDistrictRegistry::from_layer(&layer(), DistrictType::Maori, None, Arc::new(MemorySettings::new()));
        assert!(missing.get_quota_for_district_type(DistrictType::Maori).is_err());
    }

    #[test]
    fn recent_lists_are_kept_per_type() {
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
        let north = LinzElectoralDistrictRegistry::from_layer(&layer(), DistrictType::GeneralNorth, None, settings.clone());
        let maori = LinzElectoralDistrictRegistry::from_layer(&layer(), DistrictType::Maori, None, settings);
        north.push_recent_district(&DistrictId::from(2)).unwrap();
        assert_eq!(north.recent_districts_list(), vec![DistrictId::from(2)]);
        assert!(maori.recent_districts_list().is_empty());
    }
}
