use std::collections::BTreeMap;

use anyhow::{bail, ensure, Result};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::types::{AttrValue, DistrictId, DistrictType, FeatureId, ScenarioId};

/// Writable attributes of a district feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistrictField {
    Name,
    EstimatedPop,
    ScenarioId,
    StatsPop,
    StatsVarYear1,
    StatsVarYear2,
    Invalid,
    InvalidReason,
}

impl DistrictField {
    pub fn to_str(&self) -> &'static str {
        match self {
            DistrictField::Name => "name",
            DistrictField::EstimatedPop => "estimated_pop",
            DistrictField::ScenarioId => "scenario_id",
            DistrictField::StatsPop => "stats_nz_pop",
            DistrictField::StatsVarYear1 => "stats_nz_var_20",
            DistrictField::StatsVarYear2 => "stats_nz_var_23",
            DistrictField::Invalid => "invalid",
            DistrictField::InvalidReason => "invalid_reason",
        }
    }
}

/// New attribute values keyed by district feature id.
pub type AttributeChangeMap = BTreeMap<FeatureId, BTreeMap<DistrictField, AttrValue>>;

/// New geometries keyed by district feature id (`None` clears the geometry).
pub type GeometryChangeMap = BTreeMap<FeatureId, Option<MultiPolygon<f64>>>;

/// An electorate feature.
#[derive(Debug, Clone, PartialEq)]
pub struct District {
    pub fid: FeatureId,
    pub district_id: DistrictId,
    pub ty: DistrictType,
    pub code: String,
    pub name: String,
    pub geometry: Option<MultiPolygon<f64>>,
    pub estimated_pop: Option<i64>,
    pub scenario_id: Option<ScenarioId>,
    pub stats_pop: Option<i64>,
    pub stats_var_year1: Option<i64>,
    pub stats_var_year2: Option<i64>,
    pub invalid: Option<bool>,
    pub invalid_reason: Option<String>,
}

impl District {
    pub fn new(district_id: DistrictId, ty: DistrictType, code: &str, name: &str) -> Self {
        Self {
            fid: 0,
            district_id,
            ty,
            code: code.to_string(),
            name: name.to_string(),
            geometry: None,
            estimated_pop: None,
            scenario_id: None,
            stats_pop: None,
            stats_var_year1: None,
            stats_var_year2: None,
            invalid: None,
            invalid_reason: None,
        }
    }

    /// Read one attribute as a dynamic value.
    pub fn attribute(&self, field: DistrictField) -> AttrValue {
        match field {
            DistrictField::Name => AttrValue::Text(self.name.clone()),
            DistrictField::EstimatedPop => self.estimated_pop.into(),
            DistrictField::ScenarioId => self.scenario_id.into(),
            DistrictField::StatsPop => self.stats_pop.into(),
            DistrictField::StatsVarYear1 => self.stats_var_year1.into(),
            DistrictField::StatsVarYear2 => self.stats_var_year2.into(),
            DistrictField::Invalid => self.invalid.map_or(AttrValue::Null, AttrValue::Bool),
            DistrictField::InvalidReason => self.invalid_reason.clone().into(),
        }
    }

    /// Check that `value` fits the field's type without writing it.
    pub fn check_attribute(field: DistrictField, value: &AttrValue) -> Result<()> {
        let ok = match field {
            DistrictField::Name => matches!(value, AttrValue::Text(_)),
            DistrictField::Invalid => matches!(value, AttrValue::Bool(_) | AttrValue::Null),
            DistrictField::InvalidReason => matches!(value, AttrValue::Text(_) | AttrValue::Null),
            _ => matches!(value, AttrValue::Int(_) | AttrValue::Null),
        };
        ensure!(ok, "Value {value:?} is not valid for field '{}'", field.to_str());
        Ok(())
    }

    fn set_attribute(&mut self, field: DistrictField, value: &AttrValue) {
        match field {
            DistrictField::Name => self.name = value.as_text().unwrap_or_default().to_string(),
            DistrictField::EstimatedPop => self.estimated_pop = value.as_int(),
            DistrictField::ScenarioId => self.scenario_id = value.as_int(),
            DistrictField::StatsPop => self.stats_pop = value.as_int(),
            DistrictField::StatsVarYear1 => self.stats_var_year1 = value.as_int(),
            DistrictField::StatsVarYear2 => self.stats_var_year2 = value.as_int(),
            DistrictField::Invalid => self.invalid = value.as_bool(),
            DistrictField::InvalidReason => self.invalid_reason = value.as_text().map(str::to_string),
        }
    }
}

/// The live electorate layer.
#[derive(Debug, Default)]
pub struct DistrictLayer {
    features: BTreeMap<FeatureId, District>,
    next_fid: FeatureId,
    read_only: bool,
}

impl DistrictLayer {
    pub fn new() -> Self { Self::default() }

    /// Add a district, assigning it the next feature id.
    pub fn add_district(&mut self, mut district: District) -> Result<FeatureId> {
        ensure!(
            self.find(district.ty, &district.district_id).is_none(),
            "[DistrictLayer.add_district] district {} already exists for type {}", district.district_id, district.ty
        );
        self.next_fid += 1;
        district.fid = self.next_fid;
        self.features.insert(district.fid, district);
        Ok(self.next_fid)
    }

    /// Remove a district feature; returns it if present.
    pub fn remove_district(&mut self, fid: FeatureId) -> Option<District> { self.features.remove(&fid) }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn get(&self, fid: FeatureId) -> Option<&District> { self.features.get(&fid) }

    /// All districts in feature id (insertion) order.
    #[inline] pub fn districts(&self) -> impl Iterator<Item = &District> { self.features.values() }

    /// All districts of one type, in feature id order.
    pub fn districts_of_type(&self, ty: DistrictType) -> impl Iterator<Item = &District> {
        self.features.values().filter(move |district| district.ty == ty)
    }

    /// Look a district up by type and id; both keys are needed since ids repeat across types.
    pub fn find(&self, ty: DistrictType, district_id: &DistrictId) -> Option<&District> {
        self.features.values().find(|district| district.ty == ty && &district.district_id == district_id)
    }

    #[inline] pub fn is_read_only(&self) -> bool { self.read_only }

    pub fn set_read_only(&mut self, read_only: bool) { self.read_only = read_only }

    /// Current values for every (feature, field) key in `changes`.
    pub fn snapshot_attributes(&self, changes: &AttributeChangeMap) -> Result<AttributeChangeMap> {
        changes.iter().map(|(fid, fields)| {
            let Some(district) = self.features.get(fid) else {
                bail!("[DistrictLayer.snapshot_attributes] feature {fid} does not exist");
            };
            let values = fields.keys().map(|&field| (field, district.attribute(field))).collect();
            Ok((*fid, values))
        }).collect()
    }

    /// Current geometries for every feature key in `changes`.
    pub fn snapshot_geometries(&self, changes: &GeometryChangeMap) -> Result<GeometryChangeMap> {
        changes.keys().map(|fid| {
            let Some(district) = self.features.get(fid) else {
                bail!("[DistrictLayer.snapshot_geometries] feature {fid} does not exist");
            };
            Ok((*fid, district.geometry.clone()))
        }).collect()
    }

    /// Apply attribute and geometry changes as one batch.
    ///
    /// Every target feature and value is checked before anything is written,
    /// so a failing batch leaves the layer untouched.
    pub fn apply_changes(&mut self, attributes: &AttributeChangeMap, geometries: &GeometryChangeMap) -> Result<()> {
        if attributes.is_empty() && geometries.is_empty() { return Ok(()) }
        ensure!(!self.read_only, "[DistrictLayer.apply_changes] layer is read-only");

        for (fid, fields) in attributes {
            ensure!(self.features.contains_key(fid), "[DistrictLayer.apply_changes] feature {fid} does not exist");
            for (field, value) in fields {
                District::check_attribute(*field, value)?;
            }
        }
        for fid in geometries.keys() {
            ensure!(self.features.contains_key(fid), "[DistrictLayer.apply_changes] feature {fid} does not exist");
        }

        for (fid, fields) in attributes {
            if let Some(district) = self.features.get_mut(fid) {
                for (field, value) in fields {
                    district.set_attribute(*field, value);
                }
            }
        }
        for (fid, geometry) in geometries {
            if let Some(district) = self.features.get_mut(fid) {
                district.geometry = geometry.clone();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;

    fn layer() -> (DistrictLayer, FeatureId) {
        let mut layer = DistrictLayer::new();
        let fid = layer.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "Northland")).unwrap();
        (layer, fid)
    }

    #[test]
    fn ids_repeat_across_types() {
        let (mut layer, _) = layer();
        assert!(layer.add_district(District::new(DistrictId::from(1), DistrictType::Maori, "M01", "Te Tai Tokerau")).is_ok());
        assert!(layer.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "Again")).is_err());
        assert_eq!(layer.find(DistrictType::Maori, &DistrictId::from(1)).unwrap().code, "M01");
    }

    #[test]
    fn failing_batch_leaves_layer_untouched() {
        let (mut layer, fid) = layer();
        let attributes = AttributeChangeMap::from([
            (fid, BTreeMap::from([(DistrictField::EstimatedPop, AttrValue::Int(10))])),
            (fid + 1, BTreeMap::from([(DistrictField::EstimatedPop, AttrValue::Int(20))])),
        ]);
        let geometries = GeometryChangeMap::from([(fid, Some(square(0.0, 0.0)))]);

        assert!(layer.apply_changes(&attributes, &geometries).is_err());
        let district = layer.get(fid).unwrap();
        assert_eq!(district.estimated_pop, None);
        assert_eq!(district.geometry, None);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let (mut layer, fid) = layer();
        let attributes = AttributeChangeMap::from([
            (fid, BTreeMap::from([(DistrictField::Invalid, AttrValue::Int(1))])),
        ]);
        assert!(layer.apply_changes(&attributes, &GeometryChangeMap::new()).is_err());
    }

    #[test]
    fn snapshot_reports_current_values() {
        let (mut layer, fid) = layer();
        let attributes = AttributeChangeMap::from([
            (fid, BTreeMap::from([(DistrictField::EstimatedPop, AttrValue::Int(10))])),
        ]);
        let before = layer.snapshot_attributes(&attributes).unwrap();
        layer.apply_changes(&attributes, &GeometryChangeMap::new()).unwrap();
        assert_eq!(before[&fid][&DistrictField::EstimatedPop], AttrValue::Null);
        assert_eq!(layer.get(fid).unwrap().estimated_pop, Some(10));
    }

    #[test]
    fn read_only_layer_rejects_changes() {
        let (mut layer, fid) = layer();
        layer.set_read_only(true);
        let geometries = GeometryChangeMap::from([(fid, Some(square(0.0, 0.0)))]);
        assert!(layer.apply_changes(&AttributeChangeMap::new(), &geometries).is_err());
    }
}
