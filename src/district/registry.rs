use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;

use crate::{common::SettingsStore, layer::DistrictLayer, types::{DistrictId, DistrictType}};

/// Length of the most-recently-used district list.
pub const MAX_RECENT_DISTRICTS: usize = 5;

/// A source of valid districts and their titles.
pub trait DistrictRegistry {
    /// Registry name, used to namespace persisted settings.
    fn name(&self) -> &str;

    /// Settings store holding the recent-districts list.
    fn settings(&self) -> &dyn SettingsStore;

    /// All district ids in source order.
    fn district_list(&self) -> Vec<DistrictId>;

    /// Title of a district, `None` for unknown ids.
    fn district_title(&self, id: &DistrictId) -> Option<String>;

    /// Title of a district, falling back to the id's string form.
    fn get_district_title(&self, id: &DistrictId) -> String {
        self.district_title(id).unwrap_or_else(|| id.to_string())
    }

    /// Map from title to id, sorted by title.
    fn district_titles(&self) -> BTreeMap<String, DistrictId> {
        self.district_list().into_iter()
            .map(|id| (self.get_district_title(&id), id))
            .collect()
    }

    fn recent_districts_key(&self) -> String {
        format!("redistrict/{}/recent_districts", self.name())
    }

    /// The stored list, including entries that may no longer be valid.
    fn stored_recent_districts(&self) -> Vec<DistrictId> {
        self.settings().value(&self.recent_districts_key())
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Move `district` to the front of the recent list, keeping at most [`MAX_RECENT_DISTRICTS`].
    fn push_recent_district(&self, district: &DistrictId) -> Result<()> {
        let mut recent = self.stored_recent_districts();
        recent.retain(|id| id != district);
        recent.insert(0, district.clone());
        recent.truncate(MAX_RECENT_DISTRICTS);
        self.settings().set_value(&self.recent_districts_key(), serde_json::to_value(&recent)?)
    }

    /// Recent districts, most recent first, limited to ids that are still valid.
    fn recent_districts_list(&self) -> Vec<DistrictId> {
        let valid = self.district_list();
        self.stored_recent_districts().into_iter()
            .filter(|id| valid.contains(id))
            .collect()
    }
}

/// Registry reading its districts from a district layer.
#[derive(Debug, Clone)]
pub struct VectorLayerDistrictRegistry {
    name: String,
    districts: Vec<(DistrictId, String)>,
    settings: Arc<dyn SettingsStore>,
}

impl VectorLayerDistrictRegistry {
    pub fn new(name: &str, districts: Vec<(DistrictId, String)>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { name: name.to_string(), districts, settings }
    }

    /// Build from the districts of one type in `layer`, in feature order.
    pub fn from_layer(name: &str, layer: &DistrictLayer, ty: DistrictType, settings: Arc<dyn SettingsStore>) -> Self {
        let mut registry = Self::new(name, Vec::new(), settings);
        registry.refresh(layer, ty);
        registry
    }

    /// Re-read the district list from `layer`.
    pub fn refresh(&mut self, layer: &DistrictLayer, ty: DistrictType) {
        self.districts = layer.districts_of_type(ty)
            .map(|district| (district.district_id.clone(), district.name.clone()))
            .collect();
    }

    pub fn contains(&self, id: &DistrictId) -> bool {
        self.districts.iter().any(|(district, _)| district == id)
    }
}

impl DistrictRegistry for VectorLayerDistrictRegistry {
    fn name(&self) -> &str { &self.name }

    fn settings(&self) -> &dyn SettingsStore { self.settings.as_ref() }

    fn district_list(&self) -> Vec<DistrictId> {
        self.districts.iter().map(|(id, _)| id.clone()).collect()
    }

    fn district_title(&self, id: &DistrictId) -> Option<String> {
        self.districts.iter().find(|(district, _)| district == id).map(|(_, title)| title.clone())
    }
}
