use crate::{layer::{District, DistrictLayer}, types::{DistrictId, DistrictType}};

/// Column holding the district id in filter expressions.
pub const DISTRICT_ID_FIELD: &str = "electorate_id";

/// Column holding the district type in filter expressions.
pub const DISTRICT_TYPE_FIELD: &str = "type";

/// Predicate matching exactly a set of districts of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictFilter {
    pub district_type: DistrictType,
    pub ids: Vec<DistrictId>,
}

impl DistrictFilter {
    pub fn new(district_type: DistrictType, ids: Vec<DistrictId>) -> Self {
        Self { district_type, ids }
    }

    /// Expression form, e.g. `"type" = 'GN' AND "electorate_id" IN (1,2)`.
    /// Text ids are quoted, integer ids are not.
    pub fn expression(&self) -> String {
        if self.ids.is_empty() { return "FALSE".to_string() }
        let ids = self.ids.iter().map(DistrictId::to_literal).collect::<Vec<_>>().join(",");
        format!(
            "\"{DISTRICT_TYPE_FIELD}\" = '{}' AND \"{DISTRICT_ID_FIELD}\" IN ({ids})",
            self.district_type.to_str()
        )
    }

    pub fn matches(&self, district: &District) -> bool {
        district.ty == self.district_type && self.ids.contains(&district.district_id)
    }

    /// Districts of `layer` matching this filter.
    pub fn select<'a>(&'a self, layer: &'a DistrictLayer) -> impl Iterator<Item = &'a District> + 'a {
        layer.districts().filter(move |district| self.matches(district))
    }
}

impl std::fmt::Display for DistrictFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression())
    }
}
