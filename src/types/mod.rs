mod district_id;
mod district_type;
mod typed;
mod value;

pub use district_id::DistrictId;
pub use district_type::DistrictType;
pub use typed::PerType;
pub use value::AttrValue;

/// Stable numeric identifier of a meshblock.
pub type MeshblockNumber = i64;

/// Identifier of a feature within a layer.
pub type FeatureId = u64;

/// Identifier of a scenario within a scenario registry.
pub type ScenarioId = i64;
