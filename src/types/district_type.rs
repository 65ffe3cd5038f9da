use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Electorate categories. Every meshblock carries one assignment per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistrictType {
    #[serde(rename = "GN")]
    GeneralNorth,   // General electorates, North Island
    #[serde(rename = "GS")]
    GeneralSouth,   // General electorates, South Island
    #[serde(rename = "M")]
    Maori,          // Māori electorates
}

impl DistrictType {
    /// Short code used in data files and exports.
    pub fn to_str(&self) -> &'static str {
        match self {
            DistrictType::GeneralNorth => "GN",
            DistrictType::GeneralSouth => "GS",
            DistrictType::Maori => "M",
        }
    }

    /// Human readable title.
    pub fn title(&self) -> &'static str {
        match self {
            DistrictType::GeneralNorth => "General (North Island)",
            DistrictType::GeneralSouth => "General (South Island)",
            DistrictType::Maori => "Māori",
        }
    }

    /// Prefix used for per-type columns, e.g. `gn_id`, `gn_pop`, `gn_code`.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            DistrictType::GeneralNorth => "gn",
            DistrictType::GeneralSouth => "gs",
            DistrictType::Maori => "m",
        }
    }

    /// Parse a type from its short code (case-insensitive).
    pub fn from_code(code: &str) -> Result<Self> {
        match code.to_ascii_uppercase().as_str() {
            "GN" => Ok(DistrictType::GeneralNorth),
            "GS" => Ok(DistrictType::GeneralSouth),
            "M" => Ok(DistrictType::Maori),
            _ => bail!("Unknown district type code '{code}'"),
        }
    }

    pub fn order() -> [DistrictType; 3] {
        [
            DistrictType::GeneralNorth,
            DistrictType::GeneralSouth,
            DistrictType::Maori,
        ]
    }
}

impl std::fmt::Display for DistrictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
