mod audit;
mod district;
mod edit;
mod meshblock;

pub use audit::{AuditEntry, AuditLog};
pub use district::{AttributeChangeMap, District, DistrictField, DistrictLayer, GeometryChangeMap};
pub use meshblock::{AssignmentChange, Meshblock, MeshblockLayer};
