mod filter;
mod group;
mod handler;
mod linz;

pub use filter::{DistrictFilter, DISTRICT_ID_FIELD, DISTRICT_TYPE_FIELD};
pub use group::{edit_group, EditGroup};
pub use handler::{BasicRedistrictHandler, RedistrictHandler};
pub use linz::{LinzRedistrictHandler, PendingChanges, RedistrictEvent};
