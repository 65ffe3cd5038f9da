mod geojson;
mod store;

pub use geojson::write_feature_collection;
pub use store::{
    load_project, save_project, ELECTORATES_FILE, MESHBLOCKS_FILE, SCENARIOS_FILE, USER_LOG_FILE,
};
