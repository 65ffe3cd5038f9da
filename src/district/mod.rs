mod linz;
mod quota;
mod registry;

pub use linz::LinzElectoralDistrictRegistry;
pub use quota::{exceeds_tolerance, format_variance, quota_variance, QUOTA_TOLERANCE_PERCENT};
pub use registry::{DistrictRegistry, VectorLayerDistrictRegistry, MAX_RECENT_DISTRICTS};
