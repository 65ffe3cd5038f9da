mod queue;
mod response;

pub use queue::{stats_attribute_changes, PollResult, StatsApi, StatsRequestQueue, POLL_INTERVAL};
pub use response::{StatsResponse, StatsResult, IN_PROGRESS_PREFIX};
