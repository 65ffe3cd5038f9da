use std::{collections::BTreeMap, time::Duration};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    layer::{AttributeChangeMap, DistrictField},
    types::{AttrValue, FeatureId, MeshblockNumber},
};
use super::response::{StatsResponse, StatsResult};

/// How often pending statistics requests are checked.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Transport to the external statistics service.
pub trait StatsApi {
    /// Submit an electorate made of `meshblocks`; returns the request id.
    fn submit(&mut self, meshblocks: &[MeshblockNumber]) -> Result<String>;

    /// Fetch the raw status of a request.
    fn check(&mut self, request_id: &str) -> Result<Value>;
}

/// Results of one poll.
#[derive(Debug, Default)]
pub struct PollResult {
    pub completed: Vec<(FeatureId, StatsResult)>,
    pub failed: Vec<(FeatureId, anyhow::Error)>,
}

/// In-flight statistics requests keyed by request id.
#[derive(Debug, Default)]
pub struct StatsRequestQueue {
    pending: BTreeMap<String, FeatureId>,
}

impl StatsRequestQueue {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.pending.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    /// Track an already-submitted request for district feature `fid`.
    pub fn add(&mut self, request_id: String, fid: FeatureId) {
        self.pending.insert(request_id, fid);
    }

    /// Submit a request for district feature `fid` and track it.
    pub fn submit(&mut self, api: &mut dyn StatsApi, fid: FeatureId, meshblocks: &[MeshblockNumber]) -> Result<()> {
        let request_id = api.submit(meshblocks)
            .with_context(|| format!("[StatsRequestQueue.submit] request for feature {fid} failed"))?;
        debug!(request = %request_id, fid, "statistics request submitted");
        self.add(request_id, fid);
        Ok(())
    }

    /// Check every pending request once. Requests still in progress stay queued;
    /// completed and failed ones are removed and reported.
    pub fn poll(&mut self, api: &mut dyn StatsApi) -> PollResult {
        let mut result = PollResult::default();
        self.pending.retain(|request_id, fid| {
            let response = api.check(request_id).and_then(|value| StatsResponse::parse(&value));
            match response {
                Ok(StatsResponse::InProgress) => true,
                Ok(StatsResponse::Complete(stats)) => {
                    result.completed.push((*fid, stats));
                    false
                }
                Err(err) => {
                    warn!(request = %request_id, fid = *fid, error = %err, "statistics request failed");
                    result.failed.push((*fid, err));
                    false
                }
            }
        });
        result
    }

    /// Poll until no request is pending, calling `sleep(POLL_INTERVAL)` between polls.
    /// Results of every round are merged.
    pub fn poll_until_idle(&mut self, api: &mut dyn StatsApi, mut sleep: impl FnMut(Duration)) -> PollResult {
        let mut result = PollResult::default();
        while !self.is_empty() {
            let round = self.poll(api);
            result.completed.extend(round.completed);
            result.failed.extend(round.failed);
            if self.is_empty() { break }
            debug!(pending = self.len(), "statistics requests still in progress");
            sleep(POLL_INTERVAL);
        }
        result
    }
}

/// Attribute changes writing completed statistics onto their districts.
pub fn stats_attribute_changes(results: &[(FeatureId, StatsResult)]) -> AttributeChangeMap {
    results.iter().map(|(fid, stats)| {
        (*fid, BTreeMap::from([
            (DistrictField::StatsPop, AttrValue::Int(stats.population)),
            (DistrictField::StatsVarYear1, AttrValue::Int(stats.variance_year1)),
            (DistrictField::StatsVarYear2, AttrValue::Int(stats.variance_year2)),
        ]))
    }).collect()
}
