use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker the statistics service returns while a request is still running.
pub const IN_PROGRESS_PREFIX: &str = "Request in progress";

/// Population figures returned for one electorate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResult {
    pub population: i64,
    #[serde(rename = "varianceYear1")]
    pub variance_year1: i64,
    #[serde(rename = "varianceYear2")]
    pub variance_year2: i64,
}

/// Parsed reply to a status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsResponse {
    InProgress,
    Complete(StatsResult),
}

impl StatsResponse {
    /// Accepts a completed result object or an in-progress marker string; anything else is an error.
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::String(text) if text.starts_with(IN_PROGRESS_PREFIX) => Ok(StatsResponse::InProgress),
            Value::String(text) => bail!("Unexpected statistics response: {text}"),
            Value::Object(fields) => {
                let number = |key: &str| -> Result<i64> {
                    fields.get(key)
                        .and_then(Value::as_f64)
                        .map(|n| n.round() as i64)
                        .ok_or_else(|| anyhow!("Statistics response is missing numeric field '{key}'"))
                };
                Ok(StatsResponse::Complete(StatsResult {
                    population: number("population")?,
                    variance_year1: number("varianceYear1")?,
                    variance_year2: number("varianceYear2")?,
                }))
            }
            other => bail!("Unexpected statistics response: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn in_progress_is_recognized_by_prefix() {
        let value = json!("Request in progress (position 3)");
        assert_eq!(StatsResponse::parse(&value).unwrap(), StatsResponse::InProgress);
    }

    #[test]
    fn complete_result_is_parsed() {
        let value = json!({ "population": 61234, "varianceYear1": 2.4, "varianceYear2": -1 });
        assert_eq!(
            StatsResponse::parse(&value).unwrap(),
            StatsResponse::Complete(StatsResult { population: 61234, variance_year1: 2, variance_year2: -1 })
        );
    }

    #[test]
    fn other_shapes_are_errors() {
        assert!(StatsResponse::parse(&json!("Internal error")).is_err());
        assert!(StatsResponse::parse(&json!({ "population": 5 })).is_err());
        assert!(StatsResponse::parse(&json!([1, 2, 3])).is_err());
    }
}
