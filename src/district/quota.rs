/// Statutory tolerance: an electorate may deviate from its type's quota by at most this percentage.
pub const QUOTA_TOLERANCE_PERCENT: i64 = 5;

/// Percentage deviation of `population` from `quota`, rounded to the nearest integer.
/// Positive values are over quota. `None` when the quota is not positive.
pub fn quota_variance(population: i64, quota: i64) -> Option<i64> {
    if quota <= 0 { return None }
    Some(((population - quota) as f64 / quota as f64 * 100.0).round() as i64)
}

/// Whether a variance lies outside [`QUOTA_TOLERANCE_PERCENT`].
#[inline]
pub fn exceeds_tolerance(variance: i64) -> bool { variance.abs() > QUOTA_TOLERANCE_PERCENT }

/// Display form of a variance: over-quota values carry a leading `+`.
pub fn format_variance(variance: i64) -> String {
    if variance > 0 { format!("+{variance}") } else { variance.to_string() }
}
