//! Deposit timeliness classification
//!
//! Every due date, grace boundary and payout boundary is measured in units of an average
//! Earth month rather than calendar months, so two instances opened at different times of
//! the year follow exactly the same schedule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Average length of a month in seconds
pub const EARTH_SECONDS_IN_MONTH: i64 = 2_629_744;

/// Timeliness of a monthly deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositStatus {
    /// Received on or before the due date
    OnTime,
    /// Received after the due date but within the grace window
    Grace,
    /// Received after the grace window
    Default,
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DepositStatus::OnTime => "OnTime",
            DepositStatus::Grace => "Grace",
            DepositStatus::Default => "Default",
        };
        f.write_str(label)
    }
}

/// Timestamp `months` average months after `start`
pub fn months_after(start: i64, months: u32) -> i64 {
    start.saturating_add(i64::from(months).saturating_mul(EARTH_SECONDS_IN_MONTH))
}

/// Due date of the deposit for `month_id`
pub fn due_timestamp(start: i64, month_id: u32) -> i64 {
    months_after(start, month_id)
}

/// Classify a deposit observed at `observed` against its due date
pub fn classify(due: i64, grace_period_seconds: i64, observed: i64) -> DepositStatus {
    if observed <= due {
        DepositStatus::OnTime
    } else if observed <= due.saturating_add(grace_period_seconds) {
        DepositStatus::Grace
    } else {
        DepositStatus::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: i64 = 864_000;

    #[test]
    fn test_classification_boundaries() {
        let due = due_timestamp(1_000, 3);
        assert_eq!(due, 1_000 + 3 * EARTH_SECONDS_IN_MONTH);

        assert_eq!(classify(due, GRACE, due - 1), DepositStatus::OnTime);
        assert_eq!(classify(due, GRACE, due), DepositStatus::OnTime);
        assert_eq!(classify(due, GRACE, due + 1), DepositStatus::Grace);
        assert_eq!(classify(due, GRACE, due + GRACE), DepositStatus::Grace);
        assert_eq!(classify(due, GRACE, due + GRACE + 1), DepositStatus::Default);
    }

    #[test]
    fn test_zero_grace_goes_straight_to_default() {
        let due = due_timestamp(0, 1);
        assert_eq!(classify(due, 0, due), DepositStatus::OnTime);
        assert_eq!(classify(due, 0, due + 1), DepositStatus::Default);
    }
}
