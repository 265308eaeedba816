//! Per-instance payout schedule reporting

mod payouts;

pub use payouts::{PayoutRow, PayoutSchedule, PayoutState, ScheduleSummary};
