//! Contribution ledger: deposit classification, recorded deposits and benefit accrual

mod classifier;
mod deposit;
mod instance;

pub use classifier::{classify, due_timestamp, months_after, DepositStatus, EARTH_SECONDS_IN_MONTH};
pub use deposit::{queued_yearly_benefit, Deposit};
pub use instance::{Settlement, SipInstance};
