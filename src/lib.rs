//! SIP Ledger - Accounting engine for systematic investment plans
//!
//! This library provides:
//! - Plan registry with validated benefit and penalty factors
//! - Deposit classification against due dates and grace windows
//! - Contribution ledger with per-month benefit amortization
//! - Monthly benefit withdrawals and compounding power boosters
//! - Nominee authority and a solvency-checked funding reservoir
//! - Scripted scenarios and payout schedule reports

pub mod clock;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod plan;
pub mod scenario;
pub mod schedule;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{SipEngine, SipEvent};
pub use error::{SipError, SipResult};
pub use ledger::DepositStatus;
pub use plan::{PlanConfig, PlanId};
pub use scenario::{ScenarioRunner, ScenarioScript};
pub use schedule::PayoutSchedule;
pub use token::{Address, Amount, InMemoryToken, TokenLedger};
