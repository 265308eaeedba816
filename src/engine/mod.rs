//! SIP accounting engine
//!
//! Ties the plan registry, contribution ledger, nominee grants and funding reservoir together
//! behind one serialized state machine. Value moves only through the injected
//! [`TokenLedger`](crate::token::TokenLedger) and time only through the injected
//! [`Clock`](crate::clock::Clock).
//!
//! # Example
//!
//! ```rust,ignore
//! use sip_ledger::{SipEngine, PlanConfig, InMemoryToken, ManualClock, Address};
//!
//! let admin = Address::from("admin");
//! let mut engine = SipEngine::new(admin.clone(), Address::from("sip"), InMemoryToken::new(), ManualClock::new(0));
//! let plan_id = engine.create_plan(&admin, PlanConfig::new(500, 12, 9, 864_000, 200, 10, 20))?;
//! engine.new_sip(&Address::from("alice"), plan_id, 500)?;
//! ```

mod events;
mod nomination;
mod payout;
mod reservoir;
mod sip;

pub use events::SipEvent;
pub use nomination::NominationRegistry;
pub use payout::power_booster_uplift_bps;
pub use reservoir::FundingReservoir;
pub use sip::SipEngine;
