//! Plan configurations and the registry that stores them

mod data;
mod registry;
pub mod loader;

pub use data::{
    PlanConfig, PlanId, BPS_SCALE, DEFAULT_POWER_BOOSTER_RATE_BPS, FACTOR_SCALE, MONTHS_PER_YEAR,
    POWER_BOOSTER_INTERVAL_MONTHS,
};
pub use registry::PlanRegistry;
pub use loader::{load_plans, load_plans_from_reader, DEFAULT_PLANS_PATH};
