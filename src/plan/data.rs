//! Plan configuration

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{SipError, SipResult};
use crate::ledger::DepositStatus;
use crate::token::Amount;

/// Scale of the benefit and penalty factors (per mille)
pub const FACTOR_SCALE: u128 = 1_000;

/// Basis point scale used by the power booster rate
pub const BPS_SCALE: u128 = 10_000;

pub const MONTHS_PER_YEAR: u32 = 12;

/// Payout months covered by one power booster
pub const POWER_BOOSTER_INTERVAL_MONTHS: u32 = 36;

/// Default per-checkpoint compounding rate of the power booster (10%)
pub const DEFAULT_POWER_BOOSTER_RATE_BPS: u32 = 1_000;

fn default_power_booster_rate_bps() -> u32 {
    DEFAULT_POWER_BOOSTER_RATE_BPS
}

/// Identifier of a plan, assigned sequentially from 0
pub type PlanId = u32;

/// Immutable terms of a savings plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Smallest monthly commitment a depositor may pledge
    pub minimum_monthly_commitment: Amount,

    /// Months during which contributions are accepted
    pub accumulation_period_months: u32,

    /// Payout horizon of each deposit in years
    pub benefit_period_years: u32,

    /// Seconds after a due date during which a deposit is graced
    pub grace_period_seconds: i64,

    /// Yearly benefit per unit deposited, per mille
    pub monthly_benefit_factor: u32,

    /// Reduction of the benefit factor for graced deposits
    pub grace_penalty_factor: u32,

    /// Reduction of the benefit factor for defaulted deposits
    pub default_penalty_factor: u32,

    /// Compounding uplift of each power booster checkpoint, in basis points
    #[serde(default = "default_power_booster_rate_bps")]
    pub power_booster_rate_bps: u32,
}

impl PlanConfig {
    pub fn new(
        minimum_monthly_commitment: Amount,
        accumulation_period_months: u32,
        benefit_period_years: u32,
        grace_period_seconds: i64,
        monthly_benefit_factor: u32,
        grace_penalty_factor: u32,
        default_penalty_factor: u32,
    ) -> Self {
        Self {
            minimum_monthly_commitment,
            accumulation_period_months,
            benefit_period_years,
            grace_period_seconds,
            monthly_benefit_factor,
            grace_penalty_factor,
            default_penalty_factor,
            power_booster_rate_bps: DEFAULT_POWER_BOOSTER_RATE_BPS,
        }
    }

    pub fn with_power_booster_rate(mut self, rate_bps: u32) -> Self {
        self.power_booster_rate_bps = rate_bps;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> SipResult<()> {
        if self.minimum_monthly_commitment == 0 {
            return Err(SipError::InvalidConfig("minimum monthly commitment must be positive".into()));
        }
        if self.accumulation_period_months == 0 {
            return Err(SipError::InvalidConfig("accumulation period must be positive".into()));
        }
        if self.benefit_period_years == 0 {
            return Err(SipError::InvalidConfig("benefit period must be positive".into()));
        }
        if self.grace_period_seconds < 0 {
            return Err(SipError::InvalidConfig("grace period cannot be negative".into()));
        }
        if self.grace_penalty_factor > self.default_penalty_factor {
            warn!(
                "Grace penalty {} exceeds default penalty {}",
                self.grace_penalty_factor, self.default_penalty_factor
            );
        }
        if self.default_penalty_factor > self.monthly_benefit_factor {
            warn!(
                "Default penalty {} exceeds benefit factor {}; defaulted deposits queue no benefit",
                self.default_penalty_factor, self.monthly_benefit_factor
            );
        }
        self.benefit_period_years
            .checked_mul(MONTHS_PER_YEAR)
            .and_then(|months| months.checked_add(self.accumulation_period_months))
            .ok_or_else(|| SipError::InvalidConfig("benefit horizon too long".into()))?;
        Ok(())
    }

    /// Number of payout months each deposit is paid over
    pub fn benefit_months(&self) -> u32 {
        self.benefit_period_years * MONTHS_PER_YEAR
    }

    /// Last payout month that can carry a benefit (tail of the final accumulation month)
    pub fn last_payout_month(&self) -> u32 {
        self.accumulation_period_months + self.benefit_months() - 1
    }

    /// Number of power booster checkpoints in the benefit period
    pub fn power_booster_count(&self) -> u32 {
        self.benefit_months() / POWER_BOOSTER_INTERVAL_MONTHS
    }

    /// Benefit factor after the penalty for a deposit classification
    pub fn effective_benefit_factor(&self, status: DepositStatus) -> u32 {
        let penalty = match status {
            DepositStatus::OnTime => 0,
            DepositStatus::Grace => self.grace_penalty_factor,
            DepositStatus::Default => self.default_penalty_factor,
        };
        self.monthly_benefit_factor.saturating_sub(penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_plan() -> PlanConfig {
        PlanConfig::new(500, 12, 9, 864_000, 200, 10, 20)
    }

    #[test]
    fn test_plan_horizon() {
        let plan = reference_plan();
        assert_eq!(plan.benefit_months(), 108);
        assert_eq!(plan.last_payout_month(), 119);
        assert_eq!(plan.power_booster_count(), 3);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_effective_factor_ordering() {
        let plan = reference_plan();
        assert_eq!(plan.effective_benefit_factor(DepositStatus::OnTime), 200);
        assert_eq!(plan.effective_benefit_factor(DepositStatus::Grace), 190);
        assert_eq!(plan.effective_benefit_factor(DepositStatus::Default), 180);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let cases = [
            PlanConfig { minimum_monthly_commitment: 0, ..reference_plan() },
            PlanConfig { accumulation_period_months: 0, ..reference_plan() },
            PlanConfig { benefit_period_years: 0, ..reference_plan() },
            PlanConfig { grace_period_seconds: -1, ..reference_plan() },
        ];
        for plan in cases {
            assert!(matches!(plan.validate(), Err(SipError::InvalidConfig(_))), "{:?}", plan);
        }
    }

    #[test]
    fn test_unordered_penalties_accepted() {
        let inverted = PlanConfig { grace_penalty_factor: 30, ..reference_plan() };
        assert!(inverted.validate().is_ok());
        assert_eq!(inverted.effective_benefit_factor(DepositStatus::Grace), 170);

        let harsh = PlanConfig { default_penalty_factor: 250, ..reference_plan() };
        assert!(harsh.validate().is_ok());
        assert_eq!(harsh.effective_benefit_factor(DepositStatus::Default), 0);
    }

    #[test]
    fn test_serde_defaults_booster_rate() {
        let json = r#"{
            "minimum_monthly_commitment": 500,
            "accumulation_period_months": 12,
            "benefit_period_years": 9,
            "grace_period_seconds": 864000,
            "monthly_benefit_factor": 200,
            "grace_penalty_factor": 10,
            "default_penalty_factor": 20
        }"#;
        let plan: PlanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(plan, reference_plan());
        assert_eq!(plan.power_booster_rate_bps, DEFAULT_POWER_BOOSTER_RATE_BPS);
    }
}
