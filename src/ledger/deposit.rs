//! Recorded deposits and the benefit each one queues

use serde::{Deserialize, Serialize};

use super::DepositStatus;
use crate::error::{SipError, SipResult};
use crate::plan::{PlanConfig, FACTOR_SCALE, MONTHS_PER_YEAR};
use crate::token::{Address, Amount};

/// Yearly benefit queued by a deposit of `amount` with the given classification
///
/// `amount × effective_factor / FACTOR_SCALE`. Because `amount` is always a whole number of
/// commitment units, the benefit scales linearly with the number of units deposited.
pub fn queued_yearly_benefit(plan: &PlanConfig, amount: Amount, status: DepositStatus) -> SipResult<Amount> {
    let factor = u128::from(plan.effective_benefit_factor(status));
    amount
        .checked_mul(factor)
        .map(|scaled| scaled / FACTOR_SCALE)
        .ok_or(SipError::Overflow)
}

/// A single monthly contribution, immutable once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Accumulation month this deposit pays for (1-indexed)
    pub month_id: u32,

    /// Tokens received
    pub amount: Amount,

    /// Timeliness at the moment of deposit
    pub status: DepositStatus,

    /// Benefit paid per payout year for this deposit
    pub queued_yearly_benefit: Amount,

    /// Share of the yearly benefit paid in each covered payout month
    pub monthly_benefit: Amount,

    /// When the deposit was received
    pub timestamp: i64,

    /// Account that paid the deposit (depositor or nominee)
    pub deposited_by: Address,
}

impl Deposit {
    pub fn new(
        plan: &PlanConfig,
        month_id: u32,
        amount: Amount,
        status: DepositStatus,
        timestamp: i64,
        deposited_by: Address,
    ) -> SipResult<Self> {
        let queued_yearly_benefit = queued_yearly_benefit(plan, amount, status)?;
        Ok(Self {
            month_id,
            amount,
            status,
            queued_yearly_benefit,
            monthly_benefit: queued_yearly_benefit / u128::from(MONTHS_PER_YEAR),
            timestamp,
            deposited_by,
        })
    }

    /// Whether this deposit pays into `payout_month`
    ///
    /// A deposit for month K is paid from payout month K for `benefit_months` months.
    pub fn covers(&self, payout_month: u32, benefit_months: u32) -> bool {
        payout_month >= self.month_id && payout_month < self.month_id + benefit_months
    }

    /// Total that will be paid out for this deposit over the benefit period
    pub fn scheduled_total(&self, benefit_months: u32) -> SipResult<Amount> {
        self.monthly_benefit
            .checked_mul(u128::from(benefit_months))
            .ok_or(SipError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> PlanConfig {
        PlanConfig::new(500, 12, 9, 864_000, 200, 10, 20)
    }

    #[test]
    fn test_benefit_scales_with_units() {
        let plan = plan();
        assert_eq!(queued_yearly_benefit(&plan, 500, DepositStatus::OnTime).unwrap(), 100);
        assert_eq!(queued_yearly_benefit(&plan, 1_000, DepositStatus::OnTime).unwrap(), 200);
    }

    #[test]
    fn test_penalties_reduce_benefit() {
        let plan = plan();
        let on_time = queued_yearly_benefit(&plan, 6_000, DepositStatus::OnTime).unwrap();
        let grace = queued_yearly_benefit(&plan, 6_000, DepositStatus::Grace).unwrap();
        let default = queued_yearly_benefit(&plan, 6_000, DepositStatus::Default).unwrap();
        assert_eq!((on_time, grace, default), (1_200, 1_140, 1_080));
    }

    #[test]
    fn test_deposit_coverage_window() {
        let plan = plan();
        let deposit = Deposit::new(&plan, 3, 6_000, DepositStatus::OnTime, 0, Address::from("a")).unwrap();
        assert_eq!(deposit.monthly_benefit, 100);
        assert!(!deposit.covers(2, plan.benefit_months()));
        assert!(deposit.covers(3, plan.benefit_months()));
        assert!(deposit.covers(110, plan.benefit_months()));
        assert!(!deposit.covers(111, plan.benefit_months()));
        assert_eq!(deposit.scheduled_total(plan.benefit_months()).unwrap(), 10_800);
    }
}
