//! One depositor's enrollment in one plan

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::classifier::months_after;
use super::Deposit;
use crate::error::{SipError, SipResult};
use crate::plan::{PlanConfig, PlanId, POWER_BOOSTER_INTERVAL_MONTHS};
use crate::token::{Address, Amount};

/// How a payout month was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    /// Paid by an individual monthly withdrawal
    Withdrawn,
    /// Absorbed into a power booster lump sum
    Boosted { booster_index: u32 },
}

/// Contribution record and payout state of a single SIP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SipInstance {
    pub depositor: Address,
    pub plan_id: PlanId,

    /// Plan entry time; anchors every due date and payout date
    pub start_timestamp: i64,

    /// Pledged recurring amount
    pub monthly_commitment: Amount,

    /// Power booster checkpoints claimed so far
    pub power_booster_withdrawals: u32,

    deposits: BTreeMap<u32, Deposit>,
    settlements: BTreeMap<u32, Settlement>,
}

impl SipInstance {
    pub fn new(depositor: Address, plan_id: PlanId, start_timestamp: i64, monthly_commitment: Amount) -> Self {
        Self {
            depositor,
            plan_id,
            start_timestamp,
            monthly_commitment,
            power_booster_withdrawals: 0,
            deposits: BTreeMap::new(),
            settlements: BTreeMap::new(),
        }
    }

    pub fn deposit(&self, month_id: u32) -> Option<&Deposit> {
        self.deposits.get(&month_id)
    }

    pub fn deposits(&self) -> impl Iterator<Item = &Deposit> {
        self.deposits.values()
    }

    pub fn total_deposited(&self) -> Amount {
        self.deposits.values().map(|d| d.amount).sum()
    }

    pub fn settlement(&self, payout_month: u32) -> Option<Settlement> {
        self.settlements.get(&payout_month).copied()
    }

    pub(crate) fn record_deposit(&mut self, deposit: Deposit) {
        self.deposits.insert(deposit.month_id, deposit);
    }

    pub(crate) fn settle(&mut self, payout_month: u32, settlement: Settlement) {
        self.settlements.insert(payout_month, settlement);
    }

    /// Check a payout month lies inside the instance's payout horizon
    pub fn check_payout_month(&self, plan: &PlanConfig, payout_month: u32) -> SipResult<()> {
        if payout_month == 0 || payout_month > plan.last_payout_month() {
            return Err(SipError::InvalidMonth {
                month: payout_month,
                reason: "outside the payout horizon",
            });
        }
        Ok(())
    }

    /// Earliest time `payout_month` may be withdrawn
    pub fn withdrawal_available_at(&self, plan: &PlanConfig, payout_month: u32) -> i64 {
        months_after(self.start_timestamp, plan.accumulation_period_months + payout_month)
    }

    /// Time from which deposits are no longer accepted
    ///
    /// Coincides with the first payout month becoming withdrawable, so no month a deposit
    /// would cover can have been settled before it is recorded.
    pub fn deposit_window_closes_at(&self, plan: &PlanConfig) -> i64 {
        self.withdrawal_available_at(plan, 1)
    }

    /// Benefit scheduled for `payout_month`, summed over every deposit covering it
    pub fn monthly_benefit_amount(&self, plan: &PlanConfig, payout_month: u32) -> Amount {
        let benefit_months = plan.benefit_months();
        self.deposits
            .values()
            .filter(|d| d.covers(payout_month, benefit_months))
            .fold(0, |total: Amount, d| total.saturating_add(d.monthly_benefit))
    }

    /// Benefit still claimable for `payout_month`
    ///
    /// Months already withdrawn report zero. Months absorbed by a power booster report zero
    /// unless `include_boosted` is set, in which case their scheduled amount is returned.
    pub fn pending_withdrawal_amount(&self, plan: &PlanConfig, payout_month: u32, include_boosted: bool) -> Amount {
        match self.settlement(payout_month) {
            None => self.monthly_benefit_amount(plan, payout_month),
            Some(Settlement::Boosted { .. }) if include_boosted => self.monthly_benefit_amount(plan, payout_month),
            Some(_) => 0,
        }
    }

    /// Payout months covered by power booster `booster_index` (1-indexed)
    pub fn booster_block(booster_index: u32) -> RangeInclusive<u32> {
        let end = booster_index * POWER_BOOSTER_INTERVAL_MONTHS;
        (end - POWER_BOOSTER_INTERVAL_MONTHS + 1)..=end
    }

    /// Scheduled benefit over `months`, regardless of settlement
    pub fn scheduled_benefit_in(&self, plan: &PlanConfig, months: RangeInclusive<u32>) -> Amount {
        months.fold(0, |total: Amount, m| total.saturating_add(self.monthly_benefit_amount(plan, m)))
    }

    /// Benefit over `months` that has not been settled yet
    pub fn unsettled_benefit_in(&self, plan: &PlanConfig, months: RangeInclusive<u32>) -> Amount {
        months
            .filter(|m| self.settlement(*m).is_none())
            .fold(0, |total: Amount, m| total.saturating_add(self.monthly_benefit_amount(plan, m)))
    }

    /// All benefit this instance still owes; used to audit the aggregate running total
    pub fn outstanding_benefit(&self, plan: &PlanConfig) -> Amount {
        self.unsettled_benefit_in(plan, 1..=plan.last_payout_month())
    }
}
