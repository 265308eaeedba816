//! Monthly benefit withdrawals and power booster claims

use log::{info, warn};

use super::sip::SipEngine;
use super::events::SipEvent;
use crate::clock::Clock;
use crate::error::{SipError, SipResult};
use crate::ledger::{Settlement, SipInstance};
use crate::plan::{PlanConfig, PlanId, BPS_SCALE};
use crate::token::{Address, Amount, TokenLedger};

/// Uplift of power booster `booster_index`, in basis points of the block's scheduled benefit
///
/// `((1 + rate)^index − 1)`, compounded once per checkpoint with integer basis points.
/// Strictly increasing in `booster_index` whenever `rate_bps > 0`.
pub fn power_booster_uplift_bps(rate_bps: u32, booster_index: u32) -> SipResult<u128> {
    let step = BPS_SCALE + u128::from(rate_bps);
    let mut factor = BPS_SCALE;
    for _ in 0..booster_index {
        factor = factor.checked_mul(step).ok_or(SipError::Overflow)? / BPS_SCALE;
    }
    Ok(factor - BPS_SCALE)
}

fn check_booster_index(plan: &PlanConfig, instance: &SipInstance, booster_index: u32) -> SipResult<()> {
    let claimed = instance.power_booster_withdrawals;
    let available = plan.power_booster_count();
    if booster_index != claimed + 1 || booster_index > available {
        return Err(SipError::OutOfSequence {
            requested: booster_index,
            claimed,
            available,
        });
    }
    Ok(())
}

/// Lump sum for `booster_index`: the block's unsettled benefit plus the compounding uplift
fn power_booster_amount(plan: &PlanConfig, instance: &SipInstance, booster_index: u32) -> SipResult<Amount> {
    let block = SipInstance::booster_block(booster_index);
    let unsettled = instance.unsettled_benefit_in(plan, block.clone());
    let scheduled = instance.scheduled_benefit_in(plan, block);
    let uplift = scheduled
        .checked_mul(power_booster_uplift_bps(plan.power_booster_rate_bps, booster_index)?)
        .ok_or(SipError::Overflow)?
        / BPS_SCALE;
    unsettled.checked_add(uplift).ok_or(SipError::Overflow)
}

impl<T: TokenLedger, C: Clock> SipEngine<T, C> {
    /// Benefit scheduled for `payout_month`, settled or not
    pub fn monthly_benefit_amount(&self, depositor: &Address, plan_id: PlanId, payout_month: u32) -> SipResult<Amount> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        instance.check_payout_month(plan, payout_month)?;
        Ok(instance.monthly_benefit_amount(plan, payout_month))
    }

    /// Benefit still withdrawable for `payout_month`; zero once settled
    pub fn get_pending_withdrawal_amount(
        &self,
        depositor: &Address,
        plan_id: PlanId,
        payout_month: u32,
        include_boosted: bool,
    ) -> SipResult<Amount> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        instance.check_payout_month(plan, payout_month)?;
        Ok(instance.pending_withdrawal_amount(plan, payout_month, include_boosted))
    }

    /// Earliest timestamp at which `payout_month` can be withdrawn
    pub fn withdrawal_available_at(&self, depositor: &Address, plan_id: PlanId, payout_month: u32) -> SipResult<i64> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        instance.check_payout_month(plan, payout_month)?;
        Ok(instance.withdrawal_available_at(plan, payout_month))
    }

    /// Withdraw the benefit of one payout month to the caller
    pub fn withdraw_benefit(&mut self, caller: &Address, depositor: &Address, plan_id: PlanId, payout_month: u32) -> SipResult<Amount> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        self.authorize(caller, depositor, plan_id)?;
        instance.check_payout_month(plan, payout_month)?;

        let now = self.clock.now();
        let available_at = instance.withdrawal_available_at(plan, payout_month);
        if now < available_at {
            return Err(SipError::TooEarly { available_at, now });
        }
        if instance.settlement(payout_month).is_some() {
            return Err(SipError::AlreadyWithdrawn(payout_month));
        }

        let amount = instance.monthly_benefit_amount(plan, payout_month);
        if let Err(err) = self.reservoir.check_payout(amount, amount) {
            warn!("Withdrawal of month {} for {} refused: {}", payout_month, depositor, err);
            return Err(err);
        }

        if amount > 0 {
            self.token.transfer(&self.custody, caller, amount)?;
        }
        self.instance_mut(depositor, plan_id)?
            .settle(payout_month, Settlement::Withdrawn);
        self.reservoir.record_payout(amount, amount);

        info!(
            "Benefit withdrawn for {} plan {} month {}: {} to {}",
            depositor, plan_id, payout_month, amount, caller
        );
        self.emit(SipEvent::BenefitWithdrawn {
            depositor: depositor.clone(),
            plan_id,
            payout_month,
            amount,
            paid_to: caller.clone(),
        });
        Ok(amount)
    }

    /// Lump sum the next power booster would pay
    ///
    /// `booster_index` must be the next unclaimed checkpoint. The sum is the block's
    /// still-unsettled monthly benefit plus an uplift of `(1 + r)^k − 1` times the block's full
    /// scheduled benefit, where `r` is the plan's `power_booster_rate_bps`.
    pub fn calculate_power_booster(&self, depositor: &Address, plan_id: PlanId, booster_index: u32) -> SipResult<Amount> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        check_booster_index(plan, instance, booster_index)?;
        power_booster_amount(plan, instance, booster_index)
    }

    /// Earliest timestamp at which the next power booster can be claimed
    pub fn power_booster_available_at(&self, depositor: &Address, plan_id: PlanId) -> SipResult<i64> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        let booster_index = instance.power_booster_withdrawals + 1;
        check_booster_index(plan, instance, booster_index)?;
        let block_end = *SipInstance::booster_block(booster_index).end();
        Ok(instance.withdrawal_available_at(plan, block_end))
    }

    /// Top-up the reservoir needs before the next power booster can be paid
    pub fn power_booster_shortfall(&self, depositor: &Address, plan_id: PlanId) -> SipResult<Amount> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        let booster_index = instance.power_booster_withdrawals + 1;
        check_booster_index(plan, instance, booster_index)?;
        let amount = power_booster_amount(plan, instance, booster_index)?;
        let released = instance.unsettled_benefit_in(plan, SipInstance::booster_block(booster_index));
        Ok(self.reservoir.payout_shortfall(amount, released))
    }

    /// Claim the next power booster, settling its whole block
    pub fn withdraw_power_booster(&mut self, caller: &Address, depositor: &Address, plan_id: PlanId) -> SipResult<Amount> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        self.authorize(caller, depositor, plan_id)?;

        let booster_index = instance.power_booster_withdrawals + 1;
        check_booster_index(plan, instance, booster_index)?;

        let block = SipInstance::booster_block(booster_index);
        let now = self.clock.now();
        let available_at = instance.withdrawal_available_at(plan, *block.end());
        if now < available_at {
            return Err(SipError::TooEarly { available_at, now });
        }

        let amount = power_booster_amount(plan, instance, booster_index)?;
        let released = instance.unsettled_benefit_in(plan, block.clone());
        let absorbed: Vec<u32> = block.filter(|m| instance.settlement(*m).is_none()).collect();
        if let Err(err) = self.reservoir.check_payout(amount, released) {
            warn!("Power booster {} for {} refused: {}", booster_index, depositor, err);
            return Err(err);
        }

        if amount > 0 {
            self.token.transfer(&self.custody, caller, amount)?;
        }
        let instance = self.instance_mut(depositor, plan_id)?;
        for month in absorbed {
            instance.settle(month, Settlement::Boosted { booster_index });
        }
        instance.power_booster_withdrawals = booster_index;
        self.reservoir.record_payout(amount, released);

        info!(
            "Power booster {} withdrawn for {} plan {}: {} to {} ({} released from pending)",
            booster_index, depositor, plan_id, amount, caller, released
        );
        self.emit(SipEvent::PowerBoosterWithdrawn {
            depositor: depositor.clone(),
            plan_id,
            booster_index,
            amount,
            paid_to: caller.clone(),
        });
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uplift_compounds() {
        assert_eq!(power_booster_uplift_bps(1_000, 0).unwrap(), 0);
        assert_eq!(power_booster_uplift_bps(1_000, 1).unwrap(), 1_000);
        assert_eq!(power_booster_uplift_bps(1_000, 2).unwrap(), 2_100);
        assert_eq!(power_booster_uplift_bps(1_000, 3).unwrap(), 3_310);
        assert_eq!(power_booster_uplift_bps(0, 3).unwrap(), 0);
    }

    #[test]
    fn test_uplift_strictly_increasing() {
        for rate in [1, 50, 1_000, 2_500] {
            let mut previous = 0;
            for index in 1..=10 {
                let uplift = power_booster_uplift_bps(rate, index).unwrap();
                assert!(uplift > previous, "rate {} index {}", rate, index);
                previous = uplift;
            }
        }
    }
}
