//! Funding reservoir backing every pending benefit

use serde::{Deserialize, Serialize};

use crate::error::{SipError, SipResult};
use crate::token::Amount;

/// Administrator funds and the aggregate of outstanding obligations
///
/// `pending_benefit_total` is a running total adjusted by each operation that queues or
/// settles benefit; it is never rebuilt by scanning instances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingReservoir {
    /// Cumulative administrator top-ups
    pub funds_deposited: Amount,

    /// Cumulative benefit and booster payouts
    pub funds_paid_out: Amount,

    /// Queued benefit not yet settled, across all instances
    pub pending_benefit_total: Amount,
}

impl FundingReservoir {
    /// Funds currently held for payouts
    pub fn available(&self) -> Amount {
        self.funds_deposited.saturating_sub(self.funds_paid_out)
    }

    /// Amount the administrator must add to cover every pending obligation
    pub fn shortfall(&self) -> Amount {
        self.pending_benefit_total.saturating_sub(self.available())
    }

    /// Pending total after queuing `amount`, without applying it
    pub fn pending_after_queue(&self, amount: Amount) -> SipResult<Amount> {
        self.pending_benefit_total
            .checked_add(amount)
            .ok_or(SipError::Overflow)
    }

    pub(crate) fn set_pending(&mut self, pending: Amount) {
        self.pending_benefit_total = pending;
    }

    /// Funds total after a top-up of `amount`, without applying it
    pub fn funds_after_top_up(&self, amount: Amount) -> SipResult<Amount> {
        self.funds_deposited.checked_add(amount).ok_or(SipError::Overflow)
    }

    pub(crate) fn set_funds_deposited(&mut self, funds: Amount) {
        self.funds_deposited = funds;
    }

    /// Check that paying `payout`, of which `released` was pending, keeps the reservoir solvent
    pub fn check_payout(&self, payout: Amount, released: Amount) -> SipResult<()> {
        let available = self.available();
        let pending_after = self.pending_benefit_total.saturating_sub(released);
        let solvent = available
            .checked_sub(payout)
            .map_or(false, |remaining| remaining >= pending_after);
        if !solvent {
            return Err(SipError::InsufficientReservoir {
                available,
                payout,
                pending_after,
            });
        }
        Ok(())
    }

    /// Top-up required before `check_payout(payout, released)` would pass
    pub fn payout_shortfall(&self, payout: Amount, released: Amount) -> Amount {
        let pending_after = self.pending_benefit_total.saturating_sub(released);
        pending_after
            .saturating_add(payout)
            .saturating_sub(self.available())
    }

    /// Record a payout previously approved by `check_payout`
    pub(crate) fn record_payout(&mut self, payout: Amount, released: Amount) {
        self.funds_paid_out = self.funds_paid_out.saturating_add(payout);
        self.pending_benefit_total = self.pending_benefit_total.saturating_sub(released);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_requires_full_cover() {
        let mut reservoir = FundingReservoir::default();
        reservoir.set_pending(1_000);
        reservoir.set_funds_deposited(999);
        assert_eq!(reservoir.shortfall(), 1);
        assert!(matches!(
            reservoir.check_payout(100, 100),
            Err(SipError::InsufficientReservoir { available: 999, payout: 100, pending_after: 900 })
        ));

        reservoir.set_funds_deposited(1_000);
        assert!(reservoir.check_payout(100, 100).is_ok());
        reservoir.record_payout(100, 100);
        assert_eq!(reservoir.available(), 900);
        assert_eq!(reservoir.pending_benefit_total, 900);
        assert_eq!(reservoir.shortfall(), 0);
    }

    #[test]
    fn test_bonus_payout_needs_extra_funds() {
        let mut reservoir = FundingReservoir::default();
        reservoir.set_pending(500);
        reservoir.set_funds_deposited(500);
        // 50 of bonus on top of 100 released
        assert!(reservoir.check_payout(150, 100).is_err());
        assert_eq!(reservoir.payout_shortfall(150, 100), 50);
        reservoir.set_funds_deposited(550);
        assert!(reservoir.check_payout(150, 100).is_ok());
    }
}
