//! Core SIP engine: plans, enrollment, deposits, nominations and funding

use log::{debug, info, warn};
use std::collections::HashMap;

use super::events::SipEvent;
use super::nomination::NominationRegistry;
use super::reservoir::FundingReservoir;
use crate::clock::Clock;
use crate::error::{SipError, SipResult};
use crate::ledger::{classify, due_timestamp, Deposit, DepositStatus, SipInstance};
use crate::plan::{PlanConfig, PlanId, PlanRegistry};
use crate::token::{Address, Amount, TokenLedger};

/// Accounting engine for systematic investment plans
///
/// Every mutating operation takes `&mut self`, so operations are serialized and a token
/// call cannot re-enter the engine. Each operation validates everything first, then performs
/// its token transfer, and only mutates engine state once the transfer has succeeded.
pub struct SipEngine<T: TokenLedger, C: Clock> {
    /// Account allowed to create plans and add funds
    pub(super) admin: Address,

    /// Account holding deposits and reservoir funds on the token ledger
    pub(super) custody: Address,

    pub(super) token: T,
    pub(super) clock: C,
    pub(super) plans: PlanRegistry,
    pub(super) instances: HashMap<(Address, PlanId), SipInstance>,
    pub(super) nominations: NominationRegistry,
    pub(super) reservoir: FundingReservoir,
    pub(super) events: Vec<SipEvent>,
}

impl<T: TokenLedger, C: Clock> SipEngine<T, C> {
    pub fn new(admin: Address, custody: Address, token: T, clock: C) -> Self {
        Self {
            admin,
            custody,
            token,
            clock,
            plans: PlanRegistry::new(),
            instances: HashMap::new(),
            nominations: NominationRegistry::new(),
            reservoir: FundingReservoir::default(),
            events: Vec::new(),
        }
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn custody(&self) -> &Address {
        &self.custody
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Events emitted so far, oldest first
    pub fn events(&self) -> &[SipEvent] {
        &self.events
    }

    /// Remove and return the emitted events
    pub fn take_events(&mut self) -> Vec<SipEvent> {
        std::mem::take(&mut self.events)
    }

    pub(super) fn emit(&mut self, event: SipEvent) {
        self.events.push(event);
    }

    // ---- Plan registry ----

    /// Register a new plan; administrator only
    pub fn create_plan(&mut self, caller: &Address, config: PlanConfig) -> SipResult<PlanId> {
        if caller != &self.admin {
            return Err(SipError::Unauthorized { caller: caller.clone() });
        }
        let plan_id = self.plans.create(config)?;
        info!("Created plan {}", plan_id);
        self.emit(SipEvent::PlanCreated { plan_id });
        Ok(plan_id)
    }

    pub fn get_plan(&self, plan_id: PlanId) -> SipResult<&PlanConfig> {
        self.plans.get(plan_id)
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    // ---- Instances ----

    pub fn instance(&self, depositor: &Address, plan_id: PlanId) -> SipResult<&SipInstance> {
        self.instances
            .get(&(depositor.clone(), plan_id))
            .ok_or_else(|| SipError::InstanceNotFound {
                depositor: depositor.clone(),
                plan_id,
            })
    }

    pub fn instances(&self) -> impl Iterator<Item = &SipInstance> {
        self.instances.values()
    }

    /// Plan and instance for `(depositor, plan_id)`
    pub(super) fn plan_and_instance(&self, depositor: &Address, plan_id: PlanId) -> SipResult<(&PlanConfig, &SipInstance)> {
        let instance = self.instance(depositor, plan_id)?;
        let plan = self.plans.get(plan_id)?;
        Ok((plan, instance))
    }

    pub(super) fn instance_mut(&mut self, depositor: &Address, plan_id: PlanId) -> SipResult<&mut SipInstance> {
        self.instances
            .get_mut(&(depositor.clone(), plan_id))
            .ok_or_else(|| SipError::InstanceNotFound {
                depositor: depositor.clone(),
                plan_id,
            })
    }

    /// The depositor or one of their active nominees
    pub(super) fn authorize(&self, caller: &Address, depositor: &Address, plan_id: PlanId) -> SipResult<()> {
        if caller == depositor || self.nominations.is_nominee(depositor, plan_id, caller) {
            Ok(())
        } else {
            Err(SipError::Unauthorized { caller: caller.clone() })
        }
    }

    /// Open a SIP and record its first monthly deposit
    pub fn new_sip(&mut self, depositor: &Address, plan_id: PlanId, monthly_commitment: Amount) -> SipResult<()> {
        let plan = self.plans.get(plan_id)?;
        if monthly_commitment < plan.minimum_monthly_commitment {
            return Err(SipError::BelowMinimumCommitment {
                commitment: monthly_commitment,
                minimum: plan.minimum_monthly_commitment,
            });
        }
        let key = (depositor.clone(), plan_id);
        if self.instances.contains_key(&key) {
            return Err(SipError::InstanceAlreadyExists {
                depositor: depositor.clone(),
                plan_id,
            });
        }

        let now = self.clock.now();
        let deposit = Deposit::new(plan, 1, monthly_commitment, DepositStatus::OnTime, now, depositor.clone())?;
        let pending = self
            .reservoir
            .pending_after_queue(deposit.scheduled_total(plan.benefit_months())?)?;

        self.token
            .transfer_from(&self.custody, depositor, &self.custody, monthly_commitment)?;

        let mut instance = SipInstance::new(depositor.clone(), plan_id, now, monthly_commitment);
        let queued = deposit.queued_yearly_benefit;
        instance.record_deposit(deposit);
        self.instances.insert(key, instance);
        self.reservoir.set_pending(pending);

        info!(
            "New SIP for {} in plan {}: commitment {}, yearly benefit queued {}",
            depositor, plan_id, monthly_commitment, queued
        );
        self.emit(SipEvent::NewSip {
            depositor: depositor.clone(),
            plan_id,
            monthly_commitment,
            start_timestamp: now,
        });
        self.emit(SipEvent::DepositRecorded {
            depositor: depositor.clone(),
            plan_id,
            month_id: 1,
            status: DepositStatus::OnTime,
            amount: monthly_commitment,
            queued_yearly_benefit: queued,
            paid_by: depositor.clone(),
        });
        Ok(())
    }

    fn check_deposit_month(plan: &PlanConfig, month_id: u32) -> SipResult<()> {
        if month_id == 0 || month_id > plan.accumulation_period_months {
            return Err(SipError::InvalidMonth {
                month: month_id,
                reason: "outside the accumulation period",
            });
        }
        Ok(())
    }

    /// Classification a deposit for `month_id` would receive right now
    pub fn get_deposit_status(&self, depositor: &Address, plan_id: PlanId, month_id: u32) -> SipResult<DepositStatus> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        Self::check_deposit_month(plan, month_id)?;
        let due = due_timestamp(instance.start_timestamp, month_id);
        Ok(classify(due, plan.grace_period_seconds, self.clock.now()))
    }

    /// Recorded deposit for `month_id`, if any
    pub fn get_deposit(&self, depositor: &Address, plan_id: PlanId, month_id: u32) -> SipResult<Option<&Deposit>> {
        Ok(self.instance(depositor, plan_id)?.deposit(month_id))
    }

    /// Pay the contribution for `month_id`, from the depositor or a nominee
    ///
    /// `amount` may be any positive multiple of the commitment; the extra units are a
    /// top-up of the same month and scale its queued benefit. Deposits stop being accepted
    /// once the first payout month becomes withdrawable.
    pub fn monthly_deposit(
        &mut self,
        caller: &Address,
        depositor: &Address,
        plan_id: PlanId,
        amount: Amount,
        month_id: u32,
    ) -> SipResult<DepositStatus> {
        let (plan, instance) = self.plan_and_instance(depositor, plan_id)?;
        self.authorize(caller, depositor, plan_id)?;
        Self::check_deposit_month(plan, month_id)?;
        if instance.deposit(month_id).is_some() {
            return Err(SipError::InvalidMonth {
                month: month_id,
                reason: "deposit already recorded",
            });
        }
        let commitment = instance.monthly_commitment;
        if amount == 0 || amount % commitment != 0 {
            return Err(SipError::NotAMultipleOfCommitment { amount, commitment });
        }

        let now = self.clock.now();
        if now >= instance.deposit_window_closes_at(plan) {
            return Err(SipError::InvalidMonth {
                month: month_id,
                reason: "accumulation window closed",
            });
        }
        let due = due_timestamp(instance.start_timestamp, month_id);
        let status = classify(due, plan.grace_period_seconds, now);
        debug!(
            "Deposit for {} month {}: due {}, observed {}, status {}",
            depositor, month_id, due, now, status
        );
        let deposit = Deposit::new(plan, month_id, amount, status, now, caller.clone())?;
        let pending = self
            .reservoir
            .pending_after_queue(deposit.scheduled_total(plan.benefit_months())?)?;

        self.token.transfer_from(&self.custody, caller, &self.custody, amount)?;

        let queued = deposit.queued_yearly_benefit;
        self.instance_mut(depositor, plan_id)?.record_deposit(deposit);
        self.reservoir.set_pending(pending);

        info!(
            "Deposit recorded for {} plan {} month {}: {} ({}), yearly benefit queued {}",
            depositor, plan_id, month_id, amount, status, queued
        );
        self.emit(SipEvent::DepositRecorded {
            depositor: depositor.clone(),
            plan_id,
            month_id,
            status,
            amount,
            queued_yearly_benefit: queued,
            paid_by: caller.clone(),
        });
        Ok(status)
    }

    // ---- Nominations ----

    /// Grant or revoke a nominee for the caller's own SIP
    pub fn toggle_nominee(&mut self, caller: &Address, plan_id: PlanId, nominee: &Address, enabled: bool) -> SipResult<()> {
        self.instance(caller, plan_id)?;
        self.nominations.set(caller, plan_id, nominee, enabled);
        info!("Nominee {} for {} plan {} set to {}", nominee, caller, plan_id, enabled);
        self.emit(SipEvent::NomineeToggled {
            depositor: caller.clone(),
            plan_id,
            nominee: nominee.clone(),
            enabled,
        });
        Ok(())
    }

    pub fn view_nomination(&self, depositor: &Address, plan_id: PlanId, nominee: &Address) -> bool {
        self.nominations.is_nominee(depositor, plan_id, nominee)
    }

    // ---- Funding reservoir ----

    /// Top up the reservoir from the administrator's account
    pub fn add_funds(&mut self, caller: &Address, amount: Amount) -> SipResult<()> {
        if caller != &self.admin {
            return Err(SipError::Unauthorized { caller: caller.clone() });
        }
        let funds = self.reservoir.funds_after_top_up(amount)?;
        self.token.transfer_from(&self.custody, caller, &self.custody, amount)?;
        self.reservoir.set_funds_deposited(funds);

        info!("Funds added: {} (available {})", amount, self.reservoir.available());
        if self.reservoir.shortfall() > 0 {
            warn!("Reservoir still short by {}", self.reservoir.shortfall());
        }
        self.emit(SipEvent::FundsAdded { amount });
        Ok(())
    }

    pub fn reservoir(&self) -> &FundingReservoir {
        &self.reservoir
    }

    /// Outstanding queued benefit across every SIP
    pub fn pending_benefit_amount_of_all_stakers(&self) -> Amount {
        self.reservoir.pending_benefit_total
    }

    pub fn funds_deposited(&self) -> Amount {
        self.reservoir.funds_deposited
    }

    pub fn available_funds(&self) -> Amount {
        self.reservoir.available()
    }

    /// Top-up needed for the reservoir to cover every pending benefit
    pub fn reservoir_shortfall(&self) -> Amount {
        self.reservoir.shortfall()
    }

    /// Recompute the pending total by scanning every instance
    ///
    /// Verification only; the engine maintains the running total incrementally.
    pub fn audit_pending_benefit(&self) -> Amount {
        self.instances
            .values()
            .filter_map(|sip| {
                self.plans
                    .get(sip.plan_id)
                    .ok()
                    .map(|plan| sip.outstanding_benefit(plan))
            })
            .fold(0, |total: Amount, owed| total.saturating_add(owed))
    }
}
