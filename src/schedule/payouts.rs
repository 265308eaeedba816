//! Payout schedule output structures

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::clock::{format_timestamp, Clock};
use crate::engine::SipEngine;
use crate::error::SipResult;
use crate::ledger::Settlement;
use crate::plan::{PlanId, POWER_BOOSTER_INTERVAL_MONTHS};
use crate::token::{Address, Amount, TokenLedger};

/// Settlement state of a payout month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutState {
    Pending,
    Withdrawn,
    Boosted,
}

/// A single payout month of one SIP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRow {
    pub payout_month: u32,
    pub available_at: i64,
    pub available_at_utc: String,
    pub scheduled_benefit: Amount,
    pub pending_benefit: Amount,
    pub state: PayoutState,

    /// Power booster block the month belongs to, if any
    pub booster_block: Option<u32>,
}

/// Full payout schedule of one SIP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSchedule {
    pub depositor: Address,
    pub plan_id: PlanId,
    pub total_deposited: Amount,
    pub rows: Vec<PayoutRow>,
}

impl PayoutSchedule {
    /// Build the schedule of `(depositor, plan_id)` as of the engine's current state
    pub fn for_instance<T: TokenLedger, C: Clock>(
        engine: &SipEngine<T, C>,
        depositor: &Address,
        plan_id: PlanId,
    ) -> SipResult<Self> {
        let plan = engine.get_plan(plan_id)?;
        let instance = engine.instance(depositor, plan_id)?;
        let boosted_months = plan.power_booster_count() * POWER_BOOSTER_INTERVAL_MONTHS;

        let rows = (1..=plan.last_payout_month())
            .map(|payout_month| {
                let available_at = instance.withdrawal_available_at(plan, payout_month);
                let state = match instance.settlement(payout_month) {
                    None => PayoutState::Pending,
                    Some(Settlement::Withdrawn) => PayoutState::Withdrawn,
                    Some(Settlement::Boosted { .. }) => PayoutState::Boosted,
                };
                PayoutRow {
                    payout_month,
                    available_at,
                    available_at_utc: format_timestamp(available_at),
                    scheduled_benefit: instance.monthly_benefit_amount(plan, payout_month),
                    pending_benefit: instance.pending_withdrawal_amount(plan, payout_month, false),
                    state,
                    booster_block: (payout_month <= boosted_months)
                        .then(|| (payout_month - 1) / POWER_BOOSTER_INTERVAL_MONTHS + 1),
                }
            })
            .collect();

        Ok(Self {
            depositor: depositor.clone(),
            plan_id,
            total_deposited: instance.total_deposited(),
            rows,
        })
    }

    /// Get summary statistics
    pub fn summary(&self) -> ScheduleSummary {
        let total_scheduled: Amount = self.rows.iter().map(|r| r.scheduled_benefit).sum();
        let total_outstanding: Amount = self.rows.iter().map(|r| r.pending_benefit).sum();
        let months_settled = self.rows.iter().filter(|r| r.state != PayoutState::Pending).count() as u32;

        let benefit_multiple = if self.total_deposited > 0 {
            total_scheduled as f64 / self.total_deposited as f64
        } else {
            0.0
        };

        ScheduleSummary {
            payout_months: self.rows.len() as u32,
            months_settled,
            total_deposited: self.total_deposited,
            total_scheduled,
            total_settled: total_scheduled.saturating_sub(total_outstanding),
            total_outstanding,
            benefit_multiple,
        }
    }

    /// Write the rows as CSV to any writer
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Write the rows as CSV to a file
    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> csv::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

/// Summary statistics for a payout schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub payout_months: u32,
    pub months_settled: u32,
    pub total_deposited: Amount,
    pub total_scheduled: Amount,

    /// Scheduled benefit already withdrawn or absorbed by a booster
    pub total_settled: Amount,
    pub total_outstanding: Amount,

    /// Scheduled benefit per unit deposited
    pub benefit_multiple: f64,
}
