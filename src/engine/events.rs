//! Observable events emitted by the engine

use serde::{Deserialize, Serialize};

use crate::ledger::DepositStatus;
use crate::plan::PlanId;
use crate::token::{Address, Amount};

/// Record of a committed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SipEvent {
    PlanCreated {
        plan_id: PlanId,
    },
    NewSip {
        depositor: Address,
        plan_id: PlanId,
        monthly_commitment: Amount,
        start_timestamp: i64,
    },
    DepositRecorded {
        depositor: Address,
        plan_id: PlanId,
        month_id: u32,
        status: DepositStatus,
        amount: Amount,
        queued_yearly_benefit: Amount,
        paid_by: Address,
    },
    BenefitWithdrawn {
        depositor: Address,
        plan_id: PlanId,
        payout_month: u32,
        amount: Amount,
        paid_to: Address,
    },
    PowerBoosterWithdrawn {
        depositor: Address,
        plan_id: PlanId,
        booster_index: u32,
        amount: Amount,
        paid_to: Address,
    },
    NomineeToggled {
        depositor: Address,
        plan_id: PlanId,
        nominee: Address,
        enabled: bool,
    },
    FundsAdded {
        amount: Amount,
    },
}
