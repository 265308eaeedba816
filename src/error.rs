//! Error types for ledger operations

use thiserror::Error;

use crate::plan::PlanId;
use crate::token::{Address, Amount, TransferError};

/// Error raised by an engine operation. No state is mutated when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SipError {
    #[error("Invalid plan configuration: {0}")]
    InvalidConfig(String),

    #[error("Plan {0} not found")]
    PlanNotFound(PlanId),

    #[error("Monthly commitment {commitment} is below plan minimum {minimum}")]
    BelowMinimumCommitment { commitment: Amount, minimum: Amount },

    #[error("SIP already exists for {depositor} in plan {plan_id}")]
    InstanceAlreadyExists { depositor: Address, plan_id: PlanId },

    #[error("No SIP for {depositor} in plan {plan_id}")]
    InstanceNotFound { depositor: Address, plan_id: PlanId },

    #[error("Invalid month {month}: {reason}")]
    InvalidMonth { month: u32, reason: &'static str },

    #[error("Amount {amount} is not a positive multiple of commitment {commitment}")]
    NotAMultipleOfCommitment { amount: Amount, commitment: Amount },

    #[error("{caller} is not authorized for this operation")]
    Unauthorized { caller: Address },

    #[error("Too early: available at {available_at}, now {now}")]
    TooEarly { available_at: i64, now: i64 },

    #[error("Payout month {0} already settled")]
    AlreadyWithdrawn(u32),

    #[error("Power booster {requested} out of sequence: {claimed} of {available} claimed")]
    OutOfSequence {
        requested: u32,
        claimed: u32,
        available: u32,
    },

    #[error("Insufficient reservoir: available {available}, payout {payout}, pending after payout {pending_after}")]
    InsufficientReservoir {
        available: Amount,
        payout: Amount,
        pending_after: Amount,
    },

    #[error("Token transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Result type for engine operations
pub type SipResult<T> = Result<T, SipError>;
