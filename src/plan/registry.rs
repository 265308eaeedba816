//! Registry of immutable plans

use super::{PlanConfig, PlanId};
use crate::error::{SipError, SipResult};

/// Plans indexed by sequential identifier
#[derive(Debug, Clone, Default)]
pub struct PlanRegistry {
    plans: Vec<PlanConfig>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a plan, returning its identifier
    pub fn create(&mut self, config: PlanConfig) -> SipResult<PlanId> {
        config.validate()?;
        let plan_id = PlanId::try_from(self.plans.len()).map_err(|_| SipError::Overflow)?;
        self.plans.push(config);
        Ok(plan_id)
    }

    pub fn get(&self, plan_id: PlanId) -> SipResult<&PlanConfig> {
        self.plans
            .get(plan_id as usize)
            .ok_or(SipError::PlanNotFound(plan_id))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
