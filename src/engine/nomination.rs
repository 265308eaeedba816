//! Nominee grants

use std::collections::HashSet;

use crate::plan::PlanId;
use crate::token::Address;

/// Capability grant letting `nominee` act for `depositor` in `plan_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Nomination {
    depositor: Address,
    plan_id: PlanId,
    nominee: Address,
}

/// Set of active nominee grants
#[derive(Debug, Clone, Default)]
pub struct NominationRegistry {
    grants: HashSet<Nomination>,
}

impl NominationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant or revoke; setting the current value again is a no-op
    pub fn set(&mut self, depositor: &Address, plan_id: PlanId, nominee: &Address, enabled: bool) {
        let grant = Nomination {
            depositor: depositor.clone(),
            plan_id,
            nominee: nominee.clone(),
        };
        if enabled {
            self.grants.insert(grant);
        } else {
            self.grants.remove(&grant);
        }
    }

    pub fn is_nominee(&self, depositor: &Address, plan_id: PlanId, nominee: &Address) -> bool {
        self.grants.contains(&Nomination {
            depositor: depositor.clone(),
            plan_id,
            nominee: nominee.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_is_scoped_to_triple() {
        let mut registry = NominationRegistry::new();
        let alice = Address::from("alice");
        let bob = Address::from("bob");

        registry.set(&alice, 0, &bob, true);
        registry.set(&alice, 0, &bob, true);
        assert!(registry.is_nominee(&alice, 0, &bob));
        assert!(!registry.is_nominee(&alice, 1, &bob));
        assert!(!registry.is_nominee(&bob, 0, &alice));

        registry.set(&alice, 0, &bob, false);
        registry.set(&alice, 0, &bob, false);
        assert!(!registry.is_nominee(&alice, 0, &bob));
    }
}
