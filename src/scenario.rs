//! Scripted scenario runner
//!
//! A [`ScenarioScript`] describes one SIP from opening to payout as a list of steps. The
//! runner replays it against an in-memory token and a manual clock, so many scripts can be
//! run side by side without touching a real ledger.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::path::Path;

use crate::clock::ManualClock;
use crate::engine::{FundingReservoir, SipEngine, SipEvent};
use crate::error::{SipError, SipResult};
use crate::ledger::EARTH_SECONDS_IN_MONTH;
use crate::plan::{PlanConfig, PlanId, POWER_BOOSTER_INTERVAL_MONTHS};
use crate::schedule::PayoutSchedule;
use crate::token::{Address, Amount, InMemoryToken, TokenLedger};

/// Balance minted to the administrator for reservoir top-ups
const ADMIN_FLOAT: Amount = u128::MAX / 4;

/// One action of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Move the clock forward
    Advance { seconds: i64 },
    /// Move the clock forward by whole average months
    AdvanceMonths { months: u32 },
    /// Move the clock to the moment `month` becomes withdrawable
    AdvanceToPayout { month: u32 },
    /// Pay a monthly contribution; `units` multiples of the commitment
    Deposit {
        month: u32,
        #[serde(default = "one_unit")]
        units: u32,
        #[serde(default)]
        by_nominee: bool,
    },
    /// Grant or revoke the script's nominee
    ToggleNominee { enabled: bool },
    /// Administrator top-up of a fixed amount
    AddFunds { amount: Amount },
    /// Administrator top-up covering every pending obligation
    FundShortfall,
    /// Administrator top-up covering the next power booster
    FundBooster,
    /// Withdraw the benefit of one payout month
    Withdraw {
        month: u32,
        #[serde(default)]
        by_nominee: bool,
    },
    /// Withdraw every payout month from `from` to `to`, one month apart, boosting at each checkpoint
    WithdrawRange {
        from: u32,
        to: u32,
        #[serde(default)]
        by_nominee: bool,
    },
    /// Claim the next power booster
    PowerBooster {
        #[serde(default)]
        by_nominee: bool,
    },
}

fn one_unit() -> u32 {
    1
}

/// A complete SIP scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioScript {
    pub name: String,

    /// Plan the SIP is opened under; amounts are in whole tokens
    pub plan: PlanConfig,

    /// Monthly commitment in whole tokens
    pub monthly_commitment: Amount,

    /// Token decimals applied to every amount in the script
    #[serde(default)]
    pub decimals: u32,

    /// Unix time the SIP is opened at
    pub start_timestamp: i64,

    /// Starting balance of the depositor and of the nominee, in whole tokens
    pub opening_balance: Amount,

    pub steps: Vec<ScenarioStep>,
}

impl ScenarioScript {
    /// Reference plan walk-through with a nominee doing all the work
    ///
    /// 500/month for 12 months under a 20% yearly benefit paid over 9 years. Month 2 is
    /// paid double, every payout month up to 108 is withdrawn in order and the three power
    /// boosters are claimed at months 36, 72 and 108.
    pub fn reference() -> Self {
        let mut steps = vec![
            ScenarioStep::ToggleNominee { enabled: true },
            ScenarioStep::FundShortfall,
        ];
        for month in 2..=12 {
            steps.push(ScenarioStep::AdvanceMonths { months: 1 });
            steps.push(ScenarioStep::Deposit {
                month,
                units: if month == 2 { 2 } else { 1 },
                by_nominee: true,
            });
            steps.push(ScenarioStep::FundShortfall);
        }
        steps.push(ScenarioStep::WithdrawRange {
            from: 1,
            to: 108,
            by_nominee: true,
        });

        Self {
            name: "reference".to_string(),
            plan: PlanConfig::new(500, 12, 9, 864_000, 200, 10, 20),
            monthly_commitment: 500,
            decimals: 18,
            start_timestamp: 1_600_000_000,
            opening_balance: 10_000,
            steps,
        }
    }

    /// Load a script from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    fn scale(&self) -> SipResult<Amount> {
        10u128.checked_pow(self.decimals).ok_or(SipError::Overflow)
    }

    fn scaled(&self, amount: Amount) -> SipResult<Amount> {
        amount.checked_mul(self.scale()?).ok_or(SipError::Overflow)
    }
}

/// A step the engine refused, kept so scripts can assert on rejections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: usize,
    pub error: String,
}

/// Everything a finished scenario produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub schedule: PayoutSchedule,
    pub events: Vec<SipEvent>,
    pub failures: Vec<StepFailure>,
    pub reservoir: FundingReservoir,
    pub depositor_balance: Amount,
    pub nominee_balance: Amount,
    pub admin_contribution: Amount,
}

/// Replays scenario scripts against a fresh engine each
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    admin: Address,
    custody: Address,
    depositor: Address,
    nominee: Address,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

type ScenarioEngine = SipEngine<InMemoryToken, ManualClock>;

impl ScenarioRunner {
    /// Runner with the default cast of accounts
    pub fn new() -> Self {
        Self {
            admin: Address::from("admin"),
            custody: Address::from("sip-custody"),
            depositor: Address::from("depositor"),
            nominee: Address::from("nominee"),
        }
    }

    pub fn depositor(&self) -> &Address {
        &self.depositor
    }

    pub fn nominee(&self) -> &Address {
        &self.nominee
    }

    /// Run one script to completion
    ///
    /// Setup errors abort the run. Refusals from individual steps are collected in
    /// [`ScenarioOutcome::failures`] and the script carries on.
    pub fn run(&self, script: &ScenarioScript) -> SipResult<ScenarioOutcome> {
        let mut engine = self.setup(script)?;
        let plan_id: PlanId = 0;

        let mut failures = Vec::new();
        for (index, step) in script.steps.iter().enumerate() {
            if let Err(err) = self.apply(&mut engine, script, plan_id, step) {
                debug!("Scenario {} step {} ({:?}) refused: {}", script.name, index, step, err);
                failures.push(StepFailure {
                    step: index,
                    error: err.to_string(),
                });
            }
        }

        let schedule = PayoutSchedule::for_instance(&engine, &self.depositor, plan_id)?;
        let reservoir = engine.reservoir().clone();
        info!(
            "Scenario {} finished: {} events, {} refused steps",
            script.name,
            engine.events().len(),
            failures.len()
        );

        Ok(ScenarioOutcome {
            name: script.name.clone(),
            schedule,
            failures,
            admin_contribution: reservoir.funds_deposited,
            reservoir,
            depositor_balance: engine.token().balance_of(&self.depositor),
            nominee_balance: engine.token().balance_of(&self.nominee),
            events: engine.take_events(),
        })
    }

    /// Run many scripts in parallel
    pub fn run_batch(&self, scripts: &[ScenarioScript]) -> Vec<SipResult<ScenarioOutcome>> {
        scripts.par_iter().map(|script| self.run(script)).collect()
    }

    fn setup(&self, script: &ScenarioScript) -> SipResult<ScenarioEngine> {
        let opening_balance = script.scaled(script.opening_balance)?;
        let mut token = InMemoryToken::new();
        token.mint(&self.admin, ADMIN_FLOAT)?;
        token.mint(&self.depositor, opening_balance)?;
        token.mint(&self.nominee, opening_balance)?;

        let mut plan = script.plan.clone();
        plan.minimum_monthly_commitment = script.scaled(plan.minimum_monthly_commitment)?;
        let commitment = script.scaled(script.monthly_commitment)?;

        let clock = ManualClock::new(script.start_timestamp);
        let mut engine = SipEngine::new(self.admin.clone(), self.custody.clone(), token, clock);
        let plan_id = engine.create_plan(&self.admin, plan)?;

        self.approve(&mut engine, &self.depositor, commitment)?;
        engine.new_sip(&self.depositor, plan_id, commitment)?;
        Ok(engine)
    }

    fn approve(&self, engine: &mut ScenarioEngine, owner: &Address, amount: Amount) -> SipResult<()> {
        let custody = engine.custody().clone();
        engine.token_mut().approve(owner, &custody, amount)?;
        Ok(())
    }

    fn top_up(&self, engine: &mut ScenarioEngine, amount: Amount) -> SipResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.approve(engine, &self.admin, amount)?;
        engine.add_funds(&self.admin, amount)
    }

    fn caller(&self, by_nominee: bool) -> &Address {
        if by_nominee {
            &self.nominee
        } else {
            &self.depositor
        }
    }

    fn apply(&self, engine: &mut ScenarioEngine, script: &ScenarioScript, plan_id: PlanId, step: &ScenarioStep) -> SipResult<()> {
        match *step {
            ScenarioStep::Advance { seconds } => engine.clock_mut().advance(seconds),
            ScenarioStep::AdvanceMonths { months } => engine
                .clock_mut()
                .advance(i64::from(months) * EARTH_SECONDS_IN_MONTH),
            ScenarioStep::AdvanceToPayout { month } => {
                let available_at = engine.withdrawal_available_at(&self.depositor, plan_id, month)?;
                if available_at > engine.now() {
                    engine.clock_mut().set(available_at);
                }
            }
            ScenarioStep::Deposit { month, units, by_nominee } => {
                let caller = self.caller(by_nominee).clone();
                let commitment = engine.instance(&self.depositor, plan_id)?.monthly_commitment;
                let amount = commitment
                    .checked_mul(Amount::from(units))
                    .ok_or(SipError::Overflow)?;
                self.approve(engine, &caller, amount)?;
                engine.monthly_deposit(&caller, &self.depositor, plan_id, amount, month)?;
            }
            ScenarioStep::ToggleNominee { enabled } => {
                engine.toggle_nominee(&self.depositor, plan_id, &self.nominee, enabled)?
            }
            ScenarioStep::AddFunds { amount } => {
                let amount = script.scaled(amount)?;
                self.top_up(engine, amount)?;
            }
            ScenarioStep::FundShortfall => {
                let shortfall = engine.reservoir_shortfall();
                self.top_up(engine, shortfall)?;
            }
            ScenarioStep::FundBooster => {
                let shortfall = engine.power_booster_shortfall(&self.depositor, plan_id)?;
                self.top_up(engine, shortfall)?;
            }
            ScenarioStep::Withdraw { month, by_nominee } => {
                let caller = self.caller(by_nominee).clone();
                engine.withdraw_benefit(&caller, &self.depositor, plan_id, month)?;
            }
            ScenarioStep::WithdrawRange { from, to, by_nominee } => {
                let caller = self.caller(by_nominee).clone();
                for month in from..=to {
                    let available_at = engine.withdrawal_available_at(&self.depositor, plan_id, month)?;
                    if available_at > engine.now() {
                        engine.clock_mut().set(available_at);
                    }
                    engine.withdraw_benefit(&caller, &self.depositor, plan_id, month)?;

                    let boosters = engine.get_plan(plan_id)?.power_booster_count();
                    let claimed = engine.instance(&self.depositor, plan_id)?.power_booster_withdrawals;
                    if month % POWER_BOOSTER_INTERVAL_MONTHS == 0 && claimed < boosters {
                        let shortfall = engine.power_booster_shortfall(&self.depositor, plan_id)?;
                        self.top_up(engine, shortfall)?;
                        engine.withdraw_power_booster(&caller, &self.depositor, plan_id)?;
                    }
                }
            }
            ScenarioStep::PowerBooster { by_nominee } => {
                let caller = self.caller(by_nominee).clone();
                engine.withdraw_power_booster(&caller, &self.depositor, plan_id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DepositStatus;
    use crate::schedule::PayoutState;

    fn small_script(steps: Vec<ScenarioStep>) -> ScenarioScript {
        ScenarioScript {
            name: "small".to_string(),
            plan: PlanConfig::new(100, 3, 3, 0, 120, 0, 60),
            monthly_commitment: 100,
            decimals: 0,
            start_timestamp: 0,
            opening_balance: 1_000,
            steps,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let runner = ScenarioRunner::new();
        let outcome = runner.run(&ScenarioScript::reference()).unwrap();

        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        let boosters = outcome
            .events
            .iter()
            .filter(|e| matches!(e, SipEvent::PowerBoosterWithdrawn { .. }))
            .count();
        assert_eq!(boosters, 3);

        // the nominee paid 6000 in and received every payout
        let unit = 10u128.pow(18);
        assert!(outcome.nominee_balance > 10_000 * unit - 6_000 * unit);
        assert_eq!(outcome.depositor_balance, 10_000 * unit - 500 * unit);

        let summary = outcome.schedule.summary();
        assert_eq!(summary.months_settled, 108);
        assert_eq!(summary.total_outstanding, outcome.reservoir.pending_benefit_total);
        assert!(outcome.schedule.rows[..108].iter().all(|r| r.state != PayoutState::Pending));
    }

    #[test]
    fn test_refused_steps_are_recorded() {
        let script = small_script(vec![
            ScenarioStep::Withdraw { month: 1, by_nominee: false },
            ScenarioStep::Deposit { month: 2, units: 1, by_nominee: true },
            ScenarioStep::AdvanceMonths { months: 1 },
            ScenarioStep::Deposit { month: 2, units: 1, by_nominee: false },
        ]);
        let outcome = ScenarioRunner::new().run(&script).unwrap();

        let failed: Vec<usize> = outcome.failures.iter().map(|f| f.step).collect();
        assert_eq!(failed, vec![0, 1]);
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            SipEvent::DepositRecorded { month_id: 2, status: DepositStatus::OnTime, .. }
        )));
    }

    #[test]
    fn test_late_deposit_penalised() {
        let script = small_script(vec![
            ScenarioStep::AdvanceMonths { months: 3 },
            ScenarioStep::Deposit { month: 2, units: 1, by_nominee: false },
            ScenarioStep::FundShortfall,
        ]);
        let outcome = ScenarioRunner::new().run(&script).unwrap();

        assert!(outcome.failures.is_empty());
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            SipEvent::DepositRecorded { month_id: 2, status: DepositStatus::Default, .. }
        )));
        assert_eq!(outcome.reservoir.funds_deposited, outcome.reservoir.pending_benefit_total);
    }

    #[test]
    fn test_script_json_round_trip() {
        let json = r#"{
            "name": "json",
            "plan": {
                "minimum_monthly_commitment": 100,
                "accumulation_period_months": 3,
                "benefit_period_years": 3,
                "grace_period_seconds": 0,
                "monthly_benefit_factor": 120,
                "grace_penalty_factor": 0,
                "default_penalty_factor": 60
            },
            "monthly_commitment": 200,
            "start_timestamp": 0,
            "opening_balance": 1000,
            "steps": [
                {"action": "advance_months", "months": 1},
                {"action": "deposit", "month": 2},
                {"action": "fund_shortfall"},
                {"action": "withdraw_range", "from": 1, "to": 36}
            ]
        }"#;
        let script: ScenarioScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.decimals, 0);
        assert_eq!(script.plan.power_booster_rate_bps, 1_000);
        assert_eq!(script.steps[1], ScenarioStep::Deposit { month: 2, units: 1, by_nominee: false });

        let outcome = ScenarioRunner::new().run(&script).unwrap();
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
        assert_eq!(outcome.schedule.summary().months_settled, 36);
    }

    #[test]
    fn test_run_batch_matches_sequential() {
        let runner = ScenarioRunner::new();
        let scripts: Vec<ScenarioScript> = (1..=4)
            .map(|units| {
                small_script(vec![
                    ScenarioStep::AdvanceMonths { months: 1 },
                    ScenarioStep::Deposit { month: 2, units, by_nominee: false },
                    ScenarioStep::FundShortfall,
                ])
            })
            .collect();

        let batch = runner.run_batch(&scripts);
        for (script, outcome) in scripts.iter().zip(batch) {
            let outcome = outcome.unwrap();
            let sequential = runner.run(script).unwrap();
            assert_eq!(outcome.reservoir, sequential.reservoir);
        }
    }

    #[test]
    fn test_oversized_advance_saturates() {
        let script = small_script(vec![
            ScenarioStep::Advance { seconds: i64::MAX },
            ScenarioStep::Deposit { month: 2, units: 1, by_nominee: false },
        ]);
        let outcome = ScenarioRunner::new().run(&script).unwrap();
        let failed: Vec<usize> = outcome.failures.iter().map(|f| f.step).collect();
        assert_eq!(failed, vec![1]);
    }

    #[test]
    fn test_invalid_plan_aborts() {
        let mut script = small_script(Vec::new());
        script.plan.accumulation_period_months = 0;
        assert!(matches!(ScenarioRunner::new().run(&script), Err(SipError::InvalidConfig(_))));
    }
}
