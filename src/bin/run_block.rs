//! Run a whole cohort of SIPs from a cohort CSV
//!
//! Every member deposits each accumulation month (optionally late), withdraws every payout
//! month and claims each power booster. Outputs monthly aggregated payouts.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sip_ledger::ledger::EARTH_SECONDS_IN_MONTH;
use sip_ledger::plan::{load_plans, DEFAULT_PLANS_PATH};
use sip_ledger::scenario::{ScenarioOutcome, ScenarioStep};
use sip_ledger::{Amount, PlanConfig, ScenarioRunner, ScenarioScript, SipEvent};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "run_block", about = "Simulate a cohort of SIPs and aggregate monthly payouts")]
struct Args {
    /// Cohort table
    #[arg(short, long, default_value = "data/cohort.csv")]
    cohort: PathBuf,

    /// Plan table; `PlanIndex` in the cohort refers to its rows
    #[arg(short, long, default_value = DEFAULT_PLANS_PATH)]
    plans: PathBuf,

    /// Aggregated output
    #[arg(short, long, default_value = "block_payouts.csv")]
    output: PathBuf,

    /// Unix time every SIP in the cohort opens at
    #[arg(long, default_value_t = 1_600_000_000)]
    start: i64,
}

/// One cohort member
#[derive(Debug, Clone, Deserialize)]
struct CohortRow {
    #[serde(rename = "DepositorId")]
    depositor_id: String,
    #[serde(rename = "PlanIndex")]
    plan_index: usize,
    #[serde(rename = "CommitmentUnits")]
    commitment_units: u32,
    #[serde(rename = "LateSeconds")]
    late_seconds: i64,
}

impl CohortRow {
    fn to_script(&self, plan: &PlanConfig, start: i64) -> Result<ScenarioScript> {
        let mut steps = Vec::new();
        for month in 2..=plan.accumulation_period_months {
            let advance = if month == 2 {
                ScenarioStep::Advance {
                    seconds: (2 * EARTH_SECONDS_IN_MONTH).saturating_add(self.late_seconds),
                }
            } else {
                ScenarioStep::AdvanceMonths { months: 1 }
            };
            steps.push(advance);
            steps.push(ScenarioStep::Deposit {
                month,
                units: 1,
                by_nominee: false,
            });
        }
        steps.push(ScenarioStep::FundShortfall);
        steps.push(ScenarioStep::WithdrawRange {
            from: 1,
            to: plan.last_payout_month(),
            by_nominee: false,
        });

        let Some(commitment) = plan
            .minimum_monthly_commitment
            .checked_mul(Amount::from(self.commitment_units))
        else {
            bail!("{}: commitment of {} units overflows", self.depositor_id, self.commitment_units);
        };
        let Some(opening_balance) = commitment.checked_mul(Amount::from(plan.accumulation_period_months)) else {
            bail!("{}: opening balance overflows", self.depositor_id);
        };
        Ok(ScenarioScript {
            name: self.depositor_id.clone(),
            plan: plan.clone(),
            monthly_commitment: commitment,
            decimals: 0,
            start_timestamp: start,
            opening_balance,
            steps,
        })
    }
}

/// Aggregated monthly results across the cohort
#[derive(Debug, Clone, Default, Serialize)]
struct AggregatedRow {
    #[serde(rename = "Month")]
    month: u32,
    #[serde(rename = "ActiveSips")]
    active_sips: u32,
    #[serde(rename = "ScheduledBenefit")]
    scheduled_benefit: Amount,
    #[serde(rename = "SettledBenefit")]
    settled_benefit: Amount,
    #[serde(rename = "BoosterPayout")]
    booster_payout: Amount,
}

fn aggregate(outcomes: &[ScenarioOutcome]) -> Vec<AggregatedRow> {
    let horizon = outcomes
        .iter()
        .map(|o| o.schedule.rows.len())
        .max()
        .unwrap_or(0);
    let mut aggregated: Vec<AggregatedRow> = (1..=horizon as u32)
        .map(|m| AggregatedRow { month: m, ..Default::default() })
        .collect();

    for outcome in outcomes {
        for row in &outcome.schedule.rows {
            let agg = &mut aggregated[(row.payout_month - 1) as usize];
            if row.scheduled_benefit > 0 {
                agg.active_sips += 1;
            }
            agg.scheduled_benefit += row.scheduled_benefit;
            agg.settled_benefit += row.scheduled_benefit - row.pending_benefit;
        }
        for event in &outcome.events {
            if let SipEvent::PowerBoosterWithdrawn { booster_index, amount, .. } = event {
                let month = booster_index * sip_ledger::plan::POWER_BOOSTER_INTERVAL_MONTHS;
                if let Some(agg) = aggregated.get_mut((month - 1) as usize) {
                    agg.booster_payout += amount;
                }
            }
        }
    }
    aggregated
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    println!("Loading plans from {}...", args.plans.display());
    let plans = load_plans(&args.plans)
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("loading {}", args.plans.display()))?;

    let mut reader = csv::Reader::from_path(&args.cohort)
        .with_context(|| format!("opening {}", args.cohort.display()))?;
    let cohort: Vec<CohortRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| format!("reading {}", args.cohort.display()))?;
    println!("Loaded {} plans and {} members in {:?}", plans.len(), cohort.len(), start.elapsed());

    let mut scripts = Vec::with_capacity(cohort.len());
    for member in &cohort {
        let Some(plan) = plans.get(member.plan_index) else {
            bail!("{} refers to unknown plan {}", member.depositor_id, member.plan_index);
        };
        scripts.push(member.to_script(plan, args.start)?);
    }

    println!("Running scenarios...");
    let run_start = Instant::now();
    let runner = ScenarioRunner::new();
    let outcomes: Vec<ScenarioOutcome> = scripts
        .par_iter()
        .map(|script| runner.run(script))
        .collect::<Result<_, _>>()
        .context("running cohort")?;
    println!("Scenarios complete in {:?}", run_start.elapsed());

    for outcome in &outcomes {
        for failure in &outcome.failures {
            println!("  {} step {} refused: {}", outcome.name, failure.step, failure.error);
        }
    }

    println!("Aggregating results...");
    let aggregated = aggregate(&outcomes);

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for row in &aggregated {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("Output written to {}", args.output.display());

    let deposited: Amount = outcomes.iter().map(|o| o.schedule.total_deposited).sum();
    let admin: Amount = outcomes.iter().map(|o| o.admin_contribution).sum();
    let paid: Amount = outcomes.iter().map(|o| o.reservoir.funds_paid_out).sum();
    println!("\nBlock Summary:");
    println!("  Members:            {}", outcomes.len());
    println!("  Total deposited:    {}", deposited);
    println!("  Admin contribution: {}", admin);
    println!("  Total paid out:     {}", paid);

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(commitment_units: u32) -> CohortRow {
        CohortRow {
            depositor_id: "member-001".to_string(),
            plan_index: 0,
            commitment_units,
            late_seconds: 0,
        }
    }

    #[test]
    fn test_member_script() {
        let plan = PlanConfig::new(500, 12, 9, 864_000, 200, 10, 20);
        let script = member(2).to_script(&plan, 0).unwrap();
        assert_eq!(script.monthly_commitment, 1_000);
        assert_eq!(script.opening_balance, 12_000);
    }

    #[test]
    fn test_member_script_overflow_rejected() {
        let plan = PlanConfig::new(u128::MAX / 2, 12, 9, 864_000, 200, 10, 20);
        assert!(member(3).to_script(&plan, 0).is_err());

        let plan = PlanConfig::new(u128::MAX / 4, 12, 9, 864_000, 200, 10, 20);
        assert!(member(1).to_script(&plan, 0).is_err());
    }
}
