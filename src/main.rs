//! SIP Ledger CLI
//!
//! Replays a scenario script (or the built-in reference scenario) and writes the resulting
//! payout schedule

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sip_ledger::schedule::PayoutState;
use sip_ledger::{ScenarioRunner, ScenarioScript};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sip_ledger", version, about = "Replay a SIP scenario and report its payouts")]
struct Args {
    /// Scenario script (JSON); the reference scenario is used when omitted
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Payout schedule output
    #[arg(short, long, default_value = "payout_schedule.csv")]
    output: PathBuf,

    /// Optional event log output (JSON)
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Number of schedule rows printed to the console
    #[arg(long, default_value_t = 24)]
    rows: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let script = match &args.scenario {
        Some(path) => ScenarioScript::from_json_file(path)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => ScenarioScript::reference(),
    };

    println!("SIP Ledger v{}", env!("CARGO_PKG_VERSION"));
    println!("======================\n");
    println!("Scenario: {} ({} steps)", script.name, script.steps.len());

    let runner = ScenarioRunner::new();
    let outcome = runner
        .run(&script)
        .with_context(|| format!("running scenario {}", script.name))?;

    for failure in &outcome.failures {
        println!("  step {} refused: {}", failure.step, failure.error);
    }
    println!();

    println!("{:>5} {:>26} {:>28} {:>28} {:>10} {:>6}",
        "Month", "Available", "Scheduled", "Pending", "State", "Block");
    println!("{}", "-".repeat(110));
    for row in outcome.schedule.rows.iter().take(args.rows) {
        let state = match row.state {
            PayoutState::Pending => "pending",
            PayoutState::Withdrawn => "withdrawn",
            PayoutState::Boosted => "boosted",
        };
        let block = row.booster_block.map(|b| b.to_string()).unwrap_or_default();
        println!("{:>5} {:>26} {:>28} {:>28} {:>10} {:>6}",
            row.payout_month,
            row.available_at_utc,
            row.scheduled_benefit,
            row.pending_benefit,
            state,
            block,
        );
    }
    if outcome.schedule.rows.len() > args.rows {
        println!("... ({} more months)", outcome.schedule.rows.len() - args.rows);
    }

    outcome
        .schedule
        .write_csv_file(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("\nSchedule written to {}", args.output.display());

    if let Some(path) = &args.events {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &outcome.events)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Events written to {}", path.display());
    }

    let summary = outcome.schedule.summary();
    println!("\nSummary:");
    println!("  Total deposited:     {}", summary.total_deposited);
    println!("  Total scheduled:     {}", summary.total_scheduled);
    println!("  Total settled:       {}", summary.total_settled);
    println!("  Still outstanding:   {}", summary.total_outstanding);
    println!("  Months settled:      {} / {}", summary.months_settled, summary.payout_months);
    println!("  Benefit multiple:    {:.4}x", summary.benefit_multiple);
    println!("  Admin contribution:  {}", outcome.admin_contribution);
    println!("  Reservoir paid out:  {}", outcome.reservoir.funds_paid_out);
    println!("  Depositor balance:   {}", outcome.depositor_balance);
    println!("  Nominee balance:     {}", outcome.nominee_balance);

    Ok(())
}
