//! Load plan configurations from CSV

use super::{PlanConfig, DEFAULT_POWER_BOOSTER_RATE_BPS};
use crate::token::Amount;
use csv::Reader;
use std::error::Error;
use std::path::Path;

/// Default location of the plan table
pub const DEFAULT_PLANS_PATH: &str = "data/plans.csv";

/// Raw CSV row matching plans.csv columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "MinimumMonthlyCommitment")]
    minimum_monthly_commitment: Amount,
    #[serde(rename = "AccumulationPeriodMonths")]
    accumulation_period_months: u32,
    #[serde(rename = "BenefitPeriodYears")]
    benefit_period_years: u32,
    #[serde(rename = "GracePeriodSeconds")]
    grace_period_seconds: i64,
    #[serde(rename = "MonthlyBenefitFactor")]
    monthly_benefit_factor: u32,
    #[serde(rename = "GracePenaltyFactor")]
    grace_penalty_factor: u32,
    #[serde(rename = "DefaultPenaltyFactor")]
    default_penalty_factor: u32,
    #[serde(rename = "PowerBoosterRateBps", default)]
    power_booster_rate_bps: Option<u32>,
}

impl CsvRow {
    fn to_plan(self) -> Result<PlanConfig, Box<dyn Error>> {
        let plan = PlanConfig::new(
            self.minimum_monthly_commitment,
            self.accumulation_period_months,
            self.benefit_period_years,
            self.grace_period_seconds,
            self.monthly_benefit_factor,
            self.grace_penalty_factor,
            self.default_penalty_factor,
        )
        .with_power_booster_rate(self.power_booster_rate_bps.unwrap_or(DEFAULT_POWER_BOOSTER_RATE_BPS));

        plan.validate()?;
        Ok(plan)
    }
}

/// Load all plans from a CSV file, in row order
pub fn load_plans<P: AsRef<Path>>(path: P) -> Result<Vec<PlanConfig>, Box<dyn Error>> {
    let reader = Reader::from_path(path)?;
    read_plans(reader)
}

/// Load plans from any reader (e.g., string buffer)
pub fn load_plans_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<PlanConfig>, Box<dyn Error>> {
    read_plans(Reader::from_reader(reader))
}

fn read_plans<R: std::io::Read>(mut reader: Reader<R>) -> Result<Vec<PlanConfig>, Box<dyn Error>> {
    let mut plans = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        plans.push(row.to_plan()?);
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_plans_from_reader() {
        let data = "\
MinimumMonthlyCommitment,AccumulationPeriodMonths,BenefitPeriodYears,GracePeriodSeconds,MonthlyBenefitFactor,GracePenaltyFactor,DefaultPenaltyFactor,PowerBoosterRateBps
500,12,9,864000,200,10,20,
1000,24,6,0,150,5,15,250
";
        let plans = load_plans_from_reader(data.as_bytes()).expect("Failed to load plans");
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0], PlanConfig::new(500, 12, 9, 864_000, 200, 10, 20));
        assert_eq!(plans[1].power_booster_rate_bps, 250);
        assert_eq!(plans[1].accumulation_period_months, 24);
    }

    #[test]
    fn test_invalid_row_rejected() {
        let data = "\
MinimumMonthlyCommitment,AccumulationPeriodMonths,BenefitPeriodYears,GracePeriodSeconds,MonthlyBenefitFactor,GracePenaltyFactor,DefaultPenaltyFactor
500,0,9,864000,200,10,20
";
        assert!(load_plans_from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_load_default_plans() {
        let plans = load_plans(DEFAULT_PLANS_PATH).expect("Failed to load plans.csv");
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].power_booster_count(), 3);
        assert_eq!(plans[1].power_booster_rate_bps, DEFAULT_POWER_BOOSTER_RATE_BPS);
    }
}
