//! Estimate command - offline valuation from the command line

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use vgenie_core::money::{format_multiple, format_usd};
use vgenie_core::{compute, Addbacks, RevenueTrend, ValuationInput, ValuationMethod, ValuationResult};

#[derive(Parser, Debug)]
pub struct EstimateArgs {
    /// Industry key or label (see `vgenie industries`)
    #[arg(long, short = 'i')]
    pub industry: String,

    /// Annual revenue in dollars
    #[arg(long)]
    pub revenue: f64,

    /// Net profit in dollars (may be negative)
    #[arg(long, allow_hyphen_values = true)]
    pub profit: f64,

    /// Owner salary in dollars
    #[arg(long, default_value_t = 0.0)]
    pub owner_salary: f64,

    #[arg(long, default_value_t = 0.0)]
    pub depreciation: f64,

    #[arg(long, default_value_t = 0.0)]
    pub interest: f64,

    #[arg(long, default_value_t = 0.0)]
    pub amortization: f64,

    /// Non-recurring expenses to add back
    #[arg(long, default_value_t = 0.0)]
    pub one_time: f64,

    /// Owner's personal expenses run through the business
    #[arg(long, default_value_t = 0.0)]
    pub personal: f64,

    #[arg(long)]
    pub years: Option<u32>,

    #[arg(long, value_enum)]
    pub trend: Option<TrendArg>,

    /// Business name shown in the output
    #[arg(long, default_value = "My Business")]
    pub name: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum TrendArg {
    Growing,
    Stable,
    Declining,
}

impl From<TrendArg> for RevenueTrend {
    fn from(t: TrendArg) -> Self {
        match t {
            TrendArg::Growing => Self::Growing,
            TrendArg::Stable => Self::Stable,
            TrendArg::Declining => Self::Declining,
        }
    }
}

impl EstimateArgs {
    fn to_input(&self) -> ValuationInput {
        ValuationInput {
            business_name: self.name.clone(),
            industry: self.industry.clone(),
            annual_revenue: self.revenue,
            net_profit: self.profit,
            owner_salary: self.owner_salary,
            addbacks: Addbacks {
                depreciation: self.depreciation,
                interest: self.interest,
                amortization: self.amortization,
                one_time_expenses: self.one_time,
                personal_expenses: self.personal,
            },
            years_in_business: self.years,
            revenue_trend: self.trend.map(RevenueTrend::from),
            location: None,
        }
    }
}

fn render_text(input: &ValuationInput, result: &ValuationResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", input.business_name));
    out.push_str(&format!("  Industry:   {}\n", result.industry_label));
    out.push_str(&format!("  SDE:        {}\n", format_usd(result.sde)));
    let basis = match result.method {
        ValuationMethod::Sde => "SDE",
        ValuationMethod::RevenueFloor => "revenue",
    };
    out.push_str(&format!(
        "  Multiple:   {} - {} of {}\n",
        format_multiple(result.multiple_low),
        format_multiple(result.multiple_high),
        basis
    ));
    out.push_str(&format!(
        "  Value:      {} - {} (mid {})\n",
        format_usd(result.value_low),
        format_usd(result.value_high),
        format_usd(result.value_mid)
    ));
    for warning in &result.warnings {
        out.push_str(&format!("  ⚠ {}\n", warning));
    }
    out
}

pub fn run_estimate(args: EstimateArgs) -> Result<()> {
    let input = args.to_input();
    let result = compute(&input).context("Invalid valuation input")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_text(&input, &result));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> EstimateArgs {
        EstimateArgs {
            industry: "restaurant".into(),
            revenue: 850_000.0,
            profit: 120_000.0,
            owner_salary: 60_000.0,
            depreciation: 0.0,
            interest: 0.0,
            amortization: 0.0,
            one_time: 5_000.0,
            personal: 0.0,
            years: Some(8),
            trend: Some(TrendArg::Stable),
            name: "Harbor Cafe".into(),
            json: false,
        }
    }

    #[test]
    fn maps_flags_to_input() {
        let input = args().to_input();
        assert_eq!(input.addbacks.one_time_expenses, 5_000.0);
        assert_eq!(input.revenue_trend, Some(RevenueTrend::Stable));
        assert_eq!(input.years_in_business, Some(8));
    }

    #[test]
    fn text_output_has_range() {
        let input = args().to_input();
        let result = compute(&input).unwrap();
        let text = render_text(&input, &result);
        assert!(text.starts_with("Harbor Cafe\n"));
        assert!(text.contains(&format_usd(result.value_low)));
        assert!(text.contains(&format_usd(result.value_high)));
    }
}
