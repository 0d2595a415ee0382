//! SDE valuation calculator
//!
//! `value = SDE x industry multiple`, with a handful of fixed adjustments
//! and clamps. Pure and stateless; callers persist the result.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GenieError, Result};
use crate::industry::{self, MultipleRange};

/// Bounds applied to adjusted multiples
pub const MIN_MULTIPLE: f64 = 0.5;
pub const MAX_MULTIPLE: f64 = 6.0;

/// Revenue multiples used when SDE is zero or negative
pub const REVENUE_FLOOR: MultipleRange = MultipleRange { low: 0.10, high: 0.25 };

const MAX_BUSINESS_NAME_LEN: usize = 200;
const MAX_AMOUNT: f64 = 1.0e12;
const MAX_YEARS: u32 = 200;

/// Discretionary add-backs that are folded into SDE
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Addbacks {
    pub depreciation: f64,
    pub interest: f64,
    pub amortization: f64,
    pub one_time_expenses: f64,
    pub personal_expenses: f64,
}

impl Addbacks {
    /// Named add-back amounts, in display order
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("depreciation", self.depreciation),
            ("interest", self.interest),
            ("amortization", self.amortization),
            ("one_time_expenses", self.one_time_expenses),
            ("personal_expenses", self.personal_expenses),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, v)| v).sum()
    }
}

/// Direction of revenue over the last few years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueTrend {
    Growing,
    Stable,
    Declining,
}

impl RevenueTrend {
    fn adjustment(self) -> f64 {
        match self {
            Self::Growing => 0.3,
            Self::Stable => 0.0,
            Self::Declining => -0.4,
        }
    }
}

impl fmt::Display for RevenueTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Growing => write!(f, "growing"),
            Self::Stable => write!(f, "stable"),
            Self::Declining => write!(f, "declining"),
        }
    }
}

impl FromStr for RevenueTrend {
    type Err = GenieError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "growing" | "up" => Ok(Self::Growing),
            "stable" | "flat" => Ok(Self::Stable),
            "declining" | "down" => Ok(Self::Declining),
            other => Err(GenieError::validation(
                "revenue_trend",
                format!("unknown trend '{}'", other),
            )),
        }
    }
}

/// Financial inputs submitted by the valuation form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub business_name: String,
    pub industry: String,
    pub annual_revenue: f64,
    pub net_profit: f64,
    pub owner_salary: f64,
    #[serde(default)]
    pub addbacks: Addbacks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_in_business: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_trend: Option<RevenueTrend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ValuationInput {
    /// Check field constraints. Net profit may be negative; everything else
    /// must be a non-negative finite amount.
    pub fn validate(&self) -> Result<()> {
        let name = self.business_name.trim();
        if name.is_empty() {
            return Err(GenieError::validation("business_name", "cannot be empty"));
        }
        if name.chars().count() > MAX_BUSINESS_NAME_LEN {
            return Err(GenieError::validation(
                "business_name",
                format!("exceeds maximum length of {} characters", MAX_BUSINESS_NAME_LEN),
            ));
        }
        if self.industry.trim().is_empty() {
            return Err(GenieError::validation("industry", "cannot be empty"));
        }

        check_amount("annual_revenue", self.annual_revenue, false)?;
        check_amount("net_profit", self.net_profit, true)?;
        check_amount("owner_salary", self.owner_salary, false)?;
        for (field, value) in self.addbacks.entries() {
            check_amount(field, value, false)?;
        }

        if let Some(years) = self.years_in_business {
            if years > MAX_YEARS {
                return Err(GenieError::validation(
                    "years_in_business",
                    format!("must be at most {}", MAX_YEARS),
                ));
            }
        }

        Ok(())
    }

    /// Raw SDE: net profit + owner salary + add-backs, before clamping
    pub fn sde(&self) -> f64 {
        self.net_profit + self.owner_salary + self.addbacks.total()
    }
}

fn check_amount(field: &str, value: f64, allow_negative: bool) -> Result<()> {
    if !value.is_finite() {
        return Err(GenieError::validation(field, "must be a finite number"));
    }
    if !allow_negative && value < 0.0 {
        return Err(GenieError::validation(field, "cannot be negative"));
    }
    if value.abs() > MAX_AMOUNT {
        return Err(GenieError::validation(field, "is unrealistically large"));
    }
    Ok(())
}

/// How the range was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    /// SDE x industry multiple
    Sde,
    /// Revenue x floor multiple, used when SDE is not positive
    RevenueFloor,
}

/// Computed valuation range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub method: ValuationMethod,
    pub sde: f64,
    pub industry_key: String,
    pub industry_label: String,
    pub used_default_multiple: bool,
    pub multiple_low: f64,
    pub multiple_high: f64,
    pub value_low: f64,
    pub value_mid: f64,
    pub value_high: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Compute the valuation range for validated inputs.
///
/// # Example
/// ```
/// use vgenie_core::valuation::{compute, Addbacks, ValuationInput};
///
/// let input = ValuationInput {
///     business_name: "Corner Cafe".into(),
///     industry: "Unlisted Industry".into(),
///     annual_revenue: 500_000.0,
///     net_profit: 60_000.0,
///     owner_salary: 40_000.0,
///     addbacks: Addbacks::default(),
///     years_in_business: None,
///     revenue_trend: None,
///     location: None,
/// };
/// let result = compute(&input).unwrap();
/// assert_eq!(result.value_low, 200_000.0);
/// assert_eq!(result.value_high, 300_000.0);
/// ```
pub fn compute(input: &ValuationInput) -> Result<ValuationResult> {
    input.validate()?;

    let matched = industry::lookup(&input.industry);
    let mut warnings = Vec::new();

    if matched.used_default {
        warnings.push(format!(
            "industry '{}' is not in the multiple table; using the default multiple",
            matched.label
        ));
    }

    let mut sde = input.sde();
    if sde > input.annual_revenue {
        warnings.push("SDE exceeded annual revenue and was capped at revenue".to_string());
        sde = input.annual_revenue;
    }

    let (method, base, multiple) = if sde <= 0.0 {
        warnings.push(
            "SDE is not positive; range is based on a revenue floor instead".to_string(),
        );
        (ValuationMethod::RevenueFloor, input.annual_revenue, REVENUE_FLOOR)
    } else {
        let adjusted = adjust_multiple(matched.multiple, input);
        (ValuationMethod::Sde, sde, adjusted)
    };

    let value_low = (base * multiple.low).round();
    let value_high = (base * multiple.high).round();
    let value_mid = ((value_low + value_high) / 2.0).round();

    Ok(ValuationResult {
        method,
        sde: sde.round(),
        industry_key: matched.key,
        industry_label: matched.label,
        used_default_multiple: matched.used_default,
        multiple_low: multiple.low,
        multiple_high: multiple.high,
        value_low,
        value_mid,
        value_high,
        warnings,
    })
}

/// Apply the business-age and trend adjustments, then clamp.
fn adjust_multiple(base: MultipleRange, input: &ValuationInput) -> MultipleRange {
    let mut delta = 0.0;

    if let Some(years) = input.years_in_business {
        delta += match years {
            0..=1 => -0.3,
            2..=4 => 0.0,
            5..=9 => 0.2,
            _ => 0.4,
        };
    }
    if let Some(trend) = input.revenue_trend {
        delta += trend.adjustment();
    }

    let low = round2((base.low + delta).clamp(MIN_MULTIPLE, MAX_MULTIPLE));
    let high = round2((base.high + delta).clamp(MIN_MULTIPLE, MAX_MULTIPLE));

    MultipleRange {
        low: low.min(high),
        high,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
