//! Valuation report rendering
//!
//! One [`ReportView`] feeds two renderers: a print-ready HTML document and
//! a single-page PDF drawn with explicit coordinates.

pub mod html;
pub mod pdf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::money::{format_multiple, format_usd};
use crate::valuation::{ValuationInput, ValuationMethod, ValuationResult};

pub use html::render_html;
pub use pdf::render_pdf;

pub const DISCLAIMER: &str = "This report is an automated estimate based on the figures you \
provided and typical industry multiples. It is not an appraisal, audit or offer to purchase. \
Consult a qualified business broker or valuation professional before making decisions.";

/// Everything a renderer needs about one stored valuation
#[derive(Debug, Clone)]
pub struct ReportView {
    pub valuation_id: Uuid,
    pub prepared_for: Option<String>,
    pub created_at: DateTime<Utc>,
    pub input: ValuationInput,
    pub result: ValuationResult,
}

/// A labelled amount in the SDE breakdown
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownLine {
    pub label: &'static str,
    pub amount: f64,
}

impl ReportView {
    pub fn title(&self) -> String {
        format!("Valuation Report: {}", self.input.business_name.trim())
    }

    pub fn reference(&self) -> String {
        self.valuation_id.simple().to_string()[..8].to_uppercase()
    }

    pub fn date_line(&self) -> String {
        self.created_at.format("%B %-d, %Y").to_string()
    }

    pub fn range_line(&self) -> String {
        format!(
            "{} - {}",
            format_usd(self.result.value_low),
            format_usd(self.result.value_high)
        )
    }

    pub fn multiple_line(&self) -> String {
        let basis = match self.result.method {
            ValuationMethod::Sde => "SDE",
            ValuationMethod::RevenueFloor => "annual revenue",
        };
        format!(
            "{} - {} of {}",
            format_multiple(self.result.multiple_low),
            format_multiple(self.result.multiple_high),
            basis
        )
    }

    /// Non-zero components of SDE in display order
    pub fn breakdown(&self) -> Vec<BreakdownLine> {
        let input = &self.input;
        let mut lines = vec![
            BreakdownLine { label: "Net profit", amount: input.net_profit },
            BreakdownLine { label: "Owner salary", amount: input.owner_salary },
        ];
        let addbacks = [
            ("Depreciation", input.addbacks.depreciation),
            ("Interest", input.addbacks.interest),
            ("Amortization", input.addbacks.amortization),
            ("One-time expenses", input.addbacks.one_time_expenses),
            ("Personal expenses", input.addbacks.personal_expenses),
        ];
        lines.extend(
            addbacks
                .into_iter()
                .filter(|(_, amount)| *amount != 0.0)
                .map(|(label, amount)| BreakdownLine { label, amount }),
        );
        lines
    }

    /// Key/value facts shown under the headline range
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        let mut facts = vec![
            ("Industry", self.result.industry_label.clone()),
            ("Annual revenue", format_usd(self.input.annual_revenue)),
            ("Seller's discretionary earnings", format_usd(self.result.sde)),
            ("Multiple applied", self.multiple_line()),
            ("Midpoint estimate", format_usd(self.result.value_mid)),
        ];
        if let Some(years) = self.input.years_in_business {
            facts.push(("Years in business", years.to_string()));
        }
        if let Some(trend) = self.input.revenue_trend {
            facts.push(("Revenue trend", trend.to_string()));
        }
        if let Some(location) = self.input.location.as_deref().filter(|l| !l.trim().is_empty()) {
            facts.push(("Location", location.trim().to_string()));
        }
        facts
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::valuation::{compute, Addbacks};
    use chrono::TimeZone;

    pub fn view() -> ReportView {
        let input = ValuationInput {
            business_name: "Joe's <Pizza> & Grill".into(),
            industry: "restaurant".into(),
            annual_revenue: 850_000.0,
            net_profit: 90_000.0,
            owner_salary: 60_000.0,
            addbacks: Addbacks {
                depreciation: 12_000.0,
                ..Addbacks::default()
            },
            years_in_business: Some(8),
            revenue_trend: None,
            location: Some("Austin, TX".into()),
        };
        let result = compute(&input).unwrap();
        ReportView {
            valuation_id: Uuid::parse_str("3f2c8a10-1d2e-4b5c-9a7b-123456789abc").unwrap(),
            prepared_for: Some("joe@example.com".into()),
            created_at: Utc.with_ymd_and_hms(2026, 4, 2, 9, 30, 0).unwrap(),
            input,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_lines() {
        let view = fixtures::view();
        assert_eq!(view.reference(), "3F2C8A10");
        assert_eq!(view.date_line(), "April 2, 2026");
        // SDE 162,000 x (1.7, 2.7)
        assert_eq!(view.range_line(), "$275,400 - $437,400");
        assert_eq!(view.multiple_line(), "1.7x - 2.7x of SDE");
    }

    #[test]
    fn breakdown_skips_zero_addbacks() {
        let view = fixtures::view();
        let labels: Vec<_> = view.breakdown().iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["Net profit", "Owner salary", "Depreciation"]);
    }

    #[test]
    fn facts_include_optional_fields() {
        let view = fixtures::view();
        let facts = view.facts();
        assert!(facts.iter().any(|(k, v)| *k == "Years in business" && v == "8"));
        assert!(facts.iter().any(|(k, v)| *k == "Location" && v == "Austin, TX"));
        assert!(!facts.iter().any(|(k, _)| *k == "Revenue trend"));
    }
}
