//! Stored valuations

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vgenie_core::report::ReportView;
use vgenie_core::{ValuationInput, ValuationResult};

/// Valuation row; `input` and `result` are stored as JSON
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub input: ValuationInput,
    pub result: ValuationResult,
    pub is_paid: bool,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Valuation {
    pub fn report_view(&self, prepared_for: Option<String>) -> ReportView {
        ReportView {
            valuation_id: self.id,
            prepared_for,
            created_at: self.created_at,
            input: self.input.clone(),
            result: self.result.clone(),
        }
    }

    /// Slug-ish file name for downloads
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .input
            .business_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let stem = stem
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        if stem.is_empty() {
            "valuation-report".to_string()
        } else {
            format!("{}-valuation", stem)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewValuation {
    pub user_id: Uuid,
    pub input: ValuationInput,
    pub result: ValuationResult,
}

/// Valuation as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ValuationResponse {
    pub id: Uuid,
    pub business_name: String,
    pub industry: String,
    pub input: ValuationInput,
    pub result: ValuationResult,
    pub is_paid: bool,
    /// Paid, or covered by lifetime access
    pub report_unlocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ValuationResponse {
    pub fn new(v: Valuation, lifetime: bool) -> Self {
        Self {
            id: v.id,
            business_name: v.input.business_name.clone(),
            industry: v.result.industry_label.clone(),
            report_unlocked: v.is_paid || lifetime,
            is_paid: v.is_paid,
            input: v.input,
            result: v.result,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgenie_core::{compute, Addbacks};

    fn valuation(name: &str) -> Valuation {
        let input = ValuationInput {
            business_name: name.into(),
            industry: "retail".into(),
            annual_revenue: 100_000.0,
            net_profit: 20_000.0,
            owner_salary: 10_000.0,
            addbacks: Addbacks::default(),
            years_in_business: None,
            revenue_trend: None,
            location: None,
        };
        let result = compute(&input).unwrap();
        let now = Utc::now();
        Valuation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            input,
            result,
            is_paid: false,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn file_stem_is_slugged() {
        assert_eq!(valuation("Joe's Pizza & Grill").file_stem(), "joe-s-pizza-grill-valuation");
        assert_eq!(valuation("日本").file_stem(), "valuation-report");
    }

    #[test]
    fn lifetime_unlocks_report() {
        let v = valuation("Shop");
        assert!(!ValuationResponse::new(v.clone(), false).report_unlocked);
        assert!(ValuationResponse::new(v, true).report_unlocked);
    }
}
