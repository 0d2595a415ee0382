//! vgenie-core: valuation engine for ValuationGenie
//!
//! - `valuation`: SDE x industry multiple range calculator
//! - `industry`: static industry multiple table
//! - `usage`: free-tier monthly allowance
//! - `report`: HTML and PDF report rendering
//! - `config`: TOML + environment configuration shared by server and CLI

pub mod config;
pub mod error;
pub mod industry;
pub mod money;
pub mod report;
pub mod usage;
pub mod validation;
pub mod valuation;

pub use config::GenieConfig;
pub use error::{GenieError, Result};
pub use industry::{lookup as lookup_industry, Industry, IndustryMatch, MultipleRange};
pub use usage::{UsageDecision, UsageState};
pub use valuation::{compute, Addbacks, RevenueTrend, ValuationInput, ValuationMethod, ValuationResult};
