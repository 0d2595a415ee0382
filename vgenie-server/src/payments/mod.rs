//! Payment processing
//!
//! Two products are sold: a single report unlock and lifetime access. The
//! processor is reached through [`PaymentGateway`]; [`StripeClient`] is the
//! production implementation and [`DisabledGateway`] stands in when no API
//! key is configured.

pub mod stripe;
pub mod webhook;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vgenie_core::config::PricingConfig;

pub use stripe::StripeClient;
pub use webhook::{verify_signature, WebhookEvent};

/// Payment errors
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payments are not configured")]
    NotConfigured,

    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
}

/// What is being bought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    /// Unlocks the report for one valuation
    Report,
    /// Unlocks every report and lifts the monthly limit
    Lifetime,
}

impl Product {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Lifetime => "lifetime",
        }
    }

    pub fn price_cents(self, pricing: &PricingConfig) -> i64 {
        match self {
            Self::Report => pricing.report_price_cents,
            Self::Lifetime => pricing.lifetime_price_cents,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Report => "ValuationGenie valuation report",
            Self::Lifetime => "ValuationGenie lifetime access",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report" => Ok(Self::Report),
            "lifetime" => Ok(Self::Lifetime),
            other => Err(PaymentError::InvalidRequest(format!("unknown product '{}'", other))),
        }
    }
}

/// Parameters for a new payment intent
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub product: Product,
    pub user_id: Uuid,
    pub valuation_id: Option<Uuid>,
    pub receipt_email: Option<String>,
}

impl PaymentRequest {
    /// Metadata attached to the intent and read back on fulfilment
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let mut metadata = vec![
            ("user_id", self.user_id.to_string()),
            ("product", self.product.as_str().to_string()),
        ];
        if let Some(id) = self.valuation_id {
            metadata.push(("valuation_id", id.to_string()));
        }
        metadata
    }
}

/// The subset of a processor payment intent the server uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Who bought what, recovered from intent metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub user_id: Uuid,
    pub product: Product,
    pub valuation_id: Option<Uuid>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn purchase(&self) -> Result<Purchase, PaymentError> {
        let field = |name: &str| {
            self.metadata.get(name).ok_or_else(|| {
                PaymentError::InvalidRequest(format!("payment intent {} has no {}", self.id, name))
            })
        };
        let parse_id = |name: &str, raw: &str| {
            Uuid::parse_str(raw).map_err(|_| {
                PaymentError::InvalidRequest(format!("payment intent {} has malformed {}", self.id, name))
            })
        };

        let user_id = parse_id("user_id", field("user_id")?)?;
        let product: Product = field("product")?.parse()?;
        let valuation_id = match self.metadata.get("valuation_id") {
            Some(raw) => Some(parse_id("valuation_id", raw)?),
            None => None,
        };
        if product == Product::Report && valuation_id.is_none() {
            return Err(PaymentError::InvalidRequest(format!(
                "report payment intent {} has no valuation_id",
                self.id
            )));
        }

        Ok(Purchase {
            user_id,
            product,
            valuation_id,
        })
    }
}

/// Payment processor operations
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentIntent, PaymentError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError>;
}

/// Gateway used when no processor key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    fn is_configured(&self) -> bool {
        false
    }

    async fn create_payment_intent(&self, _request: &PaymentRequest) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn retrieve_payment_intent(&self, _id: &str) -> Result<PaymentIntent, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(metadata: &[(&str, &str)]) -> PaymentIntent {
        PaymentIntent {
            id: "pi_123".into(),
            amount: 2900,
            currency: "usd".into(),
            status: "succeeded".into(),
            client_secret: None,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn product_prices_follow_config() {
        let pricing = PricingConfig::default();
        assert_eq!(Product::Report.price_cents(&pricing), 2900);
        assert_eq!(Product::Lifetime.price_cents(&pricing), 9900);
        assert_eq!("lifetime".parse::<Product>().unwrap(), Product::Lifetime);
        assert!("gold".parse::<Product>().is_err());
    }

    #[test]
    fn metadata_round_trips_into_purchase() {
        let request = PaymentRequest {
            amount_cents: 2900,
            currency: "usd".into(),
            product: Product::Report,
            user_id: Uuid::new_v4(),
            valuation_id: Some(Uuid::new_v4()),
            receipt_email: None,
        };
        let pairs: Vec<(String, String)> = request
            .metadata()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let pairs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let purchase = intent(&pairs).purchase().unwrap();
        assert_eq!(purchase.user_id, request.user_id);
        assert_eq!(purchase.product, Product::Report);
        assert_eq!(purchase.valuation_id, request.valuation_id);
    }

    #[test]
    fn report_purchase_requires_valuation() {
        let user = Uuid::new_v4().to_string();
        let err = intent(&[("user_id", &user), ("product", "report")]).purchase();
        assert!(matches!(err, Err(PaymentError::InvalidRequest(_))));

        let lifetime = intent(&[("user_id", &user), ("product", "lifetime")]).purchase().unwrap();
        assert_eq!(lifetime.product, Product::Lifetime);
        assert_eq!(lifetime.valuation_id, None);
    }

    #[test]
    fn malformed_metadata_is_rejected() {
        assert!(intent(&[]).purchase().is_err());
        assert!(intent(&[("user_id", "nope"), ("product", "lifetime")]).purchase().is_err());
    }

    #[tokio::test]
    async fn disabled_gateway_refuses() {
        let gateway = DisabledGateway;
        assert!(!gateway.is_configured());
        assert!(matches!(
            gateway.retrieve_payment_intent("pi_1").await,
            Err(PaymentError::NotConfigured)
        ));
    }
}
