//! Stripe REST client (payment intents only)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use super::{PaymentError, PaymentGateway, PaymentIntent, PaymentRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct StripeClient {
    http: Client,
    secret_key: String,
    api_base: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self, PaymentError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn parse(response: Response) -> Result<PaymentIntent, PaymentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<PaymentIntent>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.message.or(e.error.code))
            .unwrap_or_else(|| body.chars().take(200).collect());
        tracing::warn!(status = status.as_u16(), %message, "Stripe request failed");
        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Stripe object ids are short alphanumeric strings with underscores
fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 255 && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentIntent, PaymentError> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".into(), request.amount_cents.to_string()),
            ("currency".into(), request.currency.clone()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
            ("description".into(), request.product.description().into()),
        ];
        for (key, value) in request.metadata() {
            form.push((format!("metadata[{}]", key), value));
        }
        if let Some(email) = &request.receipt_email {
            form.push(("receipt_email".into(), email.clone()));
        }

        tracing::info!(
            product = %request.product,
            amount = request.amount_cents,
            user_id = %request.user_id,
            "Creating payment intent"
        );
        let response = self
            .http
            .post(self.url("/v1/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        if !valid_id(id) {
            return Err(PaymentError::InvalidRequest(format!("invalid payment intent id '{}'", id)));
        }
        let response = self
            .http
            .get(self.url(&format!("/v1/payment_intents/{}", id)))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::Product;
    use httpmock::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount_cents: 2900,
            currency: "usd".into(),
            product: Product::Report,
            user_id: Uuid::nil(),
            valuation_id: Some(Uuid::nil()),
            receipt_email: Some("owner@example.com".into()),
        }
    }

    #[tokio::test]
    async fn creates_payment_intent_with_form_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/payment_intents")
                    .header("authorization", "Bearer sk_test_123")
                    .x_www_form_urlencoded_tuple("amount", "2900")
                    .x_www_form_urlencoded_tuple("currency", "usd")
                    .x_www_form_urlencoded_tuple("automatic_payment_methods[enabled]", "true")
                    .x_www_form_urlencoded_tuple("metadata[product]", "report")
                    .x_www_form_urlencoded_tuple("receipt_email", "owner@example.com");
                then.status(200).json_body(json!({
                    "id": "pi_abc",
                    "object": "payment_intent",
                    "amount": 2900,
                    "currency": "usd",
                    "status": "requires_payment_method",
                    "client_secret": "pi_abc_secret_xyz",
                    "metadata": {"product": "report"}
                }));
            })
            .await;

        let client = StripeClient::new("sk_test_123", server.base_url()).unwrap();
        let intent = client.create_payment_intent(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(intent.id, "pi_abc");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_abc_secret_xyz"));
        assert!(!intent.succeeded());
    }

    #[tokio::test]
    async fn retrieves_payment_intent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/payment_intents/pi_abc");
                then.status(200).json_body(json!({
                    "id": "pi_abc",
                    "amount": 9900,
                    "currency": "usd",
                    "status": "succeeded",
                    "metadata": {"product": "lifetime", "user_id": Uuid::nil().to_string()}
                }));
            })
            .await;

        let client = StripeClient::new("sk_test_123", server.base_url()).unwrap();
        let intent = client.retrieve_payment_intent("pi_abc").await.unwrap();
        assert!(intent.succeeded());
        assert_eq!(intent.purchase().unwrap().product, Product::Lifetime);
    }

    #[tokio::test]
    async fn surfaces_api_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/payment_intents");
                then.status(402).json_body(json!({
                    "error": {"type": "card_error", "message": "Your card was declined."}
                }));
            })
            .await;

        let client = StripeClient::new("sk_test_123", server.base_url()).unwrap();
        match client.create_payment_intent(&request()).await {
            Err(PaymentError::Api { status, message }) => {
                assert_eq!(status, 402);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejects_suspicious_ids_without_a_request() {
        let client = StripeClient::new("sk_test_123", "http://127.0.0.1:1").unwrap();
        let err = client.retrieve_payment_intent("../customers").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }
}
