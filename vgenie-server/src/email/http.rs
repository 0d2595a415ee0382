//! HTTP email provider client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{EmailMessage, MailError, Mailer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpMailer {
    http: Client,
    api_key: String,
    api_base: String,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self, MailError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let body = SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };
        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(MailError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "owner@example.com".into(),
            subject: "Your report".into(),
            html: "<p>Thanks</p>".into(),
            text: "Thanks".into(),
        }
    }

    #[tokio::test]
    async fn posts_json_with_bearer_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/emails")
                    .header("authorization", "Bearer re_test")
                    .json_body(json!({
                        "from": "ValuationGenie <hello@example.com>",
                        "to": ["owner@example.com"],
                        "subject": "Your report",
                        "html": "<p>Thanks</p>",
                        "text": "Thanks"
                    }));
                then.status(200).json_body(json!({"id": "email_1"}));
            })
            .await;

        let mailer =
            HttpMailer::new("re_test", server.base_url(), "ValuationGenie <hello@example.com>").unwrap();
        mailer.send(&message()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_errors_are_returned() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/emails");
                then.status(422).body("invalid from address");
            })
            .await;

        let mailer = HttpMailer::new("re_test", server.base_url(), "bad").unwrap();
        match mailer.send(&message()).await {
            Err(MailError::Api { status, message }) => {
                assert_eq!(status, 422);
                assert_eq!(message, "invalid from address");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }
}
