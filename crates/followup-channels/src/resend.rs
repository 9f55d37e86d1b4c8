//! Resend email transport (HTTPS API).
//!
//! Bodies are rendered as minimal HTML. Outside production, a configured
//! sandbox recipient receives every message instead of the real prospect,
//! with the intended address kept in the subject.

use async_trait::async_trait;
use followup_core::config::{Environment, ResendConfig};
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::Transport;
use followup_core::types::{Delivery, Modality, OutboundMessage};
use serde_json::json;

pub struct ResendTransport {
    config: ResendConfig,
    environment: Environment,
    client: reqwest::Client,
}

impl ResendTransport {
    pub fn new(config: ResendConfig, environment: Environment) -> Self {
        Self {
            config,
            environment,
            client: reqwest::Client::new(),
        }
    }

    /// Recipient and subject after the sandbox redirect, if any.
    fn route(&self, message: &OutboundMessage) -> (String, String) {
        let subject = message.subject.clone().unwrap_or_default();
        match self.sandbox_recipient() {
            Some(sandbox) => (
                sandbox.to_string(),
                format!("[DEMO to {}] {}", message.destination, subject),
            ),
            None => (message.destination.clone(), subject),
        }
    }

    fn sandbox_recipient(&self) -> Option<&str> {
        if self.environment.is_production() {
            return None;
        }
        self.config
            .sandbox_recipient
            .as_deref()
            .filter(|r| !r.trim().is_empty())
    }
}

/// Plain text to the HTML body Resend sends.
pub fn render_html(body: &str) -> String {
    format!(
        "<div style='font-family: sans-serif;'>{}</div>",
        body.replace('\n', "<br>")
    )
}

#[async_trait]
impl Transport for ResendTransport {
    fn name(&self) -> &str {
        "resend"
    }

    fn modality(&self) -> Modality {
        Modality::DirectMessage
    }

    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        let (to, subject) = self.route(message);
        if to != message.destination {
            tracing::info!("🧪 Sandbox redirect: {} → {}", message.destination, to);
        }

        let body = json!({
            "from": self.config.from_email,
            "to": [to],
            "subject": subject,
            "html": render_html(&message.body),
        });

        let url = format!("{}/emails", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| FollowUpError::Transport(format!("Resend request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FollowUpError::Transport(format!(
                "Resend API error {status}: {text}"
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FollowUpError::Transport(format!("Resend response: {e}")))?;
        let id = result["id"].as_str().map(String::from);

        tracing::info!("📤 Email sent to: {to} (resend)");
        Ok(Delivery {
            provider: "resend".into(),
            provider_id: id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> OutboundMessage {
        OutboundMessage {
            destination: "lee@globex.com".into(),
            subject: Some("Following up - Lee".into()),
            body: "Hi Lee,\nQuick note.".into(),
        }
    }

    fn config(base_url: String, sandbox: Option<&str>) -> ResendConfig {
        ResendConfig {
            api_key: "re_test".into(),
            base_url,
            sandbox_recipient: sandbox.map(String::from),
            ..ResendConfig::default()
        }
    }

    #[test]
    fn test_render_html() {
        assert_eq!(
            render_html("a\nb"),
            "<div style='font-family: sans-serif;'>a<br>b</div>"
        );
    }

    #[test]
    fn test_sandbox_only_outside_production() {
        let dev = ResendTransport::new(
            config("http://x".into(), Some("me@test.dev")),
            Environment::Development,
        );
        let (to, subject) = dev.route(&message());
        assert_eq!(to, "me@test.dev");
        assert_eq!(subject, "[DEMO to lee@globex.com] Following up - Lee");

        let prod = ResendTransport::new(
            config("http://x".into(), Some("me@test.dev")),
            Environment::Production,
        );
        let (to, subject) = prod.route(&message());
        assert_eq!(to, "lee@globex.com");
        assert_eq!(subject, "Following up - Lee");

        let unset = ResendTransport::new(config("http://x".into(), None), Environment::Development);
        assert_eq!(unset.route(&message()).0, "lee@globex.com");
    }

    #[test]
    fn test_unconfigured_without_key() {
        let t = ResendTransport::new(ResendConfig::default(), Environment::Development);
        assert!(!t.is_configured());
    }

    #[tokio::test]
    async fn test_send_returns_provider_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("Authorization", "Bearer re_test"))
            .and(body_partial_json(json!({ "to": ["lee@globex.com"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "em_123" })))
            .expect(1)
            .mount(&server)
            .await;

        let t = ResendTransport::new(config(server.uri(), None), Environment::Production);
        let delivery = t.send(&message()).await.unwrap();
        assert_eq!(delivery.provider, "resend");
        assert_eq!(delivery.provider_id.as_deref(), Some("em_123"));
    }

    #[tokio::test]
    async fn test_send_failure_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&server)
            .await;

        let t = ResendTransport::new(config(server.uri(), None), Environment::Production);
        let err = t.send(&message()).await.unwrap_err();
        assert!(err.is_transport());
    }
}
