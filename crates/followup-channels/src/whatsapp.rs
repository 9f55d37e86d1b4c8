//! WhatsApp Business Cloud API transport (Meta Graph API).

use async_trait::async_trait;
use followup_core::config::WhatsAppConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::Transport;
use followup_core::types::{Delivery, Modality, OutboundMessage};

use crate::phone::digits_only;

pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn modality(&self) -> Modality {
        Modality::ChatMessage
    }

    fn is_configured(&self) -> bool {
        !self.config.access_token.is_empty() && !self.config.phone_number_id.is_empty()
    }

    async fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        let url = format!(
            "{}/{}/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            self.config.phone_number_id
        );
        let to = digits_only(&message.destination);

        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": message.body }
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| FollowUpError::Transport(format!("WhatsApp send failed: {e}")))?;

        if !response.status().is_success() {
            let err = response.text().await.unwrap_or_default();
            return Err(FollowUpError::Transport(format!("WhatsApp API error: {err}")));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FollowUpError::Transport(format!("Invalid WhatsApp response: {e}")))?;

        let msg_id = result["messages"][0]["id"].as_str().map(String::from);

        tracing::info!("💬 WhatsApp sent to: {to} (meta)");
        Ok(Delivery {
            provider: "whatsapp".into(),
            provider_id: msg_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_uses_digits_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/PN1/messages"))
            .and(header("Authorization", "Bearer EAAG"))
            .and(body_partial_json(json!({ "to": "447700900123" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "messages": [{ "id": "wamid.X" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let t = WhatsAppTransport::new(WhatsAppConfig {
            access_token: "EAAG".into(),
            phone_number_id: "PN1".into(),
            base_url: server.uri(),
            ..WhatsAppConfig::default()
        });
        let msg = OutboundMessage {
            destination: "+44 7700 900123".into(),
            subject: None,
            body: "Hi".into(),
        };
        let delivery = t.send(&msg).await.unwrap();
        assert_eq!(delivery.provider_id.as_deref(), Some("wamid.X"));
    }
}
