//! Twilio WhatsApp transport (Messages API, form-encoded).

use async_trait::async_trait;
use followup_core::config::TwilioConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::Transport;
use followup_core::types::{Delivery, Modality, OutboundMessage};

use crate::phone::twilio_address;

pub struct TwilioTransport {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioTransport {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Transport for TwilioTransport {
    fn name(&self) -> &str {
        "twilio"
    }

    fn modality(&self) -> Modality {
        Modality::ChatMessage
    }

    fn is_configured(&self) -> bool {
        !self.config.account_sid.is_empty() && !self.config.auth_token.is_empty()
    }

    async fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        let to = twilio_address(&message.destination);
        let form = [
            ("From", self.config.whatsapp_from.as_str()),
            ("To", to.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| FollowUpError::Transport(format!("Twilio request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FollowUpError::Transport(format!(
                "Twilio API error {status}: {text}"
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FollowUpError::Transport(format!("Twilio response: {e}")))?;
        let sid = result["sid"].as_str().map(String::from);

        tracing::info!("💬 WhatsApp sent to: {to} (twilio)");
        Ok(Delivery {
            provider: "twilio".into(),
            provider_id: sid,
        })
    }
}
