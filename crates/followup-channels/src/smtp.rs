//! SMTP email transport via async lettre (STARTTLS relay).

use async_trait::async_trait;
use followup_core::config::SmtpConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::Transport;
use followup_core::types::{Delivery, Modality, OutboundMessage};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, Tokio1Executor};

pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn from_mailbox(&self) -> Result<Mailbox> {
        let raw = match &self.config.display_name {
            Some(name) => format!("{name} <{}>", self.config.from_email),
            None => self.config.from_email.clone(),
        };
        raw.parse()
            .map_err(|e| FollowUpError::Config(format!("Invalid from address: {e}")))
    }

    fn build(&self, message: &OutboundMessage) -> Result<LettreMessage> {
        let to: Mailbox = message
            .destination
            .parse()
            .map_err(|e| FollowUpError::Transport(format!("Invalid to address: {e}")))?;

        LettreMessage::builder()
            .from(self.from_mailbox()?)
            .to(to)
            .subject(message.subject.clone().unwrap_or_default())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| FollowUpError::Transport(format!("Build email: {e}")))
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    fn name(&self) -> &str {
        "smtp"
    }

    fn modality(&self) -> Modality {
        Modality::DirectMessage
    }

    fn is_configured(&self) -> bool {
        !self.config.host.is_empty() && !self.config.username.is_empty()
    }

    async fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        let email = self.build(message)?;
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
            .map_err(|e| FollowUpError::Transport(format!("SMTP relay: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        let response = mailer
            .send(email)
            .await
            .map_err(|e| FollowUpError::Transport(format!("SMTP send: {e}")))?;

        tracing::info!("📤 Email sent to: {} (smtp)", message.destination);
        Ok(Delivery {
            provider: "smtp".into(),
            provider_id: response.message().next().map(String::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "bot@example.com".into(),
            password: "secret".into(),
            from_email: "bot@example.com".into(),
            display_name: Some("Sales Bot".into()),
        }
    }

    #[test]
    fn test_is_configured() {
        assert!(SmtpTransport::new(config()).is_configured());
        let empty = SmtpConfig {
            host: String::new(),
            ..config()
        };
        assert!(!SmtpTransport::new(empty).is_configured());
    }

    #[test]
    fn test_build_plain_text_message() {
        let t = SmtpTransport::new(config());
        let msg = OutboundMessage {
            destination: "lee@globex.com".into(),
            subject: Some("Checking in - Lee".into()),
            body: "Hello".into(),
        };
        let built = t.build(&msg).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("Subject: Checking in - Lee"));
        assert!(raw.contains("Sales Bot"));
    }

    #[test]
    fn test_bad_destination_rejected() {
        let t = SmtpTransport::new(config());
        let msg = OutboundMessage {
            destination: "not-an-address".into(),
            subject: None,
            body: "Hello".into(),
        };
        assert!(t.build(&msg).is_err());
    }
}
