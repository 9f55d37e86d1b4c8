//! # FollowUp Channels
//!
//! Outbound transports grouped by modality:
//! - Direct message (email): [`ResendTransport`], then [`SmtpTransport`]
//! - Chat message (WhatsApp): [`TwilioTransport`], then [`WhatsAppTransport`]
//!
//! [`transports_from_config`] builds them in that priority order; the engine
//! picks the first configured one per modality.

pub mod phone;
pub mod resend;
pub mod smtp;
pub mod twilio;
pub mod whatsapp;

pub use resend::ResendTransport;
pub use smtp::SmtpTransport;
pub use twilio::TwilioTransport;
pub use whatsapp::WhatsAppTransport;

use std::sync::Arc;

use followup_core::FollowUpConfig;
use followup_core::traits::Transport;

/// Every transport with a config section, in fixed priority order.
pub fn transports_from_config(config: &FollowUpConfig) -> Vec<Arc<dyn Transport>> {
    let channels = &config.channel;
    let mut transports: Vec<Arc<dyn Transport>> = Vec::new();

    if let Some(resend) = &channels.resend {
        transports.push(Arc::new(ResendTransport::new(resend.clone(), config.environment)));
    }
    if let Some(smtp) = &channels.smtp {
        transports.push(Arc::new(SmtpTransport::new(smtp.clone())));
    }
    if let Some(twilio) = &channels.twilio {
        transports.push(Arc::new(TwilioTransport::new(twilio.clone())));
    }
    if let Some(whatsapp) = &channels.whatsapp {
        transports.push(Arc::new(WhatsAppTransport::new(whatsapp.clone())));
    }

    tracing::debug!(
        "Channels loaded: {:?}",
        transports.iter().map(|t| t.name()).collect::<Vec<_>>()
    );
    transports
}
