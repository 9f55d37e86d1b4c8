//! Dispatch router: picks the transport for a modality and sends once.
//!
//! Transports are held in priority order. The first one that reports
//! `is_configured()` for the modality is used; the others are never tried,
//! even if that send fails.

use std::sync::Arc;

use followup_core::error::{FollowUpError, Result};
use followup_core::traits::Transport;
use followup_core::types::{Delivery, Modality, OutboundMessage};

#[derive(Clone, Default)]
pub struct DispatchRouter {
    transports: Vec<Arc<dyn Transport>>,
}

impl DispatchRouter {
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        Self { transports }
    }

    /// Provider that would handle `modality`, if any.
    pub fn provider_for(&self, modality: Modality) -> Option<&Arc<dyn Transport>> {
        self.transports
            .iter()
            .find(|t| t.modality() == modality && t.is_configured())
    }

    /// Exactly one send attempt; no fallback to later providers.
    pub async fn dispatch(
        &self,
        modality: Modality,
        message: &OutboundMessage,
    ) -> Result<Delivery> {
        let transport = self.provider_for(modality).ok_or_else(|| {
            FollowUpError::Transport(format!(
                "no provider configured for {}",
                modality.channel_name()
            ))
        })?;

        tracing::debug!(
            "📨 Dispatching {} via {} to {}",
            modality.channel_name(),
            transport.name(),
            message.destination
        );
        transport.send(message).await.map_err(|e| match e {
            FollowUpError::Transport(_) => e,
            other => FollowUpError::Transport(format!("{}: {other}", transport.name())),
        })
    }
}
