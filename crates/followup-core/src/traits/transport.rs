//! Outbound transport trait: one implementation per delivery provider.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Delivery, Modality, OutboundMessage};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Provider name, e.g. "resend" or "twilio".
    fn name(&self) -> &str;

    fn modality(&self) -> Modality;

    /// Whether credentials are present. Unconfigured transports are skipped
    /// when choosing a provider; they are never sent through.
    fn is_configured(&self) -> bool;

    /// Attempt exactly one send.
    async fn send(&self, message: &OutboundMessage) -> Result<Delivery>;
}
