//! Send one campaign message to one recipient and log the outcome.

use std::sync::Arc;

use tracing::{info, warn};

use crate::Result;
use crate::audience::Recipient;
use crate::campaign::Campaign;
use crate::config::SenderConfig;
use crate::delivery::{DeliveryLogEntry, DeliveryOutcome};
use crate::store::DeliveryLog;
use crate::transport::{MailTransport, OutgoingMessage};

/// Sends messages and records exactly one log entry per attempt.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    log: Arc<dyn DeliveryLog>,
    sender: SenderConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sender", &self.sender.address)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        transport: Arc<dyn MailTransport>,
        log: Arc<dyn DeliveryLog>,
        sender: SenderConfig,
    ) -> Self {
        Self {
            transport,
            log,
            sender,
        }
    }

    /// Builds the message a recipient gets for a campaign.
    #[must_use]
    pub fn message_for(&self, campaign: &Campaign, recipient: &Recipient) -> OutgoingMessage {
        OutgoingMessage::new(&self.sender.address, &campaign.title, &campaign.body)
            .from_name(self.sender.name.clone())
            .to(&recipient.email)
            .to_name(Some(recipient.display_name()))
    }

    /// Attempts one send and appends its outcome to the log.
    ///
    /// Transport failures never surface as errors here; they are recorded as
    /// [`DeliveryOutcome::Failed`] or [`DeliveryOutcome::Error`]. The entry is
    /// written only after the send attempt has finished.
    ///
    /// # Errors
    ///
    /// Returns an error only if the log entry cannot be written.
    pub async fn dispatch(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
    ) -> Result<DeliveryLogEntry> {
        let message = self.message_for(campaign, recipient);
        let outcome = DeliveryOutcome::from_send(self.transport.send(&message).await);

        match &outcome {
            DeliveryOutcome::Success => info!(
                campaign = %campaign.id,
                recipient = %recipient.id,
                "Campaign message sent"
            ),
            DeliveryOutcome::Failed => warn!(
                campaign = %campaign.id,
                recipient = %recipient.id,
                "Campaign message accepted by nobody"
            ),
            DeliveryOutcome::Error(detail) => warn!(
                campaign = %campaign.id,
                recipient = %recipient.id,
                error = %detail,
                "Campaign message failed"
            ),
        }

        let entry = DeliveryLogEntry::record(campaign.id, recipient.id, outcome);
        self.log.append(entry).await
    }
}
