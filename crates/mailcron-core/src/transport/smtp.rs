//! SMTP transport for sending campaign mail.
//!
//! One connection per message: campaigns send to one recipient at a time and
//! a fresh session keeps one recipient's failure from poisoning the next.

use async_trait::async_trait;
use chrono::Utc;
use mailcron_smtp::connection::{connect, connect_tls};
use mailcron_smtp::{Address, Client, Connected, MailTransaction, SmtpConnection};
use tracing::debug;

use super::{MailTransport, OutgoingMessage, TransportError};
use crate::config::{Security, SmtpConfig};

/// [`MailTransport`] backed by an SMTP server.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    /// Creates a transport for the given server settings.
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    async fn open(&self) -> Result<Client<Connected>, TransportError> {
        let host = &self.config.host;
        let port = self.config.effective_port();
        let timeouts = self.config.timeouts();

        let stream = match self.config.security {
            Security::Tls => connect_tls(host, port, timeouts.connect).await,
            Security::StartTls | Security::None => connect(host, port, timeouts.connect).await,
        }
        .map_err(|e| TransportError::Connection(e.to_string()))?;

        let client = Client::from_stream(stream, timeouts)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let client = client
            .ehlo(&self.config.helo_name)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let client = if self.config.security == Security::StartTls {
            client
                .starttls(host)
                .await
                .map_err(|e| TransportError::Connection(e.to_string()))?
        } else {
            client
        };

        debug!(
            host = %host,
            port,
            server = %client.server_info().hostname,
            encrypted = client.is_encrypted(),
            "SMTP session ready"
        );
        Ok(client)
    }

    async fn begin(
        &self,
        client: Client<Connected>,
        from: Address,
    ) -> Result<Client<MailTransaction>, TransportError> {
        if self.config.username.is_empty() {
            return client
                .mail_from(from)
                .await
                .map_err(|e| TransportError::Send(e.to_string()));
        }

        let client = client
            .auth_plain(&self.config.username, &self.config.password)
            .await
            .map_err(|e| TransportError::Authentication(e.to_string()))?;

        client
            .mail_from(from)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<usize, TransportError> {
        if message.to.is_empty() {
            return Err(TransportError::InvalidAddress("No recipients specified".into()));
        }

        // Validate every address before touching the network
        let from =
            Address::new(&message.from).map_err(|e| TransportError::InvalidAddress(e.to_string()))?;
        let recipients = message
            .to
            .iter()
            .map(|to| Address::new(to).map_err(|e| TransportError::InvalidAddress(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let content = message.to_rfc5322(Utc::now());

        let client = self.open().await?;
        // SIZE 0 means the server announces no limit (RFC 1870)
        if let Some(limit) = client.server_info().max_message_size()
            && limit > 0
            && content.len() > limit
        {
            if let Err(e) = client.quit().await {
                debug!(error = %e, "QUIT after size check failed");
            }
            return Err(TransportError::Send(format!(
                "message is {} bytes, server accepts at most {limit}",
                content.len()
            )));
        }

        let mut client = self.begin(client, from).await?;

        // Refusals are counted through accepted_recipients()
        for recipient in recipients {
            client
                .rcpt_to(recipient)
                .await
                .map_err(|e| TransportError::Send(e.to_string()))?;
        }

        let accepted = client.accepted_recipients().len();
        if accepted == 0 {
            // Nothing to deliver; leave politely and report zero deliveries
            if let Ok(client) = client.reset().await
                && let Err(e) = client.quit().await
            {
                debug!(error = %e, "QUIT after refused recipients failed");
            }
            return Ok(0);
        }

        let client = client
            .data()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let client = client
            .send_message(content.as_bytes())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        // The message is queued once DATA is accepted; a failed QUIT changes nothing.
        if let Err(e) = client.quit().await {
            debug!(error = %e, "QUIT after delivery failed");
        }

        Ok(accepted)
    }
}
