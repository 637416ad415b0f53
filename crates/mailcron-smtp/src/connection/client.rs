//! Type-state SMTP client.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use base64::Engine;
use tracing::{debug, trace};

use super::{ServerInfo, SmtpStream, Timeouts};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Reply, ReplyCode};

/// Type-state marker: greeted, no transaction in progress.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: authenticated, no transaction in progress.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: `MAIL FROM` accepted, collecting recipients.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: `DATA` accepted, waiting for the message body.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    timeouts: Timeouts,
    helo_name: String,
    accepted: Vec<Address>,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;

    /// Returns true once the session runs over TLS.
    fn is_encrypted(&self) -> bool;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server refuses service.
    pub async fn from_stream(mut stream: SmtpStream, timeouts: Timeouts) -> Result<Self> {
        let greeting = bounded(timeouts.command, "greeting", read_reply(&mut stream)).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(
                greeting.code.as_u16(),
                greeting.message_text(),
            ));
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            timeouts,
            helo_name: String::new(),
            accepted: Vec::new(),
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the server's extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .into_success()?;

        self.server_info.record_ehlo(&reply.message);
        self.helo_name = client_hostname.to_string();
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and repeats EHLO over TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or the upgrade fails.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(Command::StartTls).await?.into_success()?;

        let timeout = self.timeouts.connect;
        self.stream = bounded(timeout, "TLS handshake", self.stream.upgrade_to_tls(hostname))
            .await?;

        // Capabilities learned before the handshake must be discarded (RFC 3207 §4.2).
        let helo_name = std::mem::take(&mut self.helo_name);
        self.server_info.extensions.clear();
        self.ehlo(&helo_name).await
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not offer PLAIN or rejects the credentials.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        if !self
            .server_info
            .auth_mechanisms()
            .contains(&AuthMechanism::Plain)
        {
            return Err(Error::NotSupported("AUTH PLAIN".into()));
        }

        let credentials = format!("\0{username}\0{password}");
        let initial_response =
            base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response,
            })
            .await?;
        if reply.code != ReplyCode::AUTH_OK {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        debug!(server = %self.server_info.hostname, "SMTP authentication succeeded");
        Ok(self.transition())
    }

    /// Starts a mail transaction without authentication (if the server allows it).
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(self, from: Address) -> Result<Client<MailTransaction>> {
        self.start_transaction(from).await
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(self, from: Address) -> Result<Client<MailTransaction>> {
        self.start_transaction(from).await
    }
}

impl Client<MailTransaction> {
    /// Offers one recipient to the server.
    ///
    /// Returns `Ok(true)` if the server accepted the recipient and `Ok(false)`
    /// if it refused it with a 4xx/5xx reply. A refused recipient does not
    /// abort the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout or a malformed reply.
    pub async fn rcpt_to(&mut self, to: Address) -> Result<bool> {
        let reply = self.send_command(Command::RcptTo { to: to.clone() }).await?;

        if reply.is_success() {
            self.accepted.push(to);
            Ok(true)
        } else {
            debug!(
                recipient = %to,
                code = %reply.code,
                reply = %reply.message_text(),
                "Recipient refused"
            );
            Ok(false)
        }
    }

    /// Returns the recipients accepted so far.
    #[must_use]
    pub fn accepted_recipients(&self) -> &[Address] {
        &self.accepted
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if no recipient was accepted, or an
    /// error if the server does not answer `354`.
    pub async fn data(mut self) -> Result<Client<Data>> {
        if self.accepted.is_empty() {
            return Err(Error::InvalidState(
                "DATA requires at least one accepted recipient".into(),
            ));
        }

        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        Ok(self.transition())
    }

    /// Aborts the transaction with RSET.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(mut self) -> Result<Client<Connected>> {
        self.send_command(Command::Rset).await?.into_success()?;
        self.accepted.clear();
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// The message should be RFC 5322 formatted. Line endings are normalized
    /// to CRLF and the terminating `.` line is added automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails, times out, or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        let payload = encode_data(message);
        let timeout = self.timeouts.data;

        let stream = &mut self.stream;
        let reply = bounded(timeout, "DATA", async move {
            stream.write_all(&payload).await?;
            read_reply(stream).await
        })
        .await?
        .into_success()?;

        trace!(reply = %reply.message_text(), "Message accepted");
        self.accepted.clear();
        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            timeouts: self.timeouts,
            helo_name: self.helo_name,
            accepted: self.accepted,
            _state: PhantomData,
        }
    }

    async fn start_transaction(mut self, from: Address) -> Result<Client<MailTransaction>> {
        let eight_bit = self.server_info.supports_8bitmime();
        self.send_command(Command::MailFrom { from, eight_bit })
            .await?
            .into_success()?;

        self.accepted.clear();
        Ok(self.transition())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        let verb = cmd.verb();
        trace!(command = verb, "SMTP command");

        let data = cmd.serialize();
        let stream = &mut self.stream;
        bounded(self.timeouts.command, verb, async move {
            stream.write_all(&data).await?;
            read_reply(stream).await
        })
        .await
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }

        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

async fn bounded<T>(
    limit: Duration,
    phase: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(phase))?
}
