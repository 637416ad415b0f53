//! Runtime configuration.
//!
//! Loaded from a TOML file; every section and field has a default so an
//! empty file (or no file at all) yields a usable local setup.
//!
//! ```toml
//! [database]
//! path = "/var/lib/mailcron/mailcron.db"
//!
//! [smtp]
//! host = "smtp.example.com"
//! security = "starttls"
//! username = "mailer"
//!
//! [sender]
//! address = "news@example.com"
//!
//! [dispatch]
//! max_concurrent_sends = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Environment variable that overrides `smtp.password`.
pub const SMTP_PASSWORD_ENV: &str = "MAILCRON_SMTP_PASSWORD";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the campaign database lives.
    pub database: DatabaseConfig,
    /// Outgoing mail server.
    pub smtp: SmtpConfig,
    /// Envelope and header sender.
    pub sender: SenderConfig,
    /// Send concurrency.
    pub dispatch: DispatchConfig,
    /// Interval for `run` mode.
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailcron")
            .join("config.toml")
    }

    /// Load configuration from a TOML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or holds
    /// invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] when the file exists.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        debug!(path = %path.display(), "No configuration file, using defaults");
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or holds invalid values.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(password) = std::env::var(SMTP_PASSWORD_ENV) {
            self.smtp.password = password;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.smtp.host.trim().is_empty() {
            return Err(Error::Config("smtp.host must not be empty".into()));
        }
        if !self.sender.address.contains('@') {
            return Err(Error::Config(format!(
                "sender.address {:?} is not an email address",
                self.sender.address
            )));
        }
        if self.dispatch.max_concurrent_sends == 0 {
            return Err(Error::Config(
                "dispatch.max_concurrent_sends must be at least 1".into(),
            ));
        }
        if self.schedule.interval_secs == 0 {
            return Err(Error::Config("schedule.interval_secs must be at least 1".into()));
        }
        for (name, secs) in [
            ("connect_timeout_secs", self.smtp.connect_timeout_secs),
            ("command_timeout_secs", self.smtp.command_timeout_secs),
            ("data_timeout_secs", self.smtp.data_timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::Config(format!("smtp.{name} must be at least 1")));
            }
        }
        if self.smtp.username.is_empty() != self.smtp.password.is_empty() {
            return Err(Error::Config(format!(
                "smtp.username and smtp.password must be set together (password may come from {SMTP_PASSWORD_ENV})"
            )));
        }
        Ok(())
    }
}

/// Database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the `SQLite` file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailcron")
                .join("mailcron.db"),
        }
    }
}

/// Security/encryption mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

/// SMTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; 0 picks the default for the security mode.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication; empty disables AUTH.
    pub username: String,
    /// Password for authentication.
    #[serde(skip_serializing)]
    pub password: String,
    /// Name sent in EHLO.
    pub helo_name: String,
    /// Seconds allowed for TCP connect plus TLS handshake.
    pub connect_timeout_secs: u64,
    /// Seconds allowed per SMTP command.
    pub command_timeout_secs: u64,
    /// Seconds allowed for the message body and its final reply.
    pub data_timeout_secs: u64,
}

impl SmtpConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        match security {
            Security::None => 25,
            Security::StartTls => 587,
            Security::Tls => 465,
        }
    }

    /// Port to connect to.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            Self::default_port(self.security)
        } else {
            self.port
        }
    }

    /// Timeouts for the SMTP client.
    #[must_use]
    pub const fn timeouts(&self) -> mailcron_smtp::Timeouts {
        mailcron_smtp::Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            command: Duration::from_secs(self.command_timeout_secs),
            data: Duration::from_secs(self.data_timeout_secs),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            security: Security::default(),
            username: String::new(),
            password: String::new(),
            helo_name: "localhost".to_string(),
            connect_timeout_secs: 30,
            command_timeout_secs: 60,
            data_timeout_secs: 120,
        }
    }
}

/// Who campaign mail comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SenderConfig {
    /// Envelope sender and `From:` address.
    pub address: String,
    /// Optional display name for the `From:` header.
    pub name: Option<String>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            address: "mailcron@localhost".to_string(),
            name: None,
        }
    }
}

/// Dispatch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Sends in flight at once, across all campaigns.
    pub max_concurrent_sends: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: 8,
        }
    }
}

/// Tick interval for `run` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Seconds between ticks.
    pub interval_secs: u64,
}

impl ScheduleConfig {
    /// Interval as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}
