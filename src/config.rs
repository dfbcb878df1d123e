//! IMAP connection configuration

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::time::Duration;

/// How the TCP connection to the IMAP server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS from the first byte (usually port 993).
    #[default]
    Tls,
    /// Plain greeting, then upgrade with `STARTTLS` (usually port 143).
    StartTls,
}

impl Security {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" | "implicit" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            other => Err(Error::Config(format!(
                "Invalid IMAP_SECURITY '{other}' (expected 'tls' or 'starttls')"
            ))),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls => f.write_str("tls"),
            Self::StartTls => f.write_str("starttls"),
        }
    }
}

/// IMAP connection configuration
#[derive(Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: Security,
    /// Skip certificate verification. Only for self-signed bridges.
    pub accept_invalid_certs: bool,
    /// Upper bound for one complete connect/select/fetch/logout cycle.
    pub timeout: Duration,
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish()
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl ImapConfig {
    /// Build a config with the default security settings: implicit
    /// TLS, verified certificates, 30 second timeout.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            security: Security::default(),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_HOST`
    /// - `IMAP_PORT`
    /// - `IMAP_USERNAME` (or `IMAP_USER`)
    /// - `IMAP_PASSWORD` (or `IMAP_PASS`)
    ///
    /// Optional (with defaults):
    /// - `IMAP_SECURITY` (default: `tls`, alternative: `starttls`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `IMAP_TIMEOUT_SECS` (default: `30`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ImapConfig::from_env`] but reads variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
                .ok_or_else(|| Error::Config(format!("{} not set", keys[0])))
        };

        let port = required(&["IMAP_PORT"])?
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?;

        let security = lookup("IMAP_SECURITY")
            .map_or(Ok(Security::default()), |v| Security::parse(&v))?;

        let accept_invalid_certs = match lookup("IMAP_ACCEPT_INVALID_CERTS") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                Error::Config(format!("Invalid IMAP_ACCEPT_INVALID_CERTS: {v}"))
            })?,
            None => false,
        };

        let timeout_secs = match lookup("IMAP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| Error::Config(format!("Invalid IMAP_TIMEOUT_SECS: {v}")))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            host: required(&["IMAP_HOST"])?,
            port,
            username: required(&["IMAP_USERNAME", "IMAP_USER"])?,
            password: required(&["IMAP_PASSWORD", "IMAP_PASS"])?,
            security,
            accept_invalid_certs,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
