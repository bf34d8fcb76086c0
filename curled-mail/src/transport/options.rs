//! Connection options handed to the transport

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default SMTP response timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// SMTP connection options
///
/// Values are passed through to the transport without validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Username for logging into the server
    pub user: Option<String>,
    /// Password for logging into the server
    pub password: Option<String>,
    /// Server host (defaults to `localhost`)
    pub host: Option<String>,
    /// Server port (defaults to 465 with ssl, 587 with tls, 25 otherwise)
    pub port: Option<u16>,
    /// Implicit TLS: `true` or `{ key, ca, cert }`
    pub ssl: SslOption,
    /// STARTTLS: `true` or a table of options
    pub tls: TlsOption,
    /// Max milliseconds to wait for server responses
    pub timeout: u64,
    /// Domain to greet the server with (defaults to the local hostname)
    pub domain: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            host: None,
            port: None,
            ssl: SslOption::default(),
            tls: TlsOption::default(),
            timeout: DEFAULT_TIMEOUT_MS,
            domain: None,
        }
    }
}

impl ConnectionOptions {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    pub fn port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.ssl.is_enabled() => 465,
            None if self.tls.is_enabled() => 587,
            None => 25,
        }
    }

    /// Name used in the EHLO greeting
    pub fn domain(&self) -> String {
        match &self.domain {
            Some(domain) => domain.clone(),
            None => gethostname::gethostname().to_string_lossy().to_string(),
        }
    }

    /// Credentials, when both user and password are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// Implicit TLS setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SslOption {
    Flag(bool),
    Params(SslParams),
}

impl Default for SslOption {
    fn default() -> Self {
        SslOption::Flag(false)
    }
}

impl SslOption {
    pub fn is_enabled(&self) -> bool {
        match self {
            SslOption::Flag(enabled) => *enabled,
            SslOption::Params(_) => true,
        }
    }
}

/// PEM file paths for an implicit TLS connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslParams {
    /// Client private key
    pub key: Option<String>,
    /// Extra root certificate to trust
    pub ca: Option<String>,
    /// Client certificate
    pub cert: Option<String>,
}

/// STARTTLS setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TlsOption {
    Flag(bool),
    Params(Map<String, Value>),
}

impl Default for TlsOption {
    fn default() -> Self {
        TlsOption::Flag(false)
    }
}

impl TlsOption {
    pub fn is_enabled(&self) -> bool {
        match self {
            TlsOption::Flag(enabled) => *enabled,
            TlsOption::Params(_) => true,
        }
    }
}
