// src/proxy.rs
//
// Proxy descriptors as read from the proxy list. Accepted line formats:
//   scheme://[user:pass@]host:port
//   host:port
//   user:pass@host:port
//   host:port:user:pass

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyParseError {
    #[error("empty proxy line")]
    Empty,
    #[error("invalid proxy `{line}`: {source}")]
    InvalidUrl {
        line: String,
        #[source]
        source: url::ParseError,
    },
    #[error("proxy `{0}` has no host")]
    MissingHost(String),
    #[error("unsupported proxy scheme `{0}` (only http and https are supported)")]
    UnsupportedScheme(String),
}

/// Connection descriptor for one proxy. Immutable once parsed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Proxy {
    url: Url,
}

impl Proxy {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn has_credentials(&self) -> bool {
        !self.url.username().is_empty()
    }

    /// Routing rule for a reqwest client: every request goes through this proxy.
    pub fn to_reqwest(&self) -> reqwest::Result<reqwest::Proxy> {
        reqwest::Proxy::all(self.url.as_str())
    }
}

impl FromStr for Proxy {
    type Err = ProxyParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProxyParseError::Empty);
        }

        let candidate = if line.contains("://") {
            line.to_string()
        } else {
            match line.split(':').collect::<Vec<_>>().as_slice() {
                [host, port, user, pass] if !line.contains('@') => {
                    format!("http://{}:{}@{}:{}", user, pass, host, port)
                }
                _ => format!("http://{}", line),
            }
        };

        let url = Url::parse(&candidate).map_err(|source| ProxyParseError::InvalidUrl {
            line: line.to_string(),
            source,
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ProxyParseError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ProxyParseError::MissingHost(line.to_string()));
        }

        Ok(Self { url })
    }
}

/// Credentials are masked so proxies can be logged.
impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.url.scheme())?;
        if self.has_credentials() {
            write!(f, "{}:***@", self.url.username())?;
        }
        write!(f, "{}", self.url.host_str().unwrap_or_default())?;
        if let Some(port) = self.url.port_or_known_default() {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proxy({})", self)
    }
}
