use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::transport::TransferInfo;

/// The user agent sent unless another is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("hootclient/", env!("CARGO_PKG_VERSION"));

/// Certificate verification policy for secure connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Full peer and host verification.
    #[default]
    On,
    /// No verification, except for `https://` urls where it is on for
    /// that request.
    Off,
    /// No verification, whatever the url.
    Disable,
}

impl SslMode {
    /// Whether a request to `url` should verify peer and host.
    pub fn verify_for(&self, url: &str) -> bool {
        match self {
            SslMode::On => true,
            SslMode::Off => is_secure_url(url),
            SslMode::Disable => false,
        }
    }
}

fn is_secure_url(url: &str) -> bool {
    url.get(..8)
        .map(|s| s.eq_ignore_ascii_case("https://"))
        .unwrap_or(false)
}

impl FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(SslMode::On),
            "off" => Ok(SslMode::Off),
            "disable" => Ok(SslMode::Disable),
            _ => Err(Error::InvalidArgument(format!("unsupported ssl mode: {}", s))),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SslMode::On => "on",
            SslMode::Off => "off",
            SslMode::Disable => "disable",
        };
        write!(f, "{}", s)
    }
}

/// Name/value cookies accumulated from `Set-Cookie` headers.
///
/// Attributes like `Path` or `Expires` are not kept. A cookie set again
/// keeps its first position, so the `Cookie` header is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie, replacing any with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        if let Some(existing) = self.cookies.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value;
        } else {
            self.cookies.push((name, value));
        }
    }

    /// Take the `name=value` part of a `Set-Cookie` header value.
    ///
    /// Returns false if the value has no `=` before the first `;`.
    pub fn insert_set_cookie(&mut self, header_value: &str) -> bool {
        let pair = header_value.split(';').next().unwrap_or_default();

        let Some((name, value)) = pair.split_once('=') else {
            return false;
        };

        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        trace!("Set cookie: {}", name);
        self.insert(name, value.trim());

        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// The value of a `Cookie` request header, `None` if the jar is empty.
    pub fn to_header_value(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(n, v)| format!("{}={}", n, v))
            .collect();

        Some(pairs.join("; "))
    }
}

/// Mutable state of one client.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) user_agent: String,
    pub(crate) ssl_mode: SslMode,
    pub(crate) cookies: CookieJar,
    pub(crate) last_request_info: TransferInfo,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ssl_mode: SslMode::default(),
            cookies: CookieJar::new(),
            last_request_info: TransferInfo::default(),
        }
    }
}

impl SessionState {
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn last_request_info(&self) -> &TransferInfo {
        &self.last_request_info
    }
}
