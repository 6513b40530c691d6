use std::time::Duration;

/// Max number of redirects followed by default.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Configuration a transport is created with.
///
/// These are the defaults of the handle. A client can still override
/// some of them per request, see [`TransportOption`][crate::TransportOption].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub follow_redirects: bool,
    pub max_redirects: u32,
    /// Send a `Referer` header with the previous url when following a redirect.
    pub auto_referer: bool,
    pub connect_timeout: Duration,
    /// Timeout for each read and write on the connection.
    pub timeout: Duration,
    /// Max bytes of a single response, header blocks included.
    pub max_response_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            auto_referer: true,
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(300),
            max_response_size: 64 * 1024 * 1024,
        }
    }
}

impl TransportConfig {
    pub fn with_follow_redirects(mut self, v: bool) -> Self {
        self.follow_redirects = v;
        self
    }

    pub fn with_max_redirects(mut self, v: u32) -> Self {
        self.max_redirects = v;
        self
    }

    pub fn with_auto_referer(mut self, v: bool) -> Self {
        self.auto_referer = v;
        self
    }

    pub fn with_connect_timeout(mut self, v: Duration) -> Self {
        self.connect_timeout = v;
        self
    }

    pub fn with_timeout(mut self, v: Duration) -> Self {
        self.timeout = v;
        self
    }

    pub fn with_max_response_size(mut self, v: usize) -> Self {
        self.max_response_size = v;
        self
    }
}
