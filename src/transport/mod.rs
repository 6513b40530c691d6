//! The transport handle.
//!
//! A [`Transport`] is one stateful connection configuration. It is configured
//! once when created, then reused for every request issued by the
//! [`Client`][crate::Client] owning it. Per request, the client overrides
//! a handful of options via [`Transport::set_option`] before calling
//! [`Transport::perform`].
//!
//! The payload returned by `perform` is the raw response as seen on the wire,
//! with every header block inline before the body. When the transport
//! follows redirects internally, all intermediate header blocks are
//! concatenated in front of the final one (redirect chain folding).
//!
//! The crate ships one implementation, [`TcpTransport`], a blocking
//! HTTP/1.1 transport over `std::net::TcpStream`.

use std::fmt;
use std::io;
use std::net::IpAddr;
use std::time::Duration;

use http::Method;

mod chunk;
mod recv;
mod tcp;
#[cfg(feature = "tls")]
mod tls;

pub use tcp::TcpTransport;

/// Per-request option override applied to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOption {
    Url(String),
    Method(Method),
    /// Request body. An empty body means no body is sent.
    Body(Vec<u8>),
    /// Request headers in wire format, `Name: value`.
    Headers(Vec<String>),
    UserAgent(String),
    VerifyPeer(bool),
    VerifyHost(bool),
    FollowRedirects(bool),
    MaxRedirects(u32),
    AutoReferer(bool),
}

pub trait Transport {
    /// Apply an option for subsequent requests.
    fn set_option(&mut self, option: TransportOption);

    /// Execute the configured request, returning the raw payload.
    fn perform(&mut self) -> Result<Vec<u8>, TransportFailure>;

    /// Diagnostics of the last performed request.
    fn info(&self) -> &TransferInfo;

    /// Release the handle. No further requests can be made.
    fn teardown(&mut self);

    fn is_torn_down(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_option(&mut self, option: TransportOption) {
        (**self).set_option(option)
    }

    fn perform(&mut self) -> Result<Vec<u8>, TransportFailure> {
        (**self).perform()
    }

    fn info(&self) -> &TransferInfo {
        (**self).info()
    }

    fn teardown(&mut self) {
        (**self).teardown()
    }

    fn is_torn_down(&self) -> bool {
        (**self).is_torn_down()
    }
}

/// Diagnostics for one transfer. Replaced wholesale by every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferInfo {
    /// The last URL used, after following redirects.
    pub effective_url: String,
    /// Status code of the final response, 0 if none was received.
    pub response_code: u16,
    /// `Content-Type` of the final response, if any.
    pub content_type: Option<String>,
    pub redirect_count: u32,
    pub total_time: Duration,
    /// Total size of all received header blocks.
    pub header_size: usize,
    /// Total size of all sent requests.
    pub request_size: usize,
    pub primary_ip: Option<IpAddr>,
    /// The last outbound request head, as sent.
    pub request_header: String,
}

/// Failure classes of a transfer.
///
/// The numeric codes follow the well known libcurl numbering so they read
/// familiar in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureKind {
    UnsupportedProtocol,
    MalformedUrl,
    CouldNotResolveHost,
    CouldNotConnect,
    /// The server answered with a status >= 400 and the transport was
    /// configured to treat that as a failure.
    HttpReturnedError,
    Timeout,
    TlsConnect,
    TooManyRedirects,
    Send,
    Receive,
}

impl FailureKind {
    pub fn code(&self) -> u32 {
        match self {
            FailureKind::UnsupportedProtocol => 1,
            FailureKind::MalformedUrl => 3,
            FailureKind::CouldNotResolveHost => 6,
            FailureKind::CouldNotConnect => 7,
            FailureKind::HttpReturnedError => 22,
            FailureKind::Timeout => 28,
            FailureKind::TlsConnect => 35,
            FailureKind::TooManyRedirects => 47,
            FailureKind::Send => 55,
            FailureKind::Receive => 56,
        }
    }
}

/// A failed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Whatever was received before the failure.
    pub payload: Vec<u8>,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        TransportFailure {
            kind,
            message: message.into(),
            payload: vec![],
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    /// Classify an io error happening while receiving.
    pub(crate) fn recv(e: io::Error) -> Self {
        Self::from_io(FailureKind::Receive, e)
    }

    /// Classify an io error happening while sending.
    pub(crate) fn send(e: io::Error) -> Self {
        Self::from_io(FailureKind::Send, e)
    }

    fn from_io(fallback: FailureKind, e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
            _ => fallback,
        };
        TransportFailure::new(kind, e.to_string())
    }
}

impl From<httparse::Error> for TransportFailure {
    fn from(value: httparse::Error) -> Self {
        TransportFailure::new(FailureKind::Receive, format!("http parse fail: {}", value))
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code())
    }
}

impl std::error::Error for TransportFailure {}
