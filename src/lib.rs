//! Blocking http client with a cookie session and a seekable response body.
//!
//! A [`Client`] owns one reusable [`Transport`] and the session state that
//! follows it from request to request: user agent, [`SslMode`], cookies and
//! the [`TransferInfo`] of the last request.
//!
//! The raw payload of the transport, possibly several header blocks when
//! redirects were followed, is split into a [`Response`]. Its content type
//! and body are derived lazily. JSON bodies are parsed, anything else is
//! kept as bytes. The body can be walked with [`Response::peek`],
//! [`Response::read`] and [`Response::rewind`].
//!
//! ```no_run
//! use hootclient::http::HeaderMap;
//! use hootclient::{Client, SslMode};
//!
//! let mut client = Client::new();
//! client.set_ssl_mode(SslMode::Off);
//!
//! let mut response = client.get("https://example.com/api", &HeaderMap::new())?;
//! println!("{} {}", response.code(), response.content_type());
//!
//! while let Some(chunk) = response.read()? {
//!     println!("{:?}", chunk);
//! }
//! # Ok::<_, hootclient::Error>(())
//! ```

#[macro_use]
extern crate log;

// Re-export the basis for this library.
pub use http;

mod error;
pub use error::Error;

mod config;
pub use config::{TransportConfig, DEFAULT_MAX_REDIRECTS};

mod ext;
mod util;

mod transport;
pub use transport::{FailureKind, TcpTransport, TransferInfo};
pub use transport::{Transport, TransportFailure, TransportOption};

mod session;
pub use session::{CookieJar, SessionState, SslMode, DEFAULT_USER_AGENT};

mod parser;
pub use parser::ResponseParser;

mod response;
pub use response::{Body, Chunk, ContentType, EntryKey, RawResponse, Response, StreamState};
pub use response::RESERVED_PROPERTIES;

mod reachability;
pub use reachability::{Reachability, TcpProbe};

mod client;
pub use client::{Client, RequestBody};

mod open;
pub use open::{has_default_client, open, open_with, set_default_client, with_default_client};

#[cfg(test)]
mod test;
