use std::fmt;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method};

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::parser::ResponseParser;
use crate::reachability::{Reachability, TcpProbe};
use crate::response::Response;
use crate::session::{CookieJar, SessionState, SslMode};
use crate::transport::{FailureKind, TcpTransport, TransferInfo};
use crate::transport::{Transport, TransportFailure, TransportOption};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Body of a POST, PUT or DELETE request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Key/value pairs, sent form encoded.
    Form(Vec<(String, String)>),
    /// Sent verbatim.
    Raw(Vec<u8>),
}

impl RequestBody {
    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            RequestBody::Empty => vec![],
            RequestBody::Form(pairs) => url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()
                .into_bytes(),
            RequestBody::Raw(v) => v.clone(),
        }
    }

    fn is_form(&self) -> bool {
        matches!(self, RequestBody::Form(_))
    }
}

impl From<()> for RequestBody {
    fn from(_: ()) -> Self {
        RequestBody::Empty
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        RequestBody::Raw(value.as_bytes().to_vec())
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        RequestBody::Raw(value.into_bytes())
    }
}

impl From<&[u8]> for RequestBody {
    fn from(value: &[u8]) -> Self {
        RequestBody::Raw(value.to_vec())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        RequestBody::Raw(value)
    }
}

impl From<Vec<(String, String)>> for RequestBody {
    fn from(value: Vec<(String, String)>) -> Self {
        RequestBody::Form(value)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for RequestBody {
    fn from(value: [(&str, &str); N]) -> Self {
        RequestBody::form(value)
    }
}

/// An HTTP client.
///
/// Owns one transport, configured once and reused for every request, and
/// the session state: user agent, SSL mode, cookies and the diagnostics of
/// the last request.
///
/// All requests take `&mut self`. One client runs one request at a time,
/// use several clients for concurrent requests.
pub struct Client<T: Transport = TcpTransport> {
    transport: T,
    state: SessionState,
    reachability: Box<dyn Reachability + Send>,
}

impl Client<TcpTransport> {
    pub fn new() -> Self {
        Self::with_transport(TcpTransport::new())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        Self::with_transport(TcpTransport::with_config(config))
    }
}

impl Default for Client<TcpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Client {
            transport,
            state: SessionState::default(),
            reachability: Box::new(TcpProbe::default()),
        }
    }

    /// Replace the diagnostic run when a host cannot be resolved.
    pub fn with_reachability(mut self, reachability: impl Reachability + Send + 'static) -> Self {
        self.reachability = Box::new(reachability);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    pub fn user_agent(&self) -> &str {
        &self.state.user_agent
    }

    /// Set the user agent for subsequent requests.
    ///
    /// Fails with [`Error::InvalidArgument`] for an empty value or one that
    /// can't be sent as a header.
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> Result<()> {
        let user_agent = user_agent.into();

        if user_agent.trim().is_empty() {
            return Err(Error::InvalidArgument("user agent is empty".to_string()));
        }
        if user_agent.chars().any(|c| c.is_control()) {
            return Err(Error::InvalidArgument(format!(
                "user agent contains control characters: {:?}",
                user_agent
            )));
        }

        self.state.user_agent = user_agent;

        Ok(())
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.state.ssl_mode
    }

    pub fn set_ssl_mode(&mut self, mode: SslMode) {
        self.state.ssl_mode = mode;
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.state.cookies
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.state.cookies.insert(name, value);
    }

    pub fn clear_cookies(&mut self) {
        self.state.cookies.clear();
    }

    /// Diagnostics of the last request, successful or not.
    pub fn last_request_info(&self) -> &TransferInfo {
        &self.state.last_request_info
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport. Every later request fails with
    /// [`Error::Precondition`].
    pub fn teardown(&mut self) {
        if !self.transport.is_torn_down() {
            debug!("Tear down transport");
            self.transport.teardown();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.transport.is_torn_down()
    }

    pub fn get(&mut self, url: &str, headers: &HeaderMap) -> Result<Response> {
        self.execute(Method::GET, url, &RequestBody::Empty, headers)
    }

    pub fn post(
        &mut self,
        url: &str,
        body: impl Into<RequestBody>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        self.execute(Method::POST, url, &body.into(), headers)
    }

    pub fn put(
        &mut self,
        url: &str,
        body: impl Into<RequestBody>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        self.execute(Method::PUT, url, &body.into(), headers)
    }

    pub fn delete(
        &mut self,
        url: &str,
        body: impl Into<RequestBody>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        self.execute(Method::DELETE, url, &body.into(), headers)
    }

    /// Make a request with any method.
    pub fn request(
        &mut self,
        method: Method,
        url: &str,
        body: impl Into<RequestBody>,
        headers: &HeaderMap,
    ) -> Result<Response> {
        self.execute(method, url, &body.into(), headers)
    }

    fn execute(
        &mut self,
        method: Method,
        url: &str,
        body: &RequestBody,
        headers: &HeaderMap,
    ) -> Result<Response> {
        if self.transport.is_torn_down() {
            return Err(Error::Precondition);
        }

        // Only the effective value is handed to the transport, the
        // configured mode stays as it is.
        let verify = self.state.ssl_mode.verify_for(url);
        debug!("{} {} (verify: {})", method, url, verify);

        let mut lines: Vec<String> = headers
            .iter()
            .map(|(name, value)| {
                format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()))
            })
            .collect();

        if body.is_form() && !headers.contains_key(CONTENT_TYPE) {
            lines.push(format!("Content-Type: {}", FORM_CONTENT_TYPE));
        }

        if let Some(cookie) = self.state.cookies.to_header_value() {
            lines.push(format!("Cookie: {}", cookie));
        }

        let t = &mut self.transport;
        t.set_option(TransportOption::Url(url.to_string()));
        t.set_option(TransportOption::Method(method));
        t.set_option(TransportOption::UserAgent(self.state.user_agent.clone()));
        t.set_option(TransportOption::VerifyPeer(verify));
        t.set_option(TransportOption::VerifyHost(verify));
        t.set_option(TransportOption::Headers(lines));
        t.set_option(TransportOption::Body(body.encode()));

        let result = t.perform();
        self.state.last_request_info = t.info().clone();

        let payload = match result {
            Ok(v) => v,
            Err(failure) => self.recover(failure)?,
        };

        if payload.is_empty() {
            return Err(Error::EmptyResponse);
        }

        let raw = ResponseParser::new(&mut self.state.cookies).parse(
            url,
            &self.state.user_agent,
            payload,
            &self.state.last_request_info,
        );

        trace!("Response {} for {}", raw.response_code, url);

        Ok(Response::new(raw))
    }

    /// Turn a transport failure into an error, or into a payload when the
    /// failure is only an error status.
    fn recover(&self, failure: TransportFailure) -> Result<Vec<u8>> {
        match failure.kind {
            FailureKind::CouldNotResolveHost => {
                let diagnostic = self.reachability.diagnose();
                warn!("Could not resolve host: {} ({})", failure.message, diagnostic);
                Err(Error::Connectivity {
                    message: failure.message,
                    diagnostic,
                })
            }

            FailureKind::HttpReturnedError => {
                let code = self.state.last_request_info.response_code;
                debug!("Transport reported error status {}", code);

                if failure.payload.is_empty() && code > 0 {
                    Ok(format!("HTTP/1.1 {}\r\n\r\n", code).into_bytes())
                } else {
                    Ok(failure.payload)
                }
            }

            kind => {
                warn!("Transport failed: {}", failure);
                Err(Error::Transport {
                    kind,
                    code: kind.code(),
                    message: failure.message,
                })
            }
        }
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("user_agent", &self.state.user_agent)
            .field("ssl_mode", &self.state.ssl_mode)
            .field("cookies", &self.state.cookies.len())
            .field("torn_down", &self.transport.is_torn_down())
            .finish()
    }
}
