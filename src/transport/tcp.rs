use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use url::{Position, Url};

use crate::config::TransportConfig;
use crate::ext::{MethodExt, StatusExt};
use crate::util::compare_lowercase_ascii;

use super::recv::{try_parse_head, BodyReader, Head};
use super::{FailureKind, TransferInfo, Transport, TransportFailure, TransportOption};

const BUFFER_SIZE: usize = 16 * 1024;

/// Blocking HTTP/1.1 transport over `TcpStream`.
///
/// Every request opens a new connection and sends `Connection: close`.
/// Redirects are followed internally (when enabled) and each received header
/// block is kept inline in the payload, while only the final body is kept.
#[derive(Debug)]
pub struct TcpTransport {
    config: TransportConfig,
    request: PendingRequest,
    info: TransferInfo,
    torn_down: bool,
}

/// The options for the next request.
#[derive(Debug, Clone)]
struct PendingRequest {
    url: String,
    method: Method,
    body: Vec<u8>,
    headers: Vec<String>,
    user_agent: Option<String>,
    verify_peer: bool,
    verify_host: bool,
    follow_redirects: bool,
    max_redirects: u32,
    auto_referer: bool,
}

/// One request/response on one connection.
struct Exchange {
    head: Head,
    head_bytes: Vec<u8>,
    body: Vec<u8>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        let request = PendingRequest {
            url: String::new(),
            method: Method::GET,
            body: vec![],
            headers: vec![],
            user_agent: None,
            verify_peer: true,
            verify_host: true,
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            auto_referer: config.auto_referer,
        };

        TcpTransport {
            config,
            request,
            info: TransferInfo::default(),
            torn_down: false,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn run(&self, info: &mut TransferInfo) -> Result<Vec<u8>, TransportFailure> {
        let req = &self.request;

        let mut url = Url::parse(&req.url).map_err(|e| {
            TransportFailure::new(FailureKind::MalformedUrl, format!("{}: {}", e, req.url))
        })?;
        let mut method = req.method.clone();
        let mut body: &[u8] = &req.body;
        let mut referer: Option<String> = None;
        let mut headers = req.headers.clone();

        let mut payload = Vec::new();

        loop {
            info.effective_url = url.to_string();

            let referer_ref = referer.as_deref();
            let exchange = match self.exchange(&url, &method, body, &headers, referer_ref, info) {
                Ok(v) => v,
                Err(e) => return Err(e.with_payload(payload)),
            };

            let Exchange {
                head,
                head_bytes,
                body: recv_body,
            } = exchange;

            payload.extend_from_slice(&head_bytes);
            info.header_size += head_bytes.len();
            info.response_code = head.status;
            info.content_type = head.header("content-type").map(|v| v.to_string());

            let next = if req.follow_redirects {
                match self.redirect_target(&url, &method, &head) {
                    Ok(v) => v,
                    Err(e) => return Err(e.with_payload(payload)),
                }
            } else {
                None
            };

            let Some((next_url, next_method)) = next else {
                payload.extend_from_slice(&recv_body);
                return Ok(payload);
            };

            if info.redirect_count >= req.max_redirects {
                let msg = format!("maximum ({}) redirects followed", req.max_redirects);
                return Err(
                    TransportFailure::new(FailureKind::TooManyRedirects, msg).with_payload(payload)
                );
            }

            debug!("Follow redirect {}: {} -> {}", head.status, url, next_url);

            if next_method != method {
                body = &[];
            }
            if req.auto_referer {
                referer = Some(url.to_string());
            }

            let keep_auth = can_redirect_auth_header(&url, &next_url);
            headers.retain(|line| {
                let name = line.split_once(':').map(|(n, _)| n.trim()).unwrap_or("");
                if compare_lowercase_ascii(name, "authorization") {
                    return keep_auth;
                }
                !compare_lowercase_ascii(name, "cookie")
                    && !compare_lowercase_ascii(name, "content-length")
            });

            method = next_method;
            url = next_url;
            info.redirect_count += 1;
        }
    }

    /// Work out where a response redirects to, if anywhere.
    fn redirect_target(
        &self,
        url: &Url,
        method: &Method,
        head: &Head,
    ) -> Result<Option<(Url, Method)>, TransportFailure> {
        let Ok(status) = StatusCode::from_u16(head.status) else {
            return Ok(None);
        };
        if !status.is_followable_redirect() {
            return Ok(None);
        }

        let Some(location) = head.header("location") else {
            return Ok(None);
        };

        let next_url = url.join(location).map_err(|e| {
            TransportFailure::new(
                FailureKind::MalformedUrl,
                format!("location header is malformed: {}: {}", e, location),
            )
        })?;

        // Perform the redirect method differently depending on 3xx code.
        let next_method = if status.is_redirect_retaining_status() {
            if method.need_request_body() || method == Method::DELETE {
                // only resend the request if it cannot have a body
                return Ok(None);
            }
            method.clone()
        } else if *method == Method::GET || *method == Method::HEAD {
            method.clone()
        } else {
            // POST, PUT etc change to GET on a redirect.
            Method::GET
        };

        Ok(Some((next_url, next_method)))
    }

    fn exchange(
        &self,
        url: &Url,
        method: &Method,
        body: &[u8],
        headers: &[String],
        referer: Option<&str>,
        info: &mut TransferInfo,
    ) -> Result<Exchange, TransportFailure> {
        let https = match url.scheme() {
            "http" => false,
            "https" => true,
            s => {
                return Err(TransportFailure::new(
                    FailureKind::UnsupportedProtocol,
                    format!("protocol \"{}\" not supported", s),
                ))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| TransportFailure::new(FailureKind::MalformedUrl, "url has no host"))?;
        // IPv6 hosts come bracketed.
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url.port_or_known_default().unwrap_or(if https { 443 } else { 80 });

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                TransportFailure::new(FailureKind::CouldNotResolveHost, format!("{}: {}", host, e))
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportFailure::new(
                FailureKind::CouldNotResolveHost,
                format!("{}: no addresses", host),
            ));
        }

        let tcp = connect(&addrs, self.config.connect_timeout)?;
        info.primary_ip = tcp.peer_addr().ok().map(|a| a.ip());

        let timeout = Some(self.config.timeout);
        tcp.set_read_timeout(timeout)
            .and_then(|_| tcp.set_write_timeout(timeout))
            .and_then(|_| tcp.set_nodelay(true))
            .map_err(|e| TransportFailure::new(FailureKind::CouldNotConnect, e.to_string()))?;

        let mut conn = if https {
            self.wrap_tls(host, tcp)?
        } else {
            Connection::Plain(tcp)
        };

        let request_head = self.request_head(url, method, body, headers, referer);
        trace!("Send request head: {:?}", request_head);

        info.request_size += request_head.len() + body.len();
        info.request_header = request_head.clone();

        conn.write_all(request_head.as_bytes())
            .and_then(|_| conn.write_all(body))
            .and_then(|_| conn.flush())
            .map_err(TransportFailure::send)?;

        read_response(&mut conn, method, self.config.max_response_size)
    }

    #[cfg(feature = "tls")]
    fn wrap_tls(&self, host: &str, tcp: TcpStream) -> Result<Connection, TransportFailure> {
        let verify = self.request.verify_peer || self.request.verify_host;
        if !verify {
            debug!("TLS certificate verification disabled for {}", host);
        }
        let stream = super::tls::connect(host, tcp, verify)?;
        Ok(Connection::Tls(Box::new(stream)))
    }

    #[cfg(not(feature = "tls"))]
    fn wrap_tls(&self, _host: &str, _tcp: TcpStream) -> Result<Connection, TransportFailure> {
        Err(TransportFailure::new(
            FailureKind::UnsupportedProtocol,
            "https requires the tls feature",
        ))
    }

    fn request_head(
        &self,
        url: &Url,
        method: &Method,
        body: &[u8],
        headers: &[String],
        referer: Option<&str>,
    ) -> String {
        let req = &self.request;

        let has_header = |name: &str| {
            headers.iter().any(|line| {
                line.split_once(':')
                    .map(|(n, _)| compare_lowercase_ascii(n.trim(), name))
                    .unwrap_or(false)
            })
        };

        let path = &url[Position::BeforePath..Position::AfterQuery];
        let mut head = format!("{} {} HTTP/1.1\r\n", method, path);

        if !has_header("host") {
            let host = &url[Position::BeforeHost..Position::AfterPort];
            head.push_str(&format!("Host: {}\r\n", host));
        }

        if let Some(agent) = &req.user_agent {
            if !has_header("user-agent") {
                head.push_str(&format!("User-Agent: {}\r\n", agent));
            }
        }

        if !has_header("accept") {
            head.push_str("Accept: */*\r\n");
        }

        if let Some(referer) = referer {
            head.push_str(&format!("Referer: {}\r\n", referer));
        }

        for line in headers {
            head.push_str(line);
            head.push_str("\r\n");
        }

        if !body.is_empty() || method.need_request_body() {
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));

            if !body.is_empty() && !has_header("content-type") {
                head.push_str("Content-Type: application/x-www-form-urlencoded\r\n");
            }
        }

        head.push_str("Connection: close\r\n\r\n");

        head
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn set_option(&mut self, option: TransportOption) {
        let req = &mut self.request;
        match option {
            TransportOption::Url(v) => req.url = v,
            TransportOption::Method(v) => req.method = v,
            TransportOption::Body(v) => req.body = v,
            TransportOption::Headers(v) => req.headers = v,
            TransportOption::UserAgent(v) => req.user_agent = Some(v),
            TransportOption::VerifyPeer(v) => req.verify_peer = v,
            TransportOption::VerifyHost(v) => req.verify_host = v,
            TransportOption::FollowRedirects(v) => req.follow_redirects = v,
            TransportOption::MaxRedirects(v) => req.max_redirects = v,
            TransportOption::AutoReferer(v) => req.auto_referer = v,
        }
    }

    fn perform(&mut self) -> Result<Vec<u8>, TransportFailure> {
        if self.torn_down {
            return Err(TransportFailure::new(FailureKind::Send, "transport is torn down"));
        }

        let start = Instant::now();
        let mut info = TransferInfo::default();

        let result = self.run(&mut info);

        info.total_time = start.elapsed();
        self.info = info;

        result
    }

    fn info(&self) -> &TransferInfo {
        &self.info
    }

    fn teardown(&mut self) {
        self.torn_down = true;
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

enum Connection {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<super::tls::TlsStream>),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.read(buf),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.write(buf),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(s) => s.flush(),
            #[cfg(feature = "tls")]
            Connection::Tls(s) => s.flush(),
        }
    }
}

/// The `authorization` header survives a redirect to the same host, using
/// the same scheme or upgrading to https.
fn can_redirect_auth_header(prev: &Url, next: &Url) -> bool {
    prev.host_str() == next.host_str()
        && (prev.scheme() == next.scheme() || next.scheme() == "https")
}

fn connect(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream, TransportFailure> {
    let mut last_err = None;

    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(v) => return Ok(v),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    let kind = match last_err.as_ref().map(|e| e.kind()) {
        Some(io::ErrorKind::TimedOut) => FailureKind::Timeout,
        _ => FailureKind::CouldNotConnect,
    };
    let msg = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no address to connect to".to_string());

    Err(TransportFailure::new(kind, msg))
}

fn read_some(conn: &mut impl Read, buf: &mut [u8]) -> Result<usize, TransportFailure> {
    loop {
        match conn.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // Peers closing a TLS connection without close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(0),
            Err(e) => return Err(TransportFailure::recv(e)),
        }
    }
}

fn read_response(
    conn: &mut impl Read,
    method: &Method,
    max_size: usize,
) -> Result<Exchange, TransportFailure> {
    let mut buf = vec![0_u8; BUFFER_SIZE];
    let mut input: Vec<u8> = Vec::with_capacity(BUFFER_SIZE);
    let mut head_bytes = Vec::new();

    let too_large = || TransportFailure::new(FailureKind::Receive, "response exceeds max size");

    let head = loop {
        if let Some(head) = try_parse_head(&input)? {
            head_bytes.extend(input.drain(..head.len));

            // Interim responses are kept inline, the real one follows.
            if (100..=199).contains(&head.status) && head.status != 101 {
                trace!("Skip interim response {}", head.status);
                continue;
            }

            break head;
        }

        let n = read_some(conn, &mut buf)?;
        if n == 0 {
            return Err(TransportFailure::new(
                FailureKind::Receive,
                "connection closed before response head",
            ));
        }
        input.extend_from_slice(&buf[..n]);

        if input.len() + head_bytes.len() > max_size {
            return Err(too_large());
        }
    };

    let mut reader = BodyReader::for_response(method, &head)?;
    trace!("Response {} body mode {:?}", head.status, reader);

    let mut body = Vec::new();

    loop {
        let used = reader.read(&input, &mut body)?;
        input.drain(..used);

        if reader.is_ended() {
            break;
        }

        let n = read_some(conn, &mut buf)?;
        if n == 0 {
            if reader.is_close_delimited() {
                break;
            }
            return Err(TransportFailure::new(
                FailureKind::Receive,
                "connection closed before end of body",
            ));
        }
        input.extend_from_slice(&buf[..n]);

        if head_bytes.len() + body.len() + input.len() > max_size {
            return Err(too_large());
        }
    }

    Ok(Exchange {
        head,
        head_bytes,
        body,
    })
}
