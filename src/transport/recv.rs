use std::fmt;

use http::Method;

use crate::util::compare_lowercase_ascii;

use super::chunk::Dechunker;
use super::{FailureKind, TransportFailure};

/// Max number of headers to parse from an HTTP response
pub(crate) const MAX_RESPONSE_HEADERS: usize = 128;

/// A response head parsed from the start of the input.
#[derive(Debug)]
pub(crate) struct Head {
    /// Bytes of input used by the head, including the final blank line.
    pub len: usize,
    pub http10: bool,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Head {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| compare_lowercase_ascii(k, &name))
            .map(|(_, v)| v.as_str())
    }
}

/// Try parse a response head. `None` means more input is needed.
pub(crate) fn try_parse_head(input: &[u8]) -> Result<Option<Head>, TransportFailure> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut res = httparse::Response::new(&mut headers);

    let len = match res.parse(input)? {
        httparse::Status::Complete(v) => v,
        httparse::Status::Partial => return Ok(None),
    };

    let status = res
        .code
        .ok_or_else(|| TransportFailure::new(FailureKind::Receive, "response missing status"))?;

    let headers = res
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    Ok(Some(Head {
        len,
        http10: res.version == Some(0),
        status,
        headers,
    }))
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyReader {
    /// No body is expected either due to the status or method.
    NoBody,
    /// Delimited by content-length.
    /// The value is what's left to receive.
    LengthDelimited(u64),
    /// Chunked transfer encoding
    Chunked(Dechunker),
    /// Expect remote to close at end of body.
    CloseDelimited,
}

impl BodyReader {
    pub fn for_response(method: &Method, head: &Head) -> Result<Self, TransportFailure> {
        let status_code = head.status;
        let is_informational = (100..=199).contains(&status_code);

        let has_no_body =
            // https://datatracker.ietf.org/doc/html/rfc2616#section-4.3
            // All responses to the HEAD request method
            // MUST NOT include a message-body, even though the presence of entity-
            // header fields might lead one to believe they do.
            method == Method::HEAD ||
            // All 1xx (informational), 204 (no content), and 304 (not modified) responses
            // MUST NOT include a message-body.
            is_informational ||
            matches!(status_code, 204 | 304);

        if has_no_body {
            return Ok(Self::NoBody);
        }

        // https://datatracker.ietf.org/doc/html/rfc2616#section-4.3
        // All other responses do include a message-body, although it MAY be of zero length.
        Self::header_defined(head)
    }

    fn header_defined(head: &Head) -> Result<Self, TransportFailure> {
        let chunked = head
            .header("transfer-encoding")
            .map(|value| {
                value
                    .split(',')
                    .map(|v| v.trim())
                    .any(|v| compare_lowercase_ascii(v, "chunked"))
            })
            .unwrap_or(false);

        if chunked && !head.http10 {
            // https://datatracker.ietf.org/doc/html/rfc2616#section-4.4
            // Messages MUST NOT include both a Content-Length header field and a
            // non-identity transfer-coding. If the message does include a non-
            // identity transfer-coding, the Content-Length MUST be ignored.
            return Ok(Self::Chunked(Dechunker::new()));
        }

        if let Some(value) = head.header("content-length") {
            let len = value.trim().parse::<u64>().map_err(|_| {
                TransportFailure::new(FailureKind::Receive, "content-length header not a number")
            })?;
            return Ok(Self::LengthDelimited(len));
        }

        Ok(Self::CloseDelimited)
    }

    /// Read body from `src` into `dst`. Returns the amount of input used.
    pub fn read(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize, TransportFailure> {
        let used = match self {
            BodyReader::NoBody => 0,
            BodyReader::LengthDelimited(left) => {
                let left_usize = (*left).min(usize::MAX as u64) as usize;
                let to_read = src.len().min(left_usize);
                dst.extend_from_slice(&src[..to_read]);
                *left -= to_read as u64;
                to_read
            }
            BodyReader::Chunked(dechunker) => {
                let used = dechunker.parse_input(src, dst)?;
                trace!("Read chunked: {}", used);
                used
            }
            BodyReader::CloseDelimited => {
                dst.extend_from_slice(src);
                src.len()
            }
        };

        Ok(used)
    }

    pub fn is_ended(&self) -> bool {
        match self {
            BodyReader::NoBody => true,
            BodyReader::LengthDelimited(v) => *v == 0,
            BodyReader::Chunked(v) => v.is_ended(),
            BodyReader::CloseDelimited => false,
        }
    }

    pub fn is_close_delimited(&self) -> bool {
        matches!(self, BodyReader::CloseDelimited)
    }
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBody => write!(f, "NoBody"),
            Self::LengthDelimited(arg0) => f.debug_tuple("LengthDelimited").field(arg0).finish(),
            Self::Chunked(_) => write!(f, "Chunked"),
            Self::CloseDelimited => write!(f, "CloseDelimited"),
        }
    }
}
