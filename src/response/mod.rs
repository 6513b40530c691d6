//! The response value object.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::parser::header_value;

mod stream;
pub use stream::{Chunk, EntryKey, StreamState};

/// Property names backed by response fields. These can be read via
/// [`Response::property`] but never written.
pub const RESERVED_PROPERTIES: &[&str] = &[
    "url",
    "user_agent",
    "response_code",
    "content_type",
    "response_string",
    "response_headers",
    "body",
    "code",
    "state",
    "read_index",
    "raw",
    "properties",
];

/// The response as parsed from the transport payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// The requested url.
    pub url: String,
    /// The user agent the request was sent with.
    pub user_agent: String,
    pub response_code: u16,
    /// The `Content-Type` as received, empty if there was none.
    pub content_type: String,
    /// The status line of the final response, like `HTTP/1.1 200 OK`.
    pub response_string: String,
    /// Headers of the final response. Names are unique ignoring case, the
    /// last occurrence received wins.
    pub response_headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Case insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.response_headers, name)
    }
}

/// Classification of the `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Html,
    Plain,
    /// Anything else, verbatim.
    Other(String),
}

impl ContentType {
    /// Classify a `Content-Type` header value.
    ///
    /// Parameters like `; charset=utf-8` and case are ignored when matching
    /// the known types.
    pub fn classify(value: &str) -> Self {
        let essence = value.split(';').next().unwrap_or_default().trim();

        if essence.eq_ignore_ascii_case("application/json") {
            ContentType::Json
        } else if essence.eq_ignore_ascii_case("text/html") {
            ContentType::Html
        } else if essence.eq_ignore_ascii_case("text/plain") {
            ContentType::Plain
        } else {
            ContentType::Other(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Html => "text/html",
            ContentType::Plain => "text/plain",
            ContentType::Other(v) => v,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ContentType::Json)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Parsed from an `application/json` response.
    Json(Value),
    /// Any other response, unaltered.
    Bytes(Vec<u8>),
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            Body::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Json(_) => None,
            Body::Bytes(v) => Some(v),
        }
    }
}

/// An HTTP response.
///
/// Created by the [`Client`][crate::Client]. The content type and body are
/// derived from the raw response on first access and then kept. The body
/// can also be consumed incrementally through the stream methods
/// ([`peek`][Response::peek], [`read`][Response::read],
/// [`rewind`][Response::rewind] etc).
pub struct Response {
    raw: RawResponse,
    code: u16,
    content_type: OnceCell<ContentType>,
    body: OnceCell<Body>,
    properties: HashMap<String, Value>,
    state: StreamState,
    read_index: usize,
}

impl Response {
    pub(crate) fn new(raw: RawResponse) -> Self {
        let mut response = Response {
            code: raw.response_code,
            raw,
            content_type: OnceCell::new(),
            body: OnceCell::new(),
            properties: HashMap::new(),
            state: StreamState::Unopened,
            read_index: 0,
        };

        response.open();

        response
    }

    fn open(&mut self) {
        // Without a status code there never was a proper response.
        self.state = if self.code == 0 {
            warn!("Response for {} has no status code", self.raw.url);
            StreamState::Error
        } else {
            StreamState::Connected
        };
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn into_raw(self) -> RawResponse {
        self.raw
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.code)
    }

    pub fn url(&self) -> &str {
        &self.raw.url
    }

    pub fn response_string(&self) -> &str {
        &self.raw.response_string
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.header(name)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw
            .response_headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The classified content type. Computed once.
    pub fn content_type(&self) -> &ContentType {
        self.content_type
            .get_or_init(|| ContentType::classify(&self.raw.content_type))
    }

    /// The decoded body. Computed once.
    ///
    /// A JSON body that is empty, invalid or `null` fails with
    /// [`Error::Decode`]. The failure is not kept, the next call tries again.
    pub fn body(&self) -> Result<&Body> {
        if let Some(body) = self.body.get() {
            return Ok(body);
        }

        let decoded = self.decode_body()?;

        Ok(self.body.get_or_init(|| decoded))
    }

    fn decode_body(&self) -> Result<Body> {
        if !self.content_type().is_json() {
            return Ok(Body::Bytes(self.raw.body.clone()));
        }

        if self.raw.body.iter().all(|c| c.is_ascii_whitespace()) {
            return Err(Error::Decode("empty body".to_string()));
        }

        let value: Value = serde_json::from_slice(&self.raw.body)?;

        if value.is_null() {
            return Err(Error::Decode("body is null".to_string()));
        }

        trace!("Decoded json body of {}", self.raw.url);

        Ok(Body::Json(value))
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw.body)
    }

    /// Deserialize the raw body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.raw.body)?)
    }

    /// Read a property, either a response field by its reserved name or a
    /// value set with [`set_property`][Response::set_property].
    pub fn property(&self, name: &str) -> Result<Value> {
        let value = match name {
            "url" => Value::from(self.raw.url.clone()),
            "user_agent" => Value::from(self.raw.user_agent.clone()),
            "response_code" | "code" => Value::from(self.code),
            "content_type" => Value::from(self.content_type().as_str()),
            "response_string" => Value::from(self.raw.response_string.clone()),
            "response_headers" => Value::Object(
                self.raw
                    .response_headers
                    .iter()
                    .map(|(n, v)| (n.clone(), Value::from(v.clone())))
                    .collect(),
            ),
            "body" => match self.body()? {
                Body::Json(v) => v.clone(),
                Body::Bytes(v) => Value::from(String::from_utf8_lossy(v).to_string()),
            },
            "state" => Value::from(self.state.as_str()),
            "read_index" => Value::from(self.read_index),
            "raw" => serde_json::json!({
                "url": self.raw.url,
                "user_agent": self.raw.user_agent,
                "response_code": self.raw.response_code,
                "content_type": self.raw.content_type,
                "response_string": self.raw.response_string,
            }),
            "properties" => Value::Object(
                self.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => self
                .properties
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownProperty(name.to_string()))?,
        };

        Ok(value)
    }

    /// Set an extension property. Reserved names are rejected.
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if RESERVED_PROPERTIES.contains(&name) {
            return Err(Error::ImmutableProperty(name.to_string()));
        }

        self.properties.insert(name.to_string(), value.into());

        Ok(())
    }

    pub fn has_property(&self, name: &str) -> bool {
        RESERVED_PROPERTIES.contains(&name) || self.properties.contains_key(name)
    }

    /// The extension properties set on this response.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.raw.url)
            .field("code", &self.code)
            .field("content_type", &self.raw.content_type)
            .field("body_len", &self.raw.body.len())
            .field("state", &self.state)
            .field("read_index", &self.read_index)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn response_with(content_type: &str, body: &[u8]) -> Response {
    Response::new(RawResponse {
        url: "http://x.test/".to_string(),
        user_agent: "agent".to_string(),
        response_code: 200,
        content_type: content_type.to_string(),
        response_string: "HTTP/1.1 200 OK".to_string(),
        response_headers: vec![("Content-Type".to_string(), content_type.to_string())],
        body: body.to_vec(),
    })
}
