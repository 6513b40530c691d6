//! Splitting a raw transport payload into status line, headers and body.
//!
//! A transport following redirects returns every header block it received
//! in front of the final body. The parser consumes header blocks until it
//! reaches the final one, collecting `Set-Cookie` values along the way.

use crate::response::RawResponse;
use crate::session::CookieJar;
use crate::transport::TransferInfo;
use crate::util::compare_lowercase_ascii;

/// Parses payloads for one client, writing cookies into its jar.
pub struct ResponseParser<'a> {
    cookies: &'a mut CookieJar,
}

impl<'a> ResponseParser<'a> {
    pub fn new(cookies: &'a mut CookieJar) -> Self {
        ResponseParser { cookies }
    }

    /// Parse `payload` as received for a request to `url`.
    ///
    /// The status code and content type reported in `info` take precedence
    /// over what is parsed from the final header block.
    pub fn parse(
        &mut self,
        url: &str,
        user_agent: &str,
        mut payload: Vec<u8>,
        info: &TransferInfo,
    ) -> RawResponse {
        let mut offset = 0;
        let mut response_string: String;
        let mut parsed_code: u16;
        let mut headers: Vec<(String, String)> = vec![];

        loop {
            let rest = &payload[offset..];

            let (block, body_start) = match find_blank_line(rest) {
                Some((pos, len)) => (&rest[..pos], offset + pos + len),
                None => (rest, payload.len()),
            };

            let block = String::from_utf8_lossy(block);
            let mut lines = block.split(['\r', '\n']).filter(|l| !l.is_empty());

            response_string = lines.next().unwrap_or_default().to_string();
            parsed_code = status_code(&response_string).unwrap_or(0);
            trace!("Parsed header block: {}", response_string);

            // Only the last block describes the response we return.
            headers.clear();

            for line in lines {
                let Some((name, value)) = line.split_once(": ") else {
                    debug!("Skip malformed header line: {:?}", line);
                    continue;
                };

                if compare_lowercase_ascii(name, "set-cookie") {
                    self.cookies.insert_set_cookie(value);
                }

                set_header(&mut headers, name, value);
            }

            offset = body_start;

            if !expects_more_blocks(parsed_code, &payload[offset..]) {
                break;
            }
        }

        let body = payload.split_off(offset.min(payload.len()));

        let response_code = if info.response_code > 0 {
            info.response_code
        } else {
            parsed_code
        };

        let content_type = info
            .content_type
            .clone()
            .or_else(|| header_value(&headers, "content-type").map(|v| v.to_string()))
            .unwrap_or_default();

        RawResponse {
            url: url.to_string(),
            user_agent: user_agent.to_string(),
            response_code,
            content_type,
            response_string,
            response_headers: headers,
            body,
        }
    }
}

/// Find the first blank line. Returns its position and length.
///
/// `\r\n\r\n`, `\n\n` and `\r\r` are all accepted.
fn find_blank_line(input: &[u8]) -> Option<(usize, usize)> {
    (0..input.len()).find_map(|i| {
        let rest = &input[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") || rest.starts_with(b"\r\r") {
            Some((i, 2))
        } else {
            None
        }
    })
}

/// Parse the code out of a status line such as `HTTP/1.1 200 OK`.
fn status_code(status_line: &str) -> Option<u16> {
    let mut parts = status_line.split_whitespace();

    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }

    parts.next()?.parse().ok()
}

/// Whether another header block follows a block with status `code`.
///
/// Redirects and interim responses are followed by the next response's
/// header block, but only if the rest actually starts like one. A redirect
/// that was not followed has its own body there.
fn expects_more_blocks(code: u16, rest: &[u8]) -> bool {
    let chained = matches!(code, 301 | 302 | 303 | 307 | 308)
        || ((100..=199).contains(&code) && code != 101);

    chained && rest.starts_with(b"HTTP/")
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    let lower = name.to_ascii_lowercase();

    if let Some(existing) = headers
        .iter_mut()
        .find(|(n, _)| compare_lowercase_ascii(n, &lower))
    {
        *existing = (name.to_string(), value.to_string());
    } else {
        headers.push((name.to_string(), value.to_string()));
    }
}

pub(crate) fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let lower = name.to_ascii_lowercase();
    headers
        .iter()
        .find(|(n, _)| compare_lowercase_ascii(n, &lower))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(payload: &str) -> (RawResponse, CookieJar) {
        let mut jar = CookieJar::new();
        let raw = ResponseParser::new(&mut jar).parse(
            "http://x.test/",
            "agent",
            payload.as_bytes().to_vec(),
            &TransferInfo::default(),
        );
        (raw, jar)
    }

    #[test]
    fn redirect_chain_folded() {
        let (raw, _) = parse(
            "HTTP/1.1 301 Moved\r\nLocation: /x\r\n\r\n\
             HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello",
        );

        assert_eq!(raw.response_string, "HTTP/1.1 200 OK");
        assert_eq!(
            raw.response_headers,
            vec![("Content-Type".to_string(), "text/plain".to_string())]
        );
        assert_eq!(raw.body, b"hello");
        assert_eq!(raw.response_code, 200);
        assert_eq!(raw.content_type, "text/plain");
        assert_eq!(raw.url, "http://x.test/");
        assert_eq!(raw.user_agent, "agent");
    }

    #[test]
    fn single_block() {
        let (raw, _) = parse("HTTP/1.1 404 Not Found\r\nContent-Length: 2\r\n\r\nno");
        assert_eq!(raw.response_string, "HTTP/1.1 404 Not Found");
        assert_eq!(raw.response_code, 404);
        assert_eq!(raw.body, b"no");
    }

    #[test]
    fn unfollowed_redirect_keeps_body() {
        let (raw, _) = parse("HTTP/1.1 302 Found\r\nLocation: /x\r\n\r\nmoved");
        assert_eq!(raw.response_code, 302);
        assert_eq!(raw.body, b"moved");
    }

    #[test]
    fn other_redirects_and_interim_fold() {
        let (raw, _) = parse(
            "HTTP/1.1 100 Continue\r\n\r\n\
             HTTP/1.1 307 Temporary Redirect\r\nLocation: /a\r\n\r\n\
             HTTP/1.1 303 See Other\r\nLocation: /b\r\n\r\n\
             HTTP/1.1 200 OK\r\n\r\ndone",
        );
        assert_eq!(raw.response_string, "HTTP/1.1 200 OK");
        assert!(raw.response_headers.is_empty());
        assert_eq!(raw.body, b"done");
    }

    #[test]
    fn bare_line_endings() {
        let (raw, _) = parse("HTTP/1.0 200 OK\nX-A: 1\n\nbody");
        assert_eq!(raw.response_string, "HTTP/1.0 200 OK");
        assert_eq!(raw.response_headers, vec![("X-A".into(), "1".into())]);
        assert_eq!(raw.body, b"body");

        let (raw, _) = parse("HTTP/1.0 200 OK\rX-A: 1\r\rbody");
        assert_eq!(raw.response_headers, vec![("X-A".into(), "1".into())]);
        assert_eq!(raw.body, b"body");
    }

    #[test]
    fn no_blank_line_means_no_body() {
        let (raw, _) = parse("HTTP/1.1 204 No Content\r\nX-A: 1");
        assert_eq!(raw.response_code, 204);
        assert_eq!(raw.response_headers.len(), 1);
        assert!(raw.body.is_empty());
    }

    #[test]
    fn malformed_header_skipped() {
        let (raw, _) = parse("HTTP/1.1 200 OK\r\nbroken\r\nX-B:nospace\r\nX-C: ok\r\n\r\n");
        assert_eq!(raw.response_headers, vec![("X-C".into(), "ok".into())]);
    }

    #[test]
    fn last_header_wins() {
        let (raw, _) = parse("HTTP/1.1 200 OK\r\nX-A: 1\r\nx-a: 2\r\n\r\n");
        assert_eq!(raw.response_headers, vec![("x-a".into(), "2".into())]);
        assert_eq!(raw.header("X-A"), Some("2"));
    }

    #[test]
    fn cookies_from_every_block() {
        let (_, jar) = parse(
            "HTTP/1.1 301 Moved\r\nSet-Cookie: a=1; Path=/\r\nLocation: /x\r\n\r\n\
             HTTP/1.1 200 OK\r\nset-cookie: b=2\r\nSet-Cookie: a=3\r\n\r\n",
        );
        assert_eq!(jar.get("a"), Some("3"));
        assert_eq!(jar.get("b"), Some("2"));
        assert_eq!(jar.to_header_value().as_deref(), Some("a=3; b=2"));
    }

    #[test]
    fn reported_values_take_precedence() {
        let mut jar = CookieJar::new();
        let info = TransferInfo {
            response_code: 201,
            content_type: Some("application/json".into()),
            ..Default::default()
        };
        let raw = ResponseParser::new(&mut jar).parse(
            "http://x.test/",
            "agent",
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n{}".to_vec(),
            &info,
        );
        assert_eq!(raw.response_code, 201);
        assert_eq!(raw.content_type, "application/json");
    }

    #[test]
    fn status_code_forms() {
        assert_eq!(status_code("HTTP/1.1 200 OK"), Some(200));
        assert_eq!(status_code("HTTP/2 404"), Some(404));
        assert_eq!(status_code("garbage 200"), None);
        assert_eq!(status_code("HTTP/1.1"), None);
        assert_eq!(status_code(""), None);
    }
}
