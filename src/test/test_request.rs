use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};

use super::scenario::{ok_payload, Scenario};
use crate::client::RequestBody;

fn client_with(n: usize) -> crate::Client<super::scenario::MockTransport> {
    let mut builder = Scenario::builder();
    for _ in 0..n {
        builder = builder.reply(ok_payload("text/plain", "ok"));
    }
    builder.build().to_client()
}

#[test]
fn headers_serialized() {
    let mut client = client_with(1);

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.append("x-multi", HeaderValue::from_static("1"));
    headers.append("x-multi", HeaderValue::from_static("2"));

    client.get("http://a.test/q?x=1", &headers).unwrap();

    let req = &client.transport().requests[0];
    assert_eq!(req.url, "http://a.test/q?x=1");
    assert_eq!(req.method, Some(Method::GET));
    assert!(req.headers.contains(&"accept: application/json".to_string()));
    assert!(req.headers.contains(&"x-multi: 1".to_string()));
    assert!(req.headers.contains(&"x-multi: 2".to_string()));
    assert!(req.body.is_empty());

    // Caller's headers are untouched.
    assert_eq!(headers.len(), 3);
}

#[test]
fn form_body_encoded() {
    let mut client = client_with(1);

    client
        .post(
            "http://a.test/form",
            [("name", "a b"), ("q", "1&2")],
            &HeaderMap::new(),
        )
        .unwrap();

    let req = &client.transport().requests[0];
    assert_eq!(req.method, Some(Method::POST));
    assert_eq!(req.body, b"name=a+b&q=1%262");
    assert_eq!(
        req.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn form_body_keeps_callers_content_type() {
    let mut client = client_with(1);

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/x-custom"));

    client
        .put("http://a.test/", RequestBody::form([("a", "1")]), &headers)
        .unwrap();

    let req = &client.transport().requests[0];
    assert_eq!(req.method, Some(Method::PUT));
    assert_eq!(req.header("content-type"), Some("text/x-custom"));
    assert_eq!(
        req.headers
            .iter()
            .filter(|l| l.to_ascii_lowercase().starts_with("content-type"))
            .count(),
        1
    );
}

#[test]
fn raw_body_verbatim() {
    let mut client = client_with(1);

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    client
        .delete("http://a.test/item/1", r#"{"force":true}"#, &headers)
        .unwrap();

    let req = &client.transport().requests[0];
    assert_eq!(req.method, Some(Method::DELETE));
    assert_eq!(req.body, br#"{"force":true}"#);
    assert_eq!(req.header("content-type"), Some("application/json"));
}

#[test]
fn options_reset_between_requests() {
    let mut client = client_with(2);

    let mut headers = HeaderMap::new();
    headers.insert("x-once", HeaderValue::from_static("1"));

    client.post("http://a.test/", "data", &headers).unwrap();
    client.get("http://a.test/", &HeaderMap::new()).unwrap();

    let req = &client.transport().requests[1];
    assert_eq!(req.method, Some(Method::GET));
    assert!(req.body.is_empty());
    assert!(req.headers.is_empty());
}

#[test]
fn custom_method_and_user_agent() {
    let mut client = client_with(1);
    client.set_user_agent("custom/0.1").unwrap();

    client
        .request(Method::PATCH, "http://a.test/", "p", &HeaderMap::new())
        .unwrap();

    let req = &client.transport().requests[0];
    assert_eq!(req.method, Some(Method::PATCH));
    assert_eq!(req.user_agent.as_deref(), Some("custom/0.1"));
}
