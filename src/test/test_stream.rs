use http::HeaderMap;
use serde_json::json;

use super::scenario::{ok_payload, Scenario};
use crate::response::{Chunk, EntryKey, Response, StreamState};

fn get(content_type: &str, body: &str) -> Response {
    let mut client = Scenario::builder()
        .reply(ok_payload(content_type, body))
        .build()
        .to_client();

    client.get("http://a.test/", &HeaderMap::new()).unwrap()
}

#[test]
fn connected_after_construction() {
    let res = get("text/plain", "abc");
    assert_eq!(res.state(), StreamState::Connected);
    assert_eq!(res.read_index(), 0);
}

#[test]
fn peek_is_idempotent() {
    let mut res = get("text/plain", "abcdef");

    let first = res.peek().unwrap();
    for _ in 0..5 {
        assert_eq!(res.peek().unwrap(), first);
    }

    res.read().unwrap();
    res.rewind(3);

    let after = res.peek().unwrap();
    assert_eq!(after, Some(Chunk::Bytes(b"def")));
    assert_eq!(res.peek().unwrap(), after);
}

#[test]
fn rewind_boundaries() {
    let mut res = get("text/plain", "0123456789");

    res.read().unwrap();
    assert_eq!(res.read_index(), 10);

    res.rewind(0);
    assert_eq!(res.read_index(), 0);

    res.read().unwrap();
    res.rewind(4);
    assert_eq!(res.read_index(), 6);

    res.rewind(7);
    assert_eq!(res.read_index(), 0);
}

#[test]
fn walk_json_collection() {
    let mut res = get("application/json", r#"[{"id":1},{"id":2},{"id":3}]"#);

    let mut ids = vec![];
    while let Some(chunk) = res.read().unwrap() {
        let (key, value) = chunk.as_entry().unwrap();
        let EntryKey::Index(i) = key else {
            panic!("expected index key");
        };
        ids.push((i, value["id"].clone()));
    }

    assert_eq!(ids, vec![(0, json!(1)), (1, json!(2)), (2, json!(3))]);
    assert!(res.empty().unwrap());

    res.rewind(2);
    let (_, value) = res.peek().unwrap().unwrap().as_entry().unwrap();
    assert_eq!(value, &json!({"id": 2}));
}

#[test]
fn close_keeps_fields() {
    let mut res = get("application/json", r#"{"a":1}"#);
    res.close();

    assert_eq!(res.peek().unwrap(), None);
    assert!(res.empty().unwrap());
    assert_eq!(res.code(), 200);
    assert_eq!(res.property("body").unwrap(), json!({"a": 1}));
    assert_eq!(res.property("state").unwrap(), json!("closed"));
}
