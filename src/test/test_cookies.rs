use http::HeaderMap;

use super::scenario::{ok_payload, Scenario};

#[test]
fn cookies_round_trip() {
    let mut client = Scenario::builder()
        .reply("HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\n\r\n")
        .reply("HTTP/1.1 200 OK\r\nSet-Cookie: b=2\r\n\r\n")
        .reply(ok_payload("text/plain", "done"))
        .build()
        .to_client();

    let h = HeaderMap::new();
    client.get("http://a.test/1", &h).unwrap();
    client.get("http://a.test/2", &h).unwrap();

    let jar: Vec<_> = client.cookies().iter().collect();
    assert_eq!(jar, vec![("a", "1"), ("b", "2")]);

    client.get("http://a.test/3", &h).unwrap();

    let requests = &client.transport().requests;
    assert_eq!(requests[0].header("cookie"), None);
    assert_eq!(requests[1].header("cookie"), Some("a=1"));
    assert_eq!(requests[2].header("cookie"), Some("a=1; b=2"));
}

#[test]
fn later_cookie_overwrites() {
    let mut client = Scenario::builder()
        .reply("HTTP/1.1 200 OK\r\nSet-Cookie: sid=old; Path=/\r\n\r\n")
        .reply("HTTP/1.1 200 OK\r\nSet-Cookie: sid=new; HttpOnly\r\n\r\n")
        .build()
        .to_client();

    let h = HeaderMap::new();
    client.get("http://a.test/", &h).unwrap();
    client.get("http://a.test/", &h).unwrap();

    assert_eq!(client.cookies().len(), 1);
    assert_eq!(client.cookies().get("sid"), Some("new"));
}

#[test]
fn cookies_from_redirect_blocks() {
    let mut client = Scenario::builder()
        .reply(
            "HTTP/1.1 302 Found\r\nSet-Cookie: step=1\r\nLocation: /b\r\n\r\n\
             HTTP/1.1 200 OK\r\nSet-Cookie: done=yes\r\n\r\nbody",
        )
        .build()
        .to_client();

    client.get("http://a.test/a", &HeaderMap::new()).unwrap();

    assert_eq!(client.cookies().get("step"), Some("1"));
    assert_eq!(client.cookies().get("done"), Some("yes"));
}

#[test]
fn manual_and_cleared_cookies() {
    let mut client = Scenario::builder()
        .reply(ok_payload("text/plain", "1"))
        .reply(ok_payload("text/plain", "2"))
        .build()
        .to_client();

    let h = HeaderMap::new();
    client.set_cookie("token", "abc");
    client.get("http://a.test/", &h).unwrap();

    client.clear_cookies();
    client.get("http://a.test/", &h).unwrap();

    let requests = &client.transport().requests;
    assert_eq!(requests[0].header("cookie"), Some("token=abc"));
    assert_eq!(requests[1].header("cookie"), None);
}
