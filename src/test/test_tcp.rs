use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use http::HeaderMap;

use crate::client::Client;
use crate::error::Error;
use crate::response::{Body, ContentType};

/// Serve canned responses, one per connection, returning the request heads.
fn serve(responses: Vec<&'static str>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut heads = vec![];
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();

            let mut input = vec![];
            let mut buf = [0; 1024];
            while !input.ends_with(b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                input.extend_from_slice(&buf[..n]);
            }

            heads.push(String::from_utf8(input).unwrap());
            stream.write_all(response.as_bytes()).unwrap();
        }
        heads
    });

    (format!("http://{}", addr), handle)
}

#[test]
fn redirect_and_cookies_over_tcp() {
    let (base, server) = serve(vec![
        "HTTP/1.1 301 Moved Permanently\r\nLocation: /data\r\nSet-Cookie: seen=1; Path=/\r\n\
         Content-Length: 0\r\n\r\n",
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 13\r\n\r\n\
         {\"items\":[1]}",
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
    ]);

    let mut client = Client::new();

    let res = client.get(&format!("{}/start", base), &HeaderMap::new()).unwrap();

    assert_eq!(res.code(), 200);
    assert_eq!(res.response_string(), "HTTP/1.1 200 OK");
    assert_eq!(res.content_type(), &ContentType::Json);
    assert_eq!(
        res.body().unwrap(),
        &Body::Json(serde_json::json!({"items": [1]}))
    );
    assert!(res.header("location").is_none());

    assert_eq!(client.cookies().get("seen"), Some("1"));

    let info = client.last_request_info();
    assert_eq!(info.redirect_count, 1);
    assert_eq!(info.effective_url, format!("{}/data", base));

    client.get(&base, &HeaderMap::new()).unwrap();

    let heads = server.join().unwrap();
    assert!(heads[0].starts_with("GET /start HTTP/1.1\r\n"));
    assert!(heads[0].contains(&format!("User-Agent: {}\r\n", crate::DEFAULT_USER_AGENT)));
    assert!(heads[1].starts_with("GET /data HTTP/1.1\r\n"));
    assert!(heads[2].contains("Cookie: seen=1\r\n"));
}

#[test]
fn open_with_client() {
    let (base, server) = serve(vec!["HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\ngone"]);

    let mut client = Client::new();
    let mut res = crate::open_with(&mut client, &base).unwrap();

    assert_eq!(res.code(), 404);
    assert_eq!(res.read().unwrap().and_then(|c| c.as_bytes()), Some(&b"gone"[..]));

    server.join().unwrap();
}

#[test]
fn unresolvable_host_runs_diagnostic() {
    let mut client = Client::new().with_reachability(|| "diagnostic: offline".to_string());

    let err = client
        .get("http://nonexistent.invalid/", &HeaderMap::new())
        .unwrap_err();

    assert!(matches!(err, Error::Connectivity { .. }));
    assert!(err.to_string().contains("diagnostic: offline"));
}
