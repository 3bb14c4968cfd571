//! Color server behavior over real sockets.

use axum::body::Body;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use service_lens::observability::{TraceHeader, TRACE_HEADER};

mod common;

#[tokio::test]
async fn test_ping_returns_empty_ok() {
    let server = common::start_color_server("red").await;
    let client = common::http1();

    assert_eq!(common::get(&client, &server.url("/ping")).await, (200, String::new()));
}

#[tokio::test]
async fn test_zero_rate_returns_color() {
    let server = common::start_color_server("blue").await;
    let client = common::http1();

    let (status, body) = common::get(&client, &server.url("/setFlake?rate=0&code=200")).await;
    assert_eq!(status, 200);
    assert_eq!(body, "rate: 0, code: 200");

    for _ in 0..10 {
        assert_eq!(common::get(&client, &server.url("/")).await, (200, "blue".to_string()));
    }
}

#[tokio::test]
async fn test_full_rate_returns_configured_failure() {
    let server = common::start_color_server("green").await;
    let client = common::http1();

    let (status, _) = common::get(&client, &server.url("/setFlake?rate=1&code=503")).await;
    assert_eq!(status, 200);

    for _ in 0..10 {
        assert_eq!(
            common::get(&client, &server.url("/")).await,
            (503, "flaky server".to_string())
        );
    }
}

#[tokio::test]
async fn test_out_of_range_rate_rejected_for_any_code() {
    let server = common::start_color_server("red").await;
    let client = common::http1();

    for code in ["200", "503", "abc", ""] {
        let url = server.url(&format!("/setFlake?rate=2.0&code={code}"));
        let (status, _) = common::get(&client, &url).await;
        assert_eq!(status, 400, "code={code}");
    }
}

#[tokio::test]
async fn test_non_numeric_parameters_rejected() {
    let server = common::start_color_server("red").await;
    let client = common::http1();

    for query in ["rate=abc&code=200", "rate=0.5&code=abc", "rate=&code=200", "code=200", "rate=0.5"] {
        let (status, body) = common::get(&client, &server.url(&format!("/setFlake?{query}"))).await;
        assert_eq!(status, 400, "{query}");
        assert!(!body.is_empty(), "{query}");
    }

    // Nothing above should have changed the settings.
    assert_eq!(common::get(&client, &server.url("/")).await, (200, "red".to_string()));
}

#[tokio::test]
async fn test_h2c_prior_knowledge() {
    let server = common::start_color_server("purple").await;
    let client = common::h2c();

    let response = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(response.version(), reqwest::Version::HTTP_2);
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "purple");
}

#[tokio::test]
async fn test_trace_header_echoed() {
    let server = common::start_color_server("red").await;
    let client = common::http1();

    let response = client
        .get(server.url("/"))
        .header(
            TRACE_HEADER,
            "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1",
        )
        .send()
        .await
        .unwrap();

    let echoed: TraceHeader = response
        .headers()
        .get(TRACE_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(echoed.root.as_str(), "1-5759e988-bd862e3fe1be46a994272793");
    assert_eq!(echoed.sampled, Some(true));
}

/// Reads one HTTP/1.1 response head byte by byte so nothing after it is consumed.
async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        let byte = stream.read_u8().await.expect("connection closed before end of head");
        head.push(byte);
    }
    String::from_utf8(head).unwrap()
}

#[tokio::test]
async fn test_h2c_upgrade_switches_protocols() {
    let server = common::start_color_server("orange").await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    stream
        .write_all(
            b"GET / HTTP/1.1\r\n\
              Host: localhost\r\n\
              Connection: Upgrade, HTTP2-Settings\r\n\
              Upgrade: h2c\r\n\
              HTTP2-Settings: AAMAAABkAARAAAAAAAIAAAAA\r\n\r\n",
        )
        .await
        .unwrap();

    let head = read_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 101"), "got {head:?}");
    assert!(head.to_ascii_lowercase().contains("upgrade: h2c"), "got {head:?}");

    // The same socket now speaks HTTP/2.
    let (mut sender, conn) =
        hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
            .await
            .unwrap();
    tokio::spawn(conn);

    let request = axum::http::Request::get("http://localhost/")
        .body(Body::empty())
        .unwrap();
    let response = sender.send_request(request).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.version(), axum::http::Version::HTTP_2);

    let body = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
        .await
        .unwrap();
    assert_eq!(body, "orange".as_bytes());
}

#[tokio::test]
async fn test_plain_upgrade_header_without_settings_is_served_normally() {
    let server = common::start_color_server("orange").await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n")
        .await
        .unwrap();

    let head = read_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200"), "got {head:?}");
}
