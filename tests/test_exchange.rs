use std::time::Duration;

use gridserve::http::connection::transport;
use gridserve::http::error::HttpError;
use gridserve::http::exchange::{Exchange, Step};
use gridserve::http::request::{ContentEncoding, RequestBuilder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn test_single_response_per_request() {
    let (mut client, server) = tokio::io::duplex(4096);
    let mut io = transport(server);
    let request = RequestBuilder::new().method("GET").target("/").build().unwrap();

    let mut exchange = Exchange::new(request, &mut io, TIMEOUT);
    assert!(!exchange.response_started());
    exchange.begin_response(204, "No Content").await.unwrap();

    let err = exchange.begin_response(200, "OK").await.err().unwrap();
    assert!(matches!(err, HttpError::ResponseAlreadyStarted));

    assert_eq!(exchange.finish().await.unwrap(), Step::Continue);
    drop(io);

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    assert_eq!(
        out,
        b"HTTP/1.1 204 No Content\r\nContent-Type: text/html\r\nContent-Length: 0\r\n\r\n"
    );
}

#[tokio::test]
async fn test_response_can_be_reacquired() {
    let (mut client, server) = tokio::io::duplex(4096);
    let mut io = transport(server);
    let request = RequestBuilder::new().method("GET").target("/").build().unwrap();

    let mut exchange = Exchange::new(request, &mut io, TIMEOUT);
    assert!(exchange.response().is_none());

    exchange
        .begin_response(200, "OK")
        .await
        .unwrap()
        .set_header("X-Region", "sim-1")
        .unwrap();

    let mut response = exchange.response().unwrap();
    assert_eq!(response.headers().get("X-Region"), Some("sim-1"));
    response.send(b"ok").await.unwrap();

    assert_eq!(exchange.finish().await.unwrap(), Step::Continue);
    drop(io);

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    assert!(String::from_utf8(out).unwrap().ends_with("X-Region: sim-1\r\nContent-Length: 2\r\n\r\nok"));
}

#[tokio::test]
async fn test_begin_response_drains_unread_body() {
    let (mut client, server) = tokio::io::duplex(4096);
    client.write_all(b"helloNEXT").await.unwrap();

    let mut io = transport(server);
    let request = RequestBuilder::new()
        .method("POST")
        .target("/")
        .content_length(5)
        .build()
        .unwrap();

    let mut exchange = Exchange::new(request, &mut io, TIMEOUT);
    let mut buf = [0u8; 2];
    assert_eq!(exchange.read_body(&mut buf).await.unwrap(), 2);
    assert!(exchange.has_body());

    exchange.begin_response(200, "OK").await.unwrap();
    assert!(!exchange.has_body());
    assert_eq!(exchange.read_body(&mut buf).await.unwrap(), 0);
    exchange.finish().await.unwrap();

    let mut next = [0u8; 4];
    io.read_exact(&mut next).await.unwrap();
    assert_eq!(&next, b"NEXT");
}

#[tokio::test]
async fn test_identity_body_read_to_end() {
    let (mut client, server) = tokio::io::duplex(4096);
    client.write_all(b"0123456789").await.unwrap();

    let mut io = transport(server);
    let request = RequestBuilder::new()
        .method("POST")
        .target("/")
        .content_length(10)
        .content_encoding(ContentEncoding::Identity)
        .build()
        .unwrap();

    let mut exchange = Exchange::new(request, &mut io, TIMEOUT);
    assert_eq!(exchange.read_body_to_end().await.unwrap(), b"0123456789");
    assert_eq!(exchange.request().content_length, Some(10));
}

#[tokio::test]
async fn test_stalled_body_times_out_and_closes() {
    let (_client, server) = tokio::io::duplex(4096);
    let mut io = transport(server);
    let request = RequestBuilder::new()
        .method("POST")
        .target("/")
        .content_length(5)
        .build()
        .unwrap();

    let mut exchange = Exchange::new(request, &mut io, Duration::from_millis(50));
    let mut buf = [0u8; 5];
    let err = exchange.read_body(&mut buf).await.unwrap_err();
    assert!(matches!(err, HttpError::Timeout));

    assert_eq!(exchange.finish().await.unwrap(), Step::Close);
}

#[tokio::test]
async fn test_missing_response_becomes_500() {
    let (mut client, server) = tokio::io::duplex(4096);
    let mut io = transport(server);
    let request = RequestBuilder::new().method("GET").target("/").build().unwrap();

    let exchange = Exchange::new(request, &mut io, TIMEOUT);
    assert_eq!(exchange.finish().await.unwrap(), Step::Continue);
    drop(io);

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    assert_eq!(
        out,
        b"HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\nContent-Length: 25\r\n\r\n500 Internal Server Error"
    );
}

#[tokio::test]
async fn test_body_read_error_closes_after_response() {
    let (mut client, server) = tokio::io::duplex(4096);
    client.write_all(b"definitely not gzip").await.unwrap();

    let mut io = transport(server);
    let request = RequestBuilder::new()
        .method("POST")
        .target("/")
        .content_length(19)
        .content_encoding(ContentEncoding::Gzip)
        .build()
        .unwrap();

    let mut exchange = Exchange::new(request, &mut io, TIMEOUT);
    let err = exchange.read_body_to_end().await.unwrap_err();
    assert!(matches!(err, HttpError::Io(_)));

    assert_eq!(exchange.finish().await.unwrap(), Step::Close);
    drop(io);

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(out.contains("Connection: close\r\n"));
}
