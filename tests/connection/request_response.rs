//! Request dispatch and response generation.

use h2_embed::frame::{self, FramePayload};
use h2_embed::{ErrorCode, FrameType};

use crate::util::{goaway_code, split_frames, status, TestClient};

#[test]
fn test_get_index_returns_200() {
    let mut client = TestClient::handshake();
    client.send_get(1, "/index");

    let (headers, body) = client.read_response();
    assert_eq!(status(&headers), "200");
    assert!(headers
        .iter()
        .any(|(n, v)| n == "content-type" && v == "text/html"));
    assert_eq!(body, b"<html>index</html>");
}

#[test]
fn test_unknown_path_returns_404() {
    let mut client = TestClient::handshake();
    client.send_get(1, "/missing");

    let (headers, body) = client.read_response();
    assert_eq!(status(&headers), "404");
    assert!(body.is_empty());
}

#[test]
fn test_bodyless_response_sets_end_stream_on_headers() {
    let mut client = TestClient::handshake();
    client.send_get(1, "/missing");

    let frames = split_frames(&client.conn.take_output());
    let (header, _) = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::Headers)
        .unwrap();
    assert!(header.is_end_headers());
    assert!(header.is_end_stream());
}

#[test]
fn test_post_body_is_delivered_and_window_replenished() {
    let mut client = TestClient::handshake();
    let block = client.request_block("POST", "/echo");
    client
        .conn
        .receive(&frame::build_headers(1, &block, true, false))
        .unwrap();
    client
        .conn
        .receive(&frame::build_data(1, b"ping pong", true))
        .unwrap();

    let frames = split_frames(&client.conn.take_output());
    // The consumed body bytes come back as a connection WINDOW_UPDATE.
    let update = frames
        .iter()
        .find(|(h, _)| h.frame_type == FrameType::WindowUpdate)
        .unwrap();
    assert_eq!(update.0.stream_id, 0);
    assert!(matches!(
        update.1,
        FramePayload::WindowUpdate { increment: 9 }
    ));

    let body: Vec<u8> = frames
        .iter()
        .filter_map(|(_, p)| match p {
            FramePayload::Data { data } => Some(data.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(body, b"ping pong");
}

#[test]
fn test_request_header_block_split_into_continuation() {
    let mut client = TestClient::handshake();
    let block = client.request_block("GET", "/index");
    let (first, rest) = block.split_at(block.len() / 2);

    client
        .conn
        .receive(&frame::build_headers(1, first, false, true))
        .unwrap();
    // Mid-block: no response may be produced yet.
    assert!(client.conn.take_output().is_empty());

    client
        .conn
        .receive(&frame::build_continuation(1, rest, true))
        .unwrap();
    let (headers, body) = client.read_response();
    assert_eq!(status(&headers), "200");
    assert_eq!(body, b"<html>index</html>");
}

#[test]
fn test_two_requests_reuse_the_connection() {
    let mut client = TestClient::handshake();

    client.send_get(1, "/index");
    let (headers, _) = client.read_response();
    assert_eq!(status(&headers), "200");

    client.send_get(3, "/missing");
    let (headers, _) = client.read_response();
    assert_eq!(status(&headers), "404");
    assert!(!client.conn.is_closed());
}

#[test]
fn test_pseudo_header_after_regular_is_rejected() {
    let mut client = TestClient::handshake();
    let block = client.encode_block(&[
        (":method", "GET"),
        (":scheme", "http"),
        ("accept", "*/*"),
        (":path", "/index"),
    ]);
    let err = client
        .conn
        .receive(&frame::build_headers(1, &block, true, true))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProtocolError);

    let frames = split_frames(&client.conn.take_output());
    assert_eq!(goaway_code(&frames), Some(ErrorCode::ProtocolError));
}

#[test]
fn test_missing_required_pseudo_header_is_rejected() {
    let mut client = TestClient::handshake();
    let block = client.encode_block(&[(":method", "GET"), (":scheme", "http")]);
    let err = client
        .conn
        .receive(&frame::build_headers(1, &block, true, true))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProtocolError);
}

#[test]
fn test_oversized_header_list_gets_431() {
    let mut client = TestClient::handshake();
    // Default MAX_HEADER_LIST_SIZE is 8192; one 9000-byte value overflows
    // it without tripping any frame-size limit.
    let value = "v".repeat(9000);
    let block = client.encode_block(&[
        (":method", "GET"),
        (":scheme", "http"),
        (":path", "/index"),
        ("x-big", &value),
    ]);
    client
        .conn
        .receive(&frame::build_headers(1, &block, true, true))
        .unwrap();

    let (headers, _) = client.read_response();
    assert_eq!(status(&headers), "431");
    assert!(!client.conn.is_closed());
}

#[test]
fn test_fresh_headers_discards_stale_fragment() {
    let mut client = TestClient::handshake();
    // An unfinished block; its bytes are never decoded.
    client
        .conn
        .receive(&frame::build_headers(1, &[0x82, 0x86], false, true))
        .unwrap();

    // A new HEADERS on a later stream replaces the unfinished block.
    let block = client.request_block("GET", "/index");
    client
        .conn
        .receive(&frame::build_headers(3, &block, true, true))
        .unwrap();
    let (headers, _) = client.read_response();
    assert_eq!(status(&headers), "200");
}
