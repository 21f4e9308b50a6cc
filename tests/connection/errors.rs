//! Error taxonomy: every connection error ends in a GOAWAY with the
//! RFC-mandated code.

use h2_embed::frame;
use h2_embed::ErrorCode;

use crate::util::{goaway_code, split_frames, TestClient};

fn expect_goaway(client: &mut TestClient, bytes: &[u8], code: ErrorCode) {
    let err = client.conn.receive(bytes).unwrap_err();
    assert_eq!(err.code, code);
    assert!(client.conn.is_closed());
    let frames = split_frames(&client.conn.take_output());
    assert_eq!(goaway_code(&frames), Some(code));
}

#[test]
fn test_unknown_frame_type() {
    let mut client = TestClient::handshake();
    expect_goaway(
        &mut client,
        &[0, 0, 0, 0xA, 0, 0, 0, 0, 0],
        ErrorCode::ProtocolError,
    );
}

#[test]
fn test_priority_frame_not_implemented() {
    let mut client = TestClient::handshake();
    let mut raw = vec![0, 0, 5, 0x2, 0, 0, 0, 0, 1];
    raw.extend_from_slice(&[0, 0, 0, 0, 16]);
    expect_goaway(&mut client, &raw, ErrorCode::ProtocolError);
}

#[test]
fn test_padded_headers_surface_internal_error() {
    let mut client = TestClient::handshake();
    // HEADERS with the PADDED flag (0x8) set.
    let mut raw = vec![0, 0, 3, 0x1, 0x8 | 0x4 | 0x1, 0, 0, 0, 1];
    raw.extend_from_slice(&[0, 0x82, 0]);
    expect_goaway(&mut client, &raw, ErrorCode::InternalError);
}

#[test]
fn test_frame_length_above_max_frame_size() {
    let mut client = TestClient::handshake();
    // 20000 > the advertised MAX_FRAME_SIZE of 16384.
    let raw = [0, 0x4E, 0x20, 0x0, 0, 0, 0, 0, 1];
    expect_goaway(&mut client, &raw, ErrorCode::FrameSizeError);
}

#[test]
fn test_settings_length_not_multiple_of_six() {
    let mut client = TestClient::handshake();
    let mut raw = vec![0, 0, 5, 0x4, 0, 0, 0, 0, 0];
    raw.extend_from_slice(&[0, 4, 0, 0, 0]);
    expect_goaway(&mut client, &raw, ErrorCode::FrameSizeError);
}

#[test]
fn test_invalid_enable_push_value() {
    let mut client = TestClient::handshake();
    let raw = frame::build_settings(&[(0x2, 2)]);
    expect_goaway(&mut client, &raw, ErrorCode::ProtocolError);
}

#[test]
fn test_initial_window_size_above_limit() {
    let mut client = TestClient::handshake();
    let raw = frame::build_settings(&[(0x4, 1 << 31)]);
    expect_goaway(&mut client, &raw, ErrorCode::FlowControlError);
}

#[test]
fn test_settings_on_nonzero_stream() {
    let mut client = TestClient::handshake();
    let mut raw = frame::build_settings(&[(0x4, 30000)]);
    raw[8] = 1;
    expect_goaway(&mut client, &raw, ErrorCode::ProtocolError);
}

#[test]
fn test_interleaved_frame_during_header_block() {
    let mut client = TestClient::handshake();
    client
        .conn
        .receive(&frame::build_headers(1, &[0x82], false, false))
        .unwrap();

    let ping = [0, 0, 8, 0x6, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8].to_vec();
    expect_goaway(&mut client, &ping, ErrorCode::ProtocolError);
}

#[test]
fn test_data_without_open_stream() {
    let mut client = TestClient::handshake();
    expect_goaway(
        &mut client,
        &frame::build_data(1, b"stray", false),
        ErrorCode::ProtocolError,
    );
}

#[test]
fn test_headers_on_even_stream_id() {
    let mut client = TestClient::handshake();
    expect_goaway(
        &mut client,
        &frame::build_headers(2, &[0x82], true, true),
        ErrorCode::ProtocolError,
    );
}

#[test]
fn test_headers_on_reused_stream_id() {
    let mut client = TestClient::handshake();
    client.send_get(3, "/index");
    client.read_response();

    let block = client.request_block("GET", "/index");
    expect_goaway(
        &mut client,
        &frame::build_headers(1, &block, true, true),
        ErrorCode::ProtocolError,
    );
}

#[test]
fn test_bad_header_block_is_compression_error() {
    let mut client = TestClient::handshake();
    // Indexed field 127 points past both tables.
    expect_goaway(
        &mut client,
        &frame::build_headers(1, &[0xFF, 0x00], true, true),
        ErrorCode::CompressionError,
    );
}

#[test]
fn test_ping_is_echoed_with_ack() {
    let mut client = TestClient::handshake();
    let mut ping = vec![0, 0, 8, 0x6, 0, 0, 0, 0, 0];
    ping.extend_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]);
    client.conn.receive(&ping).unwrap();

    let mut expected = vec![0, 0, 8, 0x6, 0x1, 0, 0, 0, 0];
    expected.extend_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]);
    assert_eq!(client.conn.take_output(), expected);
}
