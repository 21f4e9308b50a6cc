//! Flow-control behavior over the wire.

use h2_embed::frame::{self, FramePayload};
use h2_embed::{ErrorCode, FrameType};

use crate::util::{goaway_code, split_frames, TestClient};

const INITIAL_WINDOW_SIZE: u16 = 0x4;

fn data_frames(frames: &[(h2_embed::FrameHeader, FramePayload)]) -> Vec<(usize, bool)> {
    frames
        .iter()
        .filter(|(h, _)| h.frame_type == FrameType::Data)
        .map(|(h, p)| match p {
            FramePayload::Data { data } => (data.len(), h.is_end_stream()),
            _ => unreachable!(),
        })
        .collect()
}

#[test]
fn test_body_deferred_until_window_update() {
    // Peer allows only 10 bytes per stream before updating.
    let mut client = TestClient::handshake_with_settings(&[(INITIAL_WINDOW_SIZE, 10)]);
    client.send_get(1, "/index"); // 18-byte body

    let frames = split_frames(&client.conn.take_output());
    let data = data_frames(&frames);
    assert_eq!(data, vec![(10, false)]);

    // Opening the stream window releases the rest.
    client
        .conn
        .receive(&frame::build_window_update(1, 100))
        .unwrap();
    let frames = split_frames(&client.conn.take_output());
    let data = data_frames(&frames);
    assert_eq!(data, vec![(8, true)]);
    assert!(!client.conn.is_closed());
}

#[test]
fn test_connection_window_binds_too() {
    let mut client = TestClient::handshake_with_settings(&[(INITIAL_WINDOW_SIZE, 10)]);
    client.send_get(1, "/index");
    client.conn.take_output();

    // Stream window opens wide, but the connection window has already
    // been debited 10 of its 65535 bytes; the rest still fits.
    client
        .conn
        .receive(&frame::build_window_update(1, 1000))
        .unwrap();
    let frames = split_frames(&client.conn.take_output());
    assert_eq!(data_frames(&frames), vec![(8, true)]);
}

#[test]
fn test_large_body_chunked_by_max_frame_size() {
    let mut client = TestClient::handshake();
    client.send_get(1, "/big"); // 20000-byte body, MAX_FRAME_SIZE 16384

    let frames = split_frames(&client.conn.take_output());
    let data = data_frames(&frames);
    assert_eq!(data, vec![(16384, false), (3616, true)]);
}

#[test]
fn test_zero_window_increment_is_protocol_error() {
    let mut client = TestClient::handshake();
    // Hand-built WINDOW_UPDATE with a zero increment.
    let mut raw = vec![0, 0, 4, 0x8, 0, 0, 0, 0, 0];
    raw.extend_from_slice(&[0, 0, 0, 0]);

    let err = client.conn.receive(&raw).unwrap_err();
    assert_eq!(err.code, ErrorCode::ProtocolError);
    let frames = split_frames(&client.conn.take_output());
    assert_eq!(goaway_code(&frames), Some(ErrorCode::ProtocolError));
}

#[test]
fn test_window_increment_overflow_is_flow_control_error() {
    let mut client = TestClient::handshake();
    client
        .conn
        .receive(&frame::build_window_update(0, 1 << 30))
        .unwrap();
    let err = client
        .conn
        .receive(&frame::build_window_update(0, 1 << 30))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FlowControlError);
}

#[test]
fn test_update_for_finished_stream_is_ignored() {
    let mut client = TestClient::handshake();
    client.send_get(1, "/index");
    client.read_response();

    client
        .conn
        .receive(&frame::build_window_update(1, 500))
        .unwrap();
    assert!(client.conn.take_output().is_empty());
    assert!(!client.conn.is_closed());
}
