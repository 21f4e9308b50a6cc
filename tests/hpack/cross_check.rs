//! Interop checks against the fluke-hpack reference implementation.

use h2_embed::hpack::{
    decode_header_block, encode, DynamicTable, Header, MAX_DYNAMIC_TABLE_SIZE,
};

fn sample_headers() -> Vec<Header> {
    vec![
        Header::new(":status", "200"),
        Header::new("content-type", "text/html; charset=utf-8"),
        Header::new("content-length", "1354"),
        Header::new("x-frame-options", "DENY"),
        Header::new("set-cookie", "session=deadbeef; HttpOnly"),
    ]
}

#[test]
fn test_our_encoder_against_fluke_decoder() {
    let mut table = DynamicTable::new(4096);
    let mut fluke = fluke_hpack::Decoder::new();
    let mut buf = [0u8; 1024];

    // Two blocks, so dynamic-table references get exercised too.
    for _ in 0..2 {
        let n = encode(&mut table, &sample_headers(), &mut buf).unwrap();
        let decoded = fluke.decode(&buf[..n]).unwrap();
        let decoded: Vec<Header> = decoded
            .into_iter()
            .map(|(name, value)| {
                Header::new(
                    String::from_utf8_lossy(&name).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect();
        assert_eq!(decoded, sample_headers());
    }
}

#[test]
fn test_our_decoder_against_fluke_encoder() {
    let mut table = DynamicTable::new(4096);
    let mut fluke = fluke_hpack::Encoder::new();

    for _ in 0..2 {
        let expected = sample_headers();
        let pairs: Vec<(&[u8], &[u8])> = expected
            .iter()
            .map(|h| (h.name.as_bytes(), h.value.as_bytes()))
            .collect();
        let block = fluke.encode(pairs);

        let mut headers = Vec::new();
        decode_header_block(&mut table, MAX_DYNAMIC_TABLE_SIZE, &block, &mut headers).unwrap();
        assert_eq!(headers, expected);
    }
}
