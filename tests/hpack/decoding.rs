//! Tests for HPACK header block decoding against RFC 7541 Appendix C.

use h2_embed::hpack::{decode_header_block, DynamicTable, Header, MAX_DYNAMIC_TABLE_SIZE};

fn decode(table: &mut DynamicTable, block: &[u8]) -> Vec<Header> {
    let mut headers = Vec::new();
    let consumed =
        decode_header_block(table, MAX_DYNAMIC_TABLE_SIZE, block, &mut headers).unwrap();
    assert_eq!(consumed, block.len());
    headers
}

#[test]
fn test_decode_indexed_header() {
    let mut table = DynamicTable::new(4096);

    // 0x82 = indexed header, index 2 = :method: GET
    let headers = decode(&mut table, &[0x82]);
    assert_eq!(headers, vec![Header::new(":method", "GET")]);
}

#[test]
fn test_decode_multiple_indexed_headers() {
    let mut table = DynamicTable::new(4096);

    // 0x82 = :method: GET, 0x86 = :scheme: http, 0x84 = :path: /
    let headers = decode(&mut table, &[0x82, 0x86, 0x84]);
    assert_eq!(
        headers,
        vec![
            Header::new(":method", "GET"),
            Header::new(":scheme", "http"),
            Header::new(":path", "/"),
        ]
    );
}

#[test]
fn test_decode_literal_with_indexing() {
    let mut table = DynamicTable::new(4096);

    let data = [
        0x40, // Literal with incremental indexing, new name
        0x06, // Name length: 6
        b'c', b'u', b's', b't', b'o', b'm', //
        0x05, // Value length: 5
        b'v', b'a', b'l', b'u', b'e',
    ];
    let headers = decode(&mut table, &data);
    assert_eq!(headers, vec![Header::new("custom", "value")]);
    assert_eq!(table.n_entries(), 1);

    // The entry is now addressable at combined index 62.
    let headers = decode(&mut table, &[0xBE]);
    assert_eq!(headers, vec![Header::new("custom", "value")]);
}

#[test]
fn test_decode_literal_indexed_name() {
    let mut table = DynamicTable::new(4096);

    // 0x41 = literal with indexing, name from index 1 (:authority)
    let data = [
        0x41, 0x0F, b'w', b'w', b'w', b'.', b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c',
        b'o', b'm',
    ];
    let headers = decode(&mut table, &data);
    assert_eq!(headers, vec![Header::new(":authority", "www.example.com")]);
}

#[test]
fn test_rfc7541_c3_three_requests_share_table() {
    let mut table = DynamicTable::new(4096);

    // C.3.1
    let headers = decode(
        &mut table,
        &[
            0x82, 0x86, 0x84, 0x41, 0x0f, 0x77, 0x77, 0x77, 0x2e, 0x65, 0x78, 0x61, 0x6d, 0x70,
            0x6c, 0x65, 0x2e, 0x63, 0x6f, 0x6d,
        ],
    );
    assert_eq!(headers[3], Header::new(":authority", "www.example.com"));
    assert_eq!(table.actual_size(), 57);

    // C.3.2: :authority now hits the dynamic table (0xbe), cache-control
    // is a literal that gets indexed.
    let headers = decode(
        &mut table,
        &[
            0x82, 0x86, 0x84, 0xbe, 0x58, 0x08, 0x6e, 0x6f, 0x2d, 0x63, 0x61, 0x63, 0x68, 0x65,
        ],
    );
    assert_eq!(headers[3], Header::new(":authority", "www.example.com"));
    assert_eq!(headers[4], Header::new("cache-control", "no-cache"));
    assert_eq!(table.n_entries(), 2);
    assert_eq!(table.actual_size(), 110);

    // C.3.3: https + /index.html, both previous entries referenced.
    let headers = decode(
        &mut table,
        &[
            0x82, 0x87, 0x85, 0xbf, 0x40, 0x0a, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x6b,
            0x65, 0x79, 0x0c, 0x63, 0x75, 0x73, 0x74, 0x6f, 0x6d, 0x2d, 0x76, 0x61, 0x6c, 0x75,
            0x65,
        ],
    );
    assert_eq!(
        headers,
        vec![
            Header::new(":method", "GET"),
            Header::new(":scheme", "https"),
            Header::new(":path", "/index.html"),
            Header::new(":authority", "www.example.com"),
            Header::new("custom-key", "custom-value"),
        ]
    );
    assert_eq!(table.n_entries(), 3);
    assert_eq!(table.actual_size(), 164);
}

#[test]
fn test_rfc7541_c4_huffman_requests_share_table() {
    let mut table = DynamicTable::new(4096);

    // C.4.1
    let headers = decode(
        &mut table,
        &[
            0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab,
            0x90, 0xf4, 0xff,
        ],
    );
    assert_eq!(headers[3], Header::new(":authority", "www.example.com"));

    // C.4.2
    let headers = decode(
        &mut table,
        &[
            0x82, 0x86, 0x84, 0xbe, 0x58, 0x86, 0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf,
        ],
    );
    assert_eq!(headers[4], Header::new("cache-control", "no-cache"));
    assert_eq!(table.actual_size(), 110);
}

#[test]
fn test_decode_out_of_range_index_fails() {
    let mut table = DynamicTable::new(4096);
    let mut headers = Vec::new();
    assert!(decode_header_block(&mut table, MAX_DYNAMIC_TABLE_SIZE, &[0xBE], &mut headers).is_err());
}

#[test]
fn test_decode_truncated_block_fails() {
    let mut table = DynamicTable::new(4096);
    let mut headers = Vec::new();
    // Length prefix promises 6 bytes, only 2 present.
    let data = [0x40, 0x06, b'c', b'u'];
    assert!(decode_header_block(&mut table, MAX_DYNAMIC_TABLE_SIZE, &data, &mut headers).is_err());
}
