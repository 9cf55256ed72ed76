//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.

//! # Chunked Response and Data Source Tests
//!
//! Framing of DMR and data into chunks, reading saved responses from disk,
//! and the parse-then-compile path through [`DataSource`].
//!
//! ```bash
//! cargo test --test chunk
//! ```

use std::fs;

use dap4::chunk::{ChunkHeader, CHUNK_HEADER_SIZE, FLAG_ERROR, FLAG_LAST, FLAG_LITTLE_ENDIAN};
use dap4::{
    crc32, decode_chunked, encode_chunked, ByteOrder, ChecksumMode, DapConfigBuilder, DapValue,
    DataSource, FileSource, MemorySource,
};
use tempfile::tempdir;

const DMR: &str = r#"<Dataset name="chunked" dapVersion="4.0" dmrVersion="1.0">
  <Int32 name="x"><Dim size="3"/></Int32>
  <String name="label"/>
</Dataset>"#;

fn payload(order: ByteOrder) -> Vec<u8> {
    let mut out = Vec::new();
    for v in [7, 8, 9] {
        DapValue::Int32(v).write_to(&mut out, order);
    }
    let sum = crc32(&out);
    DapValue::UInt32(sum).write_to(&mut out, order);
    let start = out.len();
    DapValue::String("station".into()).write_to(&mut out, order);
    let sum = crc32(&out[start..]);
    DapValue::UInt32(sum).write_to(&mut out, order);
    out
}

#[test]
fn test_encode_decode_round_trip() {
    for order in [ByteOrder::Little, ByteOrder::Big] {
        let data = payload(order);
        let bytes = encode_chunked(DMR, &data, order, 1024);
        let response = decode_chunked(&bytes).unwrap();
        assert_eq!(response.dmr, DMR);
        assert_eq!(response.data, data);
        assert_eq!(response.byte_order, order);
        assert!(response.error.is_none());
    }
}

#[test]
fn test_data_split_across_chunks() {
    let data: Vec<u8> = (0..=255u8).collect();
    let bytes = encode_chunked("<Dataset/>", &data, ByteOrder::Little, 100);

    let first = ChunkHeader::parse(bytes[..CHUNK_HEADER_SIZE].try_into().unwrap());
    assert_eq!(first.length, "<Dataset/>\r\n".len());
    assert!(!first.is_last());

    // 256 bytes in chunks of 100: three data chunks, the last one flagged.
    let mut offset = CHUNK_HEADER_SIZE + first.length;
    let mut lengths = Vec::new();
    let mut flags = Vec::new();
    while offset < bytes.len() {
        let raw = &bytes[offset..offset + CHUNK_HEADER_SIZE];
        let header = ChunkHeader::parse(raw.try_into().unwrap());
        lengths.push(header.length);
        flags.push(header.flags);
        offset += CHUNK_HEADER_SIZE + header.length;
    }
    assert_eq!(lengths, vec![100, 100, 56]);
    assert_eq!(
        flags,
        vec![FLAG_LITTLE_ENDIAN, FLAG_LITTLE_ENDIAN, FLAG_LAST | FLAG_LITTLE_ENDIAN]
    );

    assert_eq!(decode_chunked(&bytes).unwrap().data, data);
}

#[test]
fn test_dmr_only_response_is_last() {
    let bytes = encode_chunked("<Dataset/>", &[], ByteOrder::Big, 64);
    let header = ChunkHeader::parse(bytes[..CHUNK_HEADER_SIZE].try_into().unwrap());
    assert_eq!(header.flags, FLAG_LAST);
    let response = decode_chunked(&bytes).unwrap();
    assert!(response.data.is_empty());
    assert_eq!(response.dmr, "<Dataset/>");
}

#[test]
fn test_error_chunks() {
    let message = "<Error httpcode=\"500\"><Message>boom</Message></Error>";
    let mut bytes = ChunkHeader {
        flags: FLAG_ERROR | FLAG_LAST,
        length: message.len(),
    }
    .to_bytes()
    .to_vec();
    bytes.extend_from_slice(message.as_bytes());

    let response = decode_chunked(&bytes).unwrap();
    assert_eq!(response.error.as_deref(), Some(message));
    assert!(response.dmr.is_empty());

    let err = MemorySource::from_chunked(&bytes).unwrap_err();
    assert!(err.is_semantic());
    assert!(err.to_string().contains("boom"));
}

#[test]
fn test_error_after_data_stops_decoding() {
    let mut bytes = encode_chunked("<Dataset/>", &[1, 2, 3], ByteOrder::Little, 2);
    // Drop the final one-byte chunk and replace it with an error chunk.
    bytes.truncate(bytes.len() - (CHUNK_HEADER_SIZE + 1));
    bytes.extend_from_slice(&ChunkHeader { flags: FLAG_ERROR, length: 4 }.to_bytes());
    bytes.extend_from_slice(b"oops");

    let response = decode_chunked(&bytes).unwrap();
    assert_eq!(response.data, vec![1, 2]);
    assert_eq!(response.error.as_deref(), Some("oops"));
}

#[test]
fn test_truncated_responses() {
    assert!(decode_chunked(&[]).unwrap_err().is_decode());
    let bytes = encode_chunked(DMR, &payload(ByteOrder::Little), ByteOrder::Little, 16);
    assert!(decode_chunked(&bytes[..bytes.len() - 1]).unwrap_err().is_decode());
}

#[test]
fn test_memory_source_parse_and_compile() {
    for order in [ByteOrder::Little, ByteOrder::Big] {
        let bytes = encode_chunked(DMR, &payload(order), order, 8);
        let source = MemorySource::from_chunked(&bytes).unwrap();
        assert_eq!(source.byte_order(), order);

        // The source's byte order wins over the configured one.
        let config = DapConfigBuilder::new()
            .byte_order(ByteOrder::Little)
            .verify_checksums(true)
            .build();
        let schema = source.parse(&config).unwrap().into_dataset().unwrap();
        let tree = source.compile(&schema, &config).unwrap();

        let x = tree.variable_by_name("/x").unwrap().as_atomic().unwrap();
        assert_eq!(
            tree.read_all(x).unwrap(),
            vec![DapValue::Int32(7), DapValue::Int32(8), DapValue::Int32(9)]
        );
        let label = tree.variable_by_name("/label").unwrap().as_atomic().unwrap();
        assert_eq!(tree.read(label, 0).unwrap().as_str(), Some("station"));
    }
}

#[test]
fn test_memory_source_without_checksums() {
    let mut data = Vec::new();
    DapValue::Int32(1).write_to(&mut data, ByteOrder::Little);
    let source = MemorySource::new(
        r#"<Dataset name="n" dapVersion="4.0" dmrVersion="1.0"><Int32 name="v"/></Dataset>"#,
        data,
        ByteOrder::Little,
    );
    let config = DapConfigBuilder::new().checksum_mode(ChecksumMode::None).build();
    let schema = source.parse(&config).unwrap().into_dataset().unwrap();
    let tree = source.compile(&schema, &config).unwrap();
    assert_eq!(tree.variables().len(), 1);
    assert!(tree.variables()[0].checksum.is_none());

    let strict = DapConfigBuilder::new().build();
    assert!(source.compile(&schema, &strict).unwrap_err().is_decode());
}

#[test]
fn test_file_source() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("response.dap");
    fs::write(&path, encode_chunked(DMR, &payload(ByteOrder::Big), ByteOrder::Big, 32)).unwrap();

    let source = FileSource::open(&path).unwrap();
    assert_eq!(source.path(), path.as_path());
    assert_eq!(source.dmr(), DMR);
    assert_eq!(source.byte_order(), ByteOrder::Big);

    let url = format!("file://{}", path.display());
    let via_url = FileSource::open(&url).unwrap();
    assert_eq!(via_url.data(), source.data());

    let config = DapConfigBuilder::new().verify_checksums(true).build();
    let schema = source.parse(&config).unwrap().into_dataset().unwrap();
    assert!(source.compile(&schema, &config).is_ok());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(FileSource::open(dir.path().join("absent.dap")).is_err());
}

#[test]
fn test_config_from_files() {
    let dir = tempdir().unwrap();

    let json = dir.path().join("dap4.json");
    fs::write(&json, r#"{"checksum_mode": "all", "verify_checksums": true}"#).unwrap();
    let config = DapConfigBuilder::from_file(&json).unwrap();
    assert_eq!(config.compile.checksum_mode, ChecksumMode::All);
    assert!(config.compile.verify_checksums);

    let yaml = dir.path().join("dap4.yaml");
    fs::write(&yaml, "require_versions: true\nbyte_order: big\n").unwrap();
    let config = DapConfigBuilder::from_file(&yaml).unwrap();
    assert!(config.parser.require_versions);
    assert_eq!(config.compile.byte_order, ByteOrder::Big);

    let unknown = dir.path().join("dap4.json5");
    fs::write(&unknown, "{}").unwrap();
    assert!(DapConfigBuilder::from_file(&unknown).is_err());

    let typo = dir.path().join("typo.json");
    fs::write(&typo, r#"{"checksum": "dap"}"#).unwrap();
    assert!(DapConfigBuilder::from_file(&typo).is_err());
}
