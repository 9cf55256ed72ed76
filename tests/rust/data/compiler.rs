//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.

//! # Data Compiler Tests
//!
//! Decoding of serialized DAP4 data against parsed schemas: fixed-size and
//! byte-string atomics, structures, sequences, checksums and failure on
//! short buffers.
//!
//! ```bash
//! cargo test --test compiler
//! ```

use dap4::data::{AtomicLayout, DataFactory, TopLevel};
use dap4::{
    compile, compile_tree, crc32, parse_dmr, ByteOrder, ChecksumMode, CompileOptions, DapDataset,
    DapType, DapValue, NodeId, Result,
};
use proptest::prelude::*;

fn schema(dmr: &str) -> DapDataset {
    parse_dmr(dmr).unwrap().into_dataset().unwrap()
}

fn no_checksums() -> CompileOptions {
    CompileOptions::new(ChecksumMode::None, ByteOrder::Little)
}

/// Serializes values the way a server would.
#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
    var_start: usize,
    order: ByteOrder,
}

impl Writer {
    fn big_endian() -> Self {
        Writer {
            order: ByteOrder::Big,
            ..Writer::default()
        }
    }

    fn value(&mut self, value: DapValue) -> &mut Self {
        value.write_to(&mut self.buf, self.order);
        self
    }

    fn count(&mut self, n: u64) -> &mut Self {
        self.value(DapValue::UInt64(n))
    }

    /// Close a top-level variable with its CRC32.
    fn checksum(&mut self) -> &mut Self {
        let sum = crc32(&self.buf[self.var_start..]);
        self.value(DapValue::UInt32(sum));
        self.var_start = self.buf.len();
        self
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

#[test]
fn test_scalar_with_checksum() {
    let dataset = schema(
        r#"<Dataset name="a" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"/></Dataset>"#,
    );
    let buffer = Writer::default().value(DapValue::Int32(-42)).checksum().finish();
    assert_eq!(buffer.len(), 8);

    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();
    let x = dataset.find_variable("/x").unwrap();

    let sum = tree.checksum(x).unwrap();
    assert_eq!((sum.start, sum.end), (0, 4));
    assert_eq!(sum.stored, crc32(&buffer[..4]));
    assert!(tree.verify_checksums().is_ok());

    let atomic = tree.variable(x).unwrap().as_atomic().unwrap();
    assert_eq!(atomic.layout.offset, 0);
    assert_eq!(atomic.layout.length, 4);
    assert_eq!(tree.read(atomic, 0).unwrap(), DapValue::Int32(-42));
}

#[test]
fn test_missing_checksum_is_a_decode_error() {
    let dataset = schema(
        r#"<Dataset name="a" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"/></Dataset>"#,
    );
    let buffer = Writer::default().value(DapValue::Int32(1)).finish();
    let mut short = buffer.clone();
    short.extend_from_slice(&[0, 0, 0]);

    let err = compile_tree(&dataset, &short, CompileOptions::default()).unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().contains("missing checksum"));

    assert!(compile_tree(&dataset, &buffer, no_checksums()).is_ok());
}

#[test]
fn test_checksum_modes() {
    let dataset = schema(
        r#"<Dataset name="a" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"/></Dataset>"#,
    );
    let with_sum = Writer::default().value(DapValue::Int32(5)).checksum().finish();
    let x = dataset.find_variable("/x").unwrap();

    for mode in [ChecksumMode::Dap, ChecksumMode::All] {
        let options = CompileOptions::new(mode, ByteOrder::Little);
        let tree = compile_tree(&dataset, &with_sum, options).unwrap();
        assert!(tree.checksum(x).is_some(), "{mode}");
    }
    for mode in [ChecksumMode::None, ChecksumMode::Dmr] {
        let options = CompileOptions::new(mode, ByteOrder::Little);
        let tree = compile_tree(&dataset, &with_sum[..4], options).unwrap();
        assert!(tree.checksum(x).is_none(), "{mode}");
    }
}

#[test]
fn test_checksum_verification() {
    let dataset = schema(
        r#"<Dataset name="a" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"/><Float64 name="y"/></Dataset>"#,
    );
    let mut buffer = Writer::default()
        .value(DapValue::Int32(9))
        .checksum()
        .value(DapValue::Float64(1.5))
        .checksum()
        .finish();
    let options = CompileOptions::default().with_verification(true);
    let tree = compile_tree(&dataset, &buffer, options).unwrap();
    let y = dataset.find_variable("/y").unwrap();
    assert_eq!(tree.checksum(y).map(|s| (s.start, s.end)), Some((8, 16)));

    buffer[9] ^= 0xFF;
    let err = compile_tree(&dataset, &buffer, options).unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().contains("checksum mismatch"));

    let unverified = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();
    assert!(unverified.verify_checksums().is_err());
}

#[test]
fn test_scalar_sequence_records() {
    let dataset = schema(
        r#"<Dataset name="b" dapVersion="4.0" dmrVersion="1.0">
  <Sequence name="S"><Int32 name="a"/></Sequence>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .count(2)
        .value(DapValue::Int32(10))
        .value(DapValue::Int32(20))
        .checksum()
        .finish();
    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();

    let seq = tree.variable_by_name("/S").unwrap().as_sequence().unwrap();
    assert_eq!(seq.record_count(), 2);
    let values: Vec<DapValue> = seq
        .records
        .iter()
        .map(|r| {
            assert_eq!(r.fields.len(), 1);
            let a = tree.field(&r.fields, "a").unwrap().as_atomic().unwrap();
            tree.read(a, 0).unwrap()
        })
        .collect();
    assert_eq!(values, vec![DapValue::Int32(10), DapValue::Int32(20)]);
}

#[test]
fn test_zero_record_sequence() {
    let dataset = schema(
        r#"<Dataset name="b" dapVersion="4.0" dmrVersion="1.0">
  <Sequence name="S"><Int32 name="a"/></Sequence>
  <Int16 name="after"/>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .count(0)
        .checksum()
        .value(DapValue::Int16(3))
        .checksum()
        .finish();
    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();
    assert_eq!(tree.variable_by_name("/S").unwrap().as_sequence().unwrap().record_count(), 0);
    let after = tree.variable_by_name("/after").unwrap().as_atomic().unwrap();
    assert_eq!(after.layout.offset, 12);
    assert_eq!(tree.read(after, 0).unwrap(), DapValue::Int16(3));
}

#[test]
fn test_sequence_count_uses_low_32_bits() {
    let dataset = schema(
        r#"<Dataset name="b" dapVersion="4.0" dmrVersion="1.0">
  <Sequence name="S"><UInt8 name="a"/></Sequence>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .count((7u64 << 32) | 1)
        .value(DapValue::UInt8(200))
        .finish();
    let tree = compile_tree(&dataset, &buffer, no_checksums()).unwrap();
    assert_eq!(tree.variable_by_name("/S").unwrap().as_sequence().unwrap().record_count(), 1);
}

#[test]
fn test_byte_strings() {
    let dataset = schema(
        r#"<Dataset name="s" dapVersion="4.0" dmrVersion="1.0">
  <String name="names"><Dim size="3"/></String>
  <Opaque name="blob"/>
  <URL name="link"/>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .value(DapValue::String("a".into()))
        .value(DapValue::String("".into()))
        .value(DapValue::String("xyz".into()))
        .checksum()
        .value(DapValue::Opaque(vec![0xDE, 0xAD]))
        .checksum()
        .value(DapValue::URL("http://x".into()))
        .checksum()
        .finish();
    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();

    let names = tree.variable_by_name("/names").unwrap().as_atomic().unwrap();
    assert_eq!(names.layout.count, 3);
    assert_eq!(names.layout.positions, vec![0, 9, 17]);
    assert_eq!(names.layout.length, 28);
    let strings: Vec<String> = tree
        .read_all(names)
        .unwrap()
        .into_iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(strings, vec!["a", "", "xyz"]);

    let blob = tree.variable_by_name("/blob").unwrap().as_atomic().unwrap();
    assert_eq!(blob.layout.offset, 32);
    assert_eq!(tree.read(blob, 0).unwrap(), DapValue::Opaque(vec![0xDE, 0xAD]));
    assert_eq!(tree.read(blob, 0).unwrap().to_string(), "0xdead");

    let link = tree.variable_by_name("/link").unwrap().as_atomic().unwrap();
    assert_eq!(tree.read(link, 0).unwrap(), DapValue::URL("http://x".into()));
    assert!(tree.verify_checksums().is_ok());
}

/// Records every atomic layout the compiler reports.
#[derive(Default)]
struct LayoutRecorder {
    seen: Vec<(NodeId, AtomicLayout)>,
}

impl DataFactory for LayoutRecorder {
    type Node = ();
    type Record = ();
    type Dataset = Vec<(NodeId, AtomicLayout)>;

    fn atomic(&mut self, var: NodeId, _ty: DapType, layout: AtomicLayout) -> Result<()> {
        self.seen.push((var, layout));
        Ok(())
    }

    fn structure(&mut self, _var: NodeId, _index: u64, _fields: Vec<()>) -> Result<()> {
        Ok(())
    }

    fn record(&mut self, _var: NodeId, _index: u64, _fields: Vec<()>) -> Result<()> {
        Ok(())
    }

    fn sequence(&mut self, _var: NodeId, _index: u64, _records: Vec<()>) -> Result<()> {
        Ok(())
    }

    fn compound_array(&mut self, _var: NodeId, _instances: Vec<()>) -> Result<()> {
        Ok(())
    }

    fn dataset(&mut self, _variables: Vec<TopLevel<()>>) -> Result<Self::Dataset> {
        Ok(std::mem::take(&mut self.seen))
    }
}

#[test]
fn test_custom_factory_sees_byte_string_offsets() {
    let dataset = schema(
        r#"<Dataset name="s" dapVersion="4.0" dmrVersion="1.0">
  <Int8 name="pad"/>
  <String name="words"><Dim size="2"/></String>
  <Int8 name="tail"/>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .value(DapValue::Int8(1))
        .value(DapValue::String("hello".into()))
        .value(DapValue::String("hi".into()))
        .value(DapValue::Int8(2))
        .finish();
    let mut factory = LayoutRecorder::default();
    let layouts = compile(&dataset, &buffer, no_checksums(), &mut factory).unwrap();

    assert_eq!(layouts.len(), 3);
    assert_eq!(layouts[1].1.positions, vec![1, 14]);
    assert_eq!(layouts[1].1.length, 8 + 5 + 8 + 2);
    assert_eq!(layouts[2].1.offset, 24);
}

#[test]
fn test_structure_arrays() {
    let dataset = schema(
        r#"<Dataset name="st" dapVersion="4.0" dmrVersion="1.0">
  <Structure name="P">
    <Int16 name="i"/>
    <String name="s"/>
    <Dim size="2"/>
  </Structure>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .value(DapValue::Int16(1))
        .value(DapValue::String("one".into()))
        .value(DapValue::Int16(2))
        .value(DapValue::String("two".into()))
        .checksum()
        .finish();
    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();

    let array = tree.variable_by_name("/P").unwrap().as_compound_array().unwrap();
    assert_eq!(array.instances.len(), 2);
    let second = array.instances[1].as_structure().unwrap();
    assert_eq!(second.index, 1);
    let i = tree.field(&second.fields, "i").unwrap().as_atomic().unwrap();
    let s = tree.field(&second.fields, "s").unwrap().as_atomic().unwrap();
    assert_eq!(tree.read(i, 0).unwrap(), DapValue::Int16(2));
    assert_eq!(tree.read(s, 0).unwrap().as_str(), Some("two"));
    assert_eq!(i.layout.offset, 13);
}

#[test]
fn test_sequence_arrays_and_nested_structures() {
    let dataset = schema(
        r#"<Dataset name="sq" dapVersion="4.0" dmrVersion="1.0">
  <Sequence name="Q">
    <Structure name="loc"><Float32 name="lat"/><Float32 name="lon"/></Structure>
    <UInt32 name="n"><Dim size="2"/></UInt32>
    <Dim size="2"/>
  </Sequence>
</Dataset>"#,
    );
    let mut w = Writer::default();
    w.count(1)
        .value(DapValue::Float32(1.0))
        .value(DapValue::Float32(2.0))
        .value(DapValue::UInt32(3))
        .value(DapValue::UInt32(4));
    w.count(2);
    for k in 0..2u32 {
        w.value(DapValue::Float32(k as f32))
            .value(DapValue::Float32(-(k as f32)))
            .value(DapValue::UInt32(k))
            .value(DapValue::UInt32(k + 10));
    }
    let buffer = w.checksum().finish();
    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();

    let array = tree.variable_by_name("/Q").unwrap().as_compound_array().unwrap();
    let counts: Vec<usize> = array
        .instances
        .iter()
        .map(|inst| inst.as_sequence().unwrap().record_count())
        .collect();
    assert_eq!(counts, vec![1, 2]);

    let last = &array.instances[1].as_sequence().unwrap().records[1];
    let n = tree.field(&last.fields, "n").unwrap().as_atomic().unwrap();
    assert_eq!(
        tree.read_all(n).unwrap(),
        vec![DapValue::UInt32(1), DapValue::UInt32(11)]
    );
    let loc = tree.field(&last.fields, "loc").unwrap();
    let lon = tree.field(loc.fields(), "lon").unwrap().as_atomic().unwrap();
    assert_eq!(tree.read(lon, 0).unwrap(), DapValue::Float32(-1.0));
}

#[test]
fn test_big_endian_buffers() {
    let dataset = schema(
        r#"<Dataset name="be" dapVersion="4.0" dmrVersion="1.0">
  <UInt16 name="u"><Dim size="2"/></UInt16>
  <Sequence name="S"><Int64 name="v"/></Sequence>
</Dataset>"#,
    );
    let buffer = Writer::big_endian()
        .value(DapValue::UInt16(0x0102))
        .value(DapValue::UInt16(0x0304))
        .checksum()
        .count(1)
        .value(DapValue::Int64(-7))
        .checksum()
        .finish();
    assert_eq!(&buffer[..2], &[0x01, 0x02]);

    let options = CompileOptions::new(ChecksumMode::Dap, ByteOrder::Big).with_verification(true);
    let tree = compile_tree(&dataset, &buffer, options).unwrap();
    let u = tree.variable_by_name("/u").unwrap().as_atomic().unwrap();
    assert_eq!(tree.read(u, 1).unwrap(), DapValue::UInt16(0x0304));
    let seq = tree.variable_by_name("/S").unwrap().as_sequence().unwrap();
    let v = tree.field(&seq.records[0].fields, "v").unwrap().as_atomic().unwrap();
    assert_eq!(tree.read(v, 0).unwrap(), DapValue::Int64(-7));
}

#[test]
fn test_enum_values_name_their_constants() {
    let dataset = schema(
        r#"<Dataset name="en" dapVersion="4.0" dmrVersion="1.0">
  <Enumeration name="color" basetype="Int8">
    <EnumConst name="RED" value="1"/>
    <EnumConst name="NONE" value="-1"/>
  </Enumeration>
  <Enum name="c" enum="color"><Dim size="3"/></Enum>
</Dataset>"#,
    );
    let buffer = Writer::default()
        .value(DapValue::Int8(1))
        .value(DapValue::Int8(-1))
        .value(DapValue::Int8(5))
        .checksum()
        .finish();
    let tree = compile_tree(&dataset, &buffer, CompileOptions::default()).unwrap();
    let c = tree.variable_by_name("/c").unwrap().as_atomic().unwrap();
    assert_eq!(c.layout.length, 3);
    assert_eq!(tree.enum_name(c, 0).unwrap(), Some("RED"));
    assert_eq!(tree.enum_name(c, 1).unwrap(), Some("NONE"));
    assert_eq!(tree.enum_name(c, 2).unwrap(), None);
    assert!(tree.read(c, 3).is_err());
}

#[test]
fn test_short_buffers_fail() {
    let dataset = schema(
        r#"<Dataset name="short" dapVersion="4.0" dmrVersion="1.0">
  <Float64 name="x"><Dim size="4"/></Float64>
  <String name="s"/>
  <Sequence name="S"><Int32 name="a"/></Sequence>
</Dataset>"#,
    );
    let mut w = Writer::default();
    for k in 0..4 {
        w.value(DapValue::Float64(k as f64));
    }
    w.value(DapValue::String("ok".into())).count(3).value(DapValue::Int32(1));
    let buffer = w.finish();

    for cut in [0, 31, 33, 41, buffer.len() - 1] {
        let err = compile_tree(&dataset, &buffer[..cut], no_checksums()).unwrap_err();
        assert!(err.is_decode(), "cut at {cut}: {err}");
    }
}

#[test]
fn test_huge_string_length_fails() {
    let dataset = schema(
        r#"<Dataset name="h" dapVersion="4.0" dmrVersion="1.0"><String name="s"/></Dataset>"#,
    );
    let buffer = Writer::default().count(u64::MAX).finish();
    assert!(compile_tree(&dataset, &buffer, no_checksums()).unwrap_err().is_decode());
}

#[test]
fn test_variable_length_dimension_has_no_wire_form() {
    let dataset = schema(
        r#"<Dataset name="v" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"><Dim size="*"/></Int32></Dataset>"#,
    );
    let err = compile_tree(&dataset, &[0u8; 16], no_checksums()).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn test_trailing_bytes_are_tolerated() {
    let dataset = schema(
        r#"<Dataset name="t" dapVersion="4.0" dmrVersion="1.0"><UInt8 name="b"/></Dataset>"#,
    );
    let tree = compile_tree(&dataset, &[9, 1, 2, 3], no_checksums()).unwrap();
    let b = tree.variable_by_name("/b").unwrap().as_atomic().unwrap();
    assert_eq!(tree.read(b, 0).unwrap(), DapValue::UInt8(9));
}

#[test]
fn test_group_variables_follow_root_variables_in_document_order() {
    let dataset = schema(
        r#"<Dataset name="g" dapVersion="4.0" dmrVersion="1.0">
  <Int8 name="first"/>
  <Group name="inner"><Int8 name="second"/></Group>
  <Int8 name="third"/>
</Dataset>"#,
    );
    let tree = compile_tree(&dataset, &[1, 2, 3], no_checksums()).unwrap();
    for (name, expected) in [("/first", 1), ("/inner/second", 2), ("/third", 3)] {
        let v = tree.variable_by_name(name).unwrap().as_atomic().unwrap();
        assert_eq!(tree.read(v, 0).unwrap(), DapValue::Int8(expected), "{name}");
    }
}

#[test]
fn test_concurrent_decodes_share_one_schema() {
    let dataset = schema(
        r#"<Dataset name="c" dapVersion="4.0" dmrVersion="1.0">
  <Int32 name="x"><Dim size="4"/></Int32>
</Dataset>"#,
    );
    let buffers: Vec<Vec<u8>> = (0..8)
        .map(|k| {
            let mut w = Writer::default();
            for i in 0..4 {
                w.value(DapValue::Int32(k * 100 + i));
            }
            w.checksum().finish()
        })
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = buffers
            .iter()
            .enumerate()
            .map(|(k, buffer)| {
                let dataset = &dataset;
                scope.spawn(move || {
                    let tree = compile_tree(dataset, buffer, CompileOptions::default()).unwrap();
                    let x = tree.variable_by_name("/x").unwrap().as_atomic().unwrap();
                    assert_eq!(tree.read(x, 3).unwrap(), DapValue::Int32(k as i32 * 100 + 3));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}

proptest! {
    #[test]
    fn prop_fixed_size_values_decode_in_place(
        values in proptest::collection::vec(any::<i32>(), 1..32),
        big in any::<bool>(),
    ) {
        let dmr = format!(
            r#"<Dataset name="p" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"><Dim size="{}"/></Int32></Dataset>"#,
            values.len()
        );
        let dataset = schema(&dmr);
        let order = if big { ByteOrder::Big } else { ByteOrder::Little };
        let mut w = Writer { order, ..Writer::default() };
        for &v in &values {
            w.value(DapValue::Int32(v));
        }
        let buffer = w.checksum().finish();
        let options = CompileOptions::new(ChecksumMode::Dap, order).with_verification(true);
        let tree = compile_tree(&dataset, &buffer, options).unwrap();
        let x = tree.variable_by_name("/x").unwrap().as_atomic().unwrap();
        let decoded: Vec<DapValue> = tree.read_all(x).unwrap();
        let expected: Vec<DapValue> = values.iter().map(|&v| DapValue::Int32(v)).collect();
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn prop_sequence_record_counts(counts in proptest::collection::vec(0u64..6, 1..5)) {
        let dmr = format!(
            r#"<Dataset name="p" dapVersion="4.0" dmrVersion="1.0"><Sequence name="S"><Int16 name="a"/><Dim size="{}"/></Sequence></Dataset>"#,
            counts.len()
        );
        let dataset = schema(&dmr);
        let mut w = Writer::default();
        for &n in &counts {
            w.count(n);
            for r in 0..n {
                w.value(DapValue::Int16(r as i16));
            }
        }
        let buffer = w.finish();
        let tree = compile_tree(&dataset, &buffer, no_checksums()).unwrap();
        let array = tree.variable_by_name("/S").unwrap().as_compound_array().unwrap();
        let decoded: Vec<u64> = array
            .instances
            .iter()
            .map(|i| i.as_sequence().unwrap().record_count() as u64)
            .collect();
        prop_assert_eq!(decoded, counts);
    }
}
