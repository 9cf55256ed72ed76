//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.

//! # DMR Parser Tests
//!
//! Schema construction from DMR documents: groups, dimensions,
//! enumerations, compound variables, maps, attributes, error responses
//! and the semantic checks applied when a parse finishes.
//!
//! ```bash
//! cargo test --test dmr_parser
//! ```

use dap4::dmr::{DapAttribute, DimRef, NodeSort};
use dap4::{parse_dmr, DapType, DmrParser, DmrParserConfig, DmrResponse, TypeSort, VariableKind};

const FULL_DMR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dataset name="sample" dapVersion="4.0" dmrVersion="1.0"
         xmlns="http://xml.opendap.org/ns/DAP/4.0#">
  <Dimension name="lat" size="3"/>
  <Dimension name="lon" size="4"/>
  <Enumeration name="quality" basetype="Int8">
    <EnumConst name="bad" value="-1"/>
    <EnumConst name="good" value="1"/>
  </Enumeration>
  <Float32 name="lat">
    <Dim name="lat"/>
  </Float32>
  <Float32 name="temp">
    <Dim name="/lat"/>
    <Dim name="lon"/>
    <Map name="/lat"/>
    <Attribute name="units" type="String">
      <Value>K</Value>
    </Attribute>
    <Attribute name="valid_range" type="Float32">
      <Value value="200"/>
      <Value value="330"/>
    </Attribute>
  </Float32>
  <Enum name="flag" enum="quality"/>
  <Structure name="obs">
    <Int32 name="id"/>
    <String name="site"/>
  </Structure>
  <Group name="inner">
    <Dimension name="n" size="2"/>
    <Int16 name="counts">
      <Dim name="n"/>
      <Dim name="/lon"/>
    </Int16>
  </Group>
  <Attribute name="history" type="Container">
    <Attribute name="created" type="String" value="today"/>
    <OtherXML name="provenance">
      <source kind="model"><run id="7"/></source>
    </OtherXML>
  </Attribute>
</Dataset>"#;

#[test]
fn test_parse_full_document() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();

    assert_eq!(dataset.name(), "sample");
    assert_eq!(dataset.dap_version(), "4.0");
    assert_eq!(dataset.dmr_version(), "1.0");

    let names: Vec<String> = dataset
        .top_variables()
        .iter()
        .map(|&id| dataset.fqn(id))
        .collect();
    assert_eq!(names, vec!["/lat", "/temp", "/flag", "/obs", "/inner/counts"]);
}

#[test]
fn test_dimension_and_variable_share_a_name() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();
    let dim = dataset.find_dimension("/lat").unwrap();
    let var = dataset.find_variable("/lat").unwrap();
    assert_ne!(dim, var);
    assert_eq!(dataset.node(dim).sort(), NodeSort::Dimension);
    assert_eq!(dataset.node(var).sort(), NodeSort::Atomic);
    assert_eq!(dataset.variable(var).unwrap().dims, vec![DimRef::Node(dim)]);
}

#[test]
fn test_dimensions_resolve_relative_and_absolute() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();
    let temp = dataset.find_variable("/temp").unwrap();
    assert_eq!(dataset.dim_sizes(temp), vec![Some(3), Some(4)]);
    assert_eq!(dataset.dim_product(temp), Some(12));

    let counts = dataset.find_variable("/inner/counts").unwrap();
    let inner_n = dataset.find_dimension("/inner/n").unwrap();
    let v = dataset.variable(counts).unwrap();
    assert_eq!(v.dims[0], DimRef::Node(inner_n));
    assert_eq!(dataset.dim_product(counts), Some(8));
}

#[test]
fn test_maps_and_attributes() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();
    let temp = dataset.find_variable("/temp").unwrap();
    let lat = dataset.find_variable("/lat").unwrap();
    assert_eq!(dataset.variable(temp).unwrap().maps, vec![lat]);

    let attrs = &dataset.node(temp).attributes;
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs[0].name(), "units");
    assert_eq!(attrs[0].values(), ["K".to_string()]);
    match &attrs[1] {
        DapAttribute::Atomic(a) => {
            assert_eq!(a.ty, DapType::FLOAT32);
            assert_eq!(a.values, vec!["200".to_string(), "330".to_string()]);
        }
        other => panic!("unexpected attribute {other:?}"),
    }
}

#[test]
fn test_container_and_other_xml_attributes() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();
    let root_attrs = &dataset.node(dataset.root()).attributes;
    let history = root_attrs.iter().find(|a| a.name() == "history").unwrap();
    let created = history.child("created").unwrap();
    assert_eq!(created.values(), ["today".to_string()]);
    match history.child("provenance") {
        Some(DapAttribute::OtherXml(x)) => {
            assert!(x.content.contains("<source kind=\"model\">"));
            assert!(x.content.contains("<run id=\"7\"/>"));
            assert!(x.content.contains("</source>"));
        }
        other => panic!("unexpected attribute {other:?}"),
    }
}

#[test]
fn test_enum_constants_are_masked_to_base() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();
    let quality = dataset.find_enumeration("/quality").unwrap();
    let e = dataset.enumeration(quality).unwrap();
    assert_eq!(e.base, TypeSort::Int8);
    assert_eq!(e.value_of("bad"), Some(u64::MAX));
    assert_eq!(e.value_of("good"), Some(1));

    let flag = dataset.find_variable("/flag").unwrap();
    assert_eq!(
        dataset.variable(flag).unwrap().base_type(),
        DapType::Enum {
            id: quality,
            base: TypeSort::Int8
        }
    );
}

#[test]
fn test_structure_fields() {
    let dataset = parse_dmr(FULL_DMR).unwrap().into_dataset().unwrap();
    let obs = dataset.find_variable("/obs").unwrap();
    let fields = dataset.fields(obs);
    assert_eq!(fields.len(), 2);
    assert_eq!(dataset.fqn(fields[0]), "/obs.id");
    assert_eq!(dataset.find_variable("/obs.site"), Some(fields[1]));
    assert!(!dataset.is_top_level(fields[0]));
    assert!(dataset.is_top_level(obs));
}

#[test]
fn test_scalar_sequence() {
    let dmr = r#"<Dataset name="seq" dapVersion="4.0" dmrVersion="1.0">
  <Sequence name="S">
    <Int32 name="a"/>
  </Sequence>
</Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    let s = dataset.find_variable("/S").unwrap();
    let v = dataset.variable(s).unwrap();
    assert!(v.is_scalar());
    assert!(matches!(v.kind, VariableKind::Sequence { .. }));
    assert_eq!(dataset.dim_product(s), Some(1));
}

#[test]
fn test_forward_dimension_reference() {
    let dmr = r#"<Dataset name="fwd" dapVersion="4.0" dmrVersion="1.0">
  <Group name="g">
    <Int32 name="x"><Dim name="later"/></Int32>
    <Dimension name="later" size="5"/>
  </Group>
</Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    let x = dataset.find_variable("/g/x").unwrap();
    assert_eq!(dataset.dim_product(x), Some(5));
}

#[test]
fn test_anonymous_dimensions_are_minted_fresh() {
    let dmr = r#"<Dataset name="anon" dapVersion="4.0" dmrVersion="1.0">
  <Int32 name="x"><Dim size="10"/></Int32>
  <Int32 name="y"><Dim size="10"/></Int32>
</Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    let x = dataset.find_variable("/x").unwrap();
    let y = dataset.find_variable("/y").unwrap();
    let dx = dataset.variable(x).unwrap().dims[0];
    let dy = dataset.variable(y).unwrap().dims[0];
    assert_ne!(dx, dy);
    assert_eq!(dataset.dim_sizes(x), vec![Some(10)]);
}

#[test]
fn test_variable_length_dimension() {
    let dmr = r#"<Dataset name="vlen" dapVersion="4.0" dmrVersion="1.0">
  <Int32 name="x"><Dim size="*"/></Int32>
</Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    let x = dataset.find_variable("/x").unwrap();
    assert_eq!(dataset.variable(x).unwrap().dims, vec![DimRef::VarLength]);
    assert_eq!(dataset.dim_product(x), None);
}

#[test]
fn test_map_into_own_structure_is_rejected() {
    let dmr = r#"<Dataset name="maps" dapVersion="4.0" dmrVersion="1.0">
  <Structure name="S">
    <Float64 name="lat"/>
    <Float64 name="value">
      <Map name="/S.lat"/>
    </Float64>
  </Structure>
</Dataset>"#;
    let err = parse_dmr(dmr).unwrap_err();
    assert!(err.is_semantic(), "{err}");
}

#[test]
fn test_map_target_must_be_atomic() {
    let dmr = r#"<Dataset name="maps" dapVersion="4.0" dmrVersion="1.0">
  <Structure name="S"><Int32 name="a"/></Structure>
  <Sequence name="Q"><Int32 name="b"/></Sequence>
  <Int32 name="x">
    <Map name="/S"/>
  </Int32>
  <Int32 name="y">
    <Map name="Q"/>
  </Int32>
</Dataset>"#;
    let err = parse_dmr(dmr).unwrap_err();
    assert!(err.is_semantic(), "{err}");
    assert!(err.to_string().contains("atomic"), "{err}");

    let field_target = r#"<Dataset name="maps" dapVersion="4.0" dmrVersion="1.0">
  <Structure name="S"><Int32 name="a"/></Structure>
  <Int32 name="x"><Map name="/S.a"/></Int32>
</Dataset>"#;
    assert!(parse_dmr(field_target).is_ok());
}

#[test]
fn test_map_to_top_level_from_field_is_allowed() {
    let dmr = r#"<Dataset name="maps" dapVersion="4.0" dmrVersion="1.0">
  <Float64 name="time"/>
  <Structure name="S">
    <Float64 name="value">
      <Map name="/time"/>
    </Float64>
  </Structure>
</Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    let value = dataset.find_variable("/S.value").unwrap();
    let time = dataset.find_variable("/time").unwrap();
    assert_eq!(dataset.variable(value).unwrap().maps, vec![time]);
}

#[test]
fn test_version_mismatch() {
    let dmr = r#"<Dataset name="v" dapVersion="3.2" dmrVersion="1.0"><Int32 name="x"/></Dataset>"#;
    let err = parse_dmr(dmr).unwrap_err();
    assert!(err.is_semantic());
    assert!(err.to_string().contains("version mismatch"));
}

#[test]
fn test_missing_versions_default_unless_required() {
    let dmr = r#"<Dataset name="v"><Int32 name="x"/></Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    assert_eq!(dataset.dap_version(), "4.0");

    let strict = DmrParser::new(DmrParserConfig {
        require_versions: true,
        trace: false,
    });
    assert!(strict.parse(dmr).unwrap_err().is_semantic());
}

#[test]
fn test_semantic_errors() {
    let cases = [
        // undefined dimension
        r#"<Dataset name="d"><Int32 name="x"><Dim name="nope"/></Int32></Dataset>"#,
        // duplicate variable
        r#"<Dataset name="d"><Int32 name="x"/><Float32 name="x"/></Dataset>"#,
        // empty enumeration
        r#"<Dataset name="d"><Enumeration name="e" basetype="UInt8"/></Dataset>"#,
        // non-integer enumeration base
        r#"<Dataset name="d"><Enumeration name="e" basetype="Float32"><EnumConst name="a" value="1"/></Enumeration></Dataset>"#,
        // illegal constant name
        r#"<Dataset name="d"><Enumeration name="e"><EnumConst name="1a" value="1"/></Enumeration></Dataset>"#,
        // zero-sized dimension
        r#"<Dataset name="d"><Dimension name="n" size="0"/></Dataset>"#,
        // Dim with both name and size
        r#"<Dataset name="d"><Dimension name="n" size="2"/><Int32 name="x"><Dim name="n" size="2"/></Int32></Dataset>"#,
        // opaque attribute
        r#"<Dataset name="d"><Attribute name="a" type="Opaque"><Value>00</Value></Attribute></Dataset>"#,
        // attribute with no values
        r#"<Dataset name="d"><Attribute name="a" type="Int32"/></Dataset>"#,
        // unknown enumeration
        r#"<Dataset name="d"><Enum name="c" enum="missing"/></Dataset>"#,
        // unnamed dataset
        r#"<Dataset dapVersion="4.0" dmrVersion="1.0"/>"#,
        // closing tag does not match the open variable
        r#"<Dataset name="d" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"></Float32></Dataset>"#,
        // closing tag does not match the open attribute
        r#"<Dataset name="d"><Attribute name="a" type="Int32"><Value>1</Value></Group></Dataset>"#,
    ];
    for dmr in cases {
        let err = parse_dmr(dmr).unwrap_err();
        assert!(err.is_semantic(), "expected semantic error for {dmr}: {err}");
    }
}

#[test]
fn test_mismatched_closing_tag() {
    let dmr =
        r#"<Dataset name="d" dapVersion="4.0" dmrVersion="1.0"><Int32 name="x"></Float32></Dataset>"#;
    let err = parse_dmr(dmr).unwrap_err();
    assert!(err.is_semantic(), "{err}");
    assert!(err.to_string().contains("</Float32>"), "{err}");

    // Elements nested in OtherXML are captured as text, not opened as scopes.
    let other = r#"<Dataset name="d" dapVersion="4.0" dmrVersion="1.0">
  <OtherXML name="extra"><a><b/></a></OtherXML>
</Dataset>"#;
    assert!(parse_dmr(other).is_ok());
}

#[test]
fn test_grammar_errors() {
    let cases = [
        r#"<Datset name="d"/>"#,
        r#"<Dataset name="d"><Int32 name="x"></Dataset>"#,
        r#"<Dataset name="d"><Bogus name="x"/></Dataset>"#,
        r#"<Dataset name="d"><Dimension name="n" size="2"><Int32 name="x"/></Dimension></Dataset>"#,
        r#"<Dataset name="d"><Int32 name="x"/>"#,
        "",
    ];
    for dmr in cases {
        assert!(parse_dmr(dmr).is_err(), "expected failure for {dmr:?}");
    }
    assert!(parse_dmr(r#"<Dataset name="d"><Bogus name="x"/></Dataset>"#)
        .unwrap_err()
        .is_grammar());
}

#[test]
fn test_error_response() {
    let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error httpcode="404">
  <Message>No such dataset</Message>
  <Context>/data/missing.nc</Context>
  <OtherInformation>try again</OtherInformation>
</Error>"#;
    let response = parse_dmr(doc).unwrap();
    assert!(response.is_error());
    match response {
        DmrResponse::Error(err) => {
            assert_eq!(err.http_code, 404);
            assert_eq!(err.message.as_deref(), Some("No such dataset"));
            assert_eq!(err.context.as_deref(), Some("/data/missing.nc"));
            assert_eq!(err.other_info.as_deref(), Some("try again"));
        }
        DmrResponse::Dataset(_) => panic!("expected an error response"),
    }
}

#[test]
fn test_attribute_enum_type() {
    let dmr = r#"<Dataset name="d" dapVersion="4.0" dmrVersion="1.0">
  <Enumeration name="level" basetype="UInt8">
    <EnumConst name="low" value="0"/>
    <EnumConst name="high" value="1"/>
  </Enumeration>
  <Int32 name="x">
    <Attribute name="importance" type="level">
      <Value>high</Value>
    </Attribute>
  </Int32>
</Dataset>"#;
    let dataset = parse_dmr(dmr).unwrap().into_dataset().unwrap();
    let x = dataset.find_variable("/x").unwrap();
    let level = dataset.find_enumeration("/level").unwrap();
    match &dataset.node(x).attributes[0] {
        DapAttribute::Atomic(a) => {
            assert_eq!(a.ty.enum_id(), Some(level));
            assert_eq!(a.values, vec!["high".to_string()]);
        }
        other => panic!("unexpected attribute {other:?}"),
    }
}

#[test]
fn test_parsed_schema_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<dap4::DapDataset>();
}
