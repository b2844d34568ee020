mod common;

use common::{custom_payload, module_bytes};
use wasmframe::parser::encoding::*;
use wasmframe::parser::{
    self, limits, DecodeError, Decoder, DecoderConfig, SectionPolicy, Utf8Policy,
};

fn producers() -> Vec<u8> {
    let mut contents = Vec::new();
    write_vu32(&mut contents, 1);
    write_name(&mut contents, "language");
    write_vu32(&mut contents, 1);
    write_name(&mut contents, "C");
    write_name(&mut contents, "");
    custom_payload("producers", &contents)
}

#[test]
fn decode_is_deterministic() {
    let bytes = module_bytes(&[
        (SECTION_TYPE, vec![0x01, 0x60, 0x00, 0x00]),
        (SECTION_CUSTOM, producers()),
        (SECTION_FUNCTION, vec![0x01, 0x00]),
    ]);
    let first = parser::decode_bytes(&bytes).unwrap();
    let second = parser::decode_bytes(&bytes).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.producers[0].to_string(), "language: C");
}

#[test]
fn sections_keep_input_order() {
    // order and repetition are not checked at this level
    let bytes = module_bytes(&[
        (SECTION_CODE, vec![0x00]),
        (SECTION_TYPE, vec![0x00]),
        (SECTION_TYPE, vec![0x01, 0x60, 0x00, 0x00]),
    ]);
    let decoded = parser::decode_bytes(&bytes).unwrap();
    let ids: Vec<u8> = decoded.sections.iter().map(|s| s.id() as u8).collect();
    assert_eq!(ids, vec![SECTION_CODE, SECTION_TYPE, SECTION_TYPE]);
}

#[test]
fn no_frames_leak_between_sections() {
    let mut names = Vec::new();
    names.push(NAME_FUNCTIONS);
    write_vu32(&mut names, 3);
    names.extend_from_slice(&[0x01, 0x00, 0x00]);
    let bytes = module_bytes(&[
        (SECTION_CUSTOM, custom_payload("name", &names)),
        (SECTION_CUSTOM, producers()),
        (SECTION_MEMORY, vec![0x01, 0x00, 0x01]),
    ]);

    let mut decoder = Decoder::from_bytes(&bytes);
    decoder.read_header().unwrap();
    assert_eq!(decoder.depth(), 1);
    while decoder.decode_next_section().unwrap() {
        assert_eq!(decoder.depth(), 1);
    }
    assert_eq!(decoder.pos(), bytes.len() as u64);
    let module = decoder.into_module().unwrap();
    assert_eq!(module.function_name(0), Some(""));
}

#[test]
fn unknown_sections_can_be_skipped() {
    let bytes = module_bytes(&[
        (0x0e, vec![0xde, 0xad]),
        (SECTION_CUSTOM, custom_payload("sourceMappingURL", b"a.map")),
        (SECTION_START, vec![0x00]),
    ]);

    match parser::decode_bytes(&bytes) {
        Err(DecodeError::UnknownSection { id: 0x0e, offset: 8 }) => {}
        other => panic!("expected UnknownSection, got {:?}", other),
    }

    let config = DecoderConfig::new().unknown_sections(SectionPolicy::Skip);
    match parser::decode_bytes_with_config(&bytes, config.clone()) {
        Err(DecodeError::UnsupportedCustomSection { name, offset }) => {
            assert_eq!(name, "sourceMappingURL");
            // the name starts right after the section's ID and size
            assert_eq!(offset, 14);
        }
        other => panic!("expected UnsupportedCustomSection, got {:?}", other),
    }

    let config = config.unknown_custom_sections(SectionPolicy::Skip);
    let decoded = parser::decode_bytes_with_config(&bytes, config).unwrap();
    assert_eq!(decoded.sections.len(), 1);
    assert_eq!(decoded.sections[0].data(), &[0x00]);
}

#[test]
fn lossy_names() {
    let mut contents = Vec::new();
    write_vu32(&mut contents, 1);
    contents.push(FEATURE_REQUIRED);
    contents.extend_from_slice(&[0x04, b's', 0xff, b'm', b'd']);
    let bytes = module_bytes(&[(SECTION_CUSTOM, custom_payload("target_features", &contents))]);

    assert!(matches!(
        parser::decode_bytes(&bytes),
        Err(DecodeError::InvalidUtf8 { .. })
    ));

    let config = DecoderConfig::new().utf8(Utf8Policy::Lossy);
    let decoded = parser::decode_bytes_with_config(&bytes, config).unwrap();
    assert_eq!(decoded.target_features[0].name, "s\u{fffd}md");
    assert_eq!(decoded.target_features[0].to_string(), "=s\u{fffd}md");
}

#[test]
fn config_from_json() {
    let config: DecoderConfig =
        serde_json::from_str(r#"{"unknown_custom_sections": "skip", "utf8": "lossy"}"#).unwrap();
    assert!(config.require_version_1);
    assert_eq!(config.unknown_sections, SectionPolicy::Reject);
    assert_eq!(config.unknown_custom_sections, SectionPolicy::Skip);
    assert_eq!(config.utf8, Utf8Policy::Lossy);
}

#[test]
fn producer_field_limit() {
    let mut contents = Vec::new();
    write_vu32(&mut contents, limits::MAX_PRODUCER_FIELDS + 1);
    let bytes = module_bytes(&[(SECTION_CUSTOM, custom_payload("producers", &contents))]);
    match parser::decode_bytes(&bytes) {
        Err(DecodeError::LimitExceeded {
            what,
            count,
            limit,
            offset,
        }) => {
            assert_eq!(what, "producer field");
            assert_eq!(count, limits::MAX_PRODUCER_FIELDS + 1);
            assert_eq!(limit, limits::MAX_PRODUCER_FIELDS);
            // header, section ID and size, then "producers"
            assert_eq!(offset, 8 + 2 + 10);
        }
        other => panic!("expected LimitExceeded, got {:?}", other),
    }
}

#[test]
fn errors_carry_offsets() {
    let bytes = module_bytes(&[(SECTION_CUSTOM, custom_payload("producers", &[0x01, 0x02]))]);
    let err = parser::decode_bytes(&bytes).unwrap_err();
    // field name claims 2 bytes with none left
    assert!(matches!(err, DecodeError::TruncatedName { len: 2, .. }));
    assert_eq!(err.offset(), Some(bytes.len() as u64));
}
