#![no_main]

use libfuzzer_sys::fuzz_target;

use wasmframe::parser::{self, DecoderConfig, SectionPolicy, Utf8Policy};

fuzz_target!(|data: &[u8]| {
    // We don't care about the result - we're looking for panics/crashes
    let strict = parser::decode_bytes(data);
    let streamed = parser::decode(data);
    if let (Ok(a), Ok(b)) = (&strict, &streamed) {
        assert_eq!(a, b);
    }

    let relaxed = DecoderConfig::new()
        .require_version_1(false)
        .unknown_sections(SectionPolicy::Skip)
        .unknown_custom_sections(SectionPolicy::Skip)
        .utf8(Utf8Policy::Lossy);
    let _ = parser::decode_bytes_with_config(data, relaxed);
});
