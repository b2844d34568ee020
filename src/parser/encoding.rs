//! Binary format constants and the primitive writers for them.
//!
//! The decoder only needs the constants. The writers produce the same
//! primitives the decoder reads (LEB128 integers, names, section framing) so
//! tests, benchmarks and fuzz seeds can assemble modules byte by byte. They
//! write directly into a caller-provided `&mut Vec<u8>`.

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// `\0asm`, as read by a big-endian u32 read.
pub const MAGIC: u32 = 0x0061_736d;
pub const MAGIC_BYTES: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// The MVP binary version. On the wire it is little-endian: `01 00 00 00`.
pub const VERSION: u32 = 1;
pub const VERSION_BYTES: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

// ---------------------------------------------------------------------------
// Section IDs (§5.5.2)
// ---------------------------------------------------------------------------

pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;
pub const SECTION_DATA_COUNT: u8 = 12;

// ---------------------------------------------------------------------------
// name section subsection IDs
// ---------------------------------------------------------------------------

pub const NAME_MODULE: u8 = 0;
pub const NAME_FUNCTIONS: u8 = 1;
pub const NAME_LOCALS: u8 = 2;
pub const NAME_LABELS: u8 = 3;
pub const NAME_TYPES: u8 = 4;
pub const NAME_TABLES: u8 = 5;
pub const NAME_MEMORIES: u8 = 6;
pub const NAME_GLOBALS: u8 = 7;
pub const NAME_ELEM_SEGMENTS: u8 = 8;
pub const NAME_DATA_SEGMENTS: u8 = 9;

// target_features prefixes
pub const FEATURE_USED: u8 = b'+';
pub const FEATURE_DISALLOWED: u8 = b'-';
pub const FEATURE_REQUIRED: u8 = b'=';

// ---------------------------------------------------------------------------
// Unsigned LEB128
// ---------------------------------------------------------------------------

/// Appends the minimal unsigned LEB128 encoding of `value` to `buf`.
pub fn write_vu32(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

// ---------------------------------------------------------------------------
// Names and framing
// ---------------------------------------------------------------------------

/// Appends a length-prefixed UTF-8 name.
pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    write_vu32(buf, name.len() as u32);
    buf.extend_from_slice(name.as_bytes());
}

pub fn write_header(buf: &mut Vec<u8>) {
    buf.extend_from_slice(&MAGIC_BYTES);
    buf.extend_from_slice(&VERSION_BYTES);
}

/// Appends a section: ID byte, LEB128 payload size, payload.
pub fn write_section(buf: &mut Vec<u8>, id: u8, payload: &[u8]) {
    buf.push(id);
    write_vu32(buf, payload.len() as u32);
    buf.extend_from_slice(payload);
}

/// Appends a custom section whose payload is `name` followed by `payload`.
pub fn write_custom_section(buf: &mut Vec<u8>, name: &str, payload: &[u8]) {
    let mut contents = Vec::with_capacity(name.len() + 5 + payload.len());
    write_name(&mut contents, name);
    contents.extend_from_slice(payload);
    write_section(buf, SECTION_CUSTOM, &contents);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
