//! Errors produced while decoding a binary module.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Every way a decode can fail. All of them are fatal to the decode in
/// progress; offsets are absolute positions in the input stream.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {offset:#x}")]
    Truncated { offset: u64 },

    #[error("malformed LEB128 u32 at offset {offset:#x}: {reason}")]
    MalformedVarint { offset: u64, reason: &'static str },

    #[error("truncated name at offset {offset:#x}: need {len} bytes, {available} available")]
    TruncatedName {
        offset: u64,
        len: u32,
        available: u64,
    },

    #[error("malformed section #{id} at offset {offset:#x}: need {size} bytes, {available} available")]
    MalformedSection {
        id: u8,
        offset: u64,
        size: u32,
        available: u64,
    },

    #[error("malformed name subsection #{id} at offset {offset:#x}: need {size} bytes, {available} available")]
    MalformedSubsection {
        id: u8,
        offset: u64,
        size: u32,
        available: u64,
    },

    #[error("unknown section #{id} at offset {offset:#x}")]
    UnknownSection { id: u8, offset: u64 },

    #[error("unsupported custom section \"{name}\" at offset {offset:#x}")]
    UnsupportedCustomSection { name: String, offset: u64 },

    #[error("invalid magic number {found:#010x}, expected {expected:#010x}")]
    InvalidMagic { found: u32, expected: u32 },

    #[error("unsupported version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid UTF-8 in name at offset {offset:#x}")]
    InvalidUtf8 {
        offset: u64,
        #[source]
        source: FromUtf8Error,
    },

    #[error("{what} count {count} at offset {offset:#x} exceeds limit {limit}")]
    LimitExceeded {
        what: &'static str,
        count: u32,
        limit: u32,
        offset: u64,
    },

    #[error("{context} ending at offset {offset:#x} left {remaining} bytes unread")]
    SizeMismatch {
        context: String,
        offset: u64,
        remaining: u64,
    },

    #[error("decoder already failed and cannot be reused")]
    DecoderFailed,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Input offset the error refers to, for the variants that have one.
    pub fn offset(&self) -> Option<u64> {
        use DecodeError::*;
        match self {
            Truncated { offset }
            | MalformedVarint { offset, .. }
            | TruncatedName { offset, .. }
            | MalformedSection { offset, .. }
            | MalformedSubsection { offset, .. }
            | UnknownSection { offset, .. }
            | UnsupportedCustomSection { offset, .. }
            | InvalidUtf8 { offset, .. }
            | LimitExceeded { offset, .. }
            | SizeMismatch { offset, .. } => Some(*offset),
            InvalidMagic { .. } => Some(0),
            UnsupportedVersion { .. } => Some(4),
            DecoderFailed | Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DecodeError::MalformedSection {
            id: 1,
            offset: 0x0a,
            size: 200,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "malformed section #1 at offset 0xa: need 200 bytes, 3 available"
        );

        let err = DecodeError::InvalidMagic {
            found: 0x7f454c46,
            expected: 0x0061736d,
        };
        assert_eq!(
            err.to_string(),
            "invalid magic number 0x7f454c46, expected 0x0061736d"
        );
    }

    #[test]
    fn error_offset() {
        assert_eq!(DecodeError::Truncated { offset: 9 }.offset(), Some(9));
        assert_eq!(
            DecodeError::UnsupportedVersion {
                found: 2,
                expected: 1
            }
            .offset(),
            Some(4)
        );
        assert_eq!(DecodeError::DecoderFailed.offset(), None);
    }
}
