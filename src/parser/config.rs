//! Decoder policy knobs.
//!
//! The defaults reject anything the decoder does not understand. Tools that
//! would rather inspect whatever they can (dumpers, linters) can opt into
//! skipping unknown sections or lossy name conversion.

use serde::{Deserialize, Serialize};

/// What to do with data the decoder has no interpreter for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionPolicy {
    /// Fail the decode.
    Reject,
    /// Discard the payload by byte count and keep going.
    Skip,
}

/// How name bytes that are not valid UTF-8 are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Utf8Policy {
    /// Fail with `DecodeError::InvalidUtf8`.
    Strict,
    /// Replace invalid sequences with U+FFFD.
    Lossy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Only accept the MVP binary version (`01 00 00 00`).
    pub require_version_1: bool,
    /// Top-level section IDs outside the known set.
    pub unknown_sections: SectionPolicy,
    /// Custom sections other than `name`, `producers` and `target_features`.
    pub unknown_custom_sections: SectionPolicy,
    pub utf8: Utf8Policy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            require_version_1: true,
            unknown_sections: SectionPolicy::Reject,
            unknown_custom_sections: SectionPolicy::Reject,
            utf8: Utf8Policy::Strict,
        }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_version_1(mut self, require: bool) -> Self {
        self.require_version_1 = require;
        self
    }

    pub fn unknown_sections(mut self, policy: SectionPolicy) -> Self {
        self.unknown_sections = policy;
        self
    }

    pub fn unknown_custom_sections(mut self, policy: SectionPolicy) -> Self {
        self.unknown_custom_sections = policy;
        self
    }

    pub fn utf8(mut self, policy: Utf8Policy) -> Self {
        self.utf8 = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let config = DecoderConfig::default();
        assert!(config.require_version_1);
        assert_eq!(config.unknown_sections, SectionPolicy::Reject);
        assert_eq!(config.unknown_custom_sections, SectionPolicy::Reject);
        assert_eq!(config.utf8, Utf8Policy::Strict);
    }

    #[test]
    fn builder_overrides() {
        let config = DecoderConfig::new()
            .unknown_sections(SectionPolicy::Skip)
            .utf8(Utf8Policy::Lossy);
        assert_eq!(config.unknown_sections, SectionPolicy::Skip);
        assert_eq!(config.unknown_custom_sections, SectionPolicy::Reject);
        assert_eq!(config.utf8, Utf8Policy::Lossy);
    }
}
