//! Implementation limits for custom section decoding.
//!
//! Counts in the `name`, `producers` and `target_features` sections come
//! straight from the input. These caps reject absurd claims up front instead
//! of looping until the section runs out of bytes. The name-map caps follow
//! V8's function and local limits (src/wasm/wasm-limits.h).

// =============================================================================
// name section
// =============================================================================

/// Maximum entries in one direct name map (function, global, data segment...)
pub const MAX_NAME_MAP_ENTRIES: u32 = 1_000_000;

/// Maximum outer entries in an indirect name map (locals, labels)
pub const MAX_INDIRECT_NAME_MAP_ENTRIES: u32 = 1_000_000;

/// Maximum entries in one inner map of an indirect name map
pub const MAX_INNER_NAME_MAP_ENTRIES: u32 = 50_000;

// =============================================================================
// producers section
// =============================================================================

/// Maximum producer fields
pub const MAX_PRODUCER_FIELDS: u32 = 1_000;

/// Maximum name/version pairs in one producer field
pub const MAX_PRODUCER_VALUES: u32 = 1_000;

// =============================================================================
// target_features section
// =============================================================================

/// Maximum target feature entries
pub const MAX_TARGET_FEATURES: u32 = 1_000;
