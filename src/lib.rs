//! A structural decoder for the WebAssembly binary module format.
//!
//! wasmframe turns an untrusted `.wasm` byte stream into a sequence of
//! well-formed sections. Every section is read inside a frame of exactly its
//! declared size, LEB128 integers are checked for overlong or oversized
//! encodings, and anything the decoder does not recognize is rejected unless
//! the caller asks for it to be skipped.
//!
//! The `name`, `producers` and `target_features` custom sections are
//! interpreted. All other sections are returned as opaque payloads, tagged
//! with their section ID, in the order they appear.
//!
//! # Modules
//!
//! - [`parser`] -- The decoder, its configuration and the module data model.
//!
//! # Example
//!
//! ```
//! use wasmframe::parser::{self, encoding};
//!
//! let mut bytes = Vec::new();
//! encoding::write_header(&mut bytes);
//! let mut producers = Vec::new();
//! encoding::write_vu32(&mut producers, 1);
//! encoding::write_name(&mut producers, "processed-by");
//! encoding::write_vu32(&mut producers, 1);
//! encoding::write_name(&mut producers, "clang");
//! encoding::write_name(&mut producers, "14.0");
//! encoding::write_custom_section(&mut bytes, "producers", &producers);
//!
//! let module = parser::decode_bytes(&bytes).unwrap();
//! assert_eq!(module.producers[0].values[0].version, "14.0");
//! ```
//!
//! # Specification
//!
//! Follows the binary format of the [WebAssembly core
//! specification](https://webassembly.github.io/spec/core/binary/index.html)
//! and the tool conventions for the
//! [producers](https://github.com/WebAssembly/tool-conventions/blob/main/ProducersSection.md)
//! and `target_features` custom sections.

pub mod parser;

pub use parser::{decode, decode_bytes, DecodeError, DecoderConfig, Module};
