//! Binary format decoder.
//!
//! [`Decoder`] checks the module header, then walks the sections: each one is
//! read inside a frame of exactly its declared size. Custom sections go to the
//! interpreters in [`custom`]; every other known section is kept verbatim as
//! [`module::Section::Opaque`].

pub mod config;
pub mod custom;
pub mod encoding;
pub mod error;
pub mod limits;
pub mod module;
pub mod reader;

pub use self::config::{DecoderConfig, SectionPolicy, Utf8Policy};
pub use self::error::DecodeError;
pub use self::module::Module;

use log::{debug, trace, warn};
use std::convert::TryFrom;
use std::io::{BufReader, Read};

use self::custom::CustomSectionKind;
use self::module::{Section, SectionId};
use self::reader::Reader;

/// Decodes a module from a byte stream with the default configuration.
///
/// The stream's length is not known in advance, so a section whose declared
/// size runs past the end of the input fails with `DecodeError::Truncated`
/// at the offset where the data ran out, not with `MalformedSection`. Use
/// [`decode_bytes`] or [`Decoder::with_len`] when the length is known.
pub fn decode<R: Read>(input: R) -> Result<Module, DecodeError> {
    decode_with_config(input, DecoderConfig::default())
}

/// As [`decode`], with an explicit configuration. Oversized sections are
/// reported as `Truncated` here too.
pub fn decode_with_config<R: Read>(input: R, config: DecoderConfig) -> Result<Module, DecodeError> {
    Decoder::with_config(BufReader::new(input), config).decode()
}

/// Decodes a module held in memory. The input length is known up front, so
/// a section claiming more bytes than the module has left is reported as
/// `MalformedSection` rather than as a truncated read.
pub fn decode_bytes(bytes: &[u8]) -> Result<Module, DecodeError> {
    Decoder::from_bytes(bytes).decode()
}

pub fn decode_bytes_with_config(
    bytes: &[u8],
    config: DecoderConfig,
) -> Result<Module, DecodeError> {
    Decoder::from_bytes_with_config(bytes, config).decode()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    ExpectHeader,
    ExpectSection,
    Done,
    /// A decode step failed; the decoder refuses further work.
    Failed,
}

pub struct Decoder<R> {
    reader: Reader<R>,
    config: DecoderConfig,
    state: State,
    module: Module,
}

impl<R: Read> Decoder<R> {
    pub fn new(input: R) -> Decoder<R> {
        Decoder::with_config(input, DecoderConfig::default())
    }

    pub fn with_config(input: R, config: DecoderConfig) -> Decoder<R> {
        Decoder::from_reader(Reader::new(input), config)
    }

    /// A decoder for a source known to hold exactly `len` bytes.
    pub fn with_len(input: R, len: u64, config: DecoderConfig) -> Decoder<R> {
        Decoder::from_reader(Reader::with_len(input, len), config)
    }

    fn from_reader(mut reader: Reader<R>, config: DecoderConfig) -> Decoder<R> {
        reader.set_utf8_policy(config.utf8);
        Decoder {
            reader,
            config,
            state: State::ExpectHeader,
            module: Module::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Offset of the next unread input byte.
    pub fn pos(&self) -> u64 {
        self.reader.pos()
    }

    /// Frame stack depth; 1 between sections.
    pub fn depth(&self) -> usize {
        self.reader.depth()
    }

    /// Runs the decoder to completion.
    pub fn decode(mut self) -> Result<Module, DecodeError> {
        while self.decode_next_section()? {}
        Ok(self.module)
    }

    /// The decoded module, once the input has been fully consumed.
    pub fn into_module(self) -> Option<Module> {
        match self.state {
            State::Done => Some(self.module),
            _ => None,
        }
    }

    /// Reads and checks the magic number and version. A no-op once the
    /// header has been read.
    pub fn read_header(&mut self) -> Result<(), DecodeError> {
        match self.state {
            State::ExpectHeader => {}
            State::Failed => return Err(DecodeError::DecoderFailed),
            State::ExpectSection | State::Done => return Ok(()),
        }
        let result = self.header();
        self.track(result)
    }

    /// Decodes one section, reading the header first if needed. Returns
    /// `false` once the input is exhausted.
    pub fn decode_next_section(&mut self) -> Result<bool, DecodeError> {
        match self.state {
            State::ExpectHeader => self.read_header()?,
            State::ExpectSection => {}
            State::Done => return Ok(false),
            State::Failed => return Err(DecodeError::DecoderFailed),
        }
        let result = self.next_section();
        let more = self.track(result)?;
        if !more {
            debug!("end of module at offset {:#x}", self.reader.pos());
            self.state = State::Done;
        }
        Ok(more)
    }

    fn track<T>(&mut self, result: Result<T, DecodeError>) -> Result<T, DecodeError> {
        if result.is_err() {
            // partial results are never handed out
            self.state = State::Failed;
            self.module = Module::new();
        }
        result
    }

    fn header(&mut self) -> Result<(), DecodeError> {
        let magic = self.reader.read_msb32()?;
        if magic != encoding::MAGIC {
            return Err(DecodeError::InvalidMagic {
                found: magic,
                expected: encoding::MAGIC,
            });
        }

        // the version field is little-endian on the wire
        let version = self.reader.read_msb32()?.swap_bytes();
        debug!("magic: {:08x} version: {}", magic, version);
        if self.config.require_version_1 && version != encoding::VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: version,
                expected: encoding::VERSION,
            });
        }

        self.module.version = version;
        self.state = State::ExpectSection;
        Ok(())
    }

    fn next_section(&mut self) -> Result<bool, DecodeError> {
        let offset = self.reader.pos();
        let id = match self.reader.try_read_byte()? {
            Some(id) => id,
            None => return Ok(false),
        };
        let size = self.reader.read_vu32()?;

        let available = self.reader.remaining();
        if u64::from(size) > available {
            return Err(DecodeError::MalformedSection {
                id,
                offset: self.reader.pos(),
                size,
                available,
            });
        }

        debug!("section #{} at {:#x}: size={}", id, offset, size);

        let Decoder {
            reader,
            config,
            module,
            ..
        } = self;
        reader.with_frame(u64::from(size), |reader| {
            decode_section(reader, config, module, id, offset)
        })?;
        Ok(true)
    }
}

impl<'a> Decoder<&'a [u8]> {
    pub fn from_bytes(bytes: &'a [u8]) -> Decoder<&'a [u8]> {
        Decoder::from_bytes_with_config(bytes, DecoderConfig::default())
    }

    pub fn from_bytes_with_config(bytes: &'a [u8], config: DecoderConfig) -> Decoder<&'a [u8]> {
        Decoder::from_reader(Reader::from_bytes(bytes), config)
    }
}

/* SECTION READERS ************************************************/

/// Decodes the section that fills the reader's current frame. `offset` is
/// where the section's ID byte was read.
fn decode_section<R: Read>(
    reader: &mut Reader<R>,
    config: &DecoderConfig,
    module: &mut Module,
    id: u8,
    offset: u64,
) -> Result<(), DecodeError> {
    let section_id = match SectionId::try_from(id) {
        Ok(section_id) => section_id,
        Err(id) => {
            return match config.unknown_sections {
                SectionPolicy::Reject => Err(DecodeError::UnknownSection { id, offset }),
                SectionPolicy::Skip => {
                    warn!("skipping unknown section #{} at offset {:#x}", id, offset);
                    let size = reader.remaining();
                    reader.skip(size)
                }
            }
        }
    };

    match section_id {
        SectionId::Custom => read_section_custom(reader, config, module),
        _ => {
            let data = reader.read_rest()?;
            trace!("section {}: {}", section_id, hex::encode(&data));
            module.sections.push(Section::Opaque {
                id: section_id,
                data,
            });
            Ok(())
        }
    }
}

fn read_section_custom<R: Read>(
    reader: &mut Reader<R>,
    config: &DecoderConfig,
    module: &mut Module,
) -> Result<(), DecodeError> {
    let offset = reader.pos();
    let name = reader.read_name()?;

    let kind = match CustomSectionKind::from_name(&name) {
        Some(kind) => kind,
        None => {
            return match config.unknown_custom_sections {
                SectionPolicy::Reject => {
                    Err(DecodeError::UnsupportedCustomSection { name, offset })
                }
                SectionPolicy::Skip => {
                    warn!("skipping custom section \"{}\" at offset {:#x}", name, offset);
                    let size = reader.remaining();
                    reader.skip(size)
                }
            }
        }
    };

    debug!("custom section \"{}\"", kind.as_str());
    custom::decode_custom_section(reader, kind, module)?;
    reader.expect_end(|| format!("custom section \"{}\"", kind.as_str()))
}
