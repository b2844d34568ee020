extern crate byteorder;

use self::byteorder::{BigEndian, ByteOrder};
use log::trace;
use std::io::{self, Read};

use super::config::Utf8Policy;
use super::error::DecodeError;

/// Upper bound on how much is reserved ahead of a bulk read; the declared
/// length comes from the input and is not trusted for allocation.
const PREALLOC_LIMIT: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy)]
struct Frame {
    start: u64,
    size: u64,
}

/// Forward-only reader over a single byte source, with a stack of nested
/// frames. Every read is checked against the innermost frame's budget, so a
/// decoder working inside a section can never run past its declared end.
pub struct Reader<R> {
    inner: R,
    pos: u64,
    frames: Vec<Frame>,
    utf8: Utf8Policy,
}

impl<R: Read> Reader<R> {
    /// A reader whose outermost frame is unbounded; the end of the input is
    /// only discovered when the source runs dry.
    pub fn new(inner: R) -> Reader<R> {
        Reader::with_len(inner, u64::MAX)
    }

    /// A reader whose outermost frame is exactly `len` bytes.
    pub fn with_len(inner: R, len: u64) -> Reader<R> {
        Reader {
            inner,
            pos: 0,
            frames: vec![Frame {
                start: 0,
                size: len,
            }],
            utf8: Utf8Policy::Strict,
        }
    }

    pub fn set_utf8_policy(&mut self, policy: Utf8Policy) {
        self.utf8 = policy;
    }
}

impl<'a> Reader<&'a [u8]> {
    pub fn from_bytes(bytes: &'a [u8]) -> Reader<&'a [u8]> {
        Reader::with_len(bytes, bytes.len() as u64)
    }
}

impl<R: Read> Reader<R> {
    // Frames ------------------------------------------------------------------

    /// Absolute offset of the next byte to be read.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Number of frames on the stack, 1 when no sub-region is active.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bytes left in the innermost frame.
    pub fn remaining(&self) -> u64 {
        match self.frames.last() {
            Some(frame) => frame.size.saturating_sub(self.pos - frame.start),
            None => 0,
        }
    }

    /// Runs `f` inside a new frame of `size` bytes starting at the current
    /// position. The frame is popped again whatever `f` returns.
    ///
    /// A frame never extends past its parent: a `size` larger than
    /// `remaining()` fails with `Truncated` at the parent's end and `f` is not
    /// run. Callers that want a more specific error check first.
    pub fn with_frame<T, F>(&mut self, size: u64, f: F) -> Result<T, DecodeError>
    where
        F: FnOnce(&mut Self) -> Result<T, DecodeError>,
    {
        let available = self.remaining();
        if size > available {
            return Err(DecodeError::Truncated {
                offset: self.pos.saturating_add(available),
            });
        }
        let depth = self.frames.len();
        self.enter(size);
        let result = f(self);
        self.exit_to(depth);
        result
    }

    /// Fails with `SizeMismatch` unless the innermost frame is used up.
    pub fn expect_end<F>(&self, context: F) -> Result<(), DecodeError>
    where
        F: FnOnce() -> String,
    {
        let remaining = self.remaining();
        if remaining != 0 {
            return Err(DecodeError::SizeMismatch {
                context: context(),
                offset: self.pos.saturating_add(remaining),
                remaining,
            });
        }
        Ok(())
    }

    fn enter(&mut self, size: u64) {
        trace!(
            "enter frame depth={} start={:#x} size={}",
            self.frames.len() + 1,
            self.pos,
            size
        );
        self.frames.push(Frame {
            start: self.pos,
            size,
        });
    }

    fn exit_to(&mut self, depth: usize) {
        // the outermost frame belongs to the reader itself
        debug_assert!(depth >= 1 && depth < self.frames.len());
        self.frames.truncate(depth);
        trace!("exit frame depth={} pos={:#x}", depth, self.pos);
    }

    // Basic operations --------------------------------------------------------

    /// Reads one byte, or `None` when the innermost frame is exhausted or
    /// the source has reached end of input.
    pub fn try_read_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.pos += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        match self.try_read_byte()? {
            Some(byte) => Ok(byte),
            None => Err(DecodeError::Truncated { offset: self.pos }),
        }
    }

    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>, DecodeError> {
        let available = self.remaining();
        if len > available {
            return Err(DecodeError::Truncated {
                offset: self.pos.saturating_add(available),
            });
        }
        let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT) as usize);
        let read = self.inner.by_ref().take(len).read_to_end(&mut buf)? as u64;
        self.pos += read;
        if read < len {
            return Err(DecodeError::Truncated { offset: self.pos });
        }
        Ok(buf)
    }

    /// Reads whatever is left of the innermost frame. Only meaningful inside
    /// a bounded frame.
    pub fn read_rest(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.remaining();
        self.read_bytes(len)
    }

    pub fn skip(&mut self, len: u64) -> Result<(), DecodeError> {
        let available = self.remaining();
        if len > available {
            return Err(DecodeError::Truncated {
                offset: self.pos.saturating_add(available),
            });
        }
        let skipped = io::copy(&mut self.inner.by_ref().take(len), &mut io::sink())?;
        self.pos += skipped;
        if skipped < len {
            return Err(DecodeError::Truncated { offset: self.pos });
        }
        Ok(())
    }

    // Read and interpret types ------------------------------------------------

    /// Big-endian u32, only used for the header fields.
    pub fn read_msb32(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        for byte in buf.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(BigEndian::read_u32(&buf))
    }

    pub fn read_vu32(&mut self) -> Result<u32, DecodeError> {
        let start = self.pos;
        read_vu32(&mut || self.read_byte(), start)
    }

    /// Length-prefixed name. The length is checked against the innermost
    /// frame before any byte of the name is read.
    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = self.read_vu32()?;
        let available = self.remaining();
        if u64::from(len) > available {
            return Err(DecodeError::TruncatedName {
                offset: self.pos,
                len,
                available,
            });
        }
        let start = self.pos;
        let bytes = self.read_bytes(u64::from(len))?;
        match self.utf8 {
            Utf8Policy::Strict => String::from_utf8(bytes).map_err(|source| {
                DecodeError::InvalidUtf8 {
                    offset: start,
                    source,
                }
            }),
            Utf8Policy::Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

/// Unsigned LEB128 u32, pulling bytes from `next`. `start` is the offset of
/// the first byte and is only used for error reporting.
///
/// At most five bytes are consumed. The fifth carries the top four bits of
/// the value, so its bits 4..6 must be clear and it must end the sequence.
pub fn read_vu32<F>(next: &mut F, start: u64) -> Result<u32, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let mut result: u32 = 0;

    for i in 0..5 {
        let b = next()?;
        let bits = b & 0b0111_1111;
        if i == 4 && (bits & 0b0111_0000) != 0 {
            return Err(DecodeError::MalformedVarint {
                offset: start,
                reason: "integer too large",
            });
        }
        result |= u32::from(bits) << (i * 7);
        if (b & 0b1000_0000) == 0 {
            return Ok(result);
        }
    }

    Err(DecodeError::MalformedVarint {
        offset: start,
        reason: "integer representation too long",
    })
}

#[cfg(test)]
fn reader(v: &[u8]) -> Reader<&[u8]> {
    Reader::from_bytes(v)
}

#[test]
fn test_read_byte() {
    let mut r = reader(&[0b00000000, 0b10000001, 0b11111111]);
    assert_eq!(r.read_byte().unwrap(), 0);
    assert_eq!(r.read_byte().unwrap(), 129);
    assert_eq!(r.read_byte().unwrap(), 255);
    assert_eq!(r.pos(), 3);
    assert!(matches!(
        r.read_byte(),
        Err(DecodeError::Truncated { offset: 3 })
    ));
    assert_eq!(r.try_read_byte().unwrap(), None);
}

#[test]
fn test_read_byte_unsized_source() {
    // no declared length, end of input comes from the source itself
    let mut r = Reader::new(&[7u8][..]);
    assert_eq!(r.remaining(), u64::MAX);
    assert_eq!(r.try_read_byte().unwrap(), Some(7));
    assert_eq!(r.try_read_byte().unwrap(), None);
    assert!(matches!(
        r.read_byte(),
        Err(DecodeError::Truncated { offset: 1 })
    ));
}

#[test]
fn test_read_msb32() {
    let read = |v: Vec<u8>| -> u32 {
        let mut r = reader(&v);
        r.read_msb32().expect("Failed to read msb32")
    };

    assert_eq!(read(vec![0x00, 0x61, 0x73, 0x6d]), 0x0061736d);
    assert_eq!(read(vec![0x01, 0x00, 0x00, 0x00]), 0x01000000);
    assert_eq!(read(vec![0x00, 0x00, 0x00, 0x01]), 1);
    assert_eq!(read(vec![0xff, 0xff, 0xff, 0xff]), 4294967295);
    assert_eq!(read(vec![0x00, 0x00, 0x01, 0x00]), 256);

    let mut r = reader(&[0x00, 0x61, 0x73]);
    assert!(matches!(
        r.read_msb32(),
        Err(DecodeError::Truncated { offset: 3 })
    ));
}

#[test]
fn test_read_vu32() {
    let read = |v: Vec<u8>| {
        let mut r = reader(&v);
        r.read_vu32().expect("Failed to read vu32")
    };

    assert_eq!(read(vec![0]), 0);
    assert_eq!(read(vec![1]), 1);
    assert_eq!(read(vec![0b11100101, 0b10001110, 0b00100110]), 624485);
    assert_eq!(read(vec![0x7f]), 127);
    assert_eq!(read(vec![0x80, 0x7f]), 16256);
    assert_eq!(read(vec![0xb4, 0x07]), 0x3b4);
    assert_eq!(read(vec![0x8c, 0x08]), 0x40c);
    assert_eq!(read(vec![0xff, 0xff, 0xff, 0xff, 0xf]), 0xffffffff);
    assert_eq!(read(vec![128, 128, 128, 128, 8]), 0x80000000);
    // non-minimal but in range
    assert_eq!(read(vec![0x80, 0x80, 0x80, 0x80, 0x00]), 0);
    assert_eq!(read(vec![0x81, 0x00]), 1);
}

#[test]
fn test_read_vu32_too_large() {
    use rand::Rng;

    for high in [0x10u8, 0x20, 0x40, 0x70, 0x1f, 0x7f].iter() {
        let bytes = [0xff, 0xff, 0xff, 0xff, *high];
        let mut r = reader(&bytes);
        match r.read_vu32() {
            Err(DecodeError::MalformedVarint { offset, reason }) => {
                assert_eq!(offset, 0);
                assert_eq!(reason, "integer too large");
            }
            other => panic!("expected MalformedVarint, got {:?}", other),
        }
    }

    // the first four bytes do not matter as long as they continue
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let mut v: Vec<u8> = (0..4).map(|_| rng.gen::<u8>() | 0x80).collect();
        v.push((rng.gen_range(1u8..8) << 4) | rng.gen_range(0u8..16));
        let mut r = reader(&v);
        assert!(
            matches!(r.read_vu32(), Err(DecodeError::MalformedVarint { .. })),
            "accepted {:?}",
            v
        );
    }
}

#[test]
fn test_read_vu32_too_long() {
    let mut r = reader(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]);
    match r.read_vu32() {
        Err(DecodeError::MalformedVarint { offset, reason }) => {
            assert_eq!(offset, 0);
            assert_eq!(reason, "integer representation too long");
        }
        other => panic!("expected MalformedVarint, got {:?}", other),
    }
    // a sixth byte is never consumed
    assert_eq!(r.pos(), 5);

    let mut r = reader(&[0xff, 0xff, 0xff, 0xff, 0x8f, 0x01]);
    assert!(matches!(
        r.read_vu32(),
        Err(DecodeError::MalformedVarint { .. })
    ));
    assert_eq!(r.pos(), 5);
}

#[test]
fn test_read_vu32_truncated() {
    let mut r = reader(&[0x80, 0x80]);
    assert!(matches!(
        r.read_vu32(),
        Err(DecodeError::Truncated { offset: 2 })
    ));
}

#[test]
fn test_read_name() {
    let mut r = reader(&[4, b'n', b'a', b'm', b'e', 0]);
    assert_eq!(r.read_name().unwrap(), "name");
    assert_eq!(r.read_name().unwrap(), "");
    assert_eq!(r.remaining(), 0);

    let mut r = reader(&[3, 0xe2, 0x82, 0xac]);
    assert_eq!(r.read_name().unwrap(), "\u{20ac}");
}

#[test]
fn test_read_name_truncated() {
    let mut r = reader(&[10, b'a', b'b']);
    match r.read_name() {
        Err(DecodeError::TruncatedName {
            offset,
            len,
            available,
        }) => {
            assert_eq!(offset, 1);
            assert_eq!(len, 10);
            assert_eq!(available, 2);
        }
        other => panic!("expected TruncatedName, got {:?}", other),
    }
    // the length check happens before any name byte is consumed
    assert_eq!(r.pos(), 1);
}

#[test]
fn test_read_name_invalid_utf8() {
    let bytes = [3, b'a', 0xff, b'b'];

    let mut r = reader(&bytes);
    assert!(matches!(
        r.read_name(),
        Err(DecodeError::InvalidUtf8 { offset: 1, .. })
    ));

    let mut r = reader(&bytes);
    r.set_utf8_policy(Utf8Policy::Lossy);
    assert_eq!(r.read_name().unwrap(), "a\u{fffd}b");
}

#[test]
fn test_frame_bounds_reads() {
    let mut r = reader(&[1, 2, 3, 4, 5]);
    assert_eq!(r.depth(), 1);
    let inner = r
        .with_frame(2, |r| {
            assert_eq!(r.depth(), 2);
            assert_eq!(r.remaining(), 2);
            let a = r.read_byte()?;
            let b = r.read_byte()?;
            assert_eq!(r.try_read_byte()?, None);
            assert!(matches!(
                r.read_byte(),
                Err(DecodeError::Truncated { offset: 2 })
            ));
            Ok((a, b))
        })
        .unwrap();
    assert_eq!(inner, (1, 2));
    assert_eq!(r.depth(), 1);
    assert_eq!(r.remaining(), 3);
    assert_eq!(r.read_byte().unwrap(), 3);
}

#[test]
fn test_frame_nested_and_unwound_on_error() {
    let mut r = reader(&[9, 9, 9, 9, 9, 9]);
    let result: Result<(), DecodeError> = r.with_frame(4, |r| {
        r.read_byte()?;
        r.with_frame(2, |r| {
            assert_eq!(r.depth(), 3);
            r.read_bytes(3).map(|_| ())
        })
    });
    assert!(matches!(result, Err(DecodeError::Truncated { offset: 3 })));
    assert_eq!(r.depth(), 1);
}

#[test]
fn test_frame_name_check_uses_innermost_frame() {
    // the underlying data has enough bytes, the frame does not
    let mut r = reader(&[5, b'h', b'e', b'l', b'l', b'o']);
    let result = r.with_frame(3, |r| r.read_name());
    assert!(matches!(
        result,
        Err(DecodeError::TruncatedName {
            len: 5,
            available: 2,
            ..
        })
    ));
}

#[test]
fn test_frame_cannot_outgrow_parent() {
    let mut r = reader(&[1, 2, 3, 4, 5, 6]);
    let result = r.with_frame(2, |r| {
        r.with_frame(5, |_r| -> Result<Vec<u8>, DecodeError> {
            panic!("oversized frame was entered");
        })
    });
    assert!(matches!(result, Err(DecodeError::Truncated { offset: 2 })));
    assert_eq!(r.depth(), 1);
    assert_eq!(r.pos(), 0);

    // exactly the parent's remaining bytes is fine
    let inner = r.with_frame(2, |r| r.with_frame(2, |r| r.read_rest())).unwrap();
    assert_eq!(inner, vec![1, 2]);

    // the outermost frame bounds a sized reader too
    assert!(matches!(
        r.with_frame(5, |r| r.read_rest()),
        Err(DecodeError::Truncated { offset: 6 })
    ));
    assert_eq!(r.read_bytes(4).unwrap(), vec![3, 4, 5, 6]);
}

#[cfg(test)]
struct FlakySource {
    data: Vec<u8>,
    pos: usize,
    interruptions: usize,
    fail_at: Option<usize>,
}

#[cfg(test)]
impl Read for FlakySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.interruptions > 0 {
            self.interruptions -= 1;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"));
        }
        if self.fail_at == Some(self.pos) {
            return Err(io::Error::new(io::ErrorKind::Other, "device error"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[test]
fn test_read_byte_retries_interrupted() {
    let mut r = Reader::new(FlakySource {
        data: vec![0x2a, 0x2b],
        pos: 0,
        interruptions: 3,
        fail_at: None,
    });
    assert_eq!(r.read_byte().unwrap(), 0x2a);
    assert_eq!(r.read_byte().unwrap(), 0x2b);
    assert_eq!(r.try_read_byte().unwrap(), None);
    assert_eq!(r.pos(), 2);
}

#[test]
fn test_read_byte_io_error() {
    let mut r = Reader::new(FlakySource {
        data: vec![0x2a, 0x2b],
        pos: 0,
        interruptions: 0,
        fail_at: Some(1),
    });
    assert_eq!(r.read_byte().unwrap(), 0x2a);
    match r.read_byte() {
        Err(DecodeError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::Other),
        other => panic!("expected Io, got {:?}", other),
    }
    // a failed read does not advance the position
    assert_eq!(r.pos(), 1);
}

#[test]
fn test_read_rest_and_skip() {
    let mut r = reader(&[1, 2, 3, 4, 5, 6]);
    r.skip(1).unwrap();
    let rest = r.with_frame(3, |r| r.read_rest()).unwrap();
    assert_eq!(rest, vec![2, 3, 4]);
    assert_eq!(r.pos(), 4);
    assert!(matches!(
        r.skip(3),
        Err(DecodeError::Truncated { offset: 6 })
    ));
    r.skip(2).unwrap();
    assert_eq!(r.remaining(), 0);
}

#[test]
fn test_expect_end() {
    let mut r = reader(&[1, 2, 3]);
    let result = r.with_frame(3, |r| {
        r.read_byte()?;
        r.expect_end(|| "record".to_string())
    });
    match result {
        Err(DecodeError::SizeMismatch {
            context,
            offset,
            remaining,
        }) => {
            assert_eq!(context, "record");
            assert_eq!(offset, 3);
            assert_eq!(remaining, 2);
        }
        other => panic!("expected SizeMismatch, got {:?}", other),
    }
    assert_eq!(r.pos(), 1);
    r.skip(2).unwrap();
    r.expect_end(|| unreachable!()).unwrap();
}

#[test]
fn test_read_bytes_short_source() {
    // declared length larger than what the source really holds
    let mut r = Reader::with_len(&[1u8, 2][..], 10);
    assert!(matches!(
        r.read_bytes(4),
        Err(DecodeError::Truncated { offset: 2 })
    ));
}
