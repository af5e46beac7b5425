//! Binary reader over a blocking byte source with cursor tracking.

use std::io::{self, Read};

use crate::BufferError;

/// A binary reader that pulls bytes from any [`Read`] source.
///
/// The reader keeps a running count of consumed bytes in `x`, which callers
/// use to report where in a stream a decode failed. Every read method
/// blocks until its bytes are available and fails with
/// [`BufferError::Io`] if the source ends early.
///
/// The reader does no buffering of its own: every primitive is one or more
/// `read` calls on the source, and the source's position always matches
/// `x`. Wrap files and sockets in a [`std::io::BufReader`].
///
/// # Example
///
/// ```
/// use df2_buffers::Reader;
///
/// let data = [0x01, 0xAC, 0x02, b'h', b'i', 0x00];
/// let mut reader = Reader::new(&data[..]);
///
/// assert_eq!(reader.u8().unwrap(), 0x01);
/// assert_eq!(reader.vu32().unwrap(), 300);
/// assert_eq!(reader.str0().unwrap(), "hi");
/// assert_eq!(reader.x, 6);
/// ```
pub struct Reader<R> {
    inner: R,
    /// Number of bytes consumed so far.
    pub x: usize,
}

impl<R: Read> Reader<R> {
    /// Creates a new reader for the given source.
    pub fn new(inner: R) -> Self {
        Self { inner, x: 0 }
    }

    /// Creates a reader whose cursor starts at `x` instead of zero.
    pub fn with_offset(inner: R, x: usize) -> Self {
        Self { inner, x }
    }

    /// Returns the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads exactly `out.len()` bytes.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<(), BufferError> {
        self.inner.read_exact(out)?;
        self.x += out.len();
        Ok(())
    }

    /// Reads one byte, or returns `None` if the source is exhausted.
    ///
    /// This is the only read that treats end-of-input as a normal outcome;
    /// it is used at command boundaries.
    pub fn try_u8(&mut self) -> Result<Option<u8>, BufferError> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.x += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self) -> Result<u8, BufferError> {
        let mut byte = [0u8; 1];
        self.fill(&mut byte)?;
        Ok(byte[0])
    }

    /// Reads a signed 8-bit integer from its raw byte.
    #[inline]
    pub fn i8(&mut self) -> Result<i8, BufferError> {
        Ok(self.u8()? as i8)
    }

    /// Reads a 32-bit IEEE-754 float (little-endian bit pattern).
    pub fn f32(&mut self) -> Result<f32, BufferError> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes)?;
        Ok(f32::from_bits(u32::from_le_bytes(bytes)))
    }

    /// Reads a 64-bit IEEE-754 float (little-endian bit pattern).
    pub fn f64(&mut self) -> Result<f64, BufferError> {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes)?;
        Ok(f64::from_bits(u64::from_le_bytes(bytes)))
    }

    /// Reads an unsigned 32-bit varint.
    pub fn vu32(&mut self) -> Result<u32, BufferError> {
        // `varint(32)` never yields more than 32 significant bits.
        Ok(self.varint(32)? as u32)
    }

    /// Reads an unsigned 64-bit varint.
    pub fn vu64(&mut self) -> Result<u64, BufferError> {
        self.varint(64)
    }

    /// Reads a signed 32-bit integer written with [`crate::Writer::vi32`].
    pub fn vi32(&mut self) -> Result<i32, BufferError> {
        Ok(self.vu32()? as i32)
    }

    /// Reads a signed 64-bit integer written with [`crate::Writer::vi64`].
    pub fn vi64(&mut self) -> Result<i64, BufferError> {
        Ok(self.vu64()? as i64)
    }

    fn varint(&mut self, bits: u32) -> Result<u64, BufferError> {
        let max_bytes = bits.div_ceil(7);
        let mut result = 0u64;
        for i in 0..max_bytes {
            let byte = self.u8()?;
            let shift = 7 * i;
            let chunk = (byte & 0x7f) as u64;
            if i == max_bytes - 1 {
                if byte & 0x80 != 0 {
                    return Err(BufferError::VarintTooLong { bits });
                }
                if chunk >> (bits - shift) != 0 {
                    return Err(BufferError::VarintOverflow { bits });
                }
            }
            result |= chunk << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(BufferError::VarintTooLong { bits })
    }

    /// Reads `size` bytes into a new vector.
    pub fn buf(&mut self, size: usize) -> Result<Vec<u8>, BufferError> {
        let mut out = vec![0u8; size];
        self.fill(&mut out)?;
        Ok(out)
    }

    /// Reads a UTF-8 string up to (and consuming) its `0x00` terminator.
    pub fn str0(&mut self) -> Result<String, BufferError> {
        let mut bytes = Vec::new();
        loop {
            match self.u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        String::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }
}
