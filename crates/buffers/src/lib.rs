//! Byte-level primitives for the DF2 wire format.
//!
//! - [`Writer`] assembles commands in an auto-growing buffer.
//! - [`Reader`] decodes from any blocking [`std::io::Read`] source.
//!
//! Integers use a little-endian base-128 varint: seven bits per byte, the
//! high bit marks continuation. Signed integers are bit-cast to unsigned
//! before encoding (no zig-zag), floats are written as their raw IEEE-754
//! bits, and strings are UTF-8 followed by a single `0x00`.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::{Writer, DEFAULT_ALLOC_SIZE};

use thiserror::Error;

/// Errors raised while decoding primitives.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("varint for a {bits}-bit integer is too long")]
    VarintTooLong { bits: u32 },
    #[error("varint for a {bits}-bit integer overflows its terminal byte")]
    VarintOverflow { bits: u32 },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

impl BufferError {
    /// `true` for malformed bytes, `false` for failures of the source itself.
    pub fn is_format(&self) -> bool {
        !matches!(self, BufferError::Io(_))
    }
}
