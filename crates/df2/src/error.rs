use df2_buffers::BufferError;
use df2_path::PathError;
use thiserror::Error;

use crate::kind::Kind;

/// Malformed bytes on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("stream does not start with the DF2 preface")]
    BadPreface,
    #[error("varint for a {bits}-bit integer is too long")]
    VarintTooLong { bits: u32 },
    #[error("varint for a {bits}-bit integer overflows its terminal byte")]
    VarintOverflow { bits: u32 },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("unknown command byte 0x{0:02x}")]
    UnknownCommand(u8),
    #[error("unknown kind byte 0x{0:02x}")]
    UnknownKind(u8),
    #[error("kind {0} cannot be used as a value kind")]
    UnexpectedKind(Kind),
    #[error("kind {0} cannot be used as an array element")]
    InvalidElementKind(Kind),
    #[error("kind {0} cannot be used as a list element")]
    InvalidListElement(Kind),
    #[error("decoded integer does not fit kind {0}")]
    IntegerOutOfRange(Kind),
    #[error("lists nest deeper than {max} levels")]
    ListTooDeep { max: usize },
}

#[derive(Debug, Error)]
pub enum Df2Error {
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("path conflict: {0:?} runs through a value")]
    PathConflict(String),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Df2Error> = std::result::Result<T, E>;

impl From<BufferError> for Df2Error {
    fn from(e: BufferError) -> Self {
        match e {
            BufferError::Io(e) => Df2Error::Io(e),
            BufferError::VarintTooLong { bits } => FormatError::VarintTooLong { bits }.into(),
            BufferError::VarintOverflow { bits } => FormatError::VarintOverflow { bits }.into(),
            BufferError::InvalidUtf8 => FormatError::InvalidUtf8.into(),
        }
    }
}

impl From<PathError> for Df2Error {
    fn from(e: PathError) -> Self {
        Df2Error::Argument(e.to_string())
    }
}

impl Df2Error {
    /// `true` when the error came from malformed stream content.
    pub fn is_format(&self) -> bool {
        matches!(self, Df2Error::Format(_))
    }
}
