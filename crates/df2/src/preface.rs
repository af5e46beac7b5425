//! Fixed stream preface.

use std::io::{Read, Write};

use crate::error::{Df2Error, FormatError, Result};

/// `«DF2 10»\r\n\x1A\n`
///
/// The non-ASCII guillemets catch transfers that clear bit 7. The CRLF and
/// trailing LF catch newline rewriting.
pub const PREFACE: [u8; 12] = [
    0xAB, 0x44, 0x46, 0x32, 0x20, 0x31, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

pub fn write_preface<W: Write>(sink: &mut W) -> Result<()> {
    sink.write_all(&PREFACE)?;
    Ok(())
}

/// Reads twelve bytes and checks them against [`PREFACE`].
///
/// A source that ends before twelve bytes is also reported as a bad preface.
pub fn read_preface<R: Read>(source: &mut R) -> Result<()> {
    let mut bytes = [0u8; PREFACE.len()];
    match source.read_exact(&mut bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            tracing::debug!("stream ended inside the preface");
            return Err(FormatError::BadPreface.into());
        }
        Err(e) => return Err(Df2Error::Io(e)),
    }
    if bytes != PREFACE {
        tracing::debug!(found = ?bytes, "preface mismatch");
        return Err(FormatError::BadPreface.into());
    }
    Ok(())
}
