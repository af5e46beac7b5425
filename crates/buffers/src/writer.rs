//! Binary buffer writer with auto-growing capacity.

/// A binary buffer writer that grows automatically as needed.
///
/// Commands are assembled in the buffer and handed to the sink in one piece
/// with [`Writer::flush_slice`], so a sink never observes half a command.
///
/// # Example
///
/// ```
/// use df2_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.vu32(300);
/// let data = writer.flush();
/// assert_eq!(data, [0x01, 0xAC, 0x02]);
/// ```
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Position where last flush happened.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
}

/// Growth step used by [`Writer::new`].
pub const DEFAULT_ALLOC_SIZE: usize = 4 * 1024;

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("capacity", &self.uint8.len())
            .field("x0", &self.x0)
            .field("x", &self.x)
            .finish()
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with the default allocation size (4KB).
    pub fn new() -> Self {
        Self::with_alloc_size(DEFAULT_ALLOC_SIZE)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let alloc_size = alloc_size.max(16);
        Self {
            uint8: vec![0u8; alloc_size],
            x0: 0,
            x: 0,
            alloc_size,
        }
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let remaining = self.uint8.len() - self.x;
        if remaining < capacity {
            let total = self.uint8.len() - self.x0;
            let required = capacity - remaining;
            let total_required = total + required;
            let new_size = if total_required <= self.alloc_size {
                self.alloc_size
            } else {
                total_required * 2
            };
            self.grow(new_size);
        }
    }

    fn grow(&mut self, new_size: usize) {
        let x0 = self.x0;
        let x = self.x;
        let mut new_buf = vec![0u8; new_size];
        new_buf[..x - x0].copy_from_slice(&self.uint8[x0..x]);
        self.uint8 = new_buf;
        self.x = x - x0;
        self.x0 = 0;
    }

    /// Number of bytes written since the last flush.
    pub fn pending(&self) -> usize {
        self.x - self.x0
    }

    /// Drops everything written since the last flush.
    pub fn discard(&mut self) {
        self.x = self.x0;
    }

    /// Returns the written data and advances the flush position.
    pub fn flush(&mut self) -> Vec<u8> {
        self.flush_slice().to_vec()
    }

    /// Returns a view of the written data and advances the flush position.
    ///
    /// Once everything has been flushed the cursors rewind to the start of
    /// the buffer so a long-lived writer does not keep growing.
    pub fn flush_slice(&mut self) -> &[u8] {
        let (x0, x) = (self.x0, self.x);
        self.x0 = 0;
        self.x = 0;
        &self.uint8[x0..x]
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    /// Writes a signed 8-bit integer as its raw byte.
    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.u8(val as u8);
    }

    /// Writes a 32-bit IEEE-754 float (little-endian bit pattern).
    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.ensure_capacity(4);
        self.uint8[self.x..self.x + 4].copy_from_slice(&val.to_bits().to_le_bytes());
        self.x += 4;
    }

    /// Writes a 64-bit IEEE-754 float (little-endian bit pattern).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.ensure_capacity(8);
        self.uint8[self.x..self.x + 8].copy_from_slice(&val.to_bits().to_le_bytes());
        self.x += 8;
    }

    /// Writes an unsigned 32-bit varint (1 to 5 bytes).
    #[inline]
    pub fn vu32(&mut self, val: u32) {
        self.vu64(val as u64);
    }

    /// Writes an unsigned 64-bit varint (1 to 10 bytes).
    ///
    /// Seven bits per byte, low-order group first, high bit set on every
    /// byte except the last.
    pub fn vu64(&mut self, mut val: u64) {
        self.ensure_capacity(10);
        while val >= 0x80 {
            self.uint8[self.x] = (val as u8) | 0x80;
            self.x += 1;
            val >>= 7;
        }
        self.uint8[self.x] = val as u8;
        self.x += 1;
    }

    /// Writes a signed 32-bit integer through the unsigned varint.
    ///
    /// The two's-complement pattern is reinterpreted as unsigned, so every
    /// negative number takes the full five bytes.
    #[inline]
    pub fn vi32(&mut self, val: i32) {
        self.vu32(val as u32);
    }

    /// Writes a signed 64-bit integer through the unsigned varint.
    #[inline]
    pub fn vi64(&mut self, val: i64) {
        self.vu64(val as u64);
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Writes a UTF-8 string followed by a single `0x00` terminator.
    ///
    /// The caller is responsible for rejecting strings with embedded NUL
    /// bytes; they cannot be told apart from the terminator on the way back.
    pub fn str0(&mut self, s: &str) {
        self.buf(s.as_bytes());
        self.u8(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        let mut w = Writer::new();
        w.vu32(0);
        assert_eq!(w.flush(), [0x00]);
        w.vu32(0x7f);
        assert_eq!(w.flush(), [0x7f]);
        w.vu32(0x80);
        assert_eq!(w.flush(), [0x80, 0x01]);
        w.vu32(u32::MAX);
        assert_eq!(w.flush(), [0xff, 0xff, 0xff, 0xff, 0x0f]);
        w.vu64(u64::MAX);
        assert_eq!(w.flush().len(), 10);
    }

    #[test]
    fn negative_ints_take_full_width() {
        let mut w = Writer::new();
        w.vi32(-1);
        assert_eq!(w.flush(), [0xff, 0xff, 0xff, 0xff, 0x0f]);
        w.vi64(-1);
        let bytes = w.flush();
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[9], 0x01);
    }

    #[test]
    fn floats_keep_bit_pattern() {
        let mut w = Writer::new();
        w.f32(f32::NAN);
        assert_eq!(w.flush(), f32::NAN.to_bits().to_le_bytes());
        w.f64(f64::NEG_INFINITY);
        assert_eq!(w.flush(), f64::NEG_INFINITY.to_bits().to_le_bytes());
    }

    #[test]
    fn str0_appends_terminator() {
        let mut w = Writer::new();
        w.str0("DF2");
        assert_eq!(w.flush(), b"DF2\0");
        w.str0("");
        assert_eq!(w.flush(), [0]);
    }

    #[test]
    fn grows_past_alloc_size() {
        let mut w = Writer::with_alloc_size(16);
        let data = vec![7u8; 100];
        w.u8(1);
        w.buf(&data);
        assert_eq!(w.pending(), 101);
        let out = w.flush();
        assert_eq!(out[0], 1);
        assert_eq!(&out[1..], &data[..]);
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn discard_drops_pending_bytes() {
        let mut w = Writer::new();
        w.u8(1);
        w.discard();
        w.u8(2);
        assert_eq!(w.flush(), [2]);
    }
}
