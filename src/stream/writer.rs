//! Stream writer - appends primitive fields to a growable buffer.

use bytes::{BufMut, Bytes, BytesMut};

use super::NULL_LENGTH;

/// Forward-only writer for primitive fields.
///
/// Writes never fail; the buffer grows as needed.
#[derive(Debug, Default)]
pub struct StreamWriter {
    buf: BytesMut,
}

impl StreamWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Create a writer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    /// Write a length-prefixed UTF-16BE string.
    ///
    /// The encoded length must stay below 4 GiB (`NULL_LENGTH`); larger
    /// strings panic in debug builds.
    pub fn write_string(&mut self, value: &str) {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.buf.reserve(4 + units.len() * 2);
        self.buf.put_u32(length_prefix(units.len() * 2));
        for unit in units {
            self.buf.put_u16(unit);
        }
    }

    /// Write a length-prefixed byte array.
    ///
    /// Same length limit as [`write_string`](Self::write_string).
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buf.reserve(4 + value.len());
        self.buf.put_u32(length_prefix(value.len()));
        self.buf.put_slice(value);
    }

    /// Write bytes verbatim, without a length prefix.
    #[inline]
    pub fn write_raw(&mut self, value: &[u8]) {
        self.buf.put_slice(value);
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append everything written to `other` onto this writer.
    pub fn append(&mut self, other: StreamWriter) {
        self.buf.unsplit(other.buf);
    }

    /// Freeze the written bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Length field for a variable-size value. `NULL_LENGTH` is reserved.
fn length_prefix(len: usize) -> u32 {
    debug_assert!(
        len < NULL_LENGTH as usize,
        "length {} does not fit a u32 length prefix",
        len
    );
    len as u32
}
