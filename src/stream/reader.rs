//! Stream reader - consumes primitive fields from a byte cursor.

use bytes::Buf;

use super::NULL_LENGTH;
use crate::error::{MarshalError, Result};

/// Forward-only cursor over a borrowed byte slice.
///
/// Every read checks the remaining length first and fails with
/// [`MarshalError::StreamUnderflow`] instead of panicking.
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    cursor: &'a [u8],
    total: usize,
}

impl<'a> StreamReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: buf,
            total: buf.len(),
        }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.total - self.cursor.remaining()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        if self.cursor.remaining() < needed {
            return Err(MarshalError::StreamUnderflow {
                needed,
                remaining: self.cursor.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.cursor.get_i32())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.get_u32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.cursor.get_i64())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.cursor.get_u64())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.cursor.get_f64())
    }

    /// Read a length-prefixed UTF-16BE string. Null strings decode as empty.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        if len == NULL_LENGTH {
            return Ok(String::new());
        }
        let len = len as usize;
        if len % 2 != 0 {
            return Err(MarshalError::InvalidString(format!(
                "odd UTF-16 byte length {}",
                len
            )));
        }

        let raw = self.read_raw(len)?;
        let units = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|e| MarshalError::InvalidString(e.to_string()))
    }

    /// Read a length-prefixed byte array. Null arrays decode as empty.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()?;
        if len == NULL_LENGTH {
            return Ok(&[]);
        }
        self.read_raw(len as usize)
    }

    /// Read `len` bytes verbatim (zero-copy).
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.cursor.split_at(len);
        self.cursor = tail;
        Ok(head)
    }

    /// Read `count` big-endian u32 values.
    ///
    /// The length is checked before allocating.
    pub fn read_u32_vec(&mut self, count: usize) -> Result<Vec<u32>> {
        let needed = count.checked_mul(4).ok_or(MarshalError::StreamUnderflow {
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        self.ensure(needed)?;
        Ok((0..count).map(|_| self.cursor.get_u32()).collect())
    }
}
