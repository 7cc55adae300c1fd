//! The flat byte container the model format reads and writes.

use crate::error::{HullError, Result};

/// An append-only byte buffer with a separate read cursor.
///
/// Every multi-byte value is little-endian. Reads past the end of the
/// data fail with [`HullError::CorruptModel`] carrying the offset of the
/// failed read. Where the bytes come from or go to is the caller's
/// business; the kernel only defines the record layout on top of this.
#[derive(Debug, Clone, Default)]
pub struct ModelBuffer {
    bytes: Vec<u8>,
    cursor: usize,
}

impl ModelBuffer {
    /// Empty buffer, ready for writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing bytes, cursor at the start.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        ModelBuffer { bytes, cursor: 0 }
    }

    /// Everything written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the bytes out of the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total byte count, independent of the read cursor.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current read offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Move the read cursor back to the start.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.put_u8(value as u8);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed UTF-8 string.
    pub fn put_string(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
    }

    fn take(&mut self, count: usize, what: &'static str) -> Result<&[u8]> {
        let start = self.cursor;
        if start + count > self.bytes.len() {
            return Err(HullError::CorruptModel {
                offset: start,
                what,
            });
        }
        self.cursor = start + count;
        Ok(&self.bytes[start..start + count])
    }

    /// Read one byte; `what` labels the field in the error on underrun.
    pub fn get_u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn get_bool(&mut self, what: &'static str) -> Result<bool> {
        Ok(self.get_u8(what)? != 0)
    }

    pub fn get_u32(&mut self, what: &'static str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_f64(&mut self, what: &'static str) -> Result<f64> {
        let b = self.take(8, what)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn get_string(&mut self, what: &'static str) -> Result<String> {
        let len = self.get_u32(what)? as usize;
        let offset = self.cursor;
        let bytes = self.take(len, what)?.to_vec();
        String::from_utf8(bytes).map_err(|_| HullError::CorruptModel { offset, what })
    }
}
