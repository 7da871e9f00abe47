//! Endian-aware binary writer.
//!
//! Encoders in this workspace build their output in memory, leave
//! placeholders for sizes they only know at the end, and back-patch them.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::{Endian, Error, Result};

/// Growable output buffer with byte-order-aware integer writes.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
    endian: Endian,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    /// Create an empty writer with preallocated capacity.
    pub fn with_capacity(capacity: usize, endian: Endian) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            endian,
        }
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Write raw bytes verbatim.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a byte group, reversed when the writer is big-endian.
    ///
    /// Pixel and palette groups are stored as host words on each platform.
    pub fn write_group(&mut self, group: &[u8]) {
        match self.endian {
            Endian::Little => self.buf.extend_from_slice(group),
            Endian::Big => self.buf.extend(group.iter().rev()),
        }
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut b = [0u8; 2];
        match self.endian {
            Endian::Little => LittleEndian::write_u16(&mut b, value),
            Endian::Big => BigEndian::write_u16(&mut b, value),
        }
        self.buf.extend_from_slice(&b);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut b = [0u8; 4];
        match self.endian {
            Endian::Little => LittleEndian::write_u32(&mut b, value),
            Endian::Big => BigEndian::write_u32(&mut b, value),
        }
        self.buf.extend_from_slice(&b);
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    /// Write `count` zero bytes.
    #[inline]
    pub fn write_zeros(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count, 0);
    }

    /// Zero-pad until the position is a multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: usize) {
        let target = crate::align_up(self.buf.len(), alignment);
        self.buf.resize(target, 0);
    }

    /// Overwrite a previously written u32 at `offset`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let len = self.buf.len();
        let slot = self
            .buf
            .get_mut(offset..offset + 4)
            .ok_or(Error::PatchOutOfRange { offset, len })?;
        match self.endian {
            Endian::Little => LittleEndian::write_u32(slot, value),
            Endian::Big => BigEndian::write_u32(slot, value),
        }
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return the written bytes.
    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endian_writes() {
        let mut le = BinaryWriter::new(Endian::Little);
        le.write_u32(0x01020304);
        assert_eq!(le.as_slice(), &[4, 3, 2, 1]);

        let mut be = BinaryWriter::new(Endian::Big);
        be.write_u32(0x01020304);
        be.write_u16(0xABCD);
        assert_eq!(be.as_slice(), &[1, 2, 3, 4, 0xAB, 0xCD]);
    }

    #[test]
    fn test_patch() {
        let mut w = BinaryWriter::new(Endian::Big);
        w.write_u32(0);
        w.write_u32(0);
        w.patch_u32(4, 0x20).unwrap();
        assert_eq!(w.as_slice(), &[0, 0, 0, 0, 0, 0, 0, 0x20]);
        assert!(w.patch_u32(6, 1).is_err());
    }

    #[test]
    fn test_group_and_padding() {
        let mut w = BinaryWriter::new(Endian::Big);
        w.write_group(&[1, 2, 3]);
        w.pad_to(16);
        assert_eq!(w.position(), 16);
        assert_eq!(&w.as_slice()[..3], &[3, 2, 1]);
    }
}
