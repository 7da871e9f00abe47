//! HPL palette files.
//!
//! A 32-byte header (`"HPAL"`, version, file length, color count, 16 reserved
//! bytes) followed by one 32-bit ARGB word per color, in the file's byte order.

use arcsys_common::{Argb, BinaryReader, BinaryWriter, Endian};

use crate::{Error, Result};

/// HPL magic bytes.
pub const HPL_MAGIC: &[u8; 4] = b"HPAL";

/// Fixed header size.
pub const HPL_HEADER_SIZE: usize = 0x20;

const VERSION: u32 = 0x125;

/// Decide the byte order of a HIP or HPL file from its version word.
///
/// The version is small, so a zero byte right after the magic means the word
/// was written big-endian.
pub fn detect_endian(data: &[u8]) -> Endian {
    match data.get(4) {
        Some(0) => Endian::Big,
        _ => Endian::Little,
    }
}

/// A parsed palette file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HplPalette {
    pub file_length: u32,
    pub color_range: u32,
    pub palette: Vec<Argb>,
    pub endian: Endian,
}

impl HplPalette {
    /// Parse a palette. `parent_len` clamps the stored file length.
    pub fn parse(data: &[u8], endian: Option<Endian>, parent_len: usize) -> Result<Self> {
        if !data.starts_with(HPL_MAGIC) || data.len() < HPL_HEADER_SIZE {
            return Err(Error::NotHpl);
        }
        let endian = endian.unwrap_or_else(|| detect_endian(data));

        let mut reader = BinaryReader::new_at(data, 8, endian);
        let file_length = reader.read_u32()?.min(parent_len as u32);
        let color_range = reader.read_u32()?;
        reader.seek(HPL_HEADER_SIZE);

        let palette = (0..color_range)
            .map(|_| reader.read_u32().map(Argb))
            .collect::<arcsys_common::Result<Vec<_>>>()?;

        Ok(Self {
            file_length,
            color_range,
            palette,
            endian,
        })
    }

    /// Serialize a palette.
    pub fn encode(palette: &[Argb], endian: Endian) -> Vec<u8> {
        let color_range = palette.len() as u32;
        let file_length = color_range * 4 + HPL_HEADER_SIZE as u32;

        let mut w = BinaryWriter::with_capacity(file_length as usize, endian);
        w.write_bytes(HPL_MAGIC);
        w.write_u32(VERSION);
        w.write_u32(file_length);
        w.write_u32(color_range);
        w.write_u32(0);
        w.write_u32(0);
        w.write_u32(0x1000_0001);
        w.write_u32(0);
        for color in palette {
            w.write_u32(color.0);
        }
        w.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> Vec<Argb> {
        vec![Argb::TRANSPARENT, Argb(0xFF112233), Argb(0x80FFFFFF)]
    }

    #[test]
    fn test_encode_layout() {
        let data = HplPalette::encode(&colors(), Endian::Little);
        assert_eq!(data.len(), 0x20 + 12);
        assert_eq!(&data[..4], b"HPAL");
        assert_eq!(&data[4..8], &[0x25, 0x01, 0, 0]);
        assert_eq!(&data[0x18..0x1C], &[0x01, 0, 0, 0x10]);
        assert_eq!(&data[0x24..0x28], &[0x33, 0x22, 0x11, 0xFF]);
    }

    #[test]
    fn test_parse_both_orders() {
        for endian in [Endian::Little, Endian::Big] {
            let data = HplPalette::encode(&colors(), endian);
            let hpl = HplPalette::parse(&data, None, data.len()).unwrap();
            assert_eq!(hpl.endian, endian);
            assert_eq!(hpl.color_range, 3);
            assert_eq!(hpl.palette, colors());
        }
    }

    #[test]
    fn test_length_clamped_to_parent() {
        let data = HplPalette::encode(&colors(), Endian::Little);
        let hpl = HplPalette::parse(&data, None, 16).unwrap();
        assert_eq!(hpl.file_length, 16);
    }

    #[test]
    fn test_not_hpl() {
        assert!(matches!(
            HplPalette::parse(b"HIP\0", None, 4),
            Err(Error::NotHpl)
        ));
    }
}
