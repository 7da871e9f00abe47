//! Texture unwrapping and hand-off to a block decoder.

use arcsys_common::{BinaryReader, Endian};

use crate::header::{block_size, mipmap_size, DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FourCC};
use crate::{Error, Result, DDS_MAGIC};

/// Decodes block-compressed texture bytes into an image.
///
/// Implementations receive the plain DDS file (magic included) and the byte
/// order it was stored in.
pub trait TextureDecoder {
    type Output;
    type Error;

    fn decode(&self, dds: &[u8], endian: Endian) -> std::result::Result<Self::Output, Self::Error>;
}

/// Header facts needed to pick a decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsInfo {
    pub width: u32,
    pub height: u32,
    pub mipmap_count: u32,
    pub four_cc: Option<FourCC>,
    pub dxgi_format: Option<u32>,
    /// Size of the top mip level for block-compressed formats.
    pub base_mip_size: Option<usize>,
}

/// A DDS texture with any SEGS wrapper removed.
#[derive(Debug, Clone)]
pub struct DdsTexture {
    data: Vec<u8>,
    endian: Endian,
    segs_wrapped: bool,
}

impl DdsTexture {
    /// Unwrap a texture.
    ///
    /// A SEGS blob at offset 0 or 16 is decompressed and marks the texture
    /// big-endian. Otherwise the byte order is `endian` if known, or
    /// big-endian when the first byte is `0x01`.
    pub fn open(data: &[u8], endian: Option<Endian>) -> Result<Self> {
        let segs_at = [0usize, 16]
            .into_iter()
            .find(|&at| data.get(at..).is_some_and(arcsys_segs::is_segs));

        if let Some(at) = segs_at {
            tracing::debug!(offset = at, "DDS texture is SEGS-wrapped");
            return Ok(Self {
                data: arcsys_segs::decompress_with(&data[at..], Endian::Big)?,
                endian: Endian::Big,
                segs_wrapped: true,
            });
        }

        let endian = endian.unwrap_or(match data.first() {
            Some(0x01) => Endian::Big,
            _ => Endian::Little,
        });

        Ok(Self {
            data: data.to_vec(),
            endian,
            segs_wrapped: false,
        })
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn is_segs_wrapped(&self) -> bool {
        self.segs_wrapped
    }

    /// The engine accepts any file starting with `"DDS"`.
    pub fn is_valid(&self) -> bool {
        self.data.starts_with(&DDS_MAGIC[..3])
    }

    /// Parse the header.
    pub fn info(&self) -> Result<DdsInfo> {
        if !self.is_valid() {
            let mut magic = [0u8; 3];
            let n = self.data.len().min(3);
            magic[..n].copy_from_slice(&self.data[..n]);
            return Err(Error::InvalidMagic(magic));
        }

        let mut reader = BinaryReader::new_at(&self.data, DDS_MAGIC.len(), self.endian);
        let mut header: DdsHeader = reader.read_struct()?;
        if self.endian.is_big() {
            header = header.swapped();
        }
        let size = header.size;
        if size != DdsHeader::SIZE {
            return Err(Error::InvalidHeader(format!("header size {size}")));
        }

        let pixel_format = header.pixel_format;
        let compressed = pixel_format.flags & DdsPixelFormat::FOURCC != 0;
        let four_cc = compressed.then_some(pixel_format.four_cc);

        let dxgi_format = if header.is_dx10() {
            let ext: DdsHeaderDxt10 = reader.read_struct()?;
            let format = ext.dxgi_format;
            Some(if self.endian.is_big() {
                format.swap_bytes()
            } else {
                format
            })
        } else {
            None
        };

        let (width, height) = (header.width, header.height);
        let base_mip_size =
            four_cc.map(|cc| mipmap_size(width, height, block_size(cc, dxgi_format)));

        Ok(DdsInfo {
            width,
            height,
            mipmap_count: header.mipmap_count,
            four_cc,
            dxgi_format,
            base_mip_size,
        })
    }

    /// Hand the plain texture to a decoder.
    pub fn decode<D: TextureDecoder>(&self, decoder: &D) -> std::result::Result<D::Output, D::Error> {
        decoder.decode(&self.data, self.endian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcsys_common::BinaryWriter;

    fn dds(endian: Endian, four_cc: &[u8; 4]) -> Vec<u8> {
        let mut w = BinaryWriter::new(endian);
        w.write_bytes(DDS_MAGIC);
        w.write_u32(DdsHeader::SIZE);
        w.write_u32(0x1007);
        w.write_u32(64);
        w.write_u32(128);
        w.write_u32(0);
        w.write_u32(0);
        w.write_u32(3);
        w.write_zeros(44);
        w.write_u32(32);
        w.write_u32(DdsPixelFormat::FOURCC);
        w.write_bytes(four_cc);
        w.write_zeros(20);
        w.write_zeros(20);
        w.into_inner()
    }

    struct Echo;

    impl TextureDecoder for Echo {
        type Output = (usize, Endian);
        type Error = ();

        fn decode(&self, dds: &[u8], endian: Endian) -> std::result::Result<Self::Output, ()> {
            Ok((dds.len(), endian))
        }
    }

    #[test]
    fn test_plain_dds() {
        let data = dds(Endian::Little, b"DXT5");
        let tex = DdsTexture::open(&data, None).unwrap();
        assert!(tex.is_valid());
        assert!(!tex.is_segs_wrapped());

        let info = tex.info().unwrap();
        assert_eq!((info.width, info.height), (128, 64));
        assert_eq!(info.mipmap_count, 3);
        assert_eq!(info.four_cc, Some(FourCC::DXT5));
        assert_eq!(info.base_mip_size, Some(32 * 16 * 16));
        assert_eq!(tex.decode(&Echo).unwrap(), (data.len(), Endian::Little));
    }

    #[test]
    fn test_big_endian_hint() {
        let data = dds(Endian::Big, b"DXT1");
        let tex = DdsTexture::open(&data, Some(Endian::Big)).unwrap();
        let info = tex.info().unwrap();
        assert_eq!((info.width, info.height), (128, 64));
        assert_eq!(info.base_mip_size, Some(32 * 16 * 8));
    }

    #[test]
    fn test_segs_wrapped() {
        let inner = dds(Endian::Little, b"DXT1");
        let mut w = BinaryWriter::new(Endian::Big);
        w.write_zeros(16);
        w.write_bytes(b"segs");
        w.write_u16(0);
        w.write_u16(1);
        w.write_u32(inner.len() as u32);
        w.write_u32(24 + inner.len() as u32);
        w.write_u16(inner.len() as u16);
        w.write_u16(inner.len() as u16);
        w.write_u32(1);
        w.write_bytes(&inner);

        let tex = DdsTexture::open(&w.into_inner(), None).unwrap();
        assert!(tex.is_segs_wrapped());
        assert_eq!(tex.endian(), Endian::Big);
        assert_eq!(tex.data(), &inner[..]);
    }

    #[test]
    fn test_invalid_magic() {
        let tex = DdsTexture::open(b"\x01XYZ", None).unwrap();
        assert_eq!(tex.endian(), Endian::Big);
        assert!(matches!(tex.info(), Err(Error::InvalidMagic(_))));
    }
}
