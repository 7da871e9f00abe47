//! Decoded pixel buffers.

use arcsys_common::Argb;

use crate::{Error, Result};

/// Pixel layouts a HIP image can carry.
///
/// Multi-byte pixels are little-endian: ARGB is stored `B, G, R, A`, and the
/// 16-bit formats are little-endian words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Indexed8,
    Gray16,
    Argb32,
    Rgb565,
}

impl PixelFormat {
    /// Map a HIP format byte. Unknown values are 32-bit ARGB.
    pub fn from_hip(byte: u8) -> Self {
        match byte {
            0x01 => Self::Indexed8,
            0x04 => Self::Gray16,
            0x40 => Self::Rgb565,
            _ => Self::Argb32,
        }
    }

    /// The HIP format byte for this layout.
    pub fn hip_byte(self) -> u8 {
        match self {
            Self::Indexed8 => 0x01,
            Self::Gray16 => 0x04,
            Self::Argb32 => 0x10,
            Self::Rgb565 => 0x40,
        }
    }

    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Indexed8 => 1,
            Self::Gray16 | Self::Rgb565 => 2,
            Self::Argb32 => 4,
        }
    }

    #[inline]
    pub fn is_indexed(self) -> bool {
        self == Self::Indexed8
    }
}

/// A decoded image: dimensions, packed rows and, for indexed images, a palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
    pub palette: Vec<Argb>,
}

impl Bitmap {
    /// Wrap a pixel buffer, checking it matches the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
        palette: Vec<Argb>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(Error::PixelBufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
            palette,
        })
    }

    /// Build a 32-bit ARGB bitmap from RGBA8 rows.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> Result<Self> {
        let pixels = rgba
            .chunks_exact(4)
            .flat_map(|p| [p[2], p[1], p[0], p[3]])
            .collect();
        Self::new(width, height, PixelFormat::Argb32, pixels, Vec::new())
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    /// Keep the top-left `width` x `height` region.
    pub fn crop(&self, width: u32, height: u32) -> Self {
        let width = width.min(self.width);
        let height = height.min(self.height);
        let bpp = self.bytes_per_pixel();
        let src_stride = self.width as usize * bpp;
        let dst_stride = width as usize * bpp;

        let mut pixels = Vec::with_capacity(dst_stride * height as usize);
        for row in self.pixels.chunks_exact(src_stride.max(1)).take(height as usize) {
            pixels.extend_from_slice(&row[..dst_stride]);
        }

        Self {
            width,
            height,
            format: self.format,
            pixels,
            palette: self.palette.clone(),
        }
    }

    /// Expand 16-bit grayscale into 48-bit RGB, repeating the sample per channel.
    pub fn gray16_to_rgb48(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[1], p[0], p[1], p[0], p[1]])
            .collect()
    }

    /// Convert to non-premultiplied RGBA8 rows.
    ///
    /// Palette indices without an entry become fully transparent.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        match self.format {
            PixelFormat::Indexed8 => {
                for &index in &self.pixels {
                    let color = self.palette.get(index as usize).copied().unwrap_or_default();
                    out.extend_from_slice(&color.to_rgba());
                }
            }
            PixelFormat::Argb32 => {
                for p in self.pixels.chunks_exact(4) {
                    out.extend_from_slice(&[p[2], p[1], p[0], p[3]]);
                }
            }
            PixelFormat::Gray16 => {
                for p in self.pixels.chunks_exact(2) {
                    out.extend_from_slice(&[p[1], p[1], p[1], 0xFF]);
                }
            }
            PixelFormat::Rgb565 => {
                for p in self.pixels.chunks_exact(2) {
                    let v = u16::from_le_bytes([p[0], p[1]]);
                    let r = ((v >> 11) & 0x1F) as u8;
                    let g = ((v >> 5) & 0x3F) as u8;
                    let b = (v & 0x1F) as u8;
                    out.extend_from_slice(&[
                        (r << 3) | (r >> 2),
                        (g << 2) | (g >> 4),
                        (b << 3) | (b >> 2),
                        0xFF,
                    ]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(PixelFormat::from_hip(0x01), PixelFormat::Indexed8);
        assert_eq!(PixelFormat::from_hip(0x00), PixelFormat::Argb32);
        assert_eq!(PixelFormat::from_hip(0x7F), PixelFormat::Argb32);
        assert_eq!(PixelFormat::Rgb565.hip_byte(), 0x40);
    }

    #[test]
    fn test_size_checked() {
        assert!(Bitmap::new(2, 2, PixelFormat::Argb32, vec![0; 15], Vec::new()).is_err());
        assert!(Bitmap::new(2, 2, PixelFormat::Indexed8, vec![0; 4], Vec::new()).is_ok());
    }

    #[test]
    fn test_rgba_roundtrip() {
        let rgba = [1, 2, 3, 4, 5, 6, 7, 8];
        let bmp = Bitmap::from_rgba8(2, 1, &rgba).unwrap();
        assert_eq!(bmp.pixels, vec![3, 2, 1, 4, 7, 6, 5, 8]);
        assert_eq!(bmp.to_rgba8(), rgba);
    }

    #[test]
    fn test_indexed_to_rgba() {
        let palette = vec![Argb::TRANSPARENT, Argb(0xFF102030)];
        let bmp = Bitmap::new(3, 1, PixelFormat::Indexed8, vec![1, 0, 9], palette).unwrap();
        assert_eq!(
            bmp.to_rgba8(),
            vec![0x10, 0x20, 0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_gray16_expansion() {
        let bmp = Bitmap::new(1, 1, PixelFormat::Gray16, vec![0x34, 0x12], Vec::new()).unwrap();
        assert_eq!(bmp.gray16_to_rgb48(), vec![0x34, 0x12, 0x34, 0x12, 0x34, 0x12]);
        assert_eq!(bmp.to_rgba8(), vec![0x12, 0x12, 0x12, 0xFF]);
    }

    #[test]
    fn test_crop() {
        let bmp = Bitmap::new(3, 2, PixelFormat::Indexed8, vec![1, 2, 3, 4, 5, 6], Vec::new()).unwrap();
        let cropped = bmp.crop(2, 1);
        assert_eq!((cropped.width, cropped.height), (2, 1));
        assert_eq!(cropped.pixels, vec![1, 2]);
    }
}
