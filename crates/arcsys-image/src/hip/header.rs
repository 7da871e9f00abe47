//! HIP header parsing.

use arcsys_common::{BinaryReader, Endian};

use crate::bitmap::PixelFormat;
use crate::hpl::detect_endian;
use crate::{Error, Result};

/// HIP magic bytes.
pub const HIP_MAGIC: &[u8; 4] = b"HIP\0";

/// Size of the fixed header before the layer header.
pub const HIP_BASE_HEADER_SIZE: u32 = 0x20;

/// Extra-parameter bit marking a placed layer.
pub const RENDERABLE_LAYERS: u8 = 0x20;

/// `"segs"` read as a little-endian word.
const SEGS_WORD: u32 = 0x7367_6573;

/// Pixel encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HipEncoding {
    RawRepeat = 0x01,
    Key = 0x02,
    Raw = 0x08,
    RawSignRepeat = 0x10,
    RawCanvas = 0x20,
}

impl HipEncoding {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::RawRepeat),
            0x02 => Some(Self::Key),
            0x08 => Some(Self::Raw),
            0x10 => Some(Self::RawSignRepeat),
            0x20 => Some(Self::RawCanvas),
            _ => None,
        }
    }
}

/// Parsed HIP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HipHeader {
    /// File length as stored.
    pub stored_length: u32,
    /// Length after clamping and the trailer check.
    pub file_length: usize,
    pub color_range: u32,
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub format: PixelFormat,
    /// Raw encoding byte; see [`HipEncoding::from_byte`].
    pub encoding: u8,
    pub layered: u8,
    pub extra_params: u8,
    pub header_size: u32,
    pub image_width: i32,
    pub image_height: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub endian: Endian,
}

impl HipHeader {
    /// Parse a header.
    ///
    /// With no `endian` hint the byte order is taken from the version word.
    /// `parent_len` is the length the containing archive declares for this
    /// file; the stored length never exceeds it.
    pub fn parse(data: &[u8], endian: Option<Endian>, parent_len: usize) -> Result<Self> {
        if !data.starts_with(HIP_MAGIC) || data.len() < HIP_BASE_HEADER_SIZE as usize {
            return Err(Error::NotHip);
        }
        let endian = endian.unwrap_or_else(|| detect_endian(data));

        let mut reader = BinaryReader::new_at(data, 8, endian);
        let stored_length = reader.read_u32()?;
        let color_range = reader.read_u32()?;
        let canvas_width = reader.read_i32()?;
        let canvas_height = reader.read_i32()?;

        let format = PixelFormat::from_hip(reader.read_u8()?);
        let encoding = reader.read_u8()?;
        let layered = reader.read_u8()?;
        let extra_params = reader.read_u8()?;

        let mut layer_header_size = reader.read_u32()? as usize;
        let header_size = HIP_BASE_HEADER_SIZE.wrapping_add(layer_header_size as u32);

        let (image_width, image_height, offset_x, offset_y) =
            if extra_params & RENDERABLE_LAYERS != 0 && layered != 0 {
                let dims = (
                    reader.read_i32()?,
                    reader.read_i32()?,
                    reader.read_i32()?,
                    reader.read_i32()?,
                );
                layer_header_size = layer_header_size.saturating_sub(0x10);
                dims
            } else {
                (canvas_width, canvas_height, 0, 0)
            };

        reader.advance(layer_header_size);
        if format.is_indexed() {
            reader.advance(color_range as usize * 4);
        }

        let mut file_length = (stored_length as usize).min(parent_len);
        if has_trailer(data, reader.position()) {
            file_length = parent_len;
        }

        Ok(Self {
            stored_length,
            file_length,
            color_range,
            canvas_width,
            canvas_height,
            format,
            encoding,
            layered,
            extra_params,
            header_size,
            image_width,
            image_height,
            offset_x,
            offset_y,
            endian,
        })
    }

    #[inline]
    pub fn encoding(&self) -> Option<HipEncoding> {
        HipEncoding::from_byte(self.encoding)
    }

    /// Whether the image is a layer placed on a larger canvas.
    #[inline]
    pub fn is_layered(&self) -> bool {
        self.extra_params & RENDERABLE_LAYERS != 0 && self.layered != 0
    }

    /// Whether the stored palette is absent and must be synthesized.
    #[inline]
    pub fn missing_palette(&self) -> bool {
        self.color_range == 0 && self.format.is_indexed()
    }
}

/// Check whether pixel data at `pos` is followed by something the stored
/// length does not cover: a SEGS blob, or a 16-byte block ending the file.
fn has_trailer(data: &[u8], pos: usize) -> bool {
    let Some(word) = data.get(pos..pos + 4) else {
        return false;
    };
    if u32::from_le_bytes([word[0], word[1], word[2], word[3]]) == SEGS_WORD {
        return true;
    }
    pos + 16 == data.len()
}
