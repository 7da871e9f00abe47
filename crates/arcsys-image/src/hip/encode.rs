//! HIP encoding.

use arcsys_common::{Argb, BinaryWriter, Endian};

use super::canvas::round_canvas;
use super::header::{HipEncoding, HipHeader, HIP_MAGIC, RENDERABLE_LAYERS};
use crate::bitmap::Bitmap;
use crate::{Error, Result};

const VERSION: u32 = 0x125;
const LAYER_HEADER_SIZE: u32 = 0x20;
const MAX_RUN: u8 = 255;

/// Options for [`encode`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub encoding: HipEncoding,
    /// Write a layer header placing the image on the canvas.
    pub layered: bool,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Zero means the image size, rounded up for layered images.
    pub canvas_width: i32,
    pub canvas_height: i32,
    /// Palette for indexed images; defaults to the bitmap's own.
    pub palette: Option<Vec<Argb>>,
    pub endian: Endian,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            encoding: HipEncoding::Raw,
            layered: false,
            offset_x: 0,
            offset_y: 0,
            canvas_width: 0,
            canvas_height: 0,
            palette: None,
            endian: Endian::Little,
        }
    }
}

impl EncodeOptions {
    /// Copy the layer placement and byte order of an existing image.
    pub fn from_reference(reference: &HipHeader, encoding: HipEncoding) -> Self {
        Self {
            encoding,
            layered: reference.is_layered(),
            offset_x: reference.offset_x,
            offset_y: reference.offset_y,
            canvas_width: reference.canvas_width,
            canvas_height: reference.canvas_height,
            palette: None,
            endian: reference.endian,
        }
    }
}

/// Encode a bitmap as a HIP file. Only `Raw` and `RawRepeat` can be written.
pub fn encode(bitmap: &Bitmap, options: &EncodeOptions) -> Result<Vec<u8>> {
    let repeat = match options.encoding {
        HipEncoding::Raw => false,
        HipEncoding::RawRepeat => true,
        other => return Err(Error::UnsupportedEncoder(other)),
    };

    let image_width = bitmap.width as i32;
    let image_height = bitmap.height as i32;
    let mut canvas_width = if options.canvas_width == 0 {
        image_width
    } else {
        options.canvas_width
    };
    let mut canvas_height = if options.canvas_height == 0 {
        image_height
    } else {
        options.canvas_height
    };
    if options.layered && (options.canvas_width == 0 || options.canvas_height == 0) {
        (canvas_width, canvas_height) = round_canvas(
            (canvas_width, canvas_height),
            (options.offset_x, options.offset_y),
            (image_width, image_height),
        )
        .ok_or(Error::InvalidDimensions {
            width: canvas_width.into(),
            height: canvas_height.into(),
        })?;
    }

    let palette: &[Argb] = if bitmap.format.is_indexed() {
        options.palette.as_deref().unwrap_or(bitmap.palette.as_slice())
    } else {
        &[]
    };

    let mut w = BinaryWriter::with_capacity(bitmap.pixels.len() + 0x60, options.endian);
    w.write_bytes(HIP_MAGIC);
    w.write_u32(VERSION);
    w.write_u32(0);
    w.write_u32(palette.len() as u32);
    w.write_i32(canvas_width);
    w.write_i32(canvas_height);
    w.write_u8(bitmap.format.hip_byte());
    w.write_u8(options.encoding as u8);
    w.write_bool(options.layered);
    w.write_u8(if options.layered { RENDERABLE_LAYERS } else { 0 });

    if options.layered {
        w.write_u32(LAYER_HEADER_SIZE);
        w.write_i32(image_width);
        w.write_i32(image_height);
        w.write_i32(options.offset_x);
        w.write_i32(options.offset_y);
        w.write_zeros(16);
    } else {
        w.write_u32(0);
    }

    for color in palette {
        w.write_u32(color.0);
    }

    let mut groups = bitmap.pixels.chunks_exact(bitmap.bytes_per_pixel()).peekable();
    while let Some(group) = groups.next() {
        w.write_group(group);
        if repeat {
            let mut run = 1u8;
            while run < MAX_RUN && groups.peek() == Some(&group) {
                groups.next();
                run += 1;
            }
            w.write_u8(run);
        }
    }

    let total = w.position() as u32;
    w.patch_u32(8, total)?;
    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PixelFormat;

    #[test]
    fn test_header_layout() {
        let bmp = Bitmap::new(2, 1, PixelFormat::Argb32, vec![1; 8], Vec::new()).unwrap();
        let data = encode(&bmp, &EncodeOptions::default()).unwrap();

        assert_eq!(&data[..4], b"HIP\0");
        assert_eq!(&data[4..8], &[0x25, 0x01, 0, 0]);
        assert_eq!(u32::from_le_bytes([data[8], data[9], data[10], data[11]]), 40);
        assert_eq!(&data[0x18..0x1C], &[0x10, 0x08, 0, 0]);
        assert_eq!(data.len(), 40);
    }

    #[test]
    fn test_long_runs_split() {
        let bmp = Bitmap::new(300, 1, PixelFormat::Indexed8, vec![7; 300], Vec::new()).unwrap();
        let options = EncodeOptions {
            encoding: HipEncoding::RawRepeat,
            ..Default::default()
        };
        let data = encode(&bmp, &options).unwrap();
        assert_eq!(&data[0x20..], &[7, 255, 7, 45]);
    }

    #[test]
    fn test_layered_canvas_rounded() {
        let bmp = Bitmap::new(2000, 1, PixelFormat::Indexed8, vec![0; 2000], Vec::new()).unwrap();
        let options = EncodeOptions {
            layered: true,
            offset_x: 1500,
            ..Default::default()
        };
        let data = encode(&bmp, &options).unwrap();
        let header = HipHeader::parse(&data, None, data.len()).unwrap();

        assert_eq!(header.canvas_width % 1024, 0);
        assert!(header.canvas_width >= 3500);
        assert_eq!(header.header_size, 0x40);
        assert_eq!((header.offset_x, header.image_width), (1500, 2000));
    }

    #[test]
    fn test_from_reference() {
        let bmp = Bitmap::new(1, 1, PixelFormat::Argb32, vec![0; 4], Vec::new()).unwrap();
        let options = EncodeOptions {
            layered: true,
            offset_x: 3,
            offset_y: 4,
            canvas_width: 8,
            canvas_height: 8,
            endian: Endian::Big,
            ..Default::default()
        };
        let data = encode(&bmp, &options).unwrap();
        let header = HipHeader::parse(&data, None, data.len()).unwrap();

        let copied = EncodeOptions::from_reference(&header, HipEncoding::RawRepeat);
        assert!(copied.layered);
        assert_eq!((copied.offset_x, copied.offset_y), (3, 4));
        assert_eq!((copied.canvas_width, copied.canvas_height), (8, 8));
        assert_eq!(copied.endian, Endian::Big);
    }

    #[test]
    fn test_unsupported_encoder() {
        let bmp = Bitmap::new(1, 1, PixelFormat::Argb32, vec![0; 4], Vec::new()).unwrap();
        let options = EncodeOptions {
            encoding: HipEncoding::Key,
            ..Default::default()
        };
        assert!(matches!(
            encode(&bmp, &options),
            Err(Error::UnsupportedEncoder(HipEncoding::Key))
        ));
    }
}
