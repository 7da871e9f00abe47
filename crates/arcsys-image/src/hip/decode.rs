//! HIP pixel decoding.

use arcsys_common::{Argb, BinaryReader, Endian};

use super::canvas::{place_on_canvas, round_canvas, Placement};
use super::header::{HipEncoding, HipHeader};
use crate::bitmap::Bitmap;
use crate::{Error, Result};

/// Largest palette an indexed image can address.
const MAX_PALETTE: usize = 256;

/// Upper bound on any decoded pixel buffer.
const MAX_IMAGE_BYTES: usize = 1 << 30;

/// Most groups a single repeat count can expand to.
const MAX_REPEAT: usize = u8::MAX as usize;

/// Options for [`decode`].
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Return the full canvas with the layer placed at its offset.
    pub keep_canvas: bool,
    /// Use this palette instead of the embedded one.
    pub palette_override: Option<Vec<Argb>>,
}

/// Decode a HIP image whose header has already been parsed.
pub fn decode(data: &[u8], header: &HipHeader, options: &DecodeOptions) -> Result<Bitmap> {
    let encoding = header
        .encoding()
        .ok_or(Error::UnsupportedEncoding(header.encoding))?;
    let format = header.format;
    let bpp = format.bytes_per_pixel();

    let mut reader = BinaryReader::new_at(data, header.header_size as usize, header.endian);
    let palette = if format.is_indexed() {
        read_palette(&mut reader, header, options.palette_override.as_deref())?
    } else {
        Vec::new()
    };

    let pixel_start = reader.position();
    let segs_at = [pixel_start, pixel_start + 16]
        .into_iter()
        .find(|&at| data.get(at..).is_some_and(arcsys_segs::is_segs));

    let unpacked;
    let (mut reader, endian) = match segs_at {
        Some(at) => {
            tracing::debug!(offset = at, "HIP pixels are SEGS-wrapped");
            unpacked = arcsys_segs::decompress_with(&data[at..], Endian::Big)?;
            (BinaryReader::with_endian(&unpacked, Endian::Big), Endian::Big)
        }
        None => (reader, header.endian),
    };

    let (canvas_width, canvas_height) = dimensions(header.canvas_width, header.canvas_height)?;
    let (image_width, image_height) = dimensions(header.image_width, header.image_height)?;
    let image_len = pixel_len(image_width, image_height, bpp)?;
    let limit = header.file_length.saturating_sub(header.header_size as usize);

    let out_len = match encoding {
        HipEncoding::Raw | HipEncoding::RawRepeat | HipEncoding::RawCanvas
            if header.extra_params == 0 || encoding == HipEncoding::RawCanvas =>
        {
            pixel_len(canvas_width, canvas_height, bpp)?
        }
        _ => image_len,
    };
    let available = reader.remaining();
    if out_len > expansion_bound(encoding, available, bpp) {
        tracing::debug!(out_len, available, "pixel stream too short for the declared size");
        return Err(Error::InvalidDimensions {
            width: header.canvas_width.max(header.image_width).into(),
            height: header.canvas_height.max(header.image_height).into(),
        });
    }

    let pixels = match encoding {
        HipEncoding::Key => decode_key(&mut reader, bpp, out_len, limit, endian),
        HipEncoding::RawSignRepeat => {
            decode_sign_repeat(&mut reader, bpp, out_len, limit, endian)?
        }
        HipEncoding::Raw | HipEncoding::RawRepeat | HipEncoding::RawCanvas => decode_raw(
            &mut reader,
            bpp,
            out_len,
            encoding == HipEncoding::RawRepeat,
            endian,
        )?,
    };

    if encoding == HipEncoding::RawCanvas {
        let canvas = Bitmap::new(
            canvas_width as u32,
            canvas_height as u32,
            format,
            pixels,
            palette,
        )?;
        return Ok(canvas.crop(image_width as u32, image_height as u32));
    }

    let mut pixels = pixels;
    pixels.resize(image_len, 0);

    if options.keep_canvas {
        let (mut width, mut height) = (header.canvas_width, header.canvas_height);
        if format.is_indexed() && header.layered != 0 {
            (width, height) = round_canvas(
                (width, height),
                (header.offset_x, header.offset_y),
                (header.image_width, header.image_height),
            )
            .ok_or(Error::InvalidDimensions {
                width: width.into(),
                height: height.into(),
            })?;
        }
        let (width, height) = dimensions(width, height)?;
        let (offset_x, offset_y) = dimensions(header.offset_x, header.offset_y)?;
        pixel_len(width, height, bpp)?;

        let placement = Placement {
            canvas_width: width,
            canvas_height: height,
            offset_x,
            offset_y,
            image_width,
            image_height,
        };
        let canvas = place_on_canvas(&pixels, bpp, &placement);
        return Bitmap::new(width as u32, height as u32, format, canvas, palette);
    }

    Bitmap::new(
        image_width as u32,
        image_height as u32,
        format,
        pixels,
        palette,
    )
}

/// Read the palette stored right after the header, without any substitution.
pub fn embedded_palette(data: &[u8], header: &HipHeader) -> Result<Vec<Argb>> {
    if !header.format.is_indexed() {
        return Ok(Vec::new());
    }
    let mut reader = BinaryReader::new_at(data, header.header_size as usize, header.endian);
    read_colors(&mut reader, header.color_range as usize)
}

fn read_colors(reader: &mut BinaryReader<'_>, count: usize) -> Result<Vec<Argb>> {
    (0..count)
        .map(|_| reader.read_u32().map(Argb).map_err(Error::from))
        .collect()
}

fn read_palette(
    reader: &mut BinaryReader<'_>,
    header: &HipHeader,
    palette_override: Option<&[Argb]>,
) -> Result<Vec<Argb>> {
    let mut palette = match palette_override {
        Some(palette) => {
            reader.advance(header.color_range as usize * 4);
            palette.to_vec()
        }
        None if header.missing_palette() => {
            let mut synthesized = vec![Argb::BLACK; MAX_PALETTE];
            synthesized[0] = Argb::TRANSPARENT;
            synthesized
        }
        None => read_colors(reader, header.color_range as usize)?,
    };
    palette.truncate(MAX_PALETTE);
    Ok(palette)
}

fn dimensions(width: i32, height: i32) -> Result<(usize, usize)> {
    match (usize::try_from(width), usize::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(Error::InvalidDimensions {
            width: width.into(),
            height: height.into(),
        }),
    }
}

/// Byte size of a `width` x `height` buffer, refusing anything that overflows
/// or exceeds [`MAX_IMAGE_BYTES`].
fn pixel_len(width: usize, height: usize, bpp: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bpp))
        .filter(|&n| n <= MAX_IMAGE_BYTES)
        .ok_or(Error::InvalidDimensions {
            width: width as i64,
            height: height as i64,
        })
}

/// Most output bytes `available` input bytes can produce.
fn expansion_bound(encoding: HipEncoding, available: usize, bpp: usize) -> usize {
    match encoding {
        HipEncoding::Raw | HipEncoding::RawCanvas => available,
        HipEncoding::RawRepeat => available.saturating_mul(MAX_REPEAT),
        HipEncoding::Key => available.saturating_mul(MAX_REPEAT * bpp),
        // A single 32-bit run may legitimately fill the whole image.
        HipEncoding::RawSignRepeat => MAX_IMAGE_BYTES,
    }
}

/// Copy one group into the output at `pos`, reversing it for big-endian data.
fn push_group(out: &mut [u8], pos: &mut usize, group: &[u8], bpp: usize, endian: Endian) -> Result<()> {
    if group.len() < bpp || *pos + bpp > out.len() {
        return Err(Error::PixelOverflow {
            capacity: out.len(),
        });
    }
    let slot = &mut out[*pos..*pos + bpp];
    slot.copy_from_slice(&group[..bpp]);
    if endian.is_big() {
        slot.reverse();
    }
    *pos += bpp;
    Ok(())
}

/// Raw groups, each optionally followed by a repeat count byte.
pub(crate) fn decode_raw(
    reader: &mut BinaryReader<'_>,
    bpp: usize,
    out_len: usize,
    repeat: bool,
    endian: Endian,
) -> Result<Vec<u8>> {
    let mut out = vec![0u8; out_len];
    let start = reader.position();
    let mut pos = 0;

    while reader.position().saturating_sub(start) < out_len && !reader.is_empty() && pos < out_len {
        let offset = reader.position();
        let group = reader.read_bytes_upto(bpp);
        if group.len() < bpp {
            return Err(Error::TruncatedPixels { offset });
        }
        let count = if repeat {
            reader
                .read_u8()
                .map_err(|_| Error::TruncatedPixels { offset })?
        } else {
            1
        };
        for _ in 0..count {
            if pos + bpp > out.len() {
                break;
            }
            push_group(&mut out, &mut pos, group, bpp, endian)?;
        }
    }
    Ok(out)
}

/// Key encoding: groups whose first byte equals the key escape a back-reference.
///
/// The stream starts with the key byte and one unused byte. An escaped group
/// `key, d, n` repeats the group `d + 1` groups back (`d == 0xFF` meaning the
/// key value) `n` times, then steps back one byte. A group `key, key` steps
/// back three bytes and takes the next group literally. Malformed groups are
/// skipped.
pub(crate) fn decode_key(
    reader: &mut BinaryReader<'_>,
    bpp: usize,
    out_len: usize,
    limit: usize,
    endian: Endian,
) -> Vec<u8> {
    let mut out = vec![0u8; out_len];
    let start = reader.position();
    let Ok(key) = reader.read_u8() else {
        return out;
    };
    reader.advance(1);
    let mut pos = 0;

    while reader.position().saturating_sub(start) < limit && !reader.is_empty() && pos < out_len {
        let group = reader.read_bytes_upto(bpp);
        if group[0] != key {
            let _ = push_group(&mut out, &mut pos, group, bpp, endian);
            continue;
        }
        let Some(&second) = group.get(1) else {
            continue;
        };

        if second == key {
            reader.rewind(3);
            let literal = reader.read_bytes_upto(bpp);
            let _ = push_group(&mut out, &mut pos, literal, bpp, endian);
            continue;
        }

        let Some(&count) = group.get(2) else {
            continue;
        };
        let distance = usize::from(if second == 0xFF { key } else { second }.wrapping_add(1)) * bpp;
        if copy_back(&mut out, &mut pos, distance, count, bpp) {
            reader.rewind(1);
        }
    }
    out
}

/// Repeat the group `distance` bytes back `count` times.
fn copy_back(out: &mut [u8], pos: &mut usize, distance: usize, count: u8, bpp: usize) -> bool {
    for _ in 0..count {
        let Some(src) = pos.checked_sub(distance) else {
            return false;
        };
        if *pos + bpp > out.len() {
            return false;
        }
        out.copy_within(src..src + bpp, *pos);
        *pos += bpp;
    }
    true
}

/// Signed run lengths: negative counts prefix literal groups, others repeat one group.
pub(crate) fn decode_sign_repeat(
    reader: &mut BinaryReader<'_>,
    bpp: usize,
    out_len: usize,
    limit: usize,
    endian: Endian,
) -> Result<Vec<u8>> {
    let mut out = vec![0u8; out_len];
    let start = reader.position();
    let mut pos = 0;

    while reader.position().saturating_sub(start) < limit && !reader.is_empty() {
        let run = reader.read_i32()?;
        if run < 0 {
            for _ in 0..(run & 0x7FFF_FFFF) {
                let group = reader.read_bytes(bpp)?;
                push_group(&mut out, &mut pos, group, bpp, endian)?;
            }
        } else {
            let group = reader.read_bytes(bpp)?;
            for _ in 0..run {
                push_group(&mut out, &mut pos, group, bpp, endian)?;
            }
        }
    }
    Ok(out)
}
