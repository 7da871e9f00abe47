//! SEGS blob layout.
//!
//! ```text
//! "segs" | flags i16 | chunk count i16 | full size u32 | compressed size u32
//! chunk count * { zsize u16 | size u16 | offset+1 u32 }
//! chunk data
//! ```
//!
//! Header fields use the blob's byte order. A stored size of 0 means 64 KiB.
//! Chunks whose size equals their compressed size are stored verbatim, the
//! rest are raw DEFLATE.

use arcsys_common::{BinaryReader, Endian};

use crate::decompress::inflate_sized;
use crate::{Error, Result};

/// SEGS magic bytes.
pub const SEGS_MAGIC: &[u8; 4] = b"segs";

/// Fixed header size before the chunk table.
pub const HEADER_SIZE: usize = 0x10;

const CHUNK_DESCRIPTOR_SIZE: usize = 8;
const FULL_CHUNK: u32 = 0x10000;

/// Check for the SEGS magic at the start of `data`.
#[inline]
pub fn is_segs(data: &[u8]) -> bool {
    data.starts_with(SEGS_MAGIC)
}

/// One chunk descriptor with its offset resolved relative to the blob start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegsChunk {
    pub z_size: u16,
    pub size: u32,
    pub offset: u32,
}

impl SegsChunk {
    /// Stored chunks are copied without inflating.
    #[inline]
    pub fn is_stored(&self) -> bool {
        self.size == u32::from(self.z_size)
    }
}

/// Parsed SEGS header and chunk table.
#[derive(Debug, Clone)]
pub struct SegsBlob {
    pub flags: i16,
    pub full_size: u32,
    pub compressed_size: u32,
    pub chunks: Vec<SegsChunk>,
    pub endian: Endian,
}

impl SegsBlob {
    /// Parse a blob header in a known byte order.
    pub fn parse(data: &[u8], endian: Endian) -> Result<Self> {
        let mut reader = BinaryReader::with_endian(data, endian);
        reader.expect_magic(SEGS_MAGIC)?;

        let flags = reader.read_i16()?;
        let count = reader.read_i16()?.max(0) as usize;
        let full_size = reader.read_u32()?;
        let compressed_size = reader.read_u32()?;

        let table_end = (HEADER_SIZE + count * CHUNK_DESCRIPTOR_SIZE) as u32;
        let mut relative_to_table = false;
        let mut chunks = Vec::with_capacity(count);

        for i in 0..count {
            let z_size = reader.read_u16()?;
            let size = match reader.read_u16()? {
                0 => FULL_CHUNK,
                n => u32::from(n),
            };
            let mut offset = reader.read_u32()?.wrapping_sub(1);

            if i == 0 && offset == 0 {
                relative_to_table = true;
            }
            if relative_to_table {
                offset = offset.wrapping_add(table_end);
            }

            chunks.push(SegsChunk {
                z_size,
                size,
                offset,
            });
        }

        Ok(Self {
            flags,
            full_size,
            compressed_size,
            chunks,
            endian,
        })
    }

    /// Detect the byte order and parse.
    ///
    /// `declared_len` is the length of the node holding the blob.
    pub fn open(data: &[u8], declared_len: usize) -> Result<Self> {
        Self::parse(data, detect_endian(data, declared_len))
    }

    /// Decompress every chunk into a buffer of exactly `full_size` bytes.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let declared = self.full_size as usize;
        let mut output = Vec::with_capacity(declared);

        for (index, chunk) in self.chunks.iter().enumerate() {
            let offset = chunk.offset as usize;
            let len = if chunk.is_stored() {
                chunk.size as usize
            } else {
                usize::from(chunk.z_size)
            };
            let bytes = offset
                .checked_add(len)
                .and_then(|end| data.get(offset..end))
                .ok_or(Error::ChunkOutOfRange {
                    index,
                    offset,
                    len,
                    available: data.len(),
                })?;

            if chunk.is_stored() {
                output.extend_from_slice(bytes);
            } else {
                output.extend(inflate_sized(bytes, chunk.size as usize)?);
            }

            if output.len() > declared {
                return Err(Error::SizeOverflow {
                    declared,
                    actual: output.len(),
                });
            }
        }

        if output.len() < declared {
            tracing::warn!(
                declared,
                actual = output.len(),
                "SEGS chunks short of declared size, zero-filling"
            );
            output.resize(declared, 0);
        }

        Ok(output)
    }
}

/// Decide the byte order of a blob from its chunk table.
///
/// The table is read little-endian first. It is accepted when the compressed
/// size fits the node, the chunk count is positive, and both the summed chunk
/// sizes and the last chunk's end stay below the compressed size. Anything
/// else means big-endian. A table too short to inspect stays little-endian.
pub fn detect_endian(data: &[u8], declared_len: usize) -> Endian {
    let mut reader = BinaryReader::new(data);
    reader.seek(6);

    let probe = (|| -> Result<bool> {
        let count = reader.read_i16()?;
        reader.advance(4);
        let compressed = reader.read_u32()?;

        if compressed as usize > declared_len || count <= 0 {
            return Ok(false);
        }

        let mut total = 0u32;
        let mut last_end = 0u32;
        for i in 0..count as usize {
            reader.seek(HEADER_SIZE + i * CHUNK_DESCRIPTOR_SIZE);
            let z_size = u32::from(reader.read_u16()?);
            total = total.wrapping_add(z_size);
            if i + 1 == count as usize {
                reader.advance(2);
                last_end = z_size.wrapping_add(reader.read_u32()?);
            }
        }

        Ok(total < compressed && last_end < compressed)
    })();

    match probe {
        Ok(true) | Err(_) => Endian::Little,
        Ok(false) => {
            tracing::debug!("SEGS chunk table does not fit little-endian, using big-endian");
            Endian::Big
        }
    }
}

/// Parse and decompress a blob, detecting its byte order.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    SegsBlob::open(data, data.len())?.decompress(data)
}

/// Parse and decompress a blob whose byte order is already known.
pub fn decompress_with(data: &[u8], endian: Endian) -> Result<Vec<u8>> {
    SegsBlob::parse(data, endian)?.decompress(data)
}
