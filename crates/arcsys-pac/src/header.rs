//! FPAC header and directory parsing.

use std::ops::{BitOr, BitOrAssign, Range};

use arcsys_common::{align_up, BinaryReader, Endian};

use crate::{Error, Result};

/// Container magic.
pub const PAC_MAGIC: &[u8; 4] = b"FPAC";

/// Optional wrapper tag that may precede the container header.
pub const BCSM_MAGIC: &[u8; 4] = b"BCSM";

/// Size of the fixed header before the first directory entry.
pub const PAC_HEADER_SIZE: usize = 0x20;

/// Bytes skipped when the container is BCSM-wrapped.
pub const WRAPPER_SIZE: usize = 16;

/// Container parameter bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Parameters(pub u32);

impl Parameters {
    /// Bit every builder sets.
    pub const DEFAULT: Self = Self(0x1);
    pub const FILE_HEADER_END_PADDING: Self = Self(0x10);
    pub const NO_BYTE_ALIGNMENT: Self = Self(0x4000_0000);
    pub const GENERATE_NAME_ID: Self = Self(0x8000_0000);
    /// Implies [`Self::GENERATE_NAME_ID`].
    pub const GENERATE_EXTENDED_NAME_ID: Self = Self(0xA000_0000);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Fixed name field width forced by name-ID generation, if requested.
    pub const fn name_id_width(self) -> Option<usize> {
        if self.contains(Self::GENERATE_EXTENDED_NAME_ID) {
            Some(64)
        } else if self.contains(Self::GENERATE_NAME_ID) {
            Some(32)
        } else {
            None
        }
    }
}

impl BitOr for Parameters {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Parameters {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Hash of a member name stored after its directory entry.
///
/// `id = id * 0x89 + byte` over the lower-cased name.
pub fn name_id(name: &str) -> u32 {
    name.bytes().fold(0u32, |id, b| {
        id.wrapping_mul(0x89)
            .wrapping_add(u32::from(b.to_ascii_lowercase()))
    })
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacEntry {
    pub name: String,
    pub index: u32,
    /// Offset relative to the end of the header.
    pub offset: u32,
    pub length: u32,
}

/// Parsed container header and directory.
#[derive(Debug, Clone)]
pub struct PacHeader {
    pub header_size: u32,
    pub file_length: u32,
    pub parameters: Parameters,
    pub name_width: i32,
    pub entries: Vec<PacEntry>,
    pub endian: Endian,
    /// Bytes preceding the `FPAC` magic (the BCSM wrapper).
    pub base_offset: usize,
}

/// Check for a container, wrapped or not.
pub fn is_pac(data: &[u8]) -> bool {
    data.starts_with(PAC_MAGIC)
        || (data.starts_with(BCSM_MAGIC)
            && data
                .get(WRAPPER_SIZE..)
                .is_some_and(|d| d.starts_with(PAC_MAGIC)))
}

/// Decide the byte order of a header starting at `FPAC`.
///
/// The header is read little-endian and its stored header size compared with
/// the two layouts the directory can have (with or without a name-ID word per
/// entry). If neither matches the data is big-endian.
pub fn detect_endian(data: &[u8]) -> Endian {
    let word = |at: usize| {
        data.get(at..at + 4)
            .map(|b| u64::from(u32::from_le_bytes([b[0], b[1], b[2], b[3]])))
    };
    let (Some(header_size), Some(count), Some(width)) = (word(4), word(12), word(20)) else {
        return Endian::Little;
    };

    let entry = align_up(width as usize + 12, 16) as u64;
    let plain = entry * count + PAC_HEADER_SIZE as u64;
    let with_id = (entry + 16) * count + PAC_HEADER_SIZE as u64;
    if header_size == plain || header_size == with_id {
        Endian::Little
    } else {
        tracing::debug!(
            header_size,
            plain,
            with_id,
            "PAC header size mismatch, reading big-endian"
        );
        Endian::Big
    }
}

impl PacHeader {
    /// Parse a container header and its directory.
    ///
    /// With no byte-order hint the order is detected from the header sizes.
    pub fn parse(data: &[u8], endian: Option<Endian>) -> Result<Self> {
        if data.len() < PAC_HEADER_SIZE {
            return Err(Error::TooShort(data.len()));
        }

        let base_offset = if data.starts_with(BCSM_MAGIC) {
            WRAPPER_SIZE
        } else {
            0
        };
        let body = &data[base_offset..];
        let endian = endian.unwrap_or_else(|| detect_endian(body));

        let mut reader = BinaryReader::with_endian(body, endian);
        let magic = reader.read_bytes(4)?;
        if magic != PAC_MAGIC {
            return Err(Error::InvalidMagic([magic[0], magic[1], magic[2], magic[3]]));
        }

        let header_size = reader.read_u32()?;
        let file_length = reader.read_u32()?;
        let file_count = reader.read_u32()?;
        let parameters = Parameters(reader.read_u32()?);
        let name_width = reader.read_i32()?;
        reader.advance(8);

        let width = usize::try_from(name_width)
            .map_err(|_| Error::InvalidHeader(format!("name field width {name_width}")))?;

        let stride = width + 12;
        let capacity = (file_count as usize).min(reader.remaining() / stride.max(1));
        let mut entries = Vec::with_capacity(capacity);

        for _ in 0..file_count {
            let name = reader.read_string_in_buffer(width)?;
            let index = reader.read_u32()?;
            let offset = reader.read_u32()?;
            let length = reader.read_u32()?;
            entries.push(PacEntry {
                name,
                index,
                offset,
                length,
            });

            let rem = stride % 16;
            if rem != 0 {
                reader.advance(16 - rem);
            } else if reader.peek_bytes(1).is_ok_and(|b| b[0] == 0) {
                reader.advance(16);
            }
        }

        tracing::trace!(
            count = entries.len(),
            header_size,
            ?endian,
            wrapped = base_offset != 0,
            "parsed PAC directory"
        );

        Ok(Self {
            header_size,
            file_length,
            parameters,
            name_width,
            entries,
            endian,
            base_offset,
        })
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Absolute byte range of an entry's payload within the parsed data.
    pub fn data_range(&self, entry: &PacEntry) -> Range<usize> {
        let start = self.base_offset + self.header_size as usize + entry.offset as usize;
        start..start + entry.length as usize
    }

    /// Borrow an entry's payload.
    pub fn entry_data<'a>(&self, data: &'a [u8], entry: &PacEntry) -> Result<&'a [u8]> {
        let range = self.data_range(entry);
        data.get(range.clone()).ok_or_else(|| Error::EntryOutOfRange {
            name: entry.name.clone(),
            offset: range.start,
            length: range.len(),
            available: data.len(),
        })
    }

    /// Find an entry by exact name.
    pub fn find(&self, name: &str) -> Option<&PacEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcsys_common::BinaryWriter;

    fn header(endian: Endian, width: u32, names: &[&str], extra_row: bool) -> Vec<u8> {
        let entry = align_up(width as usize + 12, 16) + if extra_row { 16 } else { 0 };
        let mut w = BinaryWriter::new(endian);
        w.write_bytes(PAC_MAGIC);
        w.write_u32((entry * names.len() + PAC_HEADER_SIZE) as u32);
        w.write_u32(0);
        w.write_u32(names.len() as u32);
        w.write_u32(1);
        w.write_u32(width);
        w.write_zeros(8);
        for (i, name) in names.iter().enumerate() {
            let start = w.position();
            w.write_bytes(name.as_bytes());
            w.write_zeros(width as usize - name.len());
            w.write_u32(i as u32);
            w.write_u32(i as u32 * 16);
            w.write_u32(5);
            w.write_zeros(entry - (w.position() - start));
        }
        w.into_inner()
    }

    #[test]
    fn test_name_id() {
        assert_eq!(name_id(""), 0);
        assert_eq!(name_id("a"), 0x61);
        assert_eq!(name_id("ab"), 0x61 * 0x89 + 0x62);
        assert_eq!(name_id("AB"), name_id("ab"));
    }

    #[test]
    fn test_parameters() {
        let ext = Parameters::GENERATE_EXTENDED_NAME_ID;
        assert!(ext.contains(Parameters::GENERATE_NAME_ID));
        assert_eq!(ext.name_id_width(), Some(64));
        assert_eq!(Parameters::GENERATE_NAME_ID.name_id_width(), Some(32));
        assert_eq!(Parameters::DEFAULT.name_id_width(), None);
        assert_eq!((Parameters::DEFAULT | Parameters::FILE_HEADER_END_PADDING).bits(), 0x11);
    }

    #[test]
    fn test_parse_little_endian() {
        let data = header(Endian::Little, 24, &["a.hip", "b.hpl"], false);
        let pac = PacHeader::parse(&data, None).unwrap();
        assert_eq!(pac.endian, Endian::Little);
        assert_eq!(pac.file_count(), 2);
        assert_eq!(pac.entries[1].name, "b.hpl");
        assert_eq!(pac.entries[1].offset, 16);
        assert_eq!(pac.header_size as usize, data.len());
    }

    #[test]
    fn test_big_endian_detected() {
        let data = header(Endian::Big, 24, &["one.bin", "two.bin", "three.bin"], false);
        assert_eq!(detect_endian(&data), Endian::Big);

        let pac = PacHeader::parse(&data, None).unwrap();
        assert_eq!(pac.endian, Endian::Big);
        assert_eq!(pac.name_width, 24);
        let names: Vec<_> = pac.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["one.bin", "two.bin", "three.bin"]);
        assert_eq!(pac.entries[2].length, 5);
    }

    #[test]
    fn test_aligned_entries_padding_row() {
        // width 20 makes name+12 exactly 32 bytes; builders then emit a
        // 16-byte zero row that the zero-byte probe skips.
        let data = header(Endian::Little, 20, &["x.dds", "y.dds"], true);
        assert_eq!(detect_endian(&data), Endian::Little);
        let pac = PacHeader::parse(&data, None).unwrap();
        assert_eq!(pac.entries.len(), 2);
        assert_eq!(pac.entries[1].name, "y.dds");
        assert_eq!(pac.entries[1].index, 1);
    }

    #[test]
    fn test_bcsm_wrapper() {
        let mut data = BCSM_MAGIC.to_vec();
        data.resize(WRAPPER_SIZE, 0);
        data.extend(header(Endian::Little, 24, &["a"], false));
        data.extend([7u8; 5]);
        assert!(is_pac(&data));

        let pac = PacHeader::parse(&data, None).unwrap();
        assert_eq!(pac.base_offset, WRAPPER_SIZE);
        assert_eq!(pac.entry_data(&data, &pac.entries[0]).unwrap(), &[7u8; 5]);
    }

    #[test]
    fn test_not_a_container() {
        assert!(matches!(PacHeader::parse(b"FPAC", None), Err(Error::TooShort(4))));
        assert!(matches!(
            PacHeader::parse(&[0u8; 64], None),
            Err(Error::InvalidMagic([0, 0, 0, 0]))
        ));
    }

    #[test]
    fn test_entry_out_of_range() {
        let data = header(Endian::Little, 24, &["a"], false);
        let pac = PacHeader::parse(&data, None).unwrap();
        assert!(matches!(
            pac.entry_data(&data, &pac.entries[0]),
            Err(Error::EntryOutOfRange { .. })
        ));
    }
}
