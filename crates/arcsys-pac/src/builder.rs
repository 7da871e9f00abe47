//! Container building.

use std::path::Path;

use arcsys_common::{align_up, BinaryWriter, Endian};
use walkdir::WalkDir;

use crate::header::{name_id, Parameters, PAC_MAGIC};
use crate::order::FileOrder;
use crate::{Error, Result};

/// Default minimum name field width.
pub const DEFAULT_MIN_NAME_WIDTH: usize = 24;

const ALIGNMENT: usize = 16;

/// A named payload to store in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacMember {
    pub name: String,
    pub data: Vec<u8>,
}

impl PacMember {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Options for [`build`] and [`pack_folder`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Written with [`Parameters::DEFAULT`] added.
    pub parameters: Parameters,
    pub min_name_width: usize,
    pub endian: Endian,
    /// Member order; natural order when absent.
    pub order: Option<FileOrder>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            parameters: Parameters::DEFAULT,
            min_name_width: DEFAULT_MIN_NAME_WIDTH,
            endian: Endian::Little,
            order: None,
        }
    }
}

/// Width of the name field for a set of member names.
///
/// The longest name is rounded up to a multiple of four with room for at
/// least one NUL. Name-ID generation forces a fixed width of 32 (or 64 for
/// extended IDs) and rejects names that would reach it.
pub fn name_field_width(
    names: &[&str],
    parameters: Parameters,
    min_width: usize,
) -> Result<usize> {
    let Some(longest) = names.iter().copied().max_by_key(|n| n.len()) else {
        return Ok(min_width);
    };

    let rounded = longest.len() + 4 - longest.len() % 4;
    let width = match parameters.name_id_width() {
        Some(fixed) if rounded >= fixed => {
            return Err(Error::NameTooLong {
                name: longest.to_string(),
                width: fixed,
            })
        }
        Some(fixed) => fixed,
        None => rounded,
    };
    Ok(width.max(min_width))
}

/// Shorten a name so that it and a NUL fit in `width`, keeping the extension.
fn fit_name(name: &str, width: usize) -> Result<String> {
    if name.len() < width {
        return Ok(name.to_string());
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    let keep = width
        .checked_sub(ext.len() + 1)
        .filter(|&k| k <= stem.len())
        .ok_or_else(|| Error::NameTooLong {
            name: name.to_string(),
            width,
        })?;
    let mut cut = keep;
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    Ok(format!("{}{}", &stem[..cut], ext))
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::SizeOverflow(value))
}

/// Build a container from members.
///
/// Members are laid out in manifest order when one is given, otherwise in the
/// order passed. Entries and payloads are padded to 16 bytes, and the header
/// size and total length are patched in at the end.
pub fn build(members: &[PacMember], options: &BuildOptions) -> Result<Vec<u8>> {
    let mut members: Vec<&PacMember> = members.iter().collect();
    if let Some(order) = &options.order {
        order.sort(&mut members, |m| m.name.as_str());
    }

    let parameters = options.parameters | Parameters::DEFAULT;
    let with_id = parameters.name_id_width().is_some();
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    let width = name_field_width(&names, parameters, options.min_name_width)?;

    let payload_size: usize = members
        .iter()
        .map(|m| align_up(m.data.len(), ALIGNMENT))
        .sum();
    let entry_size = width + 12 + usize::from(with_id) * 4 + ALIGNMENT;
    let mut w = BinaryWriter::with_capacity(
        0x20 + members.len() * entry_size + payload_size,
        options.endian,
    );

    w.write_bytes(PAC_MAGIC);
    w.write_u32(0);
    w.write_u32(0);
    w.write_u32(to_u32(members.len())?);
    w.write_u32(parameters.bits());
    w.write_u32(to_u32(width)?);
    w.write_zeros(8);

    let mut offset = 0usize;
    for (index, member) in members.iter().enumerate() {
        let name = fit_name(&member.name, width)?;
        w.write_bytes(name.as_bytes());
        w.write_zeros(width - name.len());
        w.write_u32(to_u32(index)?);
        w.write_u32(to_u32(offset)?);
        w.write_u32(to_u32(member.data.len())?);
        if with_id {
            w.write_u32(name_id(&name));
        }

        let rem = (width + 12 + if with_id { 4 } else { 0 }) % ALIGNMENT;
        let pad = match (rem, with_id) {
            (0, true) => 0,
            (0, false) => ALIGNMENT,
            (rem, _) => ALIGNMENT - rem,
        };
        w.write_zeros(pad);

        offset += align_up(member.data.len(), ALIGNMENT);
    }

    let header_size = w.position();
    for member in &members {
        w.write_bytes(&member.data);
        w.pad_to(ALIGNMENT);
    }

    let total = w.position();
    w.patch_u32(4, to_u32(header_size)?)?;
    w.patch_u32(8, to_u32(total)?)?;

    tracing::debug!(
        members = members.len(),
        name_width = width,
        header_size,
        total,
        "built PAC container"
    );
    Ok(w.into_inner())
}

/// Collect a folder's members: sub-folders first, then files, each group in
/// name order. Sub-folders are packed into nested `<folder>.pac` members.
pub fn folder_members(path: &Path, options: &BuildOptions) -> Result<Vec<PacMember>> {
    let mut folders = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            folders.push(entry);
        } else {
            files.push(entry);
        }
    }

    let mut members = Vec::with_capacity(folders.len() + files.len());
    for folder in folders {
        let name = format!("{}.pac", folder.file_name().to_string_lossy());
        let nested = BuildOptions {
            order: options
                .order
                .as_ref()
                .and_then(|order| order.child(&name))
                .cloned(),
            ..options.clone()
        };
        tracing::trace!(folder = %folder.path().display(), "packing nested folder");
        members.push(PacMember::new(name, pack_folder(folder.path(), &nested)?));
    }
    for file in files {
        let name = file.file_name().to_string_lossy().into_owned();
        members.push(PacMember::new(name, std::fs::read(file.path())?));
    }
    Ok(members)
}

/// Pack a folder into a container.
pub fn pack_folder(path: &Path, options: &BuildOptions) -> Result<Vec<u8>> {
    build(&folder_members(path, options)?, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PacHeader;

    /// xorshift32, enough to vary payload sizes reproducibly.
    struct Rng(u32);

    impl Rng {
        fn next(&mut self) -> u32 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            self.0
        }
    }

    fn random_members(count: usize, seed: u32) -> Vec<PacMember> {
        let mut rng = Rng(seed);
        (0..count)
            .map(|i| {
                let len = (rng.next() % 501) as usize;
                let data = (0..len).map(|_| rng.next() as u8).collect();
                PacMember::new(format!("member_{i:03}.bin"), data)
            })
            .collect()
    }

    fn assert_roundtrip(members: &[PacMember], options: &BuildOptions) {
        let data = build(members, options).unwrap();
        let pac = PacHeader::parse(&data, None).unwrap();

        assert_eq!(pac.endian, options.endian);
        assert_eq!(pac.file_count(), members.len());
        assert_eq!(pac.file_length as usize, data.len());
        for (entry, member) in pac.entries.iter().zip(members) {
            assert_eq!(entry.name, member.name);
            assert_eq!(entry.offset % 16, 0);
            assert_eq!(pac.data_range(entry).start % 16, 0);
            assert_eq!(pac.entry_data(&data, entry).unwrap(), &member.data[..]);
        }
    }

    #[test]
    fn test_roundtrip_random_payloads() {
        let members = random_members(12, 0x1234_5678);
        assert_roundtrip(&members, &BuildOptions::default());
    }

    #[test]
    fn test_roundtrip_big_endian() {
        let members = random_members(7, 0xC0FF_EE11);
        let options = BuildOptions {
            endian: Endian::Big,
            ..Default::default()
        };
        assert_roundtrip(&members, &options);
    }

    #[test]
    fn test_roundtrip_name_id() {
        let members = random_members(5, 42);
        let options = BuildOptions {
            parameters: Parameters::GENERATE_NAME_ID,
            ..Default::default()
        };
        assert_roundtrip(&members, &options);

        let data = build(&members, &options).unwrap();
        let pac = PacHeader::parse(&data, None).unwrap();
        assert_eq!(pac.name_width, 32);
        assert!(pac.parameters.contains(Parameters::GENERATE_NAME_ID | Parameters::DEFAULT));
        // name(32) + index/offset/length + id = 48 bytes per entry.
        assert_eq!(pac.header_size as usize, 0x20 + 48 * members.len());
        let id_at = 0x20 + 44;
        assert_eq!(
            u32::from_le_bytes(data[id_at..id_at + 4].try_into().unwrap()),
            name_id("member_000.bin")
        );
    }

    #[test]
    fn test_aligned_width_padding_row() {
        let members = vec![PacMember::new("a", vec![1, 2, 3]), PacMember::new("b", vec![4])];
        let options = BuildOptions {
            min_name_width: 20,
            ..Default::default()
        };
        let data = build(&members, &options).unwrap();
        assert_eq!(&data[0x14..0x18], &20u32.to_le_bytes());
        assert_eq!(u32::from_le_bytes(data[4..8].try_into().unwrap()), 0x20 + 48 * 2);
        assert_roundtrip(&members, &options);
    }

    #[test]
    fn test_name_width() {
        assert_eq!(name_field_width(&[], Parameters::DEFAULT, 24).unwrap(), 24);
        assert_eq!(name_field_width(&["abc"], Parameters::DEFAULT, 0).unwrap(), 4);
        assert_eq!(name_field_width(&["abcd"], Parameters::DEFAULT, 0).unwrap(), 8);
        let thirty = "x".repeat(30);
        assert_eq!(
            name_field_width(&[thirty.as_str()], Parameters::DEFAULT, 24).unwrap(),
            32
        );
        assert_eq!(
            name_field_width(&["short"], Parameters::GENERATE_EXTENDED_NAME_ID, 24).unwrap(),
            64
        );

        let long = "y".repeat(28);
        assert!(matches!(
            name_field_width(&[long.as_str()], Parameters::GENERATE_NAME_ID, 24),
            Err(Error::NameTooLong { width: 32, .. })
        ));
        assert!(
            name_field_width(&[long.as_str()], Parameters::GENERATE_EXTENDED_NAME_ID, 24).is_ok()
        );
    }

    #[test]
    fn test_fit_name_keeps_extension() {
        assert_eq!(fit_name("abc.hip", 8).unwrap(), "abc.hip");
        assert_eq!(fit_name("abcdefgh.hip", 8).unwrap(), "abc.hip");
        assert!(fit_name("a.verylongext", 4).is_err());
    }

    #[test]
    fn test_manifest_order() {
        let members = vec![
            PacMember::new("c.bin", vec![3]),
            PacMember::new("new.bin", vec![9]),
            PacMember::new("a.bin", vec![1]),
        ];
        let options = BuildOptions {
            order: Some(FileOrder::parse("a.bin\nc.bin\n")),
            ..Default::default()
        };
        let data = build(&members, &options).unwrap();
        let pac = PacHeader::parse(&data, None).unwrap();
        let names: Vec<_> = pac.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["new.bin", "a.bin", "c.bin"]);
        assert_eq!(pac.entries[2].index, 2);
    }

    #[test]
    fn test_pack_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("z.txt"), b"zzz").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("inner.bin"), b"inner").unwrap();

        let data = pack_folder(dir.path(), &BuildOptions::default()).unwrap();
        let pac = PacHeader::parse(&data, None).unwrap();
        let names: Vec<_> = pac.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sub.pac", "a.txt", "z.txt"]);

        let nested = pac.entry_data(&data, &pac.entries[0]).unwrap();
        let inner = PacHeader::parse(nested, None).unwrap();
        assert_eq!(inner.entries[0].name, "inner.bin");
        assert_eq!(inner.entry_data(nested, &inner.entries[0]).unwrap(), b"inner");
    }

    #[test]
    fn test_pack_folder_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("1.bin"), b"1").unwrap();
        std::fs::write(dir.path().join("sub").join("2.bin"), b"2").unwrap();
        std::fs::write(dir.path().join("top.bin"), b"t").unwrap();

        let options = BuildOptions {
            order: Some(FileOrder::parse("top.bin\nsub.pac\n{\n    2.bin\n    1.bin\n}\n")),
            ..Default::default()
        };
        let data = pack_folder(dir.path(), &options).unwrap();
        let pac = PacHeader::parse(&data, None).unwrap();
        assert_eq!(pac.entries[0].name, "top.bin");

        let nested = pac.entry_data(&data, &pac.entries[1]).unwrap();
        let inner = PacHeader::parse(nested, None).unwrap();
        let names: Vec<_> = inner.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["2.bin", "1.bin"]);
    }
}
