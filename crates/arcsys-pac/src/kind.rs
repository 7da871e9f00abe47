//! Member classification.

use std::fmt;

/// What a container member holds, decided from its name and magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Container,
    Image,
    Palette,
    Texture,
    CompressedBlob,
    Opaque,
}

/// Extension lookup, checked in order.
const EXTENSIONS: &[(&str, EntryKind)] = &[
    ("pac", EntryKind::Container),
    ("paccs", EntryKind::Container),
    ("pacgz", EntryKind::Container),
    ("fontpac", EntryKind::Container),
    ("hip", EntryKind::Image),
    ("hpl", EntryKind::Palette),
    ("dds", EntryKind::Texture),
];

/// Extension of a member name, without the dot.
pub fn extension(name: &str) -> Option<&str> {
    let file = name.rsplit(|c| c == '/' || c == '\\' || c == ':').next()?;
    file.rfind('.').map(|dot| &file[dot + 1..])
}

impl EntryKind {
    /// Classify by name alone.
    pub fn from_name(name: &str) -> Self {
        extension(name)
            .and_then(|ext| {
                EXTENSIONS
                    .iter()
                    .find(|(known, _)| known.eq_ignore_ascii_case(ext))
                    .map(|&(_, kind)| kind)
            })
            .unwrap_or(Self::Opaque)
    }

    /// Refine an opaque member once its first bytes are known.
    pub fn refine(self, magic: &[u8]) -> Self {
        match self {
            Self::Opaque if magic.starts_with(b"segs") => Self::CompressedBlob,
            kind => kind,
        }
    }

    #[inline]
    pub fn is_container(self) -> bool {
        self == Self::Container
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Image => "image",
            Self::Palette => "palette",
            Self::Texture => "texture",
            Self::CompressedBlob => "segs",
            Self::Opaque => "file",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(EntryKind::from_name("chr.pac"), EntryKind::Container);
        assert_eq!(EntryKind::from_name("font.fontpac"), EntryKind::Container);
        assert_eq!(EntryKind::from_name("a.pacgz"), EntryKind::Container);
        assert_eq!(EntryKind::from_name("x/y/face.HIP"), EntryKind::Image);
        assert_eq!(EntryKind::from_name("root.pac:pal.hpl"), EntryKind::Palette);
        assert_eq!(EntryKind::from_name("t.dds"), EntryKind::Texture);
        assert_eq!(EntryKind::from_name("script.bin"), EntryKind::Opaque);
        assert_eq!(EntryKind::from_name("noext"), EntryKind::Opaque);
        assert_eq!(EntryKind::from_name("dir.pac/noext"), EntryKind::Opaque);
    }

    #[test]
    fn test_refine() {
        assert_eq!(EntryKind::Opaque.refine(b"segs\0\0"), EntryKind::CompressedBlob);
        assert_eq!(EntryKind::Opaque.refine(b"HIP\0"), EntryKind::Opaque);
        assert_eq!(EntryKind::Image.refine(b"segs"), EntryKind::Image);
    }
}
