//! Palette color type.

/// A 32-bit color packed as `0xAARRGGBB`.
///
/// HIP and HPL files store each entry as one 32-bit word in the file's byte
/// order, so a little-endian file holds the bytes `B, G, R, A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Argb(pub u32);

impl Argb {
    /// Fully transparent white, the engine's "transparent" palette slot.
    pub const TRANSPARENT: Self = Self(0x00FF_FFFF);
    /// Opaque black.
    pub const BLACK: Self = Self(0xFF00_0000);

    #[inline]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Build from a little-endian `B, G, R, A` byte group.
    #[inline]
    pub const fn from_bgra(bytes: [u8; 4]) -> Self {
        Self::new(bytes[3], bytes[2], bytes[1], bytes[0])
    }

    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), self.a()]
    }
}
