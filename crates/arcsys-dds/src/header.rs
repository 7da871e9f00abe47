//! DDS header structures.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// DDS file header, following the 4-byte magic.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DdsHeader {
    /// Header size (should be 124).
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mipmap_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

impl DdsHeader {
    /// Expected header size.
    pub const SIZE: u32 = 124;

    /// Check if this is a DX10 extended header.
    pub fn is_dx10(&self) -> bool {
        self.pixel_format.four_cc == FourCC::DX10
    }

    /// Byte-swap every numeric field of a header read from big-endian data.
    ///
    /// The four-character code is a byte string and keeps its order.
    pub fn swapped(self) -> Self {
        let pf = self.pixel_format;
        let reserved1 = self.reserved1;
        Self {
            size: self.size.swap_bytes(),
            flags: self.flags.swap_bytes(),
            height: self.height.swap_bytes(),
            width: self.width.swap_bytes(),
            pitch_or_linear_size: self.pitch_or_linear_size.swap_bytes(),
            depth: self.depth.swap_bytes(),
            mipmap_count: self.mipmap_count.swap_bytes(),
            reserved1: reserved1.map(u32::swap_bytes),
            pixel_format: DdsPixelFormat {
                size: pf.size.swap_bytes(),
                flags: pf.flags.swap_bytes(),
                four_cc: pf.four_cc,
                rgb_bit_count: pf.rgb_bit_count.swap_bytes(),
                r_bit_mask: pf.r_bit_mask.swap_bytes(),
                g_bit_mask: pf.g_bit_mask.swap_bytes(),
                b_bit_mask: pf.b_bit_mask.swap_bytes(),
                a_bit_mask: pf.a_bit_mask.swap_bytes(),
            },
            caps: self.caps.swap_bytes(),
            caps2: self.caps2.swap_bytes(),
            caps3: self.caps3.swap_bytes(),
            caps4: self.caps4.swap_bytes(),
            reserved2: self.reserved2.swap_bytes(),
        }
    }
}

/// DDS pixel format.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: FourCC,
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl DdsPixelFormat {
    /// Pixel format flag: the four-character code is valid.
    pub const FOURCC: u32 = 0x4;
}

/// Four-character code for compression type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const DXT1: Self = Self(*b"DXT1");
    pub const DXT3: Self = Self(*b"DXT3");
    pub const DXT5: Self = Self(*b"DXT5");
    pub const DX10: Self = Self(*b"DX10");
    pub const BC4U: Self = Self(*b"BC4U");
    pub const BC4S: Self = Self(*b"BC4S");
    pub const BC5U: Self = Self(*b"BC5U");
    pub const BC5S: Self = Self(*b"BC5S");
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// DX10 extended header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DdsHeaderDxt10 {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

impl DdsHeaderDxt10 {
    pub const BC1_UNORM: u32 = 71;
    pub const BC4_UNORM: u32 = 80;
    pub const BC4_SNORM: u32 = 81;
}

/// Block size in bytes for a block-compressed format.
pub fn block_size(four_cc: FourCC, dx10_format: Option<u32>) -> usize {
    match (four_cc, dx10_format) {
        (FourCC::DXT1 | FourCC::BC4U | FourCC::BC4S, _) => 8,
        (
            _,
            Some(DdsHeaderDxt10::BC1_UNORM | DdsHeaderDxt10::BC4_UNORM | DdsHeaderDxt10::BC4_SNORM),
        ) => 8,
        _ => 16,
    }
}

/// Size in bytes of one block-compressed mip level.
pub fn mipmap_size(width: u32, height: u32, block_size: usize) -> usize {
    let blocks_x = (width as usize).div_ceil(4);
    let blocks_y = (height as usize).div_ceil(4);
    blocks_x.max(1) * blocks_y.max(1) * block_size
}
