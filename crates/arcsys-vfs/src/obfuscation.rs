//! Obfuscation detection and removal.
//!
//! Files can carry several reversible layers on top of their plain format.
//! Layers are sniffed from the first bytes and the file name, then peeled in
//! a fixed order, sniffing again after every step so that stacked layers
//! come off in one pass:
//!
//! 1. FPAC encryption (whole-container word cipher)
//! 2. FPAC deflation (`DFAS` prefix around a DEFLATE stream)
//! 3. Switch compression (gzip)
//! 4. MD5 encryption (XOR stream for files stored under a hash name)

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use arcsys_crypto::{fpac, is_md5, CryptMode, Md5XorCipher};
use arcsys_pac::{extension, BCSM_MAGIC, PAC_MAGIC};

use crate::Result;

/// gzip member magic with the DEFLATE method byte.
pub const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];

/// Prefix of a deflated container.
pub const DFAS_MAGIC: &[u8; 4] = b"DFAS";

/// `"DFASFPAC"`, original size, compressed size and the zlib header.
pub const DFAS_PREFIX_LEN: usize = 18;

/// Set of obfuscation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Obfuscation(u8);

impl Obfuscation {
    pub const NONE: Self = Self(0);
    pub const FPAC_ENCRYPTION: Self = Self(0x1);
    pub const FPAC_DEFLATION: Self = Self(0x2);
    pub const MD5_ENCRYPTION: Self = Self(0x4);
    pub const SWITCH_COMPRESSION: Self = Self(0x8);

    /// Layers in the order they are removed.
    pub const PEEL_ORDER: [Self; 4] = [
        Self::FPAC_ENCRYPTION,
        Self::FPAC_DEFLATION,
        Self::SWITCH_COMPRESSION,
        Self::MD5_ENCRYPTION,
    ];

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn label(self) -> &'static str {
        match self {
            Self::FPAC_ENCRYPTION => "fpac-encryption",
            Self::FPAC_DEFLATION => "fpac-deflation",
            Self::MD5_ENCRYPTION => "md5-encryption",
            Self::SWITCH_COMPRESSION => "gzip",
            _ => "none",
        }
    }
}

impl BitOr for Obfuscation {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Obfuscation {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Obfuscation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for layer in Self::PEEL_ORDER.into_iter().filter(|&l| self.contains(l)) {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(layer.label())?;
            first = false;
        }
        Ok(())
    }
}

/// Sniff the outermost obfuscation layer of a file.
pub fn detect(name: &str, magic: &[u8]) -> Obfuscation {
    if magic.starts_with(&GZIP_MAGIC) {
        return Obfuscation::SWITCH_COMPRESSION;
    }

    let ext = extension(name);
    if ext.is_some_and(|e| e.contains("pac")) && !magic.starts_with(BCSM_MAGIC) {
        if magic.starts_with(DFAS_MAGIC) {
            return Obfuscation::FPAC_DEFLATION;
        }
        if !magic.starts_with(PAC_MAGIC) {
            return Obfuscation::FPAC_ENCRYPTION;
        }
    }

    if ext.is_none() && is_md5(arcsys_crypto::file_name(name)) {
        return Obfuscation::MD5_ENCRYPTION;
    }

    Obfuscation::NONE
}

/// Remove every detectable layer.
///
/// Returns the plain bytes and the layers that were found. In header-only
/// mode an FPAC-encrypted file is decrypted just far enough to read its
/// header.
pub fn peel(
    mut data: Vec<u8>,
    name: &str,
    key: &[u8],
    header_only: bool,
) -> Result<(Vec<u8>, Obfuscation)> {
    let mut pending = detect(name, &data);
    let mut found = Obfuscation::NONE;

    for layer in Obfuscation::PEEL_ORDER {
        if !pending.contains(layer) {
            continue;
        }
        data = match layer {
            Obfuscation::FPAC_ENCRYPTION => {
                match fpac::crypt(&data, name, CryptMode::Decrypt, header_only) {
                    Some(plain) => plain,
                    None => {
                        tracing::debug!(name, "not FPAC-encrypted after all");
                        continue;
                    }
                }
            }
            Obfuscation::FPAC_DEFLATION => {
                let body = data.get(DFAS_PREFIX_LEN..).unwrap_or_default();
                let mut out = Vec::with_capacity(body.len() * 4);
                arcsys_segs::decompress::inflate(body, &mut out)?;
                out
            }
            Obfuscation::SWITCH_COMPRESSION => arcsys_segs::decompress::gunzip(&data)?,
            _ => {
                let mut cipher = Md5XorCipher::for_decrypt(key, name)?;
                cipher.apply(&mut data);
                data
            }
        };
        found |= layer;
        tracing::debug!(name, layer = layer.label(), len = data.len(), "peeled layer");

        // Later layers are sniffed again on the uncovered bytes.
        pending = detect(name, &data);
    }

    Ok((data, found))
}

/// Apply the FPAC cipher to plain container bytes.
pub fn fpac_encrypt(data: &[u8], name: &str) -> Vec<u8> {
    fpac::encrypt(data, name)
}

/// Apply the MD5 XOR stream for writing a file under `path`.
///
/// Returns `None` when the path offers no identifier to key the stream.
pub fn md5_encrypt(data: &[u8], path: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
    let Some(mut cipher) = Md5XorCipher::for_encrypt(key, path)? else {
        return Ok(None);
    };
    let mut out = data.to_vec();
    cipher.apply(&mut out);
    Ok(Some(out))
}
