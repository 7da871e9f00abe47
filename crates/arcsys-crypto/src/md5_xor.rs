//! MD5-keyed XOR stream.
//!
//! Files stored under a bare 32-hex-digit name are XORed byte by byte with a
//! fixed key table. The starting index comes from byte 7 of an MD5 digest of
//! the file's identifier and advances by one per byte, wrapping at the table
//! length.

use crate::{file_name, is_md5, md5_digest, md5_hex, Error, Result};

/// Key table used by BlazBlue Cross Tag Battle.
pub const BBTAG_KEY: [u8; 43] = [
    0xF5, 0x5C, 0x84, 0x2A, 0xAD, 0x61, 0x54, 0xE7, 0x0A, 0xFC, 0x99, 0x6B, 0xD5, 0xA4, 0xD3, 0xD8,
    0x48, 0x26, 0x69, 0xCB, 0x07, 0x42, 0x13, 0x5E, 0x10, 0x23, 0xD2, 0x6D, 0x36, 0xC7, 0xC1, 0x66,
    0xDF, 0xA1, 0xAD, 0xF1, 0x44, 0x44, 0x7E, 0xC9, 0x8E, 0x24, 0x99,
];

/// Length of the generic Arc System Works key table.
///
/// The table itself is not distributed and must be supplied by the caller.
pub const ARCSYS_KEY_LEN: usize = 0x2B;

/// XOR stream state for a single pass.
#[derive(Debug, Clone)]
pub struct Md5XorCipher<'k> {
    key: &'k [u8],
    index: usize,
}

impl<'k> Md5XorCipher<'k> {
    /// Start a stream at an explicit index.
    pub fn new(key: &'k [u8], index: usize) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Self {
            key,
            index: index % key.len(),
        })
    }

    /// Derive the start index for decryption from the bare file name.
    pub fn for_decrypt(key: &'k [u8], path: &str) -> Result<Self> {
        let index = md5_digest(file_name(path))[7] as usize;
        Self::new(key, index)
    }

    /// Derive the start index for encryption.
    ///
    /// A file name beginning with an MD5-looking prefix is keyed by that
    /// prefix. Otherwise the path from its last `data` component onward is
    /// hashed, and that hex digest hashed again. Returns `Ok(None)` when
    /// neither identifier is available.
    pub fn for_encrypt(key: &'k [u8], path: &str) -> Result<Option<Self>> {
        let name = file_name(path);
        if name.len() > 32 && name.is_char_boundary(32) && is_md5(&name[..32]) {
            let index = md5_digest(&name[..32])[7] as usize;
            return Self::new(key, index).map(Some);
        }

        if let Some(start) = path.rfind("data") {
            let data_path = path[start..].replace('\\', "/");
            let index = md5_digest(&md5_hex(&data_path))[7] as usize;
            return Self::new(key, index).map(Some);
        }

        tracing::debug!(path, "no identifier to key the MD5 stream");
        Ok(None)
    }

    /// Current position in the key table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// XOR `data` in place and advance the stream.
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte ^= self.key[self.index];
            self.index = (self.index + 1) % self.key.len();
        }
    }
}

/// Parse a key table written as hex, ignoring whitespace.
pub fn parse_hex_key(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(Error::InvalidKey(text.to_string()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| Error::InvalidKey(text.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_same_index() {
        let original: Vec<u8> = (0..300u32).map(|i| (i * 31) as u8).collect();
        let name = md5_hex("data/char/ky.pac");

        let mut data = original.clone();
        Md5XorCipher::for_decrypt(&BBTAG_KEY, &name)
            .unwrap()
            .apply(&mut data);
        assert_ne!(data, original);

        Md5XorCipher::for_decrypt(&BBTAG_KEY, &name)
            .unwrap()
            .apply(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_index_in_range() {
        for name in ["a", "b.pac", "0123456789abcdef0123456789abcdef", "DATA/x"] {
            let mut cipher = Md5XorCipher::for_decrypt(&BBTAG_KEY, name).unwrap();
            assert!(cipher.index() < BBTAG_KEY.len());
            cipher.apply(&mut [0u8; 100]);
            assert!(cipher.index() < BBTAG_KEY.len());
        }
    }

    #[test]
    fn test_encrypt_index_from_md5_prefix() {
        let hash = md5_hex("whatever");
        let name = format!("{hash}.bak");
        let enc = Md5XorCipher::for_encrypt(&BBTAG_KEY, &name).unwrap().unwrap();
        let dec = Md5XorCipher::for_decrypt(&BBTAG_KEY, &hash).unwrap();
        assert_eq!(enc.index(), dec.index());
    }

    #[test]
    fn test_encrypt_index_from_data_path() {
        let enc = Md5XorCipher::for_encrypt(&BBTAG_KEY, r"D:\game\data\char\ky.pac")
            .unwrap()
            .unwrap();
        let stored_name = md5_hex("data/char/ky.pac");
        let dec = Md5XorCipher::for_decrypt(&BBTAG_KEY, &stored_name).unwrap();
        assert_eq!(enc.index(), dec.index());
    }

    #[test]
    fn test_encrypt_without_identifier() {
        assert!(Md5XorCipher::for_encrypt(&BBTAG_KEY, "loose.pac")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_hex_key() {
        assert_eq!(parse_hex_key("F5 5c\n84").unwrap(), vec![0xF5, 0x5C, 0x84]);
        assert!(parse_hex_key("F5 5").is_err());
        assert!(parse_hex_key("zz").is_err());
        assert!(Md5XorCipher::new(&[], 0).is_err());
    }
}
