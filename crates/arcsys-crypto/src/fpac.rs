//! FPAC container cipher.
//!
//! A 624-word twister generator is seeded from the upper-cased file name.
//! Each tempered output word is XORed with a little-endian input word and
//! with the previous plaintext word (initially the `"FPAC"` magic), so the
//! first decrypted word of a real container is always a known sentinel.

use crate::{file_name, CryptMode};

const STATE_LEN: usize = 624;
const SHIFT_LEN: usize = 397;
const SPLIT: usize = STATE_LEN - SHIFT_LEN;
const MATRIX: u32 = 0x9908_B0DF;

/// Plain container magic `"FPAC"` as a little-endian word.
pub const FPAC_SENTINEL: u32 = 0x4341_5046;
/// Deflated container magic `"DFAS"` as a little-endian word.
pub const DFAS_SENTINEL: u32 = 0x5341_4644;

/// Bytes processed by a header-only pass.
pub const HEADER_ONLY_LEN: usize = 40;

/// Keystream generator for one cipher pass.
pub struct FpacKeystream {
    state: Box<[u32; STATE_LEN]>,
    index: usize,
}

impl FpacKeystream {
    /// Seed a generator from a path; only the final component is used.
    pub fn new(path: &str) -> Self {
        let seed = file_name(path)
            .bytes()
            .fold(0u32, |seed, b| {
                seed.wrapping_mul(0x89)
                    .wrapping_add(u32::from(b.to_ascii_uppercase()))
            });
        Self::from_seed(seed)
    }

    /// Seed a generator directly.
    pub fn from_seed(seed: u32) -> Self {
        let mut state = Box::new([0u32; STATE_LEN]);
        state[0] = seed;
        for i in 1..STATE_LEN {
            let prev = state[i - 1];
            state[i] = ((prev >> 30) ^ prev)
                .wrapping_mul(0x6C07_8965)
                .wrapping_add(i as u32);
        }
        Self {
            state,
            index: STATE_LEN,
        }
    }

    fn twist(&mut self) {
        let s = &mut self.state;
        for i in 0..STATE_LEN {
            let next = s[(i + 1) % STATE_LEN];
            let other = if i < SPLIT {
                s[i + SHIFT_LEN]
            } else {
                s[i - SPLIT]
            };
            let mut y = ((s[i] ^ next) & 0x7FFF_FFFE) ^ s[i];
            y >>= 1;
            if next & 1 != 0 {
                y ^= MATRIX;
            }
            s[i] = y ^ other;
        }
        self.index = 0;
    }

    /// Next tempered keystream word.
    pub fn next_word(&mut self) -> u32 {
        if self.index >= STATE_LEN {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y & 0xFF3A_58AD) << 7;
        y ^= (y & 0xFFFF_DF8C) << 15;
        y ^= y >> 18;
        y
    }
}

/// Run one cipher pass.
///
/// Returns `None` when decrypting and the first word does not decrypt to a
/// container sentinel. In header-only mode the pass stops after
/// [`HEADER_ONLY_LEN`] bytes unless the `"DFAS"` sentinel is seen, and the
/// output is truncated to the bytes processed.
pub fn crypt(data: &[u8], path: &str, mode: CryptMode, header_only: bool) -> Option<Vec<u8>> {
    let mut keystream = FpacKeystream::new(path);
    let mut limit = if header_only && data.len() >= HEADER_ONLY_LEN {
        HEADER_ONLY_LEN
    } else {
        data.len()
    };

    let mut out = Vec::with_capacity(limit + 4);
    let mut feedback = FPAC_SENTINEL;
    let mut pos = 0;

    while pos < limit {
        let mut word = [0u8; 4];
        let end = (pos + 4).min(data.len());
        word[..end - pos].copy_from_slice(&data[pos..end]);
        let input = u32::from_le_bytes(word);

        let value = keystream.next_word() ^ input ^ feedback;
        out.extend_from_slice(&value.to_le_bytes());

        feedback = match mode {
            CryptMode::Encrypt => input,
            CryptMode::Decrypt => value,
        };

        if pos == 0 && mode == CryptMode::Decrypt {
            match value {
                FPAC_SENTINEL => {}
                DFAS_SENTINEL => limit = data.len(),
                other => {
                    tracing::trace!("FPAC sentinel mismatch ({other:#010x}), leaving data untouched");
                    return None;
                }
            }
        }
        pos += 4;
    }

    out.truncate(limit);
    Some(out)
}

/// Decrypt a container, returning the input unchanged if it is not FPAC-encrypted.
pub fn decrypt(data: &[u8], path: &str, header_only: bool) -> Vec<u8> {
    crypt(data, path, CryptMode::Decrypt, header_only).unwrap_or_else(|| data.to_vec())
}

/// Encrypt a whole container.
pub fn encrypt(data: &[u8], path: &str) -> Vec<u8> {
    crypt(data, path, CryptMode::Encrypt, false).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        let mut data = b"FPAC".to_vec();
        data.extend((0..len - 4).map(|i| (i * 7 + 3) as u8));
        data
    }

    #[test]
    fn test_roundtrip() {
        let plain = sample(1203);
        let sealed = encrypt(&plain, "data/char/char_ky_img.pac");
        assert_eq!(sealed.len(), plain.len());
        assert_ne!(sealed, plain);
        assert_eq!(decrypt(&sealed, "char_ky_img.pac", false), plain);
    }

    #[test]
    fn test_key_ignores_case_and_directories() {
        let plain = sample(64);
        let sealed = encrypt(&plain, "CHAR_KY_IMG.PAC");
        assert_eq!(decrypt(&sealed, r"x\y\char_ky_img.pac", false), plain);
    }

    #[test]
    fn test_long_stream_crosses_twist() {
        let plain = sample(STATE_LEN * 4 * 2 + 17);
        let sealed = encrypt(&plain, "big.pac");
        assert_eq!(decrypt(&sealed, "big.pac", false), plain);
    }

    #[test]
    fn test_non_sentinel_returns_input() {
        let data: Vec<u8> = (0..64u8).collect();
        assert!(crypt(&data, "x.pac", CryptMode::Decrypt, false).is_none());
        assert_eq!(decrypt(&data, "x.pac", false), data);
    }

    #[test]
    fn test_header_only() {
        let plain = sample(200);
        let sealed = encrypt(&plain, "a.pac");
        let head = decrypt(&sealed, "a.pac", true);
        assert_eq!(head, &plain[..HEADER_ONLY_LEN]);
    }

    #[test]
    fn test_dfas_sentinel_resumes_full_length() {
        let mut plain = b"DFAS".to_vec();
        plain.extend(std::iter::repeat(0x5A).take(96));
        let sealed = encrypt(&plain, "a.pac");
        assert_eq!(decrypt(&sealed, "a.pac", true), plain);
    }
}
