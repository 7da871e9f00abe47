//! Stream ciphers for Arc System Works game archives.
//!
//! Two independent schemes are used by the engine:
//!
//! - [`fpac`] - a Mersenne-Twister-derived word cipher keyed by the upper-cased
//!   file name, applied to whole `.pac` containers
//! - [`md5_xor`] - a byte-wise XOR against a fixed key table, with the start
//!   index derived from an MD5 of the file's identifier
//!
//! Both are symmetric. All stream state lives in the value performing the
//! pass, so concurrent calls never interfere.
//!
//! # Example
//!
//! ```
//! use arcsys_crypto::fpac;
//!
//! let plain = b"FPAC\x20\x00\x00\x00 some container bytes";
//! let sealed = fpac::encrypt(plain, "char_ky_img.pac");
//! assert_eq!(fpac::decrypt(&sealed, "char_ky_img.pac", false), plain);
//! ```

mod error;
pub mod fpac;
pub mod md5_xor;

pub use error::{Error, Result};
pub use md5_xor::{Md5XorCipher, ARCSYS_KEY_LEN, BBTAG_KEY};

/// Direction of a cipher pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMode {
    Encrypt,
    Decrypt,
}

/// Strip any directory components, accepting both separator styles.
pub fn file_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

/// MD5 digest of the lower-cased identifier.
pub fn md5_digest(input: &str) -> [u8; 16] {
    md5::compute(input.to_lowercase().as_bytes()).0
}

/// Lower-case hex MD5 of the lower-cased identifier.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.to_lowercase().as_bytes()))
}

/// Whether `input` is exactly 32 hex digits.
pub fn is_md5(input: &str) -> bool {
    input.len() == 32 && input.bytes().all(|b| b.is_ascii_hexdigit())
}
