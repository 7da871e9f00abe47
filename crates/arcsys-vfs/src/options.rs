//! Tree configuration.

use std::path::Path;

use arcsys_crypto::md5_xor::parse_hex_key;
use arcsys_crypto::{ARCSYS_KEY_LEN, BBTAG_KEY};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Key table family for files stored under MD5 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Md5Variant {
    /// BlazBlue Cross Tag Battle; the table is built in.
    #[default]
    Bbtag,
    /// Other Arc System Works titles; the table must be supplied.
    Arcsys,
}

/// Options shared by every node of a tree.
///
/// ```json
/// { "cache_bytes": true, "md5_variant": "arcsys", "md5_key": "00 11 22 ..." }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Keep each node's resolved bytes after the first read.
    pub cache_bytes: bool,
    pub md5_variant: Md5Variant,
    /// Hex key table, overriding the variant's built-in one.
    pub md5_key: Option<String>,
}

impl TreeOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// The XOR key table for MD5-named files.
    pub fn md5_key(&self) -> Result<Vec<u8>> {
        let key = match (&self.md5_key, self.md5_variant) {
            (Some(hex), _) => parse_hex_key(hex)?,
            (None, Md5Variant::Bbtag) => BBTAG_KEY.to_vec(),
            (None, Md5Variant::Arcsys) => return Err(Error::MissingKey),
        };
        if key.is_empty() {
            return Err(arcsys_crypto::Error::EmptyKey.into());
        }
        if self.md5_variant == Md5Variant::Arcsys && key.len() != ARCSYS_KEY_LEN {
            tracing::warn!(
                len = key.len(),
                expected = ARCSYS_KEY_LEN,
                "unexpected arcsys key table length"
            );
        }
        Ok(key)
    }
}
