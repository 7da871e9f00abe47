//! DEFLATE and gzip helpers.

use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder};

use crate::{Error, Result};

/// Inflate a raw DEFLATE stream.
pub fn inflate(data: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let mut decoder = DeflateDecoder::new(data);

    output.clear();
    decoder
        .read_to_end(output)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    Ok(())
}

/// Inflate a raw DEFLATE stream with a size hint.
pub fn inflate_sized(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(expected_size);
    inflate(data, &mut output)?;
    Ok(output)
}

/// Decompress a gzip member.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder};
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_inflate() {
        let original = b"HIP pixels HIP pixels HIP pixels HIP pixels";

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(inflate_sized(&compressed, original.len()).unwrap(), original);
    }

    #[test]
    fn test_gunzip() {
        let original = b"switch build payload";

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(gunzip(&compressed).unwrap(), original);
        assert!(gunzip(b"not gzip").is_err());
    }
}
