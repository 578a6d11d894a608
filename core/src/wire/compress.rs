//! Gzip framing applied to every outbound payload.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

use super::CodecError;

pub fn compress(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
    encoder.write_all(payload).map_err(CodecError::Compression)?;
    encoder.finish().map_err(CodecError::Compression)
}

pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(payload);
    let mut out = Vec::with_capacity(payload.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(CodecError::Compression)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_round_trip() {
        let payload = b"15:10000001:Alpha:2E:Fire:40000001:Boss:3:1A2B0000".repeat(20);
        let packed = compress(&payload).unwrap();
        assert!(packed.len() < payload.len());
        assert_eq!(decompress(&packed).unwrap(), payload);
    }

    #[test]
    fn test_compress_empty_payload() {
        let packed = compress(&[]).unwrap();
        assert!(decompress(&packed).unwrap().is_empty());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        let result = decompress(b"definitely not gzip");
        assert!(matches!(result, Err(CodecError::Compression(_))));
    }
}
