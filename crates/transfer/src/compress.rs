use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::TransferError;

/// Gzip-compresses `data` at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let buf = Vec::with_capacity(data.len() / 2 + 32);
    let mut encoder = GzEncoder::new(buf, Compression::default());
    encoder.write_all(data).map_err(TransferError::Compression)?;
    encoder.finish().map_err(TransferError::Compression)
}

/// Inflates a gzip body produced by [`compress`] (or any gzip stream).
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, TransferError> {
    let mut out = Vec::with_capacity(data.len() * 2);
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(TransferError::Decompression)?;
    Ok(out)
}
