// src/decompression.rs
//
// Response bodies are fetched without transparent decompression, so the
// Content-Encoding header is honoured here.

use flate2::read::{GzDecoder, ZlibDecoder};
use std::borrow::Cow;
use std::io::Read;
use thiserror::Error;

const BROTLI_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum DecompressionError {
    #[error("unsupported content-encoding `{0}`")]
    Unsupported(String),
    #[error("{encoding} decode failed: {source}")]
    Corrupt {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes `body` according to a Content-Encoding header value.
///
/// Encodings listed as `a, b` were applied in that order and are undone in
/// reverse. A missing header or `identity` returns the body untouched.
pub fn decode<'a>(
    content_encoding: Option<&str>,
    body: &'a [u8],
) -> Result<Cow<'a, [u8]>, DecompressionError> {
    let Some(header) = content_encoding else {
        return Ok(Cow::Borrowed(body));
    };

    let mut data = Cow::Borrowed(body);
    for encoding in header.split(',').map(str::trim).rev() {
        let encoding = encoding.to_ascii_lowercase();
        data = match encoding.as_str() {
            "" | "identity" => data,
            "br" => {
                let decoder = brotli::Decompressor::new(&data[..], BROTLI_BUFFER_SIZE);
                Cow::Owned(read_all("br", decoder)?)
            }
            "gzip" | "x-gzip" => Cow::Owned(read_all("gzip", GzDecoder::new(&data[..]))?),
            "deflate" => Cow::Owned(read_all("deflate", ZlibDecoder::new(&data[..]))?),
            _ => return Err(DecompressionError::Unsupported(encoding)),
        };
    }
    Ok(data)
}

fn read_all<R: Read>(encoding: &'static str, mut reader: R) -> Result<Vec<u8>, DecompressionError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| DecompressionError::Corrupt { encoding, source })?;
    Ok(out)
}
