//! Decompression of Snappy block-compressed request bodies.
//!
//! Prometheus compresses remote-write payloads with the Snappy *block*
//! format: a varint preamble declaring the decompressed length, followed by
//! a sequence of literal and copy elements. The block format carries no
//! checksum, so corruption is detected only when it produces an invalid
//! element or an output length that disagrees with the preamble.

use thiserror::Error;

/// Errors returned when decompressing a request body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The preamble declares a decompressed size above the configured limit.
    #[error("decoded payload size ({declared} bytes) exceeds the maximum ({max} bytes)")]
    DecodedSizeExceeded {
        /// The size declared by the payload preamble.
        declared: usize,
        /// The configured maximum.
        max: usize,
    },

    /// The payload is not a valid Snappy block.
    #[error("invalid snappy block: {0}")]
    Snappy(#[from] snap::Error),
}

/// Decompresses Snappy block-compressed payloads, refusing to produce more
/// than `max_decoded_bytes` of output.
#[derive(Debug, Clone, Copy)]
pub struct WireDecoder {
    max_decoded_bytes: usize,
}

impl WireDecoder {
    /// Construct a decoder refusing payloads that declare a decompressed size
    /// larger than `max_decoded_bytes`.
    pub fn new(max_decoded_bytes: usize) -> Self {
        Self { max_decoded_bytes }
    }

    /// The maximum decompressed payload size this decoder accepts.
    pub fn max_decoded_bytes(&self) -> usize {
        self.max_decoded_bytes
    }

    /// Decompress `input`.
    ///
    /// An empty `input` decompresses to an empty output.
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        // The decoder allocates the declared length up front - validate it
        // before handing over a payload that could claim gigabytes in a
        // handful of bytes.
        let declared = snap::raw::decompress_len(input)?;
        if declared > self.max_decoded_bytes {
            return Err(DecodeError::DecodedSizeExceeded {
                declared,
                max: self.max_decoded_bytes,
            });
        }

        Ok(snap::raw::Decoder::new().decompress_vec(input)?)
    }
}
