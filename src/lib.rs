//! # Huffman encoder and decoder
//!
//! This crate provides an `Encoder` and a `Decoder` for a static, whole-file Huffman code over
//! byte values. The encoder counts the input once, builds a prefix code from the frequencies and
//! then packs the input a second time. The frequency table is embedded in the output so that the
//! decoder rebuilds the very same code tree without it ever being transmitted.
//!
//! The container is laid out as follows, all integers are little endian:
//!
//!  * 1 byte: the number of unused bits in the last body byte, `0..=7`
//!  * 2 bytes: the number of table entries `N`
//!  * `N` times: 1 byte value and its 8 byte occurrence count, in ascending byte order
//!  * the body, code words packed least significant bit first
//!
//! Since the padding count is only known after the whole body has been packed, the stream
//! interface of the encoder needs a seekable writer and a seekable reader.
//!
//! Exemplary use of the encoder:
//!
//! ```
//! use huffstream::encode::Encoder;
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//! let mut compressed = vec![];
//!
//! let mut enc = Encoder::new();
//! let result = enc.into_vec(&mut compressed).encode_all(&data[..]);
//! result.status.unwrap();
//! ```
//!
//! And of the decoder:
//!
//! ```
//! # let compressed = huffstream::encode_to_vec(b"TOBEORNOTTOBEORTOBEORNOT");
//! use huffstream::decode::Decoder;
//! let mut decompressed = vec![];
//!
//! let mut dec = Decoder::new();
//! let result = dec.into_vec(&mut decompressed).decode_all(&compressed);
//! result.status.unwrap();
//! assert_eq!(decompressed, b"TOBEORNOTTOBEORTOBEORNOT");
//! ```
#![forbid(unsafe_code)]

/// Length of the fixed part of the header: padding count and entry count.
pub const HEADER_LEN: usize = 3;
/// Length of one serialized table entry.
pub const ENTRY_LEN: usize = 9;
/// The byte value seeded with a zero count into tables of fewer than two distinct bytes.
pub const SENTINEL: u8 = b'a';
/// Seeded instead of [`SENTINEL`] when the sentinel is the only byte of the input.
pub const SENTINEL_ALT: u8 = b'b';
/// The default amount of bytes handed to the coders at once by the stream interfaces.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

mod error;
mod table;
mod tree;

pub mod decode;
pub mod encode;

pub use self::error::{AllResult, HuffError, HuffStatus, StreamResult, VectorResult};
pub use self::table::FrequencyTable;

/// The tuning parameters of an encoder or decoder.
///
/// None of them changes the produced output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Configuration {
    chunk_size: usize,
}

impl Configuration {
    pub const fn new() -> Self {
        Configuration {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the number of bytes processed per step.
    ///
    /// This bounds the input slice passed to the coder at once as well as the intermediate
    /// output buffer of the stream and vector interfaces. Values below one are treated as one.
    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Configuration {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn build_encoder(self) -> encode::Encoder {
        encode::Encoder::with_config(self)
    }

    pub fn build_decoder(self) -> decode::Decoder {
        decode::Decoder::with_config(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::new()
    }
}

/// Compress a whole buffer.
pub fn encode_to_vec(data: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    let result = encode::Encoder::new().into_vec(&mut out).encode_all(data);
    // Slices are counted and packed from the same memory, the packer can not fail.
    debug_assert!(result.status.is_ok());
    out
}

/// Decompress a whole container.
///
/// Any malformed container is reported as an error, the partial output is discarded.
pub fn decode_to_vec(data: &[u8]) -> Result<Vec<u8>, HuffError> {
    let mut out = vec![];
    decode::Decoder::new()
        .into_vec(&mut out)
        .decode_all(data)
        .status?;
    Ok(out)
}
