use std::io;

/// The result of a coding operation on a pair of buffer.
#[must_use = "Contains a status with potential error information"]
#[derive(Debug)]
pub struct StreamResult {
    /// The number of bytes consumed from the input buffer.
    pub consumed_in: usize,
    /// The number of bytes written into the output buffer.
    pub consumed_out: usize,
    /// The status after returning from the write call.
    pub status: Result<HuffStatus, HuffError>,
}

/// The result of coding into an output stream.
#[must_use = "Contains a status with potential error information"]
#[derive(Debug)]
pub struct AllResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    /// The possible error that occurred.
    ///
    /// Note that when writing into streams it is not in general possible to recover from an
    /// error.
    pub status: io::Result<()>,
}

/// The result of coding into a vector.
#[must_use = "Contains a status with potential error information"]
#[derive(Debug)]
pub struct VectorResult {
    /// The number of bytes consumed from the input buffer.
    pub consumed_in: usize,
    /// The number of bytes written into the output buffer.
    pub consumed_out: usize,
    /// The status after returning from the write call.
    pub status: Result<HuffStatus, HuffError>,
}

/// The status after successful coding of some data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HuffStatus {
    /// Everything went well.
    Ok,
    /// No bytes were read or written.
    ///
    /// Either the input was empty before the end of the stream was signalled, or the output
    /// buffer had no room for even a single byte.
    NoProgress,
    /// The whole container has been processed.
    Done,
}

/// The error kind after unsuccessful coding of some data.
///
/// Every malformed container is reported through one of these; the decoder never panics on
/// its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum HuffError {
    /// The input ended before the header declared by the entry count was complete.
    #[error("container header is truncated")]
    TruncatedHeader,

    /// The padding byte is not in `0..=7`, or claims padding of a body that has no bytes.
    #[error("invalid padding count {0}")]
    InvalidPadding(u8),

    /// The header declares a frequency table without any entries.
    #[error("frequency table has no entries")]
    EmptyTable,

    /// A bit of the body leads to a child that does not exist in the code tree.
    #[error("bitstream does not match the code tree")]
    InvalidBitstream,

    /// The body ended in the middle of a code word.
    #[error("bitstream ends inside a code word")]
    TruncatedBody,

    /// The encoder was handed a byte that its frequency pass never saw.
    ///
    /// Happens when the source changes between the counting and the packing pass.
    #[error("byte {0:#04x} was not counted before encoding")]
    UncountedByte(u8),
}

impl From<HuffError> for io::Error {
    fn from(err: HuffError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

impl HuffError {
    /// Whether the error describes a malformed container, as opposed to encoder misuse.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, HuffError::UncountedByte(_))
    }
}
