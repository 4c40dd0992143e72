//! A module for all encoding needs.
use std::io::{self, BufRead, Seek, SeekFrom, Write};

use bitvec::field::BitField;
use bitvec::prelude::{BitSlice, Lsb0};
use tracing::{debug, trace};

use crate::error::{AllResult, HuffError, HuffStatus, StreamResult, VectorResult};
use crate::table::FrequencyTable;
use crate::tree::{CodeBook, CodeTree};
use crate::Configuration;

#[cfg(feature = "async")]
use futures::io::{AsyncBufRead, AsyncSeek, AsyncWrite};

/// The state for encoding data with a static Huffman code.
///
/// Encoding happens in two passes over the same input. All of it is first handed to [`count`],
/// then [`header`] seals the frequency table and builds the code, then all of the input is
/// handed to [`encode_bytes`] once more. The stream interfaces [`into_stream`] and [`into_vec`]
/// do all of this at once.
///
/// [`count`]: #method.count
/// [`header`]: #method.header
/// [`encode_bytes`]: #method.encode_bytes
/// [`into_stream`]: #method.into_stream
/// [`into_vec`]: #method.into_vec
pub struct Encoder {
    config: Configuration,
    /// The frequencies of the first pass.
    table: FrequencyTable,
    /// Present once the table has been sealed.
    state: Option<EncodeState>,
}

/// A encoding stream sink.
///
/// See [`Encoder::into_stream`] on how to create this type and more information.
///
/// [`Encoder::into_stream`]: struct.Encoder.html#method.into_stream
pub struct IntoStream<'e, W> {
    encoder: &'e mut Encoder,
    writer: W,
}

/// An encoding sink into a vector.
///
/// See [`Encoder::into_vec`] on how to create this type and more information.
///
/// [`Encoder::into_vec`]: struct.Encoder.html#method.into_vec
pub struct IntoVec<'e> {
    encoder: &'e mut Encoder,
    vector: &'e mut Vec<u8>,
}

/// An async encoding sink.
///
/// See [`Encoder::into_async`] on how to create this type and more information.
///
/// [`Encoder::into_async`]: struct.Encoder.html#method.into_async
#[cfg(feature = "async")]
pub struct IntoAsync<'e, W> {
    encoder: &'e mut Encoder,
    writer: W,
}

struct EncodeState {
    /// The code word of each counted byte.
    codes: CodeBook,
    /// The bit buffer for encoding.
    buffer: LsbBuffer,
    /// If no more input follows.
    has_ended: bool,
    /// The number of unused bits in the last byte, once it has been padded.
    padding: Option<u8>,
}

struct LsbBuffer {
    /// The buffer bits.
    buffer: u64,
    /// The number of valid buffer bits.
    bits_in_buffer: u8,
    /// Complete bytes not yet written out.
    bytes: Vec<u8>,
    read_mark: usize,
}

impl Encoder {
    /// Create a new encoder with the default configuration.
    pub fn new() -> Self {
        Encoder::with_config(Configuration::new())
    }

    pub fn with_config(config: Configuration) -> Self {
        Encoder {
            config,
            table: FrequencyTable::new(),
            state: None,
        }
    }

    /// Count the bytes of one chunk of the input.
    ///
    /// Counting has no effect on the code once the [`header`] has been produced.
    ///
    /// [`header`]: #method.header
    pub fn count(&mut self, data: &[u8]) {
        self.table.count(data);
    }

    /// Seal the frequency table, build the code and serialize the container header.
    ///
    /// The first byte of the header is a placeholder, it must be replaced by the value of
    /// [`padding`] after the body has been encoded.
    ///
    /// [`padding`]: #method.padding
    pub fn header(&mut self) -> Vec<u8> {
        self.start();
        let mut header = vec![];
        self.table.write_header(0, &mut header);
        header
    }

    /// The frequencies counted so far.
    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    /// Encode some bytes from `inp` into `out`.
    ///
    /// See [`into_stream`] for high-level functions and [`finish`] for marking the input data as
    /// complete. Each byte must have been counted before. Calling this before [`header`] seals
    /// the table with the bytes counted up to this point.
    ///
    /// [`into_stream`]: #method.into_stream
    /// [`finish`]: #method.finish
    /// [`header`]: #method.header
    pub fn encode_bytes(&mut self, inp: &[u8], out: &mut [u8]) -> StreamResult {
        self.start().advance(inp, out)
    }

    /// Mark the encoding as finished.
    ///
    /// In following calls to `encode_bytes` the encoder will pad the last byte after encoding
    /// all of `inp`, at which point [`padding`] becomes available.
    ///
    /// [`padding`]: #method.padding
    pub fn finish(&mut self) {
        self.start().has_ended = true;
    }

    /// The number of unused bits in the last body byte.
    ///
    /// Only available once the encoder returned `HuffStatus::Done`.
    pub fn padding(&self) -> Option<u8> {
        self.state.as_ref().and_then(|state| state.padding)
    }

    /// Reset all internal state, forgetting all counted frequencies.
    pub fn reset(&mut self) {
        self.table = FrequencyTable::new();
        self.state = None;
    }

    /// Construct an encoder into a seekable writer.
    pub fn into_stream<W: Write + Seek>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            encoder: self,
            writer,
        }
    }

    /// Construct an encoder that appends to a vector.
    pub fn into_vec<'lt>(&'lt mut self, vec: &'lt mut Vec<u8>) -> IntoVec<'lt> {
        IntoVec {
            encoder: self,
            vector: vec,
        }
    }

    /// Construct an encoder into an async, seekable writer.
    #[cfg(feature = "async")]
    pub fn into_async<W: AsyncWrite + AsyncSeek + Unpin>(&mut self, writer: W) -> IntoAsync<'_, W> {
        IntoAsync {
            encoder: self,
            writer,
        }
    }

    fn start(&mut self) -> &mut EncodeState {
        let table = &mut self.table;
        self.state.get_or_insert_with(|| {
            table.seal();
            EncodeState::new(table)
        })
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new()
    }
}

impl<W: Write + Seek> IntoStream<'_, W> {
    /// Encode all data from a reader.
    ///
    /// The reader is drained twice: once for counting, then it is rewound to its position at
    /// the start of this call and drained again for packing. After the body has been written the
    /// padding count is written at the start of the header and the writer is seeked back to the
    /// end of the container. Any previous state of the encoder is reset.
    pub fn encode_all(mut self, read: impl BufRead + Seek) -> AllResult {
        let mut bytes_read = 0;
        let mut bytes_written = 0;
        let status = self.encode_part(read, &mut bytes_read, &mut bytes_written);

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }

    fn encode_part(
        &mut self,
        mut read: impl BufRead + Seek,
        bytes_read: &mut usize,
        bytes_written: &mut usize,
    ) -> io::Result<()> {
        let IntoStream { encoder, writer } = self;
        let chunk_size = encoder.config.chunk_size();
        encoder.reset();

        let start = read.stream_position()?;
        loop {
            let data = read.fill_buf()?;
            if data.is_empty() {
                break;
            }

            let len = data.len().min(chunk_size);
            encoder.count(&data[..len]);
            read.consume(len);
        }
        read.seek(SeekFrom::Start(start))?;

        let header = encoder.header();
        let header_at = writer.stream_position()?;
        writer.write_all(&header)?;
        *bytes_written += header.len();

        let mut outbuf = vec![0; chunk_size];
        loop {
            let data = read.fill_buf()?;
            if data.is_empty() {
                encoder.finish();
            }

            let len = data.len().min(chunk_size);
            let result = encoder.encode_bytes(&data[..len], &mut outbuf[..]);
            *bytes_read += result.consumed_in;
            read.consume(result.consumed_in);

            let done = result.status?;
            writer.write_all(&outbuf[..result.consumed_out])?;
            *bytes_written += result.consumed_out;

            if let HuffStatus::Done = done {
                break;
            }
        }

        let padding = encoder.padding().unwrap_or(0);
        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(header_at))?;
        writer.write_all(&[padding])?;
        writer.seek(SeekFrom::Start(end))?;
        writer.flush()?;

        debug!(
            bytes_read = *bytes_read,
            bytes_written = *bytes_written,
            padding,
            "encoded stream"
        );
        Ok(())
    }
}

impl IntoVec<'_> {
    /// Encode all data in the slice, appending the container to the vector.
    ///
    /// Any previous state of the encoder is reset.
    pub fn encode_all(self, data: &[u8]) -> VectorResult {
        let IntoVec { encoder, vector } = self;
        let chunk_size = encoder.config.chunk_size();
        encoder.reset();

        for chunk in data.chunks(chunk_size) {
            encoder.count(chunk);
        }

        let header_at = vector.len();
        let header = encoder.header();
        vector.extend_from_slice(&header);

        let mut consumed_in = 0;
        let mut consumed_out = header.len();
        let mut rest = data;

        let status = loop {
            if rest.is_empty() {
                encoder.finish();
            }

            let len = rest.len().min(chunk_size);
            let at = vector.len();
            vector.resize(at + chunk_size, 0);

            let result = encoder.encode_bytes(&rest[..len], &mut vector[at..]);
            vector.truncate(at + result.consumed_out);
            rest = &rest[result.consumed_in..];
            consumed_in += result.consumed_in;
            consumed_out += result.consumed_out;

            match result.status {
                Ok(HuffStatus::Done) => break Ok(HuffStatus::Done),
                Ok(_) => {}
                Err(err) => break Err(err),
            }
        };

        if let Some(padding) = encoder.padding() {
            vector[header_at] = padding;
        }

        VectorResult {
            consumed_in,
            consumed_out,
            status,
        }
    }
}

#[cfg(feature = "async")]
impl<W: AsyncWrite + AsyncSeek + Unpin> IntoAsync<'_, W> {
    /// Encode all data from a reader, see [`IntoStream::encode_all`].
    ///
    /// [`IntoStream::encode_all`]: struct.IntoStream.html#method.encode_all
    pub async fn encode_all(mut self, read: impl AsyncBufRead + AsyncSeek + Unpin) -> AllResult {
        let mut bytes_read = 0;
        let mut bytes_written = 0;
        let status = self
            .encode_part(read, &mut bytes_read, &mut bytes_written)
            .await;

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }

    async fn encode_part(
        &mut self,
        mut read: impl AsyncBufRead + AsyncSeek + Unpin,
        bytes_read: &mut usize,
        bytes_written: &mut usize,
    ) -> io::Result<()> {
        use futures::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt};

        let IntoAsync { encoder, writer } = self;
        let chunk_size = encoder.config.chunk_size();
        encoder.reset();

        let start = read.seek(SeekFrom::Current(0)).await?;
        loop {
            let data = read.fill_buf().await?;
            if data.is_empty() {
                break;
            }

            let len = data.len().min(chunk_size);
            encoder.count(&data[..len]);
            read.consume_unpin(len);
        }
        read.seek(SeekFrom::Start(start)).await?;

        let header = encoder.header();
        let header_at = writer.seek(SeekFrom::Current(0)).await?;
        writer.write_all(&header).await?;
        *bytes_written += header.len();

        let mut outbuf = vec![0; chunk_size];
        loop {
            let data = read.fill_buf().await?;
            if data.is_empty() {
                encoder.finish();
            }

            let len = data.len().min(chunk_size);
            let result = encoder.encode_bytes(&data[..len], &mut outbuf[..]);
            *bytes_read += result.consumed_in;
            read.consume_unpin(result.consumed_in);

            let done = result.status?;
            writer.write_all(&outbuf[..result.consumed_out]).await?;
            *bytes_written += result.consumed_out;

            if let HuffStatus::Done = done {
                break;
            }
        }

        let padding = encoder.padding().unwrap_or(0);
        let end = writer.seek(SeekFrom::Current(0)).await?;
        writer.seek(SeekFrom::Start(header_at)).await?;
        writer.write_all(&[padding]).await?;
        writer.seek(SeekFrom::Start(end)).await?;
        writer.flush().await?;

        debug!(
            bytes_read = *bytes_read,
            bytes_written = *bytes_written,
            padding,
            "encoded stream"
        );
        Ok(())
    }
}

impl EncodeState {
    fn new(table: &FrequencyTable) -> Self {
        let codes = match CodeTree::build(table) {
            Some(tree) => {
                let codes = CodeBook::new(&tree);
                debug!(
                    entries = codes.len(),
                    symbols = tree.weight(tree.root()),
                    longest = codes.max_len(),
                    "built code book"
                );
                codes
            }
            None => CodeBook::empty(),
        };

        EncodeState {
            codes,
            buffer: LsbBuffer::new(),
            has_ended: false,
            padding: None,
        }
    }

    fn advance(&mut self, mut inp: &[u8], mut out: &mut [u8]) -> StreamResult {
        let c_in = inp.len();
        let c_out = out.len();
        let mut status = Ok(HuffStatus::Ok);

        loop {
            if self.buffer.push_out(&mut out) {
                break;
            }

            match inp.split_first() {
                Some((&byte, rest)) => match self.codes.get(byte) {
                    Some(code) => {
                        self.buffer.buffer_code(code);
                        inp = rest;
                    }
                    None => {
                        status = Err(HuffError::UncountedByte(byte));
                        break;
                    }
                },
                None if self.has_ended && self.padding.is_none() => {
                    self.padding = Some(self.buffer.buffer_pad());
                }
                None => break,
            }
        }

        if status.is_ok() {
            if inp.is_empty() && self.padding.is_some() && self.buffer.is_empty() {
                status = Ok(HuffStatus::Done);
            } else if c_in == inp.len() && c_out == out.len() {
                status = Ok(HuffStatus::NoProgress);
            }
        }

        trace!(consumed_in = c_in - inp.len(), consumed_out = c_out - out.len(), "encode step");
        StreamResult {
            consumed_in: c_in - inp.len(),
            consumed_out: c_out - out.len(),
            status,
        }
    }
}

impl LsbBuffer {
    fn new() -> Self {
        LsbBuffer {
            buffer: 0,
            bits_in_buffer: 0,
            bytes: Vec::new(),
            read_mark: 0,
        }
    }

    /// Append a code word, the first bit of the code goes into the lowest free bit.
    fn buffer_code(&mut self, code: &BitSlice<u8, Lsb0>) {
        for part in code.chunks(32) {
            self.buffer |= part.load_le::<u64>() << self.bits_in_buffer;
            self.bits_in_buffer += part.len() as u8;

            while self.bits_in_buffer >= 8 {
                self.bytes.push(self.buffer as u8);
                self.buffer >>= 8;
                self.bits_in_buffer -= 8;
            }
        }
    }

    /// Write out complete bytes, returning if any remain.
    fn push_out(&mut self, out: &mut &mut [u8]) -> bool {
        let pending = &self.bytes[self.read_mark..];
        let count = pending.len().min(out.len());
        let (bytes, tail) = core::mem::replace(out, &mut []).split_at_mut(count);
        *out = tail;

        bytes.copy_from_slice(&pending[..count]);
        self.read_mark += count;

        if self.read_mark < self.bytes.len() {
            return true;
        }

        self.bytes.clear();
        self.read_mark = 0;
        false
    }

    /// Pad the buffer to a full byte with zero bits, returning the number of padding bits.
    fn buffer_pad(&mut self) -> u8 {
        if self.bits_in_buffer == 0 {
            return 0;
        }

        let padding = 8 - self.bits_in_buffer;
        self.bytes.push(self.buffer as u8);
        self.buffer = 0;
        self.bits_in_buffer = 0;
        padding
    }

    fn is_empty(&self) -> bool {
        self.bits_in_buffer == 0 && self.read_mark == self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoder, LsbBuffer};
    use crate::{HuffError, HuffStatus};
    use bitvec::prelude::*;

    #[test]
    fn packs_least_significant_bit_first() {
        let mut buffer = LsbBuffer::new();
        buffer.buffer_code(bits![u8, Lsb0; 1, 0, 1]);
        buffer.buffer_code(bits![u8, Lsb0; 1, 1, 0, 0, 1, 1]);
        assert_eq!(buffer.bytes, [0b1001_1101]);
        assert_eq!(buffer.bits_in_buffer, 1);
        assert_eq!(buffer.buffer_pad(), 7);
        assert_eq!(buffer.bytes, [0b1001_1101, 0b0000_0001]);
    }

    #[test]
    fn packs_long_codes() {
        let mut code = BitVec::<u8, Lsb0>::new();
        for i in 0..70 {
            code.push(i % 3 == 0);
        }

        let mut buffer = LsbBuffer::new();
        buffer.buffer_code(&code);
        assert_eq!(buffer.buffer_pad(), 2);

        let packed = BitVec::<u8, Lsb0>::from_vec(buffer.bytes.clone());
        assert_eq!(&packed[..70], &code[..]);
        assert!(packed[70..].not_any());
    }

    #[test]
    fn exact_bytes_need_no_padding() {
        let mut buffer = LsbBuffer::new();
        buffer.buffer_code(bits![u8, Lsb0; 0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(buffer.buffer_pad(), 0);
        assert_eq!(buffer.bytes, [0b1010_1010]);
    }

    #[test]
    fn push_out_respects_space() {
        let mut buffer = LsbBuffer::new();
        buffer.buffer_code(&bitvec![u8, Lsb0; 1; 24]);

        let mut target = [0u8; 2];
        let mut out = &mut target[..];
        assert!(buffer.push_out(&mut out));
        assert!(out.is_empty());
        assert_eq!(target, [0xff, 0xff]);

        let mut target = [0u8; 2];
        let mut out = &mut target[..];
        assert!(!buffer.push_out(&mut out));
        assert_eq!(out.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn single_symbol_body() {
        let data = b"?";
        let mut encoder = Encoder::new();
        encoder.count(data);
        let header = encoder.header();
        assert_eq!(&header[..3], &[0, 2, 0]);

        let mut out = [0u8; 4];
        encoder.finish();
        let result = encoder.encode_bytes(data, &mut out);
        assert_eq!(result.status, Ok(HuffStatus::Done));
        assert_eq!(result.consumed_in, 1);
        assert_eq!(result.consumed_out, 1);
        // '?' sorts before the sentinel but weighs more, so it is the right child.
        assert_eq!(out[0], 0b0000_0001);
        assert_eq!(encoder.padding(), Some(7));
    }

    #[test]
    fn empty_input_has_empty_body() {
        let mut encoder = Encoder::new();
        let header = encoder.header();
        assert_eq!(header, [0, 1, 0, b'a', 0, 0, 0, 0, 0, 0, 0, 0]);

        encoder.finish();
        let result = encoder.encode_bytes(&[], &mut [0u8; 4]);
        assert_eq!(result.status, Ok(HuffStatus::Done));
        assert_eq!(result.consumed_out, 0);
        assert_eq!(encoder.padding(), Some(0));
    }

    #[test]
    fn uncounted_byte_rejected() {
        let mut encoder = Encoder::new();
        encoder.count(b"abc");
        let _ = encoder.header();
        let result = encoder.encode_bytes(b"abz", &mut [0u8; 16]);
        assert_eq!(result.status, Err(HuffError::UncountedByte(b'z')));
        assert_eq!(result.consumed_in, 2);
    }

    #[test]
    fn output_may_be_tiny() {
        let data = b"abracadabra, abracadabra";
        let mut encoder = Encoder::new();
        encoder.count(data);
        let _ = encoder.header();

        let mut body = vec![];
        let mut inp = &data[..];
        loop {
            if inp.is_empty() {
                encoder.finish();
            }
            let mut out = [0u8; 1];
            let result = encoder.encode_bytes(inp, &mut out);
            inp = &inp[result.consumed_in..];
            body.extend_from_slice(&out[..result.consumed_out]);
            if let Ok(HuffStatus::Done) = result.status {
                break;
            }
            assert!(result.status.is_ok());
        }

        let mut reference = vec![];
        Encoder::new().into_vec(&mut reference).encode_all(data).status.unwrap();
        let header_len = encoder.table().header_len();
        assert_eq!(body, &reference[header_len..]);
        assert_eq!(encoder.padding(), Some(reference[0]));
    }

    #[test]
    fn no_progress_without_input() {
        let mut encoder = Encoder::new();
        encoder.count(b"xy");
        let result = encoder.encode_bytes(&[], &mut [0u8; 4]);
        assert_eq!(result.status, Ok(HuffStatus::NoProgress));
    }
}
