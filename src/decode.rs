//! A module for all decoding needs.
use std::io::{self, BufRead, Write};

use tracing::{debug, trace};

use crate::error::{AllResult, HuffError, HuffStatus, StreamResult, VectorResult};
use crate::table::FrequencyTable;
use crate::tree::{CodeTree, NodeId};
use crate::{Configuration, ENTRY_LEN, HEADER_LEN};

#[cfg(feature = "async")]
use futures::io::{AsyncBufRead, AsyncWrite};

/// The state for decoding a container.
///
/// The decoder can not know which byte is the last one of the body, and only its first
/// `8 - padding` bits carry data. It therefore holds back the most recent byte until either
/// more input arrives or [`finish`] is called. Any split of the input into separate calls to
/// [`decode_bytes`] produces the same output.
///
/// [`finish`]: #method.finish
/// [`decode_bytes`]: #method.decode_bytes
pub struct Decoder {
    config: Configuration,
    state: DecodeState,
}

/// A decoding stream sink.
///
/// See [`Decoder::into_stream`] on how to create this type and more information.
///
/// [`Decoder::into_stream`]: struct.Decoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

/// A decoding sink into a vector.
///
/// See [`Decoder::into_vec`] on how to create this type and more information.
///
/// [`Decoder::into_vec`]: struct.Decoder.html#method.into_vec
pub struct IntoVec<'d> {
    decoder: &'d mut Decoder,
    vector: &'d mut Vec<u8>,
}

/// An async decoding sink.
///
/// See [`Decoder::into_async`] on how to create this type and more information.
///
/// [`Decoder::into_async`]: struct.Decoder.html#method.into_async
#[cfg(feature = "async")]
pub struct IntoAsync<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

struct DecodeState {
    /// The raw header, until it is complete.
    header: Vec<u8>,
    /// The number of unused bits in the last body byte.
    padding: u8,
    /// The code tree, once the header is complete.
    tree: Option<CodeTree>,
    /// The current position in the tree.
    cursor: NodeId,
    /// The last body byte received, not yet known to be the final one.
    held: Option<u8>,
    /// The body byte whose bits are currently walked.
    walk: Option<Walk>,
    /// The number of body bytes received.
    body_len: u64,
    /// If no more input follows.
    has_ended: bool,
    /// If the whole container was decoded.
    is_done: bool,
    /// The first error, repeated by all later calls.
    failed: Option<HuffError>,
}

#[derive(Clone, Copy)]
struct Walk {
    byte: u8,
    /// The next bit to examine.
    next: u8,
    /// The number of bits carrying data.
    limit: u8,
}

impl Decoder {
    /// Create a new decoder with the default configuration.
    pub fn new() -> Self {
        Decoder::with_config(Configuration::new())
    }

    pub fn with_config(config: Configuration) -> Self {
        Decoder {
            config,
            state: DecodeState::new(),
        }
    }

    /// Decode some bytes from `inp` and write result to `out`.
    ///
    /// This will consume a prefix of the input buffer and write decoded output into a prefix of
    /// the output buffer. See the respective fields of the return value for the count of consumed
    /// and written bytes. For the next call resubmit the unconsumed input.
    ///
    /// The container is complete only after [`finish`] was called and this method returned
    /// `HuffStatus::Done`. An error is final, all following calls return it again.
    ///
    /// [`finish`]: #method.finish
    pub fn decode_bytes(&mut self, inp: &[u8], out: &mut [u8]) -> StreamResult {
        self.state.advance(inp, out)
    }

    /// Signal that no more input follows.
    ///
    /// The byte held back last is then treated as the final byte of the body.
    pub fn finish(&mut self) {
        self.state.has_ended = true;
    }

    /// Check if the end of the container has been reached.
    pub fn has_ended(&self) -> bool {
        self.state.is_done
    }

    /// The padding count of the header, once it has been read.
    pub fn padding(&self) -> Option<u8> {
        self.state.tree.as_ref().map(|_| self.state.padding)
    }

    /// Reset all internal state.
    pub fn reset(&mut self) {
        self.state = DecodeState::new();
    }

    /// Construct a decoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            decoder: self,
            writer,
        }
    }

    /// Construct a decoder that appends to a vector.
    pub fn into_vec<'lt>(&'lt mut self, vec: &'lt mut Vec<u8>) -> IntoVec<'lt> {
        IntoVec {
            decoder: self,
            vector: vec,
        }
    }

    /// Construct a decoder into an async writer.
    #[cfg(feature = "async")]
    pub fn into_async<W: AsyncWrite + Unpin>(&mut self, writer: W) -> IntoAsync<'_, W> {
        IntoAsync {
            decoder: self,
            writer,
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Decode data from a reader.
    ///
    /// This will read data until the stream is empty but will not signal the end of the
    /// container, so decoding can resume with more data later.
    pub fn decode(&mut self, read: impl BufRead) -> AllResult {
        self.decode_part(read, false)
    }

    /// Decode data from a reader, requiring the end of the container when it is exhausted.
    pub fn decode_all(mut self, read: impl BufRead) -> AllResult {
        self.decode_part(read, true)
    }

    fn decode_part(&mut self, mut read: impl BufRead, finish: bool) -> AllResult {
        let IntoStream { decoder, writer } = self;

        enum Progress {
            Ok,
            Done,
        }

        let mut bytes_read = 0;
        let mut bytes_written = 0;

        let read_bytes = &mut bytes_read;
        let write_bytes = &mut bytes_written;

        let chunk_size = decoder.config.chunk_size();
        let mut outbuf = vec![0; chunk_size];
        let once = move || -> io::Result<Progress> {
            let data = read.fill_buf()?;

            if data.is_empty() {
                if finish {
                    decoder.finish();
                } else {
                    return Ok(Progress::Done);
                }
            }

            let len = data.len().min(chunk_size);
            let result = decoder.decode_bytes(&data[..len], &mut outbuf[..]);
            *read_bytes += result.consumed_in;
            *write_bytes += result.consumed_out;
            read.consume(result.consumed_in);

            let done = result.status?;
            writer.write_all(&outbuf[..result.consumed_out])?;

            match done {
                HuffStatus::Done => {
                    writer.flush()?;
                    Ok(Progress::Done)
                }
                HuffStatus::Ok => Ok(Progress::Ok),
                HuffStatus::NoProgress => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "No more data but the container is not complete",
                )),
            }
        };

        let status = core::iter::repeat_with(once)
            // scan+fuse can be replaced with map_while
            .scan((), |(), result| match result {
                Ok(Progress::Ok) => Some(Ok(())),
                Err(err) => Some(Err(err)),
                Ok(Progress::Done) => None,
            })
            .fuse()
            .collect();

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }
}

impl IntoVec<'_> {
    /// Decode all data in the slice as a complete container, appending to the vector.
    pub fn decode_all(self, data: &[u8]) -> VectorResult {
        let IntoVec { decoder, vector } = self;
        let chunk_size = decoder.config.chunk_size();

        let mut consumed_in = 0;
        let mut consumed_out = 0;
        let mut rest = data;

        let status = loop {
            if rest.is_empty() {
                decoder.finish();
            }

            let len = rest.len().min(chunk_size);
            let at = vector.len();
            vector.resize(at + chunk_size, 0);

            let result = decoder.decode_bytes(&rest[..len], &mut vector[at..]);
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

        VectorResult {
            consumed_in,
            consumed_out,
            status,
        }
    }
}

#[cfg(feature = "async")]
impl<W: AsyncWrite + Unpin> IntoAsync<'_, W> {
    /// Decode data from a reader, requiring the end of the container when it is exhausted.
    pub async fn decode_all(self, mut read: impl AsyncBufRead + Unpin) -> AllResult {
        use futures::io::{AsyncBufReadExt, AsyncWriteExt};

        let IntoAsync { decoder, mut writer } = self;
        let chunk_size = decoder.config.chunk_size();
        let mut outbuf = vec![0; chunk_size];

        let mut bytes_read = 0;
        let mut bytes_written = 0;

        let status = async {
            loop {
                let data = read.fill_buf().await?;
                if data.is_empty() {
                    decoder.finish();
                }

                let len = data.len().min(chunk_size);
                let result = decoder.decode_bytes(&data[..len], &mut outbuf[..]);
                bytes_read += result.consumed_in;
                bytes_written += result.consumed_out;
                read.consume_unpin(result.consumed_in);

                let done = result.status?;
                writer.write_all(&outbuf[..result.consumed_out]).await?;

                if let HuffStatus::Done = done {
                    break;
                }
            }

            writer.flush().await?;
            Ok::<_, io::Error>(())
        }
        .await;

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }
}

impl DecodeState {
    fn new() -> Self {
        DecodeState {
            header: Vec::with_capacity(HEADER_LEN),
            padding: 0,
            tree: None,
            cursor: 0,
            held: None,
            walk: None,
            body_len: 0,
            has_ended: false,
            is_done: false,
            failed: None,
        }
    }

    fn advance(&mut self, mut inp: &[u8], mut out: &mut [u8]) -> StreamResult {
        let c_in = inp.len();
        let c_out = out.len();

        let status = match self.failed {
            Some(err) => Err(err),
            None => self.run(&mut inp, &mut out),
        };

        let status = match status {
            Ok(HuffStatus::Ok) if c_in == inp.len() && c_out == out.len() => {
                Ok(HuffStatus::NoProgress)
            }
            Err(err) => {
                if self.failed.replace(err).is_none() {
                    debug!(error = %err, body_len = self.body_len, "rejecting container");
                }
                Err(err)
            }
            status => status,
        };

        trace!(consumed_in = c_in - inp.len(), consumed_out = c_out - out.len(), "decode step");
        StreamResult {
            consumed_in: c_in - inp.len(),
            consumed_out: c_out - out.len(),
            status,
        }
    }

    fn run(&mut self, inp: &mut &[u8], out: &mut &mut [u8]) -> Result<HuffStatus, HuffError> {
        if self.is_done {
            return Ok(HuffStatus::Done);
        }

        if self.tree.is_none() && !self.read_header(inp)? {
            return Ok(HuffStatus::Ok);
        }

        loop {
            if !self.walk_bits(out)? {
                return Ok(HuffStatus::Ok);
            }

            let data: &[u8] = *inp;
            match data.split_first() {
                Some((&byte, rest)) => {
                    *inp = rest;
                    self.body_len += 1;
                    if let Some(previous) = self.held.replace(byte) {
                        self.walk = Some(Walk {
                            byte: previous,
                            next: 0,
                            limit: 8,
                        });
                    }
                }
                None if self.has_ended => match self.held.take() {
                    Some(last) => {
                        self.walk = Some(Walk {
                            byte: last,
                            next: 0,
                            limit: 8 - self.padding,
                        });
                    }
                    None => return self.complete(),
                },
                None => return Ok(HuffStatus::Ok),
            }
        }
    }

    /// Collect header bytes, returning if the header is complete.
    fn read_header(&mut self, inp: &mut &[u8]) -> Result<bool, HuffError> {
        loop {
            let want = self.header_len();
            if self.header.len() >= want {
                break;
            }

            let data: &[u8] = *inp;
            let take = (want - self.header.len()).min(data.len());
            self.header.extend_from_slice(&data[..take]);
            *inp = &data[take..];

            if let Some(&padding) = self.header.first() {
                if padding > 7 {
                    return Err(HuffError::InvalidPadding(padding));
                }
            }

            if self.header.len() < want {
                return if self.has_ended {
                    Err(HuffError::TruncatedHeader)
                } else {
                    Ok(false)
                };
            }
        }

        let table = FrequencyTable::read_entries(&self.header[HEADER_LEN..])?;
        let tree = CodeTree::build(&table).ok_or(HuffError::EmptyTable)?;
        self.padding = self.header[0];
        self.cursor = tree.root();
        self.tree = Some(tree);

        debug!(
            entries = table.len(),
            padding = self.padding,
            symbols = table.total(),
            "parsed container header"
        );
        Ok(true)
    }

    /// The length of the header as far as it is known.
    fn header_len(&self) -> usize {
        match self.header.get(1..HEADER_LEN) {
            Some(&[lo, hi]) => HEADER_LEN + ENTRY_LEN * usize::from(u16::from_le_bytes([lo, hi])),
            _ => HEADER_LEN,
        }
    }

    /// Walk the remaining bits of the current byte, returning `false` if the output is full.
    fn walk_bits(&mut self, out: &mut &mut [u8]) -> Result<bool, HuffError> {
        let DecodeState {
            tree, cursor, walk, ..
        } = self;

        let (tree, current) = match (tree.as_ref(), walk.as_mut()) {
            (Some(tree), Some(current)) => (tree, current),
            _ => return Ok(true),
        };

        while current.next < current.limit {
            if out.is_empty() {
                return Ok(false);
            }

            let bit = (current.byte >> current.next) & 1 == 1;
            current.next += 1;

            let node = tree.step(*cursor, bit).ok_or(HuffError::InvalidBitstream)?;
            match tree.symbol(node) {
                Some(byte) => {
                    let target = core::mem::replace(out, &mut []);
                    target[0] = byte;
                    *out = &mut target[1..];
                    *cursor = tree.root();
                }
                None => *cursor = node,
            }
        }

        *walk = None;
        Ok(true)
    }

    fn complete(&mut self) -> Result<HuffStatus, HuffError> {
        if self.body_len == 0 && self.padding != 0 {
            return Err(HuffError::InvalidPadding(self.padding));
        }

        let at_root = self
            .tree
            .as_ref()
            .map_or(false, |tree| tree.root() == self.cursor);
        if !at_root {
            return Err(HuffError::TruncatedBody);
        }

        self.is_done = true;
        debug!(body_len = self.body_len, "container decoded");
        Ok(HuffStatus::Done)
    }
}
