//! Request body readers.
//!
//! Neither reader owns the connection; each read borrows it. That keeps the
//! stream available for the response once the body is closed, and lets the
//! body be drained without unwrapping any decoder.

use std::io::{self, Write};

use bytes::{Buf, BytesMut};
use flate2::write::GzDecoder;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::request::ContentEncoding;

/// Largest single read used when discarding unread body bytes.
const DRAIN_CHUNK: usize = 10 * 1024;

/// Raw bytes pulled per read when feeding a decoder.
const DECODE_CHUNK: usize = 8 * 1024;

/// Exposes exactly `length` bytes of the underlying stream.
///
/// Reads are clamped to the bytes still owed, so nothing past the declared
/// body is ever consumed. Writing and seeking are not offered.
#[derive(Debug)]
pub struct ContentLengthReader {
    length: u64,
    remaining: u64,
}

impl ContentLengthReader {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            remaining: length,
        }
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.length - self.remaining
    }

    /// Reads up to `buf.len()` body bytes. Returns 0 only once the whole
    /// body has been consumed; a peer that hangs up early is an error.
    pub async fn read<R>(&mut self, io: &mut R, buf: &mut [u8]) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = io.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside request body",
            ));
        }

        self.remaining -= n as u64;
        Ok(n)
    }

    /// Reads and discards whatever is left of the body, leaving `io`
    /// positioned right after it. Returns the number of bytes discarded.
    pub async fn drain<R>(&mut self, io: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut scratch = [0u8; DRAIN_CHUNK];
        let mut discarded = 0u64;

        while self.remaining > 0 {
            discarded += self.read(io, &mut scratch).await? as u64;
        }

        Ok(discarded)
    }
}

/// A bounded body with its content decoding applied.
pub struct RequestBody {
    raw: ContentLengthReader,
    decoder: Option<Box<Inflate>>,
}

struct Inflate {
    inner: GzDecoder<Vec<u8>>,
    pending: BytesMut,
    finished: bool,
}

impl RequestBody {
    pub fn new(length: u64, encoding: ContentEncoding) -> Self {
        let decoder = match encoding {
            ContentEncoding::Identity => None,
            ContentEncoding::Gzip => Some(Box::new(Inflate {
                inner: GzDecoder::new(Vec::new()),
                pending: BytesMut::new(),
                finished: false,
            })),
        };

        Self {
            raw: ContentLengthReader::new(length),
            decoder,
        }
    }

    /// The wire-level reader under the decoder.
    pub fn raw(&self) -> &ContentLengthReader {
        &self.raw
    }

    /// Reads decoded body bytes. Returns 0 at the end of the body.
    pub async fn read<R>(&mut self, io: &mut R, buf: &mut [u8]) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        let Some(inflate) = self.decoder.as_deref_mut() else {
            return self.raw.read(io, buf).await;
        };

        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if !inflate.pending.is_empty() {
                let n = buf.len().min(inflate.pending.len());
                buf[..n].copy_from_slice(&inflate.pending[..n]);
                inflate.pending.advance(n);
                return Ok(n);
            }

            if inflate.finished {
                return Ok(0);
            }

            if self.raw.is_empty() {
                // Zero-length body: nothing to decode.
                inflate.finished = true;
                return Ok(0);
            }

            if self.raw.remaining() == 0 {
                inflate.inner.try_finish()?;
                inflate.finished = true;
                inflate.take_output();
                continue;
            }

            let mut chunk = [0u8; DECODE_CHUNK];
            let n = self.raw.read(io, &mut chunk).await?;
            inflate.feed(&chunk[..n])?;
        }
    }

    /// Reads the remaining decoded body into a vector.
    pub async fn read_to_end<R>(&mut self, io: &mut R) -> io::Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let mut out = Vec::new();
        let mut buf = [0u8; DECODE_CHUNK];

        loop {
            let n = self.read(io, &mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Discards the rest of the raw body. Decoder state is dropped, so the
    /// stream ends up aligned on the declared length even if decoding
    /// stopped early.
    pub async fn drain<R>(&mut self, io: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        if let Some(inflate) = self.decoder.as_deref_mut() {
            inflate.pending.clear();
            inflate.finished = true;
        }
        self.raw.drain(io).await
    }
}

impl Inflate {
    fn feed(&mut self, mut input: &[u8]) -> io::Result<()> {
        while !input.is_empty() {
            let n = self.inner.write(input)?;
            if n == 0 {
                // Trailing bytes after the gzip member.
                break;
            }
            input = &input[n..];
        }
        self.inner.flush()?;
        self.take_output();
        Ok(())
    }

    fn take_output(&mut self) {
        let out = self.inner.get_mut();
        self.pending.extend_from_slice(out);
        out.clear();
    }
}
