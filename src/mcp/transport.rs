//! Stdio message framing.
//!
//! Messages are normally one JSON document per line. Clients that speak the
//! LSP convention (`Content-Length: N` header, blank line, N bytes of body)
//! are also understood, and replies go back in whichever framing the request
//! used.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const CONTENT_LENGTH_HEADER: &str = "content-length";

/// Upper bound on a `Content-Length` body
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// How a message was framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    #[default]
    Newline,
    ContentLength,
}

/// One unit read from the input stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message { payload: String, framing: Framing },
    /// Bytes that could not be turned into a payload; the session continues
    Malformed { reason: String, framing: Framing },
}

/// Reads [`Frame`]s from a buffered byte stream
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    line: Vec<u8>,
    /// Header line found glued to the end of a discarded body
    pending: Option<Vec<u8>>,
}

impl<R> FrameReader<R>
where
    R: AsyncBufRead + Unpin,
{
    #[inline]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            pending: None,
        }
    }

    /// Next frame, or `None` at end of input. Blank lines are skipped.
    #[inline]
    pub async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        loop {
            if !self.next_line().await? {
                return Ok(None);
            }

            let line = match std::str::from_utf8(&self.line) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("Discarding non UTF-8 line: {}", e);
                    return Ok(Some(Frame::Malformed {
                        reason: format!("Line is not valid UTF-8: {e}"),
                        framing: Framing::Newline,
                    }));
                }
            };
            if line.is_empty() {
                continue;
            }

            if let Some(value) = header_value(line, CONTENT_LENGTH_HEADER) {
                let value = value.to_string();
                return self.read_content_length_body(&value).await.map(Some);
            }

            return Ok(Some(Frame::Message {
                payload: line.to_string(),
                framing: Framing::Newline,
            }));
        }
    }

    /// Load the next raw line into `self.line`. Returns `false` at EOF.
    async fn next_line(&mut self) -> io::Result<bool> {
        if let Some(line) = self.pending.take() {
            self.line = line;
            return Ok(true);
        }

        self.line.clear();
        Ok(self.reader.read_until(b'\n', &mut self.line).await? > 0)
    }

    async fn read_content_length_body(&mut self, value: &str) -> io::Result<Frame> {
        let malformed = |reason: String| Frame::Malformed {
            reason,
            framing: Framing::ContentLength,
        };

        let declared = value.parse::<usize>();
        self.skip_headers().await?;

        let length = match declared {
            Ok(length) if length <= MAX_FRAME_BYTES => length,
            Ok(length) => {
                self.discard_bytes(length).await?;
                return Ok(malformed(format!(
                    "Content-Length {length} exceeds limit of {MAX_FRAME_BYTES} bytes"
                )));
            }
            Err(_) => {
                self.discard_unsized_body().await?;
                return Ok(malformed(format!("Invalid Content-Length: {value:?}")));
            }
        };

        let mut body = vec![0_u8; length];
        self.reader.read_exact(&mut body).await?;

        match String::from_utf8(body) {
            Ok(payload) => Ok(Frame::Message {
                payload,
                framing: Framing::ContentLength,
            }),
            Err(e) => {
                warn!("Discarding non UTF-8 body: {}", e);
                Ok(malformed(format!("Body is not valid UTF-8: {e}")))
            }
        }
    }

    /// Consume any further headers up to the blank separator line
    async fn skip_headers(&mut self) -> io::Result<()> {
        loop {
            if !self.next_line().await? {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "EOF inside Content-Length headers",
                ));
            }
            let header = self.line.trim_ascii();
            if header.is_empty() {
                return Ok(());
            }
            debug!("Ignoring header: {}", String::from_utf8_lossy(header));
        }
    }

    async fn discard_bytes(&mut self, length: usize) -> io::Result<()> {
        let expected = u64::try_from(length).unwrap_or(u64::MAX);
        let skipped = io::copy(&mut (&mut self.reader).take(expected), &mut io::sink()).await?;
        if skipped < expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "EOF inside oversized Content-Length body",
            ));
        }
        Ok(())
    }

    /// Drop a body whose length is unknown: everything up to the end of the
    /// line it ends on. A `Content-Length` header starting later on that line
    /// is kept for the next frame.
    async fn discard_unsized_body(&mut self) -> io::Result<()> {
        if !self.next_line().await? {
            return Ok(());
        }
        if let Some(start) = find_content_length(&self.line) {
            self.pending = Some(self.line.split_off(start));
        }
        Ok(())
    }
}

/// Write one payload using `framing`, then flush
#[inline]
pub async fn write_frame<W>(writer: &mut W, payload: &str, framing: Framing) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        Framing::Newline => {
            writer.write_all(payload.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(payload.as_bytes()).await?;
        }
    }
    writer.flush().await
}

fn find_content_length(line: &[u8]) -> Option<usize> {
    let needle = CONTENT_LENGTH_HEADER.as_bytes();
    line.windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Value of `name: value` when `line` is that header (case-insensitive)
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case(name)
        .then(|| value.trim())
}
