//! Line-feed delimited framing over a byte stream.
//!
//! One frame carries one record rendered without embedded line breaks. The
//! transport may split or batch frames arbitrarily; the reader buffers until
//! it sees a line-feed.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Record, to_line};

/// Render a record as a complete frame, trailing line-feed included.
pub fn encode_frame(record: &Record) -> Result<String> {
    let mut line = to_line(record)?;
    if line.contains('\n') {
        return Err(Error::Parse("Record rendered with embedded line-feed".into()));
    }
    line.push('\n');
    Ok(line)
}

/// Reads frames from a buffered byte stream.
pub struct FrameReader<R> {
    inner: R,
    max_frame_bytes: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, max_frame_bytes: usize) -> Self {
        Self {
            inner,
            max_frame_bytes,
            buf: Vec::new(),
        }
    }

    /// Next frame without its line-feed, or `None` at end of stream.
    ///
    /// Blank lines are skipped. An oversized frame is consumed up to its
    /// line-feed and reported as [`Error::FrameTooLarge`]; the reader stays
    /// usable afterwards. Bytes left unterminated at end of stream are dropped.
    pub async fn next_frame(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            let mut oversized = false;

            loop {
                let (found, used) = {
                    let available = self.inner.fill_buf().await?;
                    if available.is_empty() {
                        if oversized || !self.buf.is_empty() {
                            debug!(
                                pending = self.buf.len(),
                                "Discarding unterminated frame at end of stream"
                            );
                        }
                        return Ok(None);
                    }
                    match available.iter().position(|&b| b == b'\n') {
                        Some(i) => {
                            if !oversized {
                                self.buf.extend_from_slice(&available[..i]);
                            }
                            (true, i + 1)
                        }
                        None => {
                            if !oversized {
                                self.buf.extend_from_slice(available);
                            }
                            (false, available.len())
                        }
                    }
                };
                self.inner.consume(used);

                if self.buf.len() > self.max_frame_bytes {
                    oversized = true;
                    self.buf.clear();
                }
                if found {
                    break;
                }
            }

            if oversized {
                return Err(Error::FrameTooLarge {
                    limit: self.max_frame_bytes,
                });
            }

            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            if self.buf.is_empty() {
                continue;
            }

            let frame = std::str::from_utf8(&self.buf)
                .map_err(|_| Error::Parse("Frame is not valid UTF-8".into()))?;
            return Ok(Some(frame.to_string()));
        }
    }
}

/// Writes records as frames.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one record followed by a line-feed and flush.
    pub async fn write_record(&mut self, record: &Record) -> Result<()> {
        let frame = encode_frame(record)?;
        self.inner.write_all(frame.as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Close the write half so the peer sees end of stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
