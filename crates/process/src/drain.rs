// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent line draining of a child's stdout and stderr.

use cmdr_core::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::aggregate::Aggregator;

/// One output stream read line by line.
///
/// Bytes of an unfinished line stay in `buf` between calls, so a
/// `next_line` future dropped by `select!` loses nothing.
struct LineSource<R> {
    reader: Option<BufReader<R>>,
    buf: Vec<u8>,
    stream: Stream,
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    fn new(reader: Option<R>, stream: Stream) -> Self {
        Self {
            reader: reader.map(BufReader::new),
            buf: Vec::new(),
            stream,
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Read the next line; `None` once the stream is exhausted.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let n = reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 || !self.buf.ends_with(b"\n") {
            // EOF, possibly after an unterminated final line
            self.reader = None;
        }
        Ok(self.take())
    }

    fn take(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let mut bytes = std::mem::take(&mut self.buf);
        if bytes.ends_with(b"\n") {
            bytes.pop();
            if bytes.ends_with(b"\r") {
                bytes.pop();
            }
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Drain both streams into `sink` until both reach end-of-stream or `stop`
/// fires.
///
/// Both streams are polled in one biased loop: when stdout and stderr each
/// have a line ready in the same poll, stdout is appended first. Any
/// unterminated line is appended as a final fragment, including when
/// draining is stopped early.
pub(crate) async fn drain<O, E>(
    stdout: Option<O>,
    stderr: Option<E>,
    sink: Aggregator,
    stop: CancellationToken,
) -> std::io::Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = LineSource::new(stdout, Stream::Stdout);
    let mut err = LineSource::new(stderr, Stream::Stderr);

    loop {
        let out_open = out.is_open();
        let err_open = err.is_open();
        if !out_open && !err_open {
            break;
        }
        tokio::select! {
            biased;
            line = out.next_line(), if out_open => {
                if let Some(line) = line? {
                    sink.push(out.stream, line);
                }
            }
            line = err.next_line(), if err_open => {
                if let Some(line) = line? {
                    sink.push(err.stream, line);
                }
            }
            _ = stop.cancelled() => {
                if let Some(line) = out.take() {
                    sink.push(out.stream, line);
                }
                if let Some(line) = err.take() {
                    sink.push(err.stream, line);
                }
                tracing::debug!("output draining stopped before end-of-stream");
                break;
            }
        }
    }
    Ok(())
}

/// Read a stream to the end, keeping at most `limit` leading bytes.
pub(crate) async fn snippet<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    let s = String::from_utf8_lossy(&kept);
    let mut end = s.len().min(limit);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
