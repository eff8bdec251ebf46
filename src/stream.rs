// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Byte-stream seam and row-group positioning.
//!
//! The decode core never performs I/O itself: it consumes already
//! decompressed, seekable byte streams handed over by the stripe layer, one
//! contiguous chunk at a time.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{OrcError, Result};

/// Largest byte count forwarded to [`SeekableByteStream::skip`] in one call.
/// Larger skips are chunked by the readers.
pub const MAX_SKIP_BYTES: usize = i32::MAX as usize;

/// A seekable source of decompressed bytes for one `(column, stream kind)`
/// pair.
///
/// `next_chunk` hands out the next contiguous run of bytes; chunk boundaries
/// are an artifact of the stripe layer and carry no meaning. `seek` consumes
/// positions from the per-column provider in the stream's own order.
pub trait SeekableByteStream {
    /// The next chunk, or `None` at end of stream. Empty chunks are allowed
    /// and skipped by callers.
    fn next_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Advance past `count` bytes without surfacing them. `count` never
    /// exceeds [`MAX_SKIP_BYTES`] per call.
    fn skip(&mut self, count: usize) -> Result<()>;

    /// Reposition to a saved row-group position.
    fn seek(&mut self, positions: &mut PositionProvider) -> Result<()>;

    /// Stream name for diagnostics.
    fn name(&self) -> String;
}

/// Skip `count` bytes on `stream`, chunking calls at [`MAX_SKIP_BYTES`].
pub(crate) fn skip_stream_bytes(
    stream: &mut dyn SeekableByteStream,
    mut count: usize,
) -> Result<()> {
    while count != 0 {
        let step = count.min(MAX_SKIP_BYTES);
        stream.skip(step)?;
        count -= step;
    }
    Ok(())
}

/// Read exactly `size` bytes from `stream` into a fresh buffer.
///
/// A chunk running past `size` means the stream disagrees with the caller's
/// length bookkeeping and is treated as corrupt.
pub(crate) fn read_fully(
    stream: &mut dyn SeekableByteStream,
    size: usize,
    context: &str,
) -> Result<Vec<u8>> {
    let mut buffer = vec![0_u8; size];
    let mut position = 0_usize;
    while position < size {
        let chunk = stream.next_chunk()?.ok_or_else(|| {
            OrcError::parse(format!(
                "truncated stream in {}: stream={}, required_bytes={}, read_bytes={}",
                context,
                stream.name(),
                size,
                position
            ))
        })?;
        if position + chunk.len() > size {
            return Err(OrcError::parse(format!(
                "corrupt blob in {}: stream={}, expected_bytes={}, chunk_overruns_by={}",
                context,
                stream.name(),
                size,
                position + chunk.len() - size
            )));
        }
        buffer[position..position + chunk.len()].copy_from_slice(&chunk);
        position += chunk.len();
    }
    Ok(buffer)
}

/// Cursor over the current chunk of a byte stream.
///
/// Readers that walk raw payload bytes (floats, decimal varints, string
/// blobs) keep one of these between calls. The view is invalidated on seek
/// and on any skip that outruns the buffered bytes.
#[derive(Default)]
pub(crate) struct ChunkView {
    chunk: Bytes,
    pos: usize,
}

impl ChunkView {
    pub(crate) fn new() -> Self {
        ChunkView {
            chunk: Bytes::new(),
            pos: 0,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.chunk.len() - self.pos
    }

    pub(crate) fn rest(&self) -> &[u8] {
        &self.chunk[self.pos..]
    }

    pub(crate) fn advance(&mut self, count: usize) {
        debug_assert!(count <= self.remaining());
        self.pos += count;
    }

    pub(crate) fn clear(&mut self) {
        self.chunk = Bytes::new();
        self.pos = 0;
    }

    /// Replace the exhausted view with the next non-empty chunk.
    pub(crate) fn refill(
        &mut self,
        stream: &mut dyn SeekableByteStream,
        context: &str,
    ) -> Result<()> {
        loop {
            match stream.next_chunk()? {
                Some(chunk) if !chunk.is_empty() => {
                    self.chunk = chunk;
                    self.pos = 0;
                    return Ok(());
                }
                Some(_) => continue,
                None => {
                    return Err(OrcError::parse(format!(
                        "read past end of stream in {}: stream={}",
                        context,
                        stream.name()
                    )));
                }
            }
        }
    }

    pub(crate) fn read_u8(
        &mut self,
        stream: &mut dyn SeekableByteStream,
        context: &str,
    ) -> Result<u8> {
        if self.remaining() == 0 {
            self.refill(stream, context)?;
        }
        let byte = self.chunk[self.pos];
        self.pos += 1;
        Ok(byte)
    }
}

/// Cursor over one column's saved row-group positions.
///
/// Each stream owned by a column consumes its positions left-to-right in a
/// fixed order on seek; running out of positions means the stripe-level
/// index and the reader disagree about the stream set.
#[derive(Clone, Debug)]
pub struct PositionProvider {
    positions: Vec<u64>,
    next: usize,
}

impl PositionProvider {
    pub fn new(positions: Vec<u64>) -> Self {
        PositionProvider { positions, next: 0 }
    }

    pub fn next(&mut self) -> Result<u64> {
        let value = self.positions.get(self.next).copied().ok_or_else(|| {
            OrcError::parse(format!(
                "position provider exhausted: consumed={}, available={}",
                self.next,
                self.positions.len()
            ))
        })?;
        self.next += 1;
        Ok(value)
    }
}

/// Per-column position providers for one row-group boundary.
#[derive(Default)]
pub struct PositionProviderMap {
    providers: HashMap<u32, PositionProvider>,
}

impl PositionProviderMap {
    pub fn new() -> Self {
        PositionProviderMap {
            providers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column_id: u32, provider: PositionProvider) {
        self.providers.insert(column_id, provider);
    }

    pub fn at(&mut self, column_id: u32) -> Result<&mut PositionProvider> {
        self.providers.get_mut(&column_id).ok_or_else(|| {
            OrcError::parse(format!(
                "missing position provider for column: column_id={}",
                column_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SliceStream {
        chunks: Vec<Bytes>,
        next: usize,
    }

    impl SliceStream {
        fn new(chunks: Vec<&'static [u8]>) -> Self {
            SliceStream {
                chunks: chunks.into_iter().map(Bytes::from_static).collect(),
                next: 0,
            }
        }
    }

    impl SeekableByteStream for SliceStream {
        fn next_chunk(&mut self) -> Result<Option<Bytes>> {
            let chunk = self.chunks.get(self.next).cloned();
            if chunk.is_some() {
                self.next += 1;
            }
            Ok(chunk)
        }

        fn skip(&mut self, _count: usize) -> Result<()> {
            Ok(())
        }

        fn seek(&mut self, _positions: &mut PositionProvider) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> String {
            "test-stream".to_string()
        }
    }

    #[test]
    fn read_fully_spans_chunks() {
        let mut stream = SliceStream::new(vec![b"ab", b"", b"cde"]);
        let blob = read_fully(&mut stream, 5, "test").expect("read");
        assert_eq!(blob, b"abcde");
    }

    #[test]
    fn read_fully_rejects_overrun_chunk() {
        let mut stream = SliceStream::new(vec![b"abcd"]);
        let err = read_fully(&mut stream, 3, "test").expect_err("overrun");
        assert!(err.to_string().contains("corrupt blob"), "err={}", err);
    }

    #[test]
    fn read_fully_rejects_truncation() {
        let mut stream = SliceStream::new(vec![b"ab"]);
        let err = read_fully(&mut stream, 5, "test").expect_err("truncated");
        assert!(err.to_string().contains("truncated stream"), "err={}", err);
    }

    #[test]
    fn chunk_view_reads_across_refills() {
        let mut stream = SliceStream::new(vec![b"xy", b"z"]);
        let mut view = ChunkView::new();
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(view.read_u8(&mut stream, "test").expect("byte"));
        }
        assert_eq!(out, b"xyz");
        let err = view.read_u8(&mut stream, "test").expect_err("eof");
        assert!(err.to_string().contains("read past end"), "err={}", err);
    }

    #[test]
    fn position_provider_is_ordered_and_finite() {
        let mut provider = PositionProvider::new(vec![3, 9]);
        assert_eq!(provider.next().expect("first"), 3);
        assert_eq!(provider.next().expect("second"), 9);
        let err = provider.next().expect_err("exhausted");
        assert!(err.to_string().contains("exhausted"), "err={}", err);
    }
}
