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
//! Float and double leaf reader.
//!
//! Values are fixed-width little-endian IEEE-754 read straight from the
//! DATA stream's chunks, monomorphized over the stored width (4 or 8
//! bytes). Decoding goes through `from_le_bytes`, so the same code is
//! correct on either host byte order; the fast path is consuming whole
//! values from the current chunk without per-byte refill checks. The batch
//! element may be wider than the stored value (FLOAT column read into a
//! Double batch).

use crate::batch::{BatchPayload, ColumnVectorBatch};
use crate::error::Result;
use crate::schema::TypeNode;
use crate::stream::{skip_stream_bytes, ChunkView, PositionProviderMap, SeekableByteStream};
use crate::stripe::{StreamKind, StripeStreams};

use super::{batch_kind_error, refined_mask, require_stream, ReaderBase};

/// Reader for FLOAT (`BYTES = 4`) and DOUBLE (`BYTES = 8`) columns.
pub struct FloatReader<const BYTES: usize> {
    base: ReaderBase,
    stream: Box<dyn SeekableByteStream>,
    view: ChunkView,
}

const CONTEXT: &str = "Double column";

fn value_from_le<const BYTES: usize>(bytes: &[u8]) -> f64 {
    let mut bits = 0_u64;
    for (i, byte) in bytes.iter().take(BYTES).enumerate() {
        bits |= (*byte as u64) << (8 * i);
    }
    if BYTES == 4 {
        f32::from_bits(bits as u32) as f64
    } else {
        f64::from_bits(bits)
    }
}

impl<const BYTES: usize> FloatReader<BYTES> {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let stream = require_stream(stripe, base.column_id(), StreamKind::Data, CONTEXT)?;
        Ok(FloatReader {
            base,
            stream,
            view: ChunkView::new(),
        })
    }

    /// One value, refilling the chunk view byte-by-byte if it straddles a
    /// chunk boundary.
    fn read_value(&mut self) -> Result<f64> {
        if self.view.remaining() >= BYTES {
            let value = value_from_le::<BYTES>(self.view.rest());
            self.view.advance(BYTES);
            return Ok(value);
        }
        let mut bits = 0_u64;
        for i in 0..BYTES {
            let byte = self.view.read_u8(&mut *self.stream, CONTEXT)?;
            bits |= (byte as u64) << (8 * i);
        }
        Ok(if BYTES == 4 {
            f32::from_bits(bits as u32) as f64
        } else {
            f64::from_bits(bits)
        })
    }

    fn fill<T: Copy>(
        &mut self,
        out: &mut [T],
        mask: Option<&[u8]>,
        convert: fn(f64) -> T,
    ) -> Result<()> {
        match mask {
            Some(mask) => {
                for (i, slot) in out.iter_mut().enumerate() {
                    if mask[i] != 0 {
                        *slot = convert(self.read_value()?);
                    }
                }
            }
            None => {
                let mut filled = 0;
                while filled < out.len() {
                    let whole = self.view.remaining() / BYTES;
                    if whole > 0 {
                        let take = whole.min(out.len() - filled);
                        let rest = self.view.rest();
                        for j in 0..take {
                            out[filled + j] = convert(value_from_le::<BYTES>(&rest[j * BYTES..]));
                        }
                        self.view.advance(take * BYTES);
                        filled += take;
                    } else {
                        out[filled] = convert(self.read_value()?);
                        filled += 1;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        self.base.next_presence(batch, num_values, incoming_mask)?;
        let column_id = self.base.column_id();
        let ColumnVectorBatch {
            has_nulls,
            not_null,
            payload,
            ..
        } = batch;
        let mask = refined_mask(*has_nulls, not_null, num_values);
        match payload {
            BatchPayload::Double { data } => self.fill(&mut data[..num_values], mask, |v| v),
            BatchPayload::Float { data } => {
                self.fill(&mut data[..num_values], mask, |v| v as f32)
            }
            other => Err(batch_kind_error(
                column_id,
                CONTEXT,
                "Float|Double",
                other.type_name(),
            )),
        }
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        let byte_count = non_null * BYTES;
        if self.view.remaining() >= byte_count {
            self.view.advance(byte_count);
        } else {
            let residual = byte_count - self.view.remaining();
            self.view.clear();
            skip_stream_bytes(&mut *self.stream, residual)?;
        }
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.stream.seek(positions.at(self.base.column_id())?)?;
        self.view.clear();
        Ok(())
    }
}
