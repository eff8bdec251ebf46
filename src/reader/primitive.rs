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
//! Boolean, byte, and integer leaf readers.
//!
//! Booleans and bytes come out of a byte-wise RLE decoder one byte per row;
//! wider integer columns come out of a signed RLE decoder at the version
//! implied by the column encoding. The byte-wise readers decode into a byte
//! scratch and then write sign-extended values into the batch, which keeps
//! the wide-batch path independent of host byte order.

use crate::batch::{BatchPayload, ColumnVectorBatch};
use crate::error::Result;
use crate::rle::{ByteRleDecoder, IntRleDecoder};
use crate::schema::TypeNode;
use crate::stream::PositionProviderMap;
use crate::stripe::{StreamKind, StripeStreams};

use super::{batch_kind_error, refined_mask, require_stream, ReaderBase};

/// Copy a decoded byte scratch into a tight or wide batch payload.
fn store_bytes(
    payload: &mut BatchPayload,
    scratch: &[u8],
    num_values: usize,
    column_id: u32,
    context: &str,
) -> Result<()> {
    match payload {
        BatchPayload::Byte { data } => {
            for i in 0..num_values {
                data[i] = scratch[i] as i8;
            }
            Ok(())
        }
        BatchPayload::Long { data } => {
            for i in 0..num_values {
                data[i] = (scratch[i] as i8) as i64;
            }
            Ok(())
        }
        other => Err(batch_kind_error(
            column_id,
            context,
            "Byte|Long",
            other.type_name(),
        )),
    }
}

/// Reader for BOOLEAN columns: one DATA stream of boolean runs.
pub struct BooleanReader {
    base: ReaderBase,
    rle: Box<dyn ByteRleDecoder>,
    scratch: Vec<u8>,
}

impl BooleanReader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let stream = require_stream(stripe, base.column_id(), StreamKind::Data, "Boolean column")?;
        let rle = stripe.create_boolean_rle(stream)?;
        Ok(BooleanReader {
            base,
            rle,
            scratch: Vec::new(),
        })
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        self.base.next_presence(batch, num_values, incoming_mask)?;
        let mask = refined_mask(batch.has_nulls, &batch.not_null, num_values);
        self.scratch.clear();
        self.scratch.resize(num_values, 0);
        self.rle.next(&mut self.scratch, mask)?;
        store_bytes(
            &mut batch.payload,
            &self.scratch,
            num_values,
            self.base.column_id(),
            "Boolean column",
        )
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        self.rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.rle.seek(positions.at(self.base.column_id())?)
    }
}

/// Reader for BYTE (tinyint) columns: one DATA stream of byte runs.
pub struct ByteReader {
    base: ReaderBase,
    rle: Box<dyn ByteRleDecoder>,
    scratch: Vec<u8>,
}

impl ByteReader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let stream = require_stream(stripe, base.column_id(), StreamKind::Data, "Byte column")?;
        let rle = stripe.create_byte_rle(stream)?;
        Ok(ByteReader {
            base,
            rle,
            scratch: Vec::new(),
        })
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        self.base.next_presence(batch, num_values, incoming_mask)?;
        let mask = refined_mask(batch.has_nulls, &batch.not_null, num_values);
        self.scratch.clear();
        self.scratch.resize(num_values, 0);
        self.rle.next(&mut self.scratch, mask)?;
        store_bytes(
            &mut batch.payload,
            &self.scratch,
            num_values,
            self.base.column_id(),
            "Byte column",
        )
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        self.rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.rle.seek(positions.at(self.base.column_id())?)
    }
}

/// Reader for SHORT/INT/LONG/DATE columns: one signed RLE DATA stream.
pub struct IntegerReader {
    base: ReaderBase,
    rle: Box<dyn IntRleDecoder>,
    scratch: Vec<i64>,
}

impl IntegerReader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let version = stripe.encoding(base.column_id())?.kind.rle_version();
        let stream = require_stream(stripe, base.column_id(), StreamKind::Data, "Integer column")?;
        let rle = stripe.create_int_rle(stream, true, version)?;
        Ok(IntegerReader {
            base,
            rle,
            scratch: Vec::new(),
        })
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
            BatchPayload::Long { data } => self.rle.next(&mut data[..num_values], mask),
            BatchPayload::Short { data } => {
                self.scratch.clear();
                self.scratch.resize(num_values, 0);
                self.rle.next(&mut self.scratch, mask)?;
                for i in 0..num_values {
                    data[i] = i16::try_from(self.scratch[i]).map_err(|_| {
                        crate::error::OrcError::parse(format!(
                            "integer value out of Short batch range: column_id={}, row={}, value={}",
                            column_id, i, self.scratch[i]
                        ))
                    })?;
                }
                Ok(())
            }
            BatchPayload::Int { data } => {
                self.scratch.clear();
                self.scratch.resize(num_values, 0);
                self.rle.next(&mut self.scratch, mask)?;
                for i in 0..num_values {
                    data[i] = i32::try_from(self.scratch[i]).map_err(|_| {
                        crate::error::OrcError::parse(format!(
                            "integer value out of Int batch range: column_id={}, row={}, value={}",
                            column_id, i, self.scratch[i]
                        ))
                    })?;
                }
                Ok(())
            }
            other => Err(batch_kind_error(
                column_id,
                "Integer column",
                "Short|Int|Long",
                other.type_name(),
            )),
        }
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        self.rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.rle.seek(positions.at(self.base.column_id())?)
    }
}
