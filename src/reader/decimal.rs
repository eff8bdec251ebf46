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
//! Decimal leaf readers.
//!
//! The classic layout stores each value as a variable-length little-endian
//! base-128 zig-zag integer on DATA, with the value's own scale on a
//! SECONDARY run stream; values are rescaled to the column's target scale
//! while decoding. The V2 layout (`is_decimal_as_long`) stores pre-scaled
//! 64-bit values on a plain RLE V2 DATA stream. Hive 0.11 files carry no
//! precision, decode at 128 bits under a caller-forced scale, and turn
//! 38-digit overflows into either an error or a nulled row with a warning,
//! by configuration.

use std::sync::Arc;

use tracing::warn;

use crate::batch::{BatchPayload, ColumnVectorBatch};
use crate::error::{OrcError, Result};
use crate::rle::{IntRleDecoder, RleVersion};
use crate::schema::TypeNode;
use crate::stream::{ChunkView, PositionProviderMap, SeekableByteStream};
use crate::stripe::{ErrorSink, StreamKind, StripeStreams};

use super::{batch_kind_error, refined_mask, require_stream, ReaderBase};

pub(crate) const POWERS_OF_TEN: [i64; 19] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
];

/// Largest magnitude a 38-digit decimal may reach.
const MAX_DECIMAL128: i128 = 99_999_999_999_999_999_999_999_999_999_999_999_999;

fn unzigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn unzigzag128(value: u128) -> i128 {
    ((value >> 1) as i128) ^ -((value & 1) as i128)
}

/// One base-128 varint, at most 64 bits of significand kept.
fn read_varint_u64(
    view: &mut ChunkView,
    stream: &mut dyn SeekableByteStream,
    context: &str,
) -> Result<u64> {
    let mut value = 0_u64;
    let mut offset = 0_u32;
    loop {
        let byte = view.read_u8(stream, context)?;
        if offset < 64 {
            value |= ((byte & 0x7f) as u64) << offset;
        }
        offset += 7;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

/// One base-128 varint at 128 bits. The boolean is false when the encoded
/// significand needs more than 128 bits; the excess bytes are still
/// consumed so the stream stays aligned.
fn read_varint_u128(
    view: &mut ChunkView,
    stream: &mut dyn SeekableByteStream,
    context: &str,
) -> Result<(u128, bool)> {
    let mut value = 0_u128;
    let mut offset = 0_u32;
    let mut fits = true;
    loop {
        let byte = view.read_u8(stream, context)?;
        let work = (byte & 0x7f) as u128;
        if offset > 128 || (offset == 126 && work > 3) {
            fits = false;
        }
        if offset < 128 {
            value |= work << offset;
        }
        offset += 7;
        if byte & 0x80 == 0 {
            return Ok((value, fits));
        }
    }
}

/// Consume `count` varint-encoded values without decoding them.
fn skip_varints(
    view: &mut ChunkView,
    stream: &mut dyn SeekableByteStream,
    count: usize,
    context: &str,
) -> Result<()> {
    let mut skipped = 0_usize;
    while skipped < count {
        if view.read_u8(stream, context)? & 0x80 == 0 {
            skipped += 1;
        }
    }
    Ok(())
}

/// Move a 64-bit value from its stored scale to the target scale.
/// Division truncates toward zero.
fn rescale_i64(
    value: i64,
    target_scale: i32,
    current_scale: i32,
    column_id: u32,
) -> Result<i64> {
    if target_scale > current_scale && target_scale - current_scale <= 18 {
        value
            .checked_mul(POWERS_OF_TEN[(target_scale - current_scale) as usize])
            .ok_or_else(|| {
                OrcError::parse(format!(
                    "decimal rescale overflow: column_id={}, value={}, current_scale={}, target_scale={}",
                    column_id, value, current_scale, target_scale
                ))
            })
    } else if target_scale < current_scale && current_scale - target_scale <= 18 {
        Ok(value / POWERS_OF_TEN[(current_scale - target_scale) as usize])
    } else if target_scale != current_scale {
        Err(OrcError::parse(format!(
            "decimal scale out of range: column_id={}, current_scale={}, target_scale={}",
            column_id, current_scale, target_scale
        )))
    } else {
        Ok(value)
    }
}

/// 128-bit rescale in digit blocks of at most 18.
fn rescale_i128(
    mut value: i128,
    target_scale: i32,
    mut current_scale: i32,
    column_id: u32,
) -> Result<i128> {
    while target_scale > current_scale {
        let adjust = (target_scale - current_scale).min(18);
        value = value
            .checked_mul(POWERS_OF_TEN[adjust as usize] as i128)
            .ok_or_else(|| {
                OrcError::parse(format!(
                    "decimal rescale overflow: column_id={}, current_scale={}, target_scale={}",
                    column_id, current_scale, target_scale
                ))
            })?;
        current_scale += adjust;
    }
    while current_scale > target_scale {
        let adjust = (current_scale - target_scale).min(18);
        value /= POWERS_OF_TEN[adjust as usize] as i128;
        current_scale -= adjust;
    }
    Ok(value)
}

fn decimal64_payload<'a>(
    payload: &'a mut BatchPayload,
    column_id: u32,
    context: &str,
) -> Result<(&'a mut Vec<i64>, &'a mut Vec<i64>, &'a mut i32, &'a mut i32)> {
    match payload {
        BatchPayload::Decimal64 {
            values,
            read_scales,
            precision,
            scale,
        } => Ok((values, read_scales, precision, scale)),
        other => Err(batch_kind_error(
            column_id,
            context,
            "Decimal64",
            other.type_name(),
        )),
    }
}

fn decimal128_payload<'a>(
    payload: &'a mut BatchPayload,
    column_id: u32,
    context: &str,
) -> Result<(&'a mut Vec<i128>, &'a mut Vec<i64>, &'a mut i32, &'a mut i32)> {
    match payload {
        BatchPayload::Decimal128 {
            values,
            read_scales,
            precision,
            scale,
        } => Ok((values, read_scales, precision, scale)),
        other => Err(batch_kind_error(
            column_id,
            context,
            "Decimal128",
            other.type_name(),
        )),
    }
}

const DECIMAL64_CONTEXT: &str = "Decimal64 column";

/// Classic decimal at 64 bits: varint DATA + scale SECONDARY.
pub struct Decimal64Reader {
    base: ReaderBase,
    value_stream: Box<dyn SeekableByteStream>,
    view: ChunkView,
    scale_rle: Box<dyn IntRleDecoder>,
    precision: i32,
    scale: i32,
}

impl Decimal64Reader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let value_stream =
            require_stream(stripe, column_id, StreamKind::Data, DECIMAL64_CONTEXT)?;
        let version = stripe.encoding(column_id)?.kind.rle_version();
        let scale_stream =
            require_stream(stripe, column_id, StreamKind::Secondary, DECIMAL64_CONTEXT)?;
        let scale_rle = stripe.create_int_rle(scale_stream, true, version)?;
        Ok(Decimal64Reader {
            base,
            value_stream,
            view: ChunkView::new(),
            scale_rle,
            precision: node.precision() as i32,
            scale: node.scale() as i32,
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
        let (values, read_scales, precision, scale) =
            decimal64_payload(payload, column_id, DECIMAL64_CONTEXT)?;
        *precision = self.precision;
        *scale = self.scale;
        read_scales[..num_values].fill(0);
        self.scale_rle.next(&mut read_scales[..num_values], mask)?;
        for i in 0..num_values {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            let raw = read_varint_u64(&mut self.view, &mut *self.value_stream, DECIMAL64_CONTEXT)?;
            values[i] = rescale_i64(
                unzigzag64(raw),
                self.scale,
                read_scales[i] as i32,
                column_id,
            )?;
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        skip_varints(
            &mut self.view,
            &mut *self.value_stream,
            non_null,
            DECIMAL64_CONTEXT,
        )?;
        self.scale_rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.value_stream.seek(positions.at(self.base.column_id())?)?;
        self.scale_rle.seek(positions.at(self.base.column_id())?)?;
        self.view.clear();
        Ok(())
    }
}

const DECIMAL128_CONTEXT: &str = "Decimal128 column";

/// Classic decimal at 128 bits.
pub struct Decimal128Reader {
    base: ReaderBase,
    value_stream: Box<dyn SeekableByteStream>,
    view: ChunkView,
    scale_rle: Box<dyn IntRleDecoder>,
    precision: i32,
    scale: i32,
}

impl Decimal128Reader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let value_stream =
            require_stream(stripe, column_id, StreamKind::Data, DECIMAL128_CONTEXT)?;
        let version = stripe.encoding(column_id)?.kind.rle_version();
        let scale_stream =
            require_stream(stripe, column_id, StreamKind::Secondary, DECIMAL128_CONTEXT)?;
        let scale_rle = stripe.create_int_rle(scale_stream, true, version)?;
        Ok(Decimal128Reader {
            base,
            value_stream,
            view: ChunkView::new(),
            scale_rle,
            precision: node.precision() as i32,
            scale: node.scale() as i32,
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
        let (values, read_scales, precision, scale) =
            decimal128_payload(payload, column_id, DECIMAL128_CONTEXT)?;
        *precision = self.precision;
        *scale = self.scale;
        read_scales[..num_values].fill(0);
        self.scale_rle.next(&mut read_scales[..num_values], mask)?;
        for i in 0..num_values {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            let (raw, _) =
                read_varint_u128(&mut self.view, &mut *self.value_stream, DECIMAL128_CONTEXT)?;
            values[i] = rescale_i128(
                unzigzag128(raw),
                self.scale,
                read_scales[i] as i32,
                column_id,
            )?;
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        skip_varints(
            &mut self.view,
            &mut *self.value_stream,
            non_null,
            DECIMAL128_CONTEXT,
        )?;
        self.scale_rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.value_stream.seek(positions.at(self.base.column_id())?)?;
        self.scale_rle.seek(positions.at(self.base.column_id())?)?;
        self.view.clear();
        Ok(())
    }
}

const DECIMAL64_V2_CONTEXT: &str = "Decimal64V2 column";

/// Small-precision decimal stored as pre-scaled RLE V2 longs.
pub struct Decimal64V2Reader {
    base: ReaderBase,
    value_rle: Box<dyn IntRleDecoder>,
    precision: i32,
    scale: i32,
}

impl Decimal64V2Reader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let stream = require_stream(
            stripe,
            base.column_id(),
            StreamKind::Data,
            DECIMAL64_V2_CONTEXT,
        )?;
        let value_rle = stripe.create_int_rle(stream, true, RleVersion::V2)?;
        Ok(Decimal64V2Reader {
            base,
            value_rle,
            precision: node.precision() as i32,
            scale: node.scale() as i32,
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
        let (values, _, precision, scale) =
            decimal64_payload(payload, column_id, DECIMAL64_V2_CONTEXT)?;
        self.value_rle.next(&mut values[..num_values], mask)?;
        *precision = self.precision;
        *scale = self.scale;
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        self.value_rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.value_rle.seek(positions.at(self.base.column_id())?)
    }
}

const HIVE11_CONTEXT: &str = "Hive 0.11 decimal column";

/// Legacy Hive 0.11 decimal: no precision in the file, 128-bit output,
/// caller-forced scale, configurable overflow handling.
pub struct DecimalHive11Reader {
    base: ReaderBase,
    value_stream: Box<dyn SeekableByteStream>,
    view: ChunkView,
    scale_rle: Box<dyn IntRleDecoder>,
    scale: i32,
    throw_on_overflow: bool,
    error_sink: Arc<dyn ErrorSink>,
}

impl DecimalHive11Reader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let value_stream = require_stream(stripe, column_id, StreamKind::Data, HIVE11_CONTEXT)?;
        let version = stripe.encoding(column_id)?.kind.rle_version();
        let scale_stream =
            require_stream(stripe, column_id, StreamKind::Secondary, HIVE11_CONTEXT)?;
        let scale_rle = stripe.create_int_rle(scale_stream, true, version)?;
        Ok(DecimalHive11Reader {
            base,
            value_stream,
            view: ChunkView::new(),
            scale_rle,
            scale: stripe.forced_scale_on_hive11_decimal(),
            throw_on_overflow: stripe.throw_on_hive11_decimal_overflow(),
            error_sink: stripe.error_sink(),
        })
    }

    /// Decode one value; `None` when it cannot be represented in 38 digits.
    /// The wire bytes are consumed either way.
    fn read_value(&mut self, current_scale: i32, column_id: u32) -> Result<Option<i128>> {
        let (raw, fits) =
            read_varint_u128(&mut self.view, &mut *self.value_stream, HIVE11_CONTEXT)?;
        if !fits {
            return Ok(None);
        }
        let value = match rescale_i128(unzigzag128(raw), self.scale, current_scale, column_id) {
            Ok(value) => value,
            Err(_) => return Ok(None),
        };
        if !(-MAX_DECIMAL128..=MAX_DECIMAL128).contains(&value) {
            return Ok(None);
        }
        Ok(Some(value))
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        self.base.next_presence(batch, num_values, incoming_mask)?;
        let column_id = self.base.column_id();
        // The loop below may null out rows, so take a copy of the mask
        // instead of borrowing `not_null` across the mutation.
        let mask: Option<Vec<u8>> = if batch.has_nulls {
            Some(batch.not_null[..num_values].to_vec())
        } else {
            None
        };
        let mask = mask.as_deref();
        {
            let (_, read_scales, precision, scale) =
                decimal128_payload(&mut batch.payload, column_id, HIVE11_CONTEXT)?;
            *precision = 0;
            *scale = self.scale;
            read_scales[..num_values].fill(0);
            self.scale_rle.next(&mut read_scales[..num_values], mask)?;
        }
        for i in 0..num_values {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            let current_scale = match &batch.payload {
                BatchPayload::Decimal128 { read_scales, .. } => read_scales[i] as i32,
                _ => 0,
            };
            match self.read_value(current_scale, column_id)? {
                Some(value) => {
                    if let BatchPayload::Decimal128 { values, .. } = &mut batch.payload {
                        values[i] = value;
                    }
                }
                None => {
                    if self.throw_on_overflow {
                        return Err(OrcError::parse(format!(
                            "Hive 0.11 decimal was more than 38 digits: column_id={}, row={}",
                            column_id, i
                        )));
                    }
                    self.error_sink.write_line(
                        "Warning: Hive 0.11 decimal with more than 38 digits replaced by NULL",
                    );
                    warn!(column_id, row = i, "Hive 0.11 decimal overflow replaced by NULL");
                    batch.not_null[i] = 0;
                    batch.has_nulls = true;
                }
            }
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        skip_varints(
            &mut self.view,
            &mut *self.value_stream,
            non_null,
            HIVE11_CONTEXT,
        )?;
        self.scale_rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.value_stream.seek(positions.at(self.base.column_id())?)?;
        self.scale_rle.seek(positions.at(self.base.column_id())?)?;
        self.view.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unzigzag_round_values() {
        assert_eq!(unzigzag64(0), 0);
        assert_eq!(unzigzag64(1), -1);
        assert_eq!(unzigzag64(2), 1);
        assert_eq!(unzigzag64(3), -2);
        assert_eq!(unzigzag128(4), 2);
        assert_eq!(unzigzag128(5), -3);
    }

    #[test]
    fn rescale_i64_matches_scale_rules() {
        // Raising the scale multiplies, lowering truncates toward zero.
        assert_eq!(rescale_i64(5, 2, 0, 0).expect("up"), 500);
        assert_eq!(rescale_i64(12345, 2, 3, 0).expect("down"), 1234);
        assert_eq!(rescale_i64(-12345, 2, 3, 0).expect("down"), -1234);
        assert_eq!(rescale_i64(7, 4, 4, 0).expect("same"), 7);
        let err = rescale_i64(1, 25, 0, 0).expect_err("out of range");
        assert!(err.to_string().contains("scale out of range"), "err={}", err);
        let err = rescale_i64(i64::MAX, 2, 0, 0).expect_err("overflow");
        assert!(err.to_string().contains("rescale overflow"), "err={}", err);
    }

    #[test]
    fn rescale_i128_iterates_in_blocks() {
        let value = rescale_i128(1, 38, 0, 0).expect("rescale");
        assert_eq!(value, 10_i128.pow(38));
        assert_eq!(rescale_i128(MAX_DECIMAL128, 0, 20, 0).expect("down"),
                   MAX_DECIMAL128 / 10_i128.pow(20));
    }
}
