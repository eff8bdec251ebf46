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
//! Timestamp leaf reader.
//!
//! Two RLE streams per column: DATA carries signed seconds from the format
//! epoch, SECONDARY carries nanoseconds with the low three bits holding a
//! trailing-zero count. TIMESTAMP columns are rebased from the writer's
//! timezone rules to the reader's; TIMESTAMP_INSTANT pins both zones to GMT
//! which makes the rebase a no-op.

use std::sync::Arc;

use crate::batch::{BatchPayload, ColumnVectorBatch};
use crate::error::Result;
use crate::rle::IntRleDecoder;
use crate::schema::TypeNode;
use crate::stream::PositionProviderMap;
use crate::stripe::{StreamKind, StripeStreams};
use crate::timezone::{Timezone, TzRules};

use super::{batch_kind_error, refined_mask, require_stream, ReaderBase};

const CONTEXT: &str = "Timestamp column";

pub struct TimestampReader {
    base: ReaderBase,
    seconds_rle: Box<dyn IntRleDecoder>,
    nanos_rle: Box<dyn IntRleDecoder>,
    writer_timezone: Arc<dyn Timezone>,
    reader_timezone: Arc<dyn Timezone>,
    epoch_offset: i64,
    same_timezone: bool,
}

impl TimestampReader {
    pub(crate) fn open(
        node: &TypeNode,
        stripe: &dyn StripeStreams,
        is_instant: bool,
    ) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let version = stripe.encoding(base.column_id())?.kind.rle_version();
        let seconds_stream =
            require_stream(stripe, base.column_id(), StreamKind::Data, CONTEXT)?;
        let seconds_rle = stripe.create_int_rle(seconds_stream, true, version)?;
        let nanos_stream =
            require_stream(stripe, base.column_id(), StreamKind::Secondary, CONTEXT)?;
        let nanos_rle = stripe.create_int_rle(nanos_stream, false, version)?;

        let (writer_timezone, reader_timezone): (Arc<dyn Timezone>, Arc<dyn Timezone>) =
            if is_instant {
                (Arc::new(TzRules::gmt()), Arc::new(TzRules::gmt()))
            } else {
                (stripe.writer_timezone(), stripe.reader_timezone())
            };
        let epoch_offset = writer_timezone.epoch_offset();
        let same_timezone = writer_timezone.name() == reader_timezone.name();
        Ok(TimestampReader {
            base,
            seconds_rle,
            nanos_rle,
            writer_timezone,
            reader_timezone,
            epoch_offset,
            same_timezone,
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
        let BatchPayload::Timestamp {
            seconds,
            nanoseconds,
        } = payload
        else {
            return Err(batch_kind_error(
                column_id,
                CONTEXT,
                "Timestamp",
                payload.type_name(),
            ));
        };
        self.seconds_rle.next(&mut seconds[..num_values], mask)?;
        self.nanos_rle.next(&mut nanoseconds[..num_values], mask)?;

        for i in 0..num_values {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            let zeros = (nanoseconds[i] & 0x7) as u32;
            nanoseconds[i] >>= 3;
            if zeros != 0 {
                // The stored trailing-zero count is one less than the number
                // of zeros removed.
                for _ in 0..=zeros {
                    nanoseconds[i] *= 10;
                }
            }
            let mut writer_time = seconds[i].wrapping_add(self.epoch_offset);
            if !self.same_timezone {
                let writer_variant = self.writer_timezone.variant_at(writer_time);
                let reader_variant = self.reader_timezone.variant_at(writer_time);
                if !writer_variant.has_same_rule(&reader_variant) {
                    // The offset adjustment itself can land on the other
                    // side of a reader DST boundary, so re-evaluate there.
                    let adjusted =
                        writer_time + writer_variant.gmt_offset - reader_variant.gmt_offset;
                    let adjusted_variant = self.reader_timezone.variant_at(adjusted);
                    writer_time =
                        writer_time + writer_variant.gmt_offset - adjusted_variant.gmt_offset;
                }
            }
            seconds[i] = writer_time;
            // Pre-epoch values split seconds/nanos around zero; undo the
            // carry the writer introduced.
            if seconds[i] < 0 && nanoseconds[i] > 999_999 {
                seconds[i] -= 1;
            }
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        self.seconds_rle.skip(non_null)?;
        self.nanos_rle.skip(non_null)?;
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.seconds_rle.seek(positions.at(self.base.column_id())?)?;
        self.nanos_rle.seek(positions.at(self.base.column_id())?)
    }
}
