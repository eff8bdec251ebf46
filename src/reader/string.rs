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
//! Direct and dictionary string leaf readers.
//!
//! Direct columns interleave a LENGTH run stream with a raw DATA blob; the
//! reader assembles per-row views over a batch-owned copy of the blob.
//! Dictionary columns materialize their dictionary eagerly at construction
//! and then stream entry indexes; the decoded path resolves views into the
//! shared dictionary blob, while the encoded path hands the indexes and the
//! dictionary itself to the caller untouched.

use std::sync::Arc;

use crate::batch::{BatchPayload, ColumnVectorBatch, StringBatch, StringDictionary};
use crate::error::{OrcError, Result};
use crate::rle::IntRleDecoder;
use crate::schema::TypeNode;
use crate::stream::{
    read_fully, skip_stream_bytes, ChunkView, PositionProviderMap, SeekableByteStream,
};
use crate::stripe::{StreamKind, StripeStreams};

use super::{batch_kind_error, refined_mask, require_stream, ReaderBase};

/// Window size for paging lengths while skipping.
const LENGTH_WINDOW: usize = 1024;

fn string_payload<'a>(
    payload: &'a mut BatchPayload,
    column_id: u32,
    context: &str,
) -> Result<&'a mut StringBatch> {
    match payload {
        BatchPayload::String(strings) => Ok(strings),
        other => Err(batch_kind_error(
            column_id,
            context,
            "String",
            other.type_name(),
        )),
    }
}

/// Reader for direct-encoded string-family columns.
pub struct StringDirectReader {
    base: ReaderBase,
    length_rle: Box<dyn IntRleDecoder>,
    blob_stream: Box<dyn SeekableByteStream>,
    /// Unconsumed tail of the last DATA chunk, carried across calls.
    carry: ChunkView,
}

const DIRECT_CONTEXT: &str = "direct string column";

impl StringDirectReader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let version = stripe.encoding(base.column_id())?.kind.rle_version();
        let length_stream =
            require_stream(stripe, base.column_id(), StreamKind::Length, DIRECT_CONTEXT)?;
        let length_rle = stripe.create_int_rle(length_stream, false, version)?;
        let blob_stream =
            require_stream(stripe, base.column_id(), StreamKind::Data, DIRECT_CONTEXT)?;
        Ok(StringDirectReader {
            base,
            length_rle,
            blob_stream,
            carry: ChunkView::new(),
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
        let strings = string_payload(payload, column_id, DIRECT_CONTEXT)?;
        strings.is_encoded = false;
        strings.dictionary = None;

        let lengths = &mut strings.lengths[..num_values];
        lengths.fill(0);
        self.length_rle.next(lengths, mask)?;

        let mut total = 0_usize;
        for (i, length) in lengths.iter().enumerate() {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            if *length < 0 {
                return Err(OrcError::parse(format!(
                    "negative value length in {}: column_id={}, row={}, length={}",
                    DIRECT_CONTEXT, column_id, i, length
                )));
            }
            total = total.checked_add(*length as usize).ok_or_else(|| {
                OrcError::parse(format!(
                    "value byte total overflow in {}: column_id={}",
                    DIRECT_CONTEXT, column_id
                ))
            })?;
        }

        // Drain exactly `total` blob bytes, favoring the carried-over tail
        // of the previous chunk.
        strings.blob.clear();
        strings.blob.resize(total, 0);
        let mut buffered = 0_usize;
        while buffered + self.carry.remaining() < total {
            let available = self.carry.remaining();
            strings.blob[buffered..buffered + available].copy_from_slice(self.carry.rest());
            buffered += available;
            self.carry.refill(&mut *self.blob_stream, DIRECT_CONTEXT)?;
        }
        if buffered < total {
            let more = total - buffered;
            strings.blob[buffered..total].copy_from_slice(&self.carry.rest()[..more]);
            self.carry.advance(more);
        }

        let mut position = 0_usize;
        for i in 0..num_values {
            strings.starts[i] = position as u64;
            let present = match mask {
                Some(mask) => mask[i] != 0,
                None => true,
            };
            if present {
                position += strings.lengths[i] as usize;
            }
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        let mut scratch = [0_i64; LENGTH_WINDOW];
        let mut remaining = non_null;
        let mut total = 0_usize;
        while remaining > 0 {
            let step = remaining.min(LENGTH_WINDOW);
            self.length_rle.next(&mut scratch[..step], None)?;
            for length in &scratch[..step] {
                if *length < 0 {
                    return Err(OrcError::parse(format!(
                        "negative value length in {}: column_id={}, length={}",
                        DIRECT_CONTEXT,
                        self.base.column_id(),
                        length
                    )));
                }
                total += *length as usize;
            }
            remaining -= step;
        }
        if total <= self.carry.remaining() {
            self.carry.advance(total);
        } else {
            let residual = total - self.carry.remaining();
            self.carry.clear();
            skip_stream_bytes(&mut *self.blob_stream, residual)?;
        }
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.blob_stream.seek(positions.at(self.base.column_id())?)?;
        self.length_rle.seek(positions.at(self.base.column_id())?)?;
        self.carry.clear();
        Ok(())
    }
}

const DICT_CONTEXT: &str = "dictionary string column";

/// Reader for dictionary-encoded string-family columns.
pub struct StringDictionaryReader {
    base: ReaderBase,
    /// Entry index stream (DATA), unsigned RLE.
    rle: Box<dyn IntRleDecoder>,
    dictionary: Arc<StringDictionary>,
}

impl StringDictionaryReader {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let encoding = stripe.encoding(column_id)?;
        let version = encoding.kind.rle_version();
        let dict_size = encoding.dictionary_size as usize;

        let index_stream = require_stream(stripe, column_id, StreamKind::Data, DICT_CONTEXT)?;
        let rle = stripe.create_int_rle(index_stream, false, version)?;

        let mut offsets = vec![0_i64; dict_size + 1];
        if dict_size > 0 {
            let length_stream = stripe
                .stream(column_id, StreamKind::Length, false)?
                .ok_or_else(|| {
                    OrcError::parse(format!(
                        "LENGTH stream not found in {}: column_id={}",
                        DICT_CONTEXT, column_id
                    ))
                })?;
            let mut length_rle = stripe.create_int_rle(length_stream, false, version)?;
            length_rle.next(&mut offsets[1..], None)?;
            for i in 1..=dict_size {
                if offsets[i] < 0 {
                    return Err(OrcError::parse(format!(
                        "negative dictionary entry length: column_id={}, entry={}, length={}",
                        column_id,
                        i - 1,
                        offsets[i]
                    )));
                }
                offsets[i] = offsets[i].checked_add(offsets[i - 1]).ok_or_else(|| {
                    OrcError::parse(format!(
                        "dictionary blob size overflow: column_id={}, entry={}",
                        column_id,
                        i - 1
                    ))
                })?;
            }
        }

        let blob_size = usize::try_from(offsets[dict_size]).map_err(|_| {
            OrcError::parse(format!(
                "dictionary blob size out of range: column_id={}, blob_size={}",
                column_id, offsets[dict_size]
            ))
        })?;
        let blob = if blob_size > 0 {
            let mut blob_stream = stripe
                .stream(column_id, StreamKind::DictionaryData, false)?
                .ok_or_else(|| {
                    OrcError::parse(format!(
                        "DICTIONARY_DATA stream not found in {}: column_id={}",
                        DICT_CONTEXT, column_id
                    ))
                })?;
            read_fully(&mut *blob_stream, blob_size, DICT_CONTEXT)?
        } else {
            Vec::new()
        };

        Ok(StringDictionaryReader {
            base,
            rle,
            dictionary: Arc::new(StringDictionary { offsets, blob }),
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
        let strings = string_payload(payload, column_id, DICT_CONTEXT)?;
        strings.is_encoded = false;
        strings.blob.clear();

        // The length array doubles as scratch for the entry indexes.
        let lengths = &mut strings.lengths[..num_values];
        lengths.fill(0);
        self.rle.next(lengths, mask)?;

        let dict_size = self.dictionary.len() as i64;
        for i in 0..num_values {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            let entry = strings.lengths[i];
            if entry < 0 || entry >= dict_size {
                return Err(OrcError::parse(format!(
                    "dictionary entry index out of range: column_id={}, row={}, entry={}, dictionary_size={}",
                    column_id, i, entry, dict_size
                )));
            }
            let start = self.dictionary.offsets[entry as usize];
            let end = self.dictionary.offsets[entry as usize + 1];
            strings.starts[i] = start as u64;
            strings.lengths[i] = end - start;
        }
        strings.dictionary = Some(Arc::clone(&self.dictionary));
        Ok(())
    }

    pub fn next_encoded(
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
        let strings = string_payload(payload, column_id, DICT_CONTEXT)?;
        strings.is_encoded = true;

        let index = &mut strings.index[..num_values];
        index.fill(0);
        self.rle.next(index, mask)?;
        strings.dictionary = Some(Arc::clone(&self.dictionary));
        Ok(())
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
