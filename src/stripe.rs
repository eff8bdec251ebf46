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
//! Stripe environment consumed by the reader tree.
//!
//! Everything the decode core needs from one stripe comes through the
//! [`StripeStreams`] trait: per-column byte streams, encodings, the column
//! selection bitset, timezone rules, decode policy knobs, and construction
//! of the run-length decoders. The core owns none of it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::batch::ColumnVectorBatch;
use crate::error::Result;
use crate::rle::{ByteRleDecoder, IntRleDecoder, RleVersion};
use crate::schema::TypeNode;
use crate::stream::{PositionProviderMap, SeekableByteStream};
use crate::timezone::Timezone;

/// Kinds of per-column streams inside a stripe.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StreamKind {
    Present,
    Data,
    Length,
    Secondary,
    DictionaryData,
}

/// Wire encoding of one column.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColumnEncodingKind {
    Direct,
    DirectV2,
    Dictionary,
    DictionaryV2,
}

impl ColumnEncodingKind {
    pub fn rle_version(self) -> RleVersion {
        match self {
            ColumnEncodingKind::Direct | ColumnEncodingKind::Dictionary => RleVersion::V1,
            ColumnEncodingKind::DirectV2 | ColumnEncodingKind::DictionaryV2 => RleVersion::V2,
        }
    }

    pub fn is_dictionary(self) -> bool {
        matches!(
            self,
            ColumnEncodingKind::Dictionary | ColumnEncodingKind::DictionaryV2
        )
    }
}

/// Per-column encoding descriptor from the stripe footer.
#[derive(Clone, Copy, Debug)]
pub struct ColumnEncoding {
    pub kind: ColumnEncodingKind,
    /// Entry count for dictionary-flavored encodings, 0 otherwise.
    pub dictionary_size: u32,
}

impl ColumnEncoding {
    pub fn direct(kind: ColumnEncodingKind) -> Self {
        ColumnEncoding {
            kind,
            dictionary_size: 0,
        }
    }
}

/// Line-oriented sink for recoverable decode warnings.
pub trait ErrorSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Counters shared by every reader in one tree; thread-safe so multiple
/// trees may share one sink.
#[derive(Default, Debug)]
pub struct ReaderMetrics {
    pub decoded_batches: AtomicU64,
    pub decoded_values: AtomicU64,
    pub skipped_values: AtomicU64,
    pub row_group_seeks: AtomicU64,
}

impl ReaderMetrics {
    pub(crate) fn on_next(&self, num_values: usize) {
        self.decoded_batches.fetch_add(1, Ordering::Relaxed);
        self.decoded_values
            .fetch_add(num_values as u64, Ordering::Relaxed);
    }

    pub(crate) fn on_skip(&self, num_values: usize) {
        self.skipped_values
            .fetch_add(num_values as u64, Ordering::Relaxed);
    }

    pub(crate) fn on_seek(&self) {
        self.row_group_seeks.fetch_add(1, Ordering::Relaxed);
    }
}

/// Reader interposed when the stripe's writer schema differs from the
/// reader schema. Built behind [`SchemaEvolution`]; the decode core only
/// forwards calls to it.
pub trait ConvertReader {
    fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()>;

    fn next_encoded(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        self.next(batch, num_values, incoming_mask)
    }

    fn skip(&mut self, num_values: usize) -> Result<usize>;

    fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()>;
}

/// Schema-evolution helper supplied by the stripe when the writer and
/// reader schemas differ.
pub trait SchemaEvolution: Send + Sync {
    /// Whether values of `read_type` must be converted while decoding this
    /// stripe.
    fn needs_convert(&self, read_type: &TypeNode) -> bool;

    /// Build the interposing reader for `read_type`.
    fn build_convert_reader(
        &self,
        read_type: &TypeNode,
        stripe: &dyn StripeStreams,
        use_tight_numeric: bool,
        throw_on_overflow: bool,
    ) -> Result<Box<dyn ConvertReader>>;
}

/// One stripe as seen by the decode core.
///
/// The three `create_*` methods are the construction seam for the
/// run-length codec layer: the core hands back the stream it was given and
/// receives an opaque decoder.
pub trait StripeStreams {
    /// The stream for `(column_id, kind)`. With `required`, a missing
    /// stream is an error at the implementation's discretion; readers also
    /// convert `None` into a parse error naming the column.
    fn stream(
        &self,
        column_id: u32,
        kind: StreamKind,
        required: bool,
    ) -> Result<Option<Box<dyn SeekableByteStream>>>;

    fn encoding(&self, column_id: u32) -> Result<ColumnEncoding>;

    /// Column selection bitset indexed by column id. Columns past the end
    /// count as selected.
    fn selected_columns(&self) -> &[bool];

    fn writer_timezone(&self) -> Arc<dyn Timezone>;

    fn reader_timezone(&self) -> Arc<dyn Timezone>;

    /// Scale forced onto Hive 0.11 decimal columns, which carry none.
    fn forced_scale_on_hive11_decimal(&self) -> i32;

    /// Whether a Hive 0.11 decimal wider than 38 digits aborts the decode
    /// instead of nulling the row.
    fn throw_on_hive11_decimal_overflow(&self) -> bool;

    fn error_sink(&self) -> Arc<dyn ErrorSink>;

    fn schema_evolution(&self) -> Option<Arc<dyn SchemaEvolution>>;

    fn reader_metrics(&self) -> Arc<ReaderMetrics>;

    /// Whether small-precision decimals were written as RLE V2 longs
    /// (DATA stream only, pre-scaled).
    fn is_decimal_as_long(&self) -> bool;

    fn create_boolean_rle(
        &self,
        stream: Box<dyn SeekableByteStream>,
    ) -> Result<Box<dyn ByteRleDecoder>>;

    fn create_byte_rle(
        &self,
        stream: Box<dyn SeekableByteStream>,
    ) -> Result<Box<dyn ByteRleDecoder>>;

    fn create_int_rle(
        &self,
        stream: Box<dyn SeekableByteStream>,
        signed: bool,
        version: RleVersion,
    ) -> Result<Box<dyn IntRleDecoder>>;
}
