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
//! Column reader tree.
//!
//! One [`ColumnReader`] per selected schema node, built by [`build_reader`]
//! from the schema and the stripe's per-column encodings. Every reader
//! supports the same three operations: decode the next `N` rows into a
//! batch, skip `N` rows, and reposition all owned streams at a row-group
//! boundary. Null masks flow down the tree: a reader ANDs the incoming mask
//! with its own PRESENT stream and hands the refined mask to its payload
//! decoders and children.

use std::sync::Arc;

use tracing::debug;

use crate::batch::ColumnVectorBatch;
use crate::error::{OrcError, Result};
use crate::rle::ByteRleDecoder;
use crate::schema::{TypeKind, TypeNode};
use crate::stream::{PositionProviderMap, SeekableByteStream};
use crate::stripe::{ConvertReader, ReaderMetrics, StreamKind, StripeStreams};

pub mod complex;
pub mod decimal;
pub mod float;
pub mod primitive;
pub mod string;
pub mod timestamp;

use complex::{ListReader, MapReader, StructReader, UnionReader};
use decimal::{Decimal128Reader, Decimal64Reader, Decimal64V2Reader, DecimalHive11Reader};
use float::FloatReader;
use primitive::{BooleanReader, ByteReader, IntegerReader};
use string::{StringDictionaryReader, StringDirectReader};
use timestamp::TimestampReader;

/// Decimal precision representable in 64 bits.
pub(crate) const MAX_PRECISION_64: u32 = 18;

/// Fields shared by every reader: the column id, the optional PRESENT
/// decoder, and the injected metrics sink.
pub(crate) struct ReaderBase {
    column_id: u32,
    present: Option<Box<dyn ByteRleDecoder>>,
    metrics: Arc<ReaderMetrics>,
}

impl ReaderBase {
    pub(crate) fn open(node: &TypeNode, stripe: &dyn StripeStreams) -> Result<Self> {
        let column_id = node.column_id();
        let present = match stripe.stream(column_id, StreamKind::Present, false)? {
            Some(stream) => Some(stripe.create_boolean_rle(stream)?),
            None => None,
        };
        Ok(ReaderBase {
            column_id,
            present,
            metrics: stripe.reader_metrics(),
        })
    }

    pub(crate) fn column_id(&self) -> u32 {
        self.column_id
    }

    /// Fill `batch.not_null[..num_values]` from the PRESENT stream and the
    /// incoming mask, and settle `has_nulls`.
    pub(crate) fn next_presence(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        batch.resize(num_values);
        batch.num_elements = num_values;
        self.metrics.on_next(num_values);
        if let Some(decoder) = self.present.as_mut() {
            let not_null = &mut batch.not_null[..num_values];
            if incoming_mask.is_some() {
                // Masked-out rows consume no PRESENT bit and must read as
                // null here.
                not_null.fill(0);
            }
            decoder.next(not_null, incoming_mask)?;
            batch.has_nulls = not_null.iter().any(|value| *value == 0);
        } else if let Some(mask) = incoming_mask {
            batch.not_null[..num_values].copy_from_slice(&mask[..num_values]);
            batch.has_nulls = true;
        } else {
            batch.has_nulls = false;
        }
        Ok(())
    }

    /// Page through `num_values` PRESENT entries and return how many were
    /// non-null, i.e. how many payload values the caller must skip.
    pub(crate) fn skip_presence(&mut self, num_values: usize) -> Result<usize> {
        self.metrics.on_skip(num_values);
        let Some(decoder) = self.present.as_mut() else {
            return Ok(num_values);
        };
        const MAX_BUFFER_SIZE: usize = 32 * 1024;
        let mut buffer = vec![0_u8; num_values.min(MAX_BUFFER_SIZE)];
        let mut remaining = num_values;
        let mut non_null = num_values;
        while remaining > 0 {
            let step = remaining.min(buffer.len());
            decoder.next(&mut buffer[..step], None)?;
            non_null -= buffer[..step].iter().filter(|value| **value == 0).count();
            remaining -= step;
        }
        Ok(non_null)
    }

    pub(crate) fn seek(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.metrics.on_seek();
        if let Some(decoder) = self.present.as_mut() {
            decoder.seek(positions.at(self.column_id)?)?;
        }
        Ok(())
    }
}

/// The refined mask a reader hands to its payload decoders and children.
pub(crate) fn refined_mask(has_nulls: bool, not_null: &[u8], num_values: usize) -> Option<&[u8]> {
    if has_nulls {
        Some(&not_null[..num_values])
    } else {
        None
    }
}

/// Fetch a stream the column cannot decode without.
pub(crate) fn require_stream(
    stripe: &dyn StripeStreams,
    column_id: u32,
    kind: StreamKind,
    context: &str,
) -> Result<Box<dyn SeekableByteStream>> {
    stripe.stream(column_id, kind, true)?.ok_or_else(|| {
        OrcError::parse(format!(
            "{:?} stream not found in {}: column_id={}",
            kind, context, column_id
        ))
    })
}

/// Batch-kind mismatch between a reader and the batch it was handed.
pub(crate) fn batch_kind_error(
    column_id: u32,
    context: &str,
    expected: &str,
    actual: &str,
) -> OrcError {
    OrcError::parse(format!(
        "batch kind mismatch in {}: column_id={}, expected={}, actual={}",
        context, column_id, expected, actual
    ))
}

impl std::fmt::Debug for ColumnReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ColumnReader")
    }
}

/// One node of the reader tree.
pub enum ColumnReader {
    Boolean(BooleanReader),
    Byte(ByteReader),
    Integer(IntegerReader),
    Float(FloatReader<4>),
    Double(FloatReader<8>),
    Timestamp(TimestampReader),
    StringDirect(StringDirectReader),
    StringDictionary(StringDictionaryReader),
    Decimal64(Decimal64Reader),
    Decimal128(Decimal128Reader),
    Decimal64V2(Decimal64V2Reader),
    DecimalHive11(DecimalHive11Reader),
    Struct(StructReader),
    List(ListReader),
    Map(MapReader),
    Union(UnionReader),
    /// Schema-evolution interposer built behind the stripe's
    /// [`crate::stripe::SchemaEvolution`] seam.
    Convert(Box<dyn ConvertReader>),
}

impl ColumnReader {
    /// Decode the next `num_values` rows into `batch`.
    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        match self {
            ColumnReader::Boolean(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Byte(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Integer(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Float(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Double(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Timestamp(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::StringDirect(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::StringDictionary(reader) => {
                reader.next(batch, num_values, incoming_mask)
            }
            ColumnReader::Decimal64(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Decimal128(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Decimal64V2(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::DecimalHive11(reader) => reader.next(batch, num_values, incoming_mask),
            ColumnReader::Struct(reader) => reader.next(batch, num_values, incoming_mask, false),
            ColumnReader::List(reader) => reader.next(batch, num_values, incoming_mask, false),
            ColumnReader::Map(reader) => reader.next(batch, num_values, incoming_mask, false),
            ColumnReader::Union(reader) => reader.next(batch, num_values, incoming_mask, false),
            ColumnReader::Convert(reader) => reader.next(batch, num_values, incoming_mask),
        }
    }

    /// Decode the next `num_values` rows, keeping dictionary strings in
    /// encoded form. Identical to [`ColumnReader::next`] for readers with
    /// no encoded representation.
    pub fn next_encoded(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
    ) -> Result<()> {
        match self {
            ColumnReader::StringDictionary(reader) => {
                reader.next_encoded(batch, num_values, incoming_mask)
            }
            ColumnReader::Struct(reader) => reader.next(batch, num_values, incoming_mask, true),
            ColumnReader::List(reader) => reader.next(batch, num_values, incoming_mask, true),
            ColumnReader::Map(reader) => reader.next(batch, num_values, incoming_mask, true),
            ColumnReader::Union(reader) => reader.next(batch, num_values, incoming_mask, true),
            ColumnReader::Convert(reader) => {
                reader.next_encoded(batch, num_values, incoming_mask)
            }
            other => other.next(batch, num_values, incoming_mask),
        }
    }

    /// Skip `num_values` rows; returns the non-null count among them.
    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        match self {
            ColumnReader::Boolean(reader) => reader.skip(num_values),
            ColumnReader::Byte(reader) => reader.skip(num_values),
            ColumnReader::Integer(reader) => reader.skip(num_values),
            ColumnReader::Float(reader) => reader.skip(num_values),
            ColumnReader::Double(reader) => reader.skip(num_values),
            ColumnReader::Timestamp(reader) => reader.skip(num_values),
            ColumnReader::StringDirect(reader) => reader.skip(num_values),
            ColumnReader::StringDictionary(reader) => reader.skip(num_values),
            ColumnReader::Decimal64(reader) => reader.skip(num_values),
            ColumnReader::Decimal128(reader) => reader.skip(num_values),
            ColumnReader::Decimal64V2(reader) => reader.skip(num_values),
            ColumnReader::DecimalHive11(reader) => reader.skip(num_values),
            ColumnReader::Struct(reader) => reader.skip(num_values),
            ColumnReader::List(reader) => reader.skip(num_values),
            ColumnReader::Map(reader) => reader.skip(num_values),
            ColumnReader::Union(reader) => reader.skip(num_values),
            ColumnReader::Convert(reader) => reader.skip(num_values),
        }
    }

    /// Reposition every stream owned by this subtree to the row-group
    /// boundary described by `positions`.
    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        match self {
            ColumnReader::Boolean(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Byte(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Integer(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Float(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Double(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Timestamp(reader) => reader.seek_to_row_group(positions),
            ColumnReader::StringDirect(reader) => reader.seek_to_row_group(positions),
            ColumnReader::StringDictionary(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Decimal64(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Decimal128(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Decimal64V2(reader) => reader.seek_to_row_group(positions),
            ColumnReader::DecimalHive11(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Struct(reader) => reader.seek_to_row_group(positions),
            ColumnReader::List(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Map(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Union(reader) => reader.seek_to_row_group(positions),
            ColumnReader::Convert(reader) => reader.seek_to_row_group(positions),
        }
    }
}

/// Build the reader tree for one schema subtree.
///
/// `use_tight_numeric` matches the batch layout chosen by
/// [`ColumnVectorBatch::for_type`]; `convert_to_read_type` enables the
/// schema-evolution seam.
pub fn build_reader(
    node: &TypeNode,
    stripe: &dyn StripeStreams,
    use_tight_numeric: bool,
    throw_on_schema_evolution_overflow: bool,
    convert_to_read_type: bool,
) -> Result<ColumnReader> {
    if convert_to_read_type {
        if let Some(evolution) = stripe.schema_evolution() {
            if evolution.needs_convert(node) {
                debug!(
                    column_id = node.column_id(),
                    kind = ?node.kind(),
                    "interposing convert reader"
                );
                let reader = evolution.build_convert_reader(
                    node,
                    stripe,
                    use_tight_numeric,
                    throw_on_schema_evolution_overflow,
                )?;
                return Ok(ColumnReader::Convert(reader));
            }
        }
    }

    match node.kind() {
        TypeKind::Boolean => Ok(ColumnReader::Boolean(BooleanReader::open(node, stripe)?)),
        TypeKind::Byte => Ok(ColumnReader::Byte(ByteReader::open(node, stripe)?)),
        TypeKind::Short | TypeKind::Int | TypeKind::Long | TypeKind::Date => {
            Ok(ColumnReader::Integer(IntegerReader::open(node, stripe)?))
        }
        TypeKind::Float => Ok(ColumnReader::Float(FloatReader::open(node, stripe)?)),
        TypeKind::Double => Ok(ColumnReader::Double(FloatReader::open(node, stripe)?)),
        TypeKind::Timestamp => Ok(ColumnReader::Timestamp(TimestampReader::open(
            node, stripe, false,
        )?)),
        TypeKind::TimestampInstant => Ok(ColumnReader::Timestamp(TimestampReader::open(
            node, stripe, true,
        )?)),
        kind if kind.is_string_family() => {
            if stripe.encoding(node.column_id())?.kind.is_dictionary() {
                Ok(ColumnReader::StringDictionary(StringDictionaryReader::open(
                    node, stripe,
                )?))
            } else {
                Ok(ColumnReader::StringDirect(StringDirectReader::open(
                    node, stripe,
                )?))
            }
        }
        TypeKind::Decimal => {
            // Precision 0 marks a Hive 0.11 file with no precision at all.
            if node.precision() == 0 {
                Ok(ColumnReader::DecimalHive11(DecimalHive11Reader::open(
                    node, stripe,
                )?))
            } else if node.precision() <= MAX_PRECISION_64 {
                if stripe.is_decimal_as_long() {
                    Ok(ColumnReader::Decimal64V2(Decimal64V2Reader::open(
                        node, stripe,
                    )?))
                } else {
                    Ok(ColumnReader::Decimal64(Decimal64Reader::open(node, stripe)?))
                }
            } else {
                Ok(ColumnReader::Decimal128(Decimal128Reader::open(
                    node, stripe,
                )?))
            }
        }
        TypeKind::List => Ok(ColumnReader::List(ListReader::open(
            node,
            stripe,
            use_tight_numeric,
            throw_on_schema_evolution_overflow,
        )?)),
        TypeKind::Map => Ok(ColumnReader::Map(MapReader::open(
            node,
            stripe,
            use_tight_numeric,
            throw_on_schema_evolution_overflow,
        )?)),
        TypeKind::Struct => Ok(ColumnReader::Struct(StructReader::open(
            node,
            stripe,
            use_tight_numeric,
            throw_on_schema_evolution_overflow,
        )?)),
        TypeKind::Union => Ok(ColumnReader::Union(UnionReader::open(
            node,
            stripe,
            use_tight_numeric,
            throw_on_schema_evolution_overflow,
        )?)),
        other => Err(OrcError::not_implemented(format!(
            "build_reader unhandled type: kind={:?}, column_id={}",
            other,
            node.column_id()
        ))),
    }
}
