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
//! Struct, list, map, and union composite readers.
//!
//! Composites own no payload of their own beyond lengths or tags; their job
//! is routing: refine the null mask, derive how many child elements each
//! child must produce, and recurse. Child batches live inside the parent
//! batch; child readers live inside the parent reader.

use crate::batch::{is_selected, BatchPayload, ColumnVectorBatch};
use crate::error::{OrcError, Result};
use crate::rle::{ByteRleDecoder, IntRleDecoder};
use crate::schema::TypeNode;
use crate::stream::PositionProviderMap;
use crate::stripe::{ColumnEncodingKind, StreamKind, StripeStreams};

use super::{
    batch_kind_error, build_reader, refined_mask, require_stream, ColumnReader, ReaderBase,
};

/// Window size for paging lengths/tags while skipping.
const SKIP_WINDOW: usize = 1024;

fn child_next(
    child: &mut ColumnReader,
    batch: &mut ColumnVectorBatch,
    num_values: usize,
    mask: Option<&[u8]>,
    encoded: bool,
) -> Result<()> {
    if encoded {
        child.next_encoded(batch, num_values, mask)
    } else {
        child.next(batch, num_values, mask)
    }
}

/// Reader for STRUCT columns: one child reader per selected subtype.
pub struct StructReader {
    base: ReaderBase,
    children: Vec<ColumnReader>,
}

impl StructReader {
    pub(crate) fn open(
        node: &TypeNode,
        stripe: &dyn StripeStreams,
        use_tight_numeric: bool,
        throw_on_schema_evolution_overflow: bool,
    ) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let encoding = stripe.encoding(base.column_id())?;
        if encoding.kind != ColumnEncodingKind::Direct {
            return Err(OrcError::parse(format!(
                "unknown encoding for Struct column: column_id={}, encoding={:?}",
                base.column_id(),
                encoding.kind
            )));
        }
        let mut children = Vec::new();
        for child in node.children() {
            if is_selected(stripe.selected_columns(), child.column_id()) {
                children.push(build_reader(
                    child,
                    stripe,
                    use_tight_numeric,
                    throw_on_schema_evolution_overflow,
                    true,
                )?);
            }
        }
        Ok(StructReader { base, children })
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
        encoded: bool,
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
        let BatchPayload::Struct { fields } = payload else {
            return Err(batch_kind_error(
                column_id,
                "Struct column",
                "Struct",
                payload.type_name(),
            ));
        };
        if fields.len() != self.children.len() {
            return Err(OrcError::parse(format!(
                "Struct batch field count mismatch: column_id={}, fields={}, selected_children={}",
                column_id,
                fields.len(),
                self.children.len()
            )));
        }
        for (child, field) in self.children.iter_mut().zip(fields.iter_mut()) {
            child_next(child, field, num_values, mask, encoded)?;
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        for child in &mut self.children {
            child.skip(non_null)?;
        }
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        for child in &mut self.children {
            child.seek_to_row_group(positions)?;
        }
        Ok(())
    }
}

/// Convert per-row lengths (already decoded under the mask) into prefix-sum
/// offsets, returning the total child count.
fn lengths_to_offsets(
    offsets: &mut [i64],
    num_values: usize,
    mask: Option<&[u8]>,
    column_id: u32,
    context: &str,
) -> Result<usize> {
    let mut total: u64 = 0;
    for i in 0..num_values {
        let present = match mask {
            Some(mask) => mask[i] != 0,
            None => true,
        };
        if present {
            let length = offsets[i];
            if length < 0 {
                return Err(OrcError::parse(format!(
                    "negative length in {}: column_id={}, row={}, length={}",
                    context, column_id, i, length
                )));
            }
            offsets[i] = total as i64;
            total += length as u64;
        } else {
            offsets[i] = total as i64;
        }
    }
    offsets[num_values] = total as i64;
    usize::try_from(total).map_err(|_| {
        OrcError::parse(format!(
            "child element count out of range in {}: column_id={}, total={}",
            context, column_id, total
        ))
    })
}

/// Reader for LIST columns: a LENGTH run stream plus at most one child.
pub struct ListReader {
    base: ReaderBase,
    rle: Box<dyn IntRleDecoder>,
    child: Option<Box<ColumnReader>>,
}

const LIST_CONTEXT: &str = "List column";

impl ListReader {
    pub(crate) fn open(
        node: &TypeNode,
        stripe: &dyn StripeStreams,
        use_tight_numeric: bool,
        throw_on_schema_evolution_overflow: bool,
    ) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let version = stripe.encoding(column_id)?.kind.rle_version();
        let stream = require_stream(stripe, column_id, StreamKind::Length, LIST_CONTEXT)?;
        let rle = stripe.create_int_rle(stream, false, version)?;
        let element = node.children().first().ok_or_else(|| {
            OrcError::parse(format!(
                "LIST schema node missing element child: column_id={}",
                column_id
            ))
        })?;
        let child = if is_selected(stripe.selected_columns(), element.column_id()) {
            Some(Box::new(build_reader(
                element,
                stripe,
                use_tight_numeric,
                throw_on_schema_evolution_overflow,
                true,
            )?))
        } else {
            None
        };
        Ok(ListReader { base, rle, child })
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
        encoded: bool,
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
        let BatchPayload::List { offsets, elements } = payload else {
            return Err(batch_kind_error(
                column_id,
                LIST_CONTEXT,
                "List",
                payload.type_name(),
            ));
        };
        offsets[..num_values + 1].fill(0);
        self.rle.next(&mut offsets[..num_values], mask)?;
        let total_children =
            lengths_to_offsets(offsets, num_values, mask, column_id, LIST_CONTEXT)?;
        if let Some(child) = self.child.as_mut() {
            // List elements carry their own presence; the parent mask does
            // not propagate past the offsets.
            child_next(child, elements, total_children, None, encoded)?;
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        match self.child.as_mut() {
            Some(child) => {
                let mut scratch = [0_i64; SKIP_WINDOW];
                let mut remaining = non_null;
                let mut total_children = 0_usize;
                while remaining > 0 {
                    let step = remaining.min(SKIP_WINDOW);
                    self.rle.next(&mut scratch[..step], None)?;
                    for length in &scratch[..step] {
                        if *length < 0 {
                            return Err(OrcError::parse(format!(
                                "negative length in {}: column_id={}, length={}",
                                LIST_CONTEXT,
                                self.base.column_id(),
                                length
                            )));
                        }
                        total_children += *length as usize;
                    }
                    remaining -= step;
                }
                child.skip(total_children)?;
            }
            None => self.rle.skip(non_null)?,
        }
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.rle.seek(positions.at(self.base.column_id())?)?;
        if let Some(child) = self.child.as_mut() {
            child.seek_to_row_group(positions)?;
        }
        Ok(())
    }
}

/// Reader for MAP columns: a LENGTH run stream plus key and value children.
pub struct MapReader {
    base: ReaderBase,
    rle: Box<dyn IntRleDecoder>,
    key_reader: Option<Box<ColumnReader>>,
    element_reader: Option<Box<ColumnReader>>,
}

const MAP_CONTEXT: &str = "Map column";

impl MapReader {
    pub(crate) fn open(
        node: &TypeNode,
        stripe: &dyn StripeStreams,
        use_tight_numeric: bool,
        throw_on_schema_evolution_overflow: bool,
    ) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let version = stripe.encoding(column_id)?.kind.rle_version();
        let stream = require_stream(stripe, column_id, StreamKind::Length, MAP_CONTEXT)?;
        let rle = stripe.create_int_rle(stream, false, version)?;
        let [key, value] = node.children() else {
            return Err(OrcError::parse(format!(
                "MAP schema node child mismatch: column_id={}, children={}, expected=2",
                column_id,
                node.children().len()
            )));
        };
        let selected = stripe.selected_columns();
        let key_reader = if is_selected(selected, key.column_id()) {
            Some(Box::new(build_reader(
                key,
                stripe,
                use_tight_numeric,
                throw_on_schema_evolution_overflow,
                true,
            )?))
        } else {
            None
        };
        let element_reader = if is_selected(stripe.selected_columns(), value.column_id()) {
            Some(Box::new(build_reader(
                value,
                stripe,
                use_tight_numeric,
                throw_on_schema_evolution_overflow,
                true,
            )?))
        } else {
            None
        };
        Ok(MapReader {
            base,
            rle,
            key_reader,
            element_reader,
        })
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
        encoded: bool,
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
        let BatchPayload::Map {
            offsets,
            keys,
            elements,
        } = payload
        else {
            return Err(batch_kind_error(
                column_id,
                MAP_CONTEXT,
                "Map",
                payload.type_name(),
            ));
        };
        offsets[..num_values + 1].fill(0);
        self.rle.next(&mut offsets[..num_values], mask)?;
        let total_children =
            lengths_to_offsets(offsets, num_values, mask, column_id, MAP_CONTEXT)?;
        if let Some(child) = self.key_reader.as_mut() {
            child_next(child, keys, total_children, None, encoded)?;
        }
        if let Some(child) = self.element_reader.as_mut() {
            child_next(child, elements, total_children, None, encoded)?;
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        if self.key_reader.is_some() || self.element_reader.is_some() {
            let mut scratch = [0_i64; SKIP_WINDOW];
            let mut remaining = non_null;
            let mut total_children = 0_usize;
            while remaining > 0 {
                let step = remaining.min(SKIP_WINDOW);
                self.rle.next(&mut scratch[..step], None)?;
                for length in &scratch[..step] {
                    if *length < 0 {
                        return Err(OrcError::parse(format!(
                            "negative length in {}: column_id={}, length={}",
                            MAP_CONTEXT,
                            self.base.column_id(),
                            length
                        )));
                    }
                    total_children += *length as usize;
                }
                remaining -= step;
            }
            if let Some(child) = self.key_reader.as_mut() {
                child.skip(total_children)?;
            }
            if let Some(child) = self.element_reader.as_mut() {
                child.skip(total_children)?;
            }
        } else {
            self.rle.skip(non_null)?;
        }
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.rle.seek(positions.at(self.base.column_id())?)?;
        if let Some(child) = self.key_reader.as_mut() {
            child.seek_to_row_group(positions)?;
        }
        if let Some(child) = self.element_reader.as_mut() {
            child.seek_to_row_group(positions)?;
        }
        Ok(())
    }
}

/// Reader for UNION columns: a byte tag stream plus one child per subtype.
pub struct UnionReader {
    base: ReaderBase,
    rle: Box<dyn ByteRleDecoder>,
    children: Vec<Option<Box<ColumnReader>>>,
    child_counts: Vec<usize>,
}

const UNION_CONTEXT: &str = "Union column";

impl UnionReader {
    pub(crate) fn open(
        node: &TypeNode,
        stripe: &dyn StripeStreams,
        use_tight_numeric: bool,
        throw_on_schema_evolution_overflow: bool,
    ) -> Result<Self> {
        let base = ReaderBase::open(node, stripe)?;
        let column_id = base.column_id();
        let stream = require_stream(stripe, column_id, StreamKind::Data, UNION_CONTEXT)?;
        let rle = stripe.create_byte_rle(stream)?;
        let mut children = Vec::with_capacity(node.children().len());
        for child in node.children() {
            if is_selected(stripe.selected_columns(), child.column_id()) {
                children.push(Some(Box::new(build_reader(
                    child,
                    stripe,
                    use_tight_numeric,
                    throw_on_schema_evolution_overflow,
                    true,
                )?)));
            } else {
                children.push(None);
            }
        }
        let child_counts = vec![0; children.len()];
        Ok(UnionReader {
            base,
            rle,
            children,
            child_counts,
        })
    }

    pub fn next(
        &mut self,
        batch: &mut ColumnVectorBatch,
        num_values: usize,
        incoming_mask: Option<&[u8]>,
        encoded: bool,
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
        let BatchPayload::Union {
            tags,
            offsets,
            children,
        } = payload
        else {
            return Err(batch_kind_error(
                column_id,
                UNION_CONTEXT,
                "Union",
                payload.type_name(),
            ));
        };
        if children.len() != self.children.len() {
            return Err(OrcError::parse(format!(
                "Union batch child count mismatch: column_id={}, batch_children={}, subtypes={}",
                column_id,
                children.len(),
                self.children.len()
            )));
        }
        tags[..num_values].fill(0);
        self.rle.next(&mut tags[..num_values], mask)?;

        self.child_counts.fill(0);
        for i in 0..num_values {
            let present = match mask {
                Some(mask) => mask[i] != 0,
                None => true,
            };
            if present {
                let tag = tags[i] as usize;
                if tag >= self.children.len() {
                    return Err(OrcError::parse(format!(
                        "union tag out of range: column_id={}, row={}, tag={}, subtypes={}",
                        column_id,
                        i,
                        tag,
                        self.children.len()
                    )));
                }
                offsets[i] = self.child_counts[tag] as u64;
                self.child_counts[tag] += 1;
            }
        }
        for (tag, child) in self.children.iter_mut().enumerate() {
            if let Some(child) = child {
                child_next(
                    child,
                    &mut children[tag],
                    self.child_counts[tag],
                    None,
                    encoded,
                )?;
            }
        }
        Ok(())
    }

    pub fn skip(&mut self, num_values: usize) -> Result<usize> {
        let non_null = self.base.skip_presence(num_values)?;
        let mut scratch = [0_u8; SKIP_WINDOW];
        self.child_counts.fill(0);
        let mut remaining = non_null;
        while remaining > 0 {
            let step = remaining.min(SKIP_WINDOW);
            self.rle.next(&mut scratch[..step], None)?;
            for tag in &scratch[..step] {
                let tag = *tag as usize;
                if tag >= self.children.len() {
                    return Err(OrcError::parse(format!(
                        "union tag out of range: column_id={}, tag={}, subtypes={}",
                        self.base.column_id(),
                        tag,
                        self.children.len()
                    )));
                }
                self.child_counts[tag] += 1;
            }
            remaining -= step;
        }
        for (tag, child) in self.children.iter_mut().enumerate() {
            if let Some(child) = child {
                if self.child_counts[tag] != 0 {
                    child.skip(self.child_counts[tag])?;
                }
            }
        }
        Ok(non_null)
    }

    pub fn seek_to_row_group(&mut self, positions: &mut PositionProviderMap) -> Result<()> {
        self.base.seek(positions)?;
        self.rle.seek(positions.at(self.base.column_id())?)?;
        for child in self.children.iter_mut().flatten() {
            child.seek_to_row_group(positions)?;
        }
        Ok(())
    }
}
