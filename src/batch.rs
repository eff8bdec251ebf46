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
//! Typed row-batch buffers filled by the column readers.
//!
//! One [`ColumnVectorBatch`] mirrors one schema node: common null-mask
//! fields plus a payload variant matching the node's kind. Composite
//! payloads own their child batches, so a whole batch tree is built once
//! from the schema and reused across `next` calls.
//!
//! Readers accept only the payload variant matching their column kind and
//! fail with a parse error otherwise; there is no downcasting.

use std::sync::Arc;

use crate::error::{OrcError, Result};
use crate::schema::{TypeKind, TypeNode};

/// Immutable dictionary shared between a dictionary string reader and any
/// batches it produced in encoded mode.
///
/// `offsets` has `dict_size + 1` monotonically non-decreasing entries with
/// `offsets[0] == 0`; `blob.len() == offsets[dict_size]`.
#[derive(Debug, Default)]
pub struct StringDictionary {
    pub offsets: Vec<i64>,
    pub blob: Vec<u8>,
}

impl StringDictionary {
    /// Number of dictionary entries.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of entry `index`, or `None` when out of range.
    pub fn entry(&self, index: usize) -> Option<&[u8]> {
        let start = usize::try_from(*self.offsets.get(index)?).ok()?;
        let end = usize::try_from(*self.offsets.get(index + 1)?).ok()?;
        self.blob.get(start..end)
    }
}

/// String payload: per-row views into a byte blob.
///
/// In direct mode the views index `blob`. After a dictionary decode they
/// index `dictionary`'s blob instead. In encoded mode no views are
/// materialized: `index[i]` carries the dictionary entry id and
/// `is_encoded` is raised.
#[derive(Debug, Default)]
pub struct StringBatch {
    /// Byte offset of each row's value in the backing blob.
    pub starts: Vec<u64>,
    /// Byte length of each row's value. Doubles as the index scratch while
    /// decoding dictionary entries.
    pub lengths: Vec<i64>,
    /// Backing store for direct reads.
    pub blob: Vec<u8>,
    /// Dictionary entry ids when `is_encoded`.
    pub index: Vec<i64>,
    pub is_encoded: bool,
    pub dictionary: Option<Arc<StringDictionary>>,
}

impl StringBatch {
    /// Bytes of row `row` after a decoded read. `None` for out-of-range
    /// views or when the batch is in encoded mode.
    pub fn bytes_at(&self, row: usize) -> Option<&[u8]> {
        if self.is_encoded {
            return None;
        }
        let start = usize::try_from(*self.starts.get(row)?).ok()?;
        let length = usize::try_from(*self.lengths.get(row)?).ok()?;
        let source = match &self.dictionary {
            Some(dictionary) => &dictionary.blob,
            None => &self.blob,
        };
        source.get(start..start + length)
    }
}

/// Kind-specific contents of a batch.
#[derive(Debug)]
pub enum BatchPayload {
    /// Tight boolean/byte values.
    Byte { data: Vec<i8> },
    Short { data: Vec<i16> },
    Int { data: Vec<i32> },
    /// Wide integers; also the wide target for boolean/byte columns.
    Long { data: Vec<i64> },
    Float { data: Vec<f32> },
    Double { data: Vec<f64> },
    Timestamp {
        seconds: Vec<i64>,
        nanoseconds: Vec<i64>,
    },
    String(StringBatch),
    Decimal64 {
        values: Vec<i64>,
        read_scales: Vec<i64>,
        precision: i32,
        scale: i32,
    },
    Decimal128 {
        values: Vec<i128>,
        read_scales: Vec<i64>,
        precision: i32,
        scale: i32,
    },
    List {
        /// `offsets[0..=num_elements]`, prefix sums of child counts.
        offsets: Vec<i64>,
        elements: Box<ColumnVectorBatch>,
    },
    Map {
        offsets: Vec<i64>,
        keys: Box<ColumnVectorBatch>,
        elements: Box<ColumnVectorBatch>,
    },
    Struct {
        /// One batch per *selected* child, in schema order.
        fields: Vec<ColumnVectorBatch>,
    },
    Union {
        tags: Vec<u8>,
        /// Per-row offset within the row's tag child.
        offsets: Vec<u64>,
        /// One batch per subtype, selected or not; unselected children are
        /// never touched.
        children: Vec<ColumnVectorBatch>,
    },
}

impl BatchPayload {
    /// Payload label used in kind-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            BatchPayload::Byte { .. } => "Byte",
            BatchPayload::Short { .. } => "Short",
            BatchPayload::Int { .. } => "Int",
            BatchPayload::Long { .. } => "Long",
            BatchPayload::Float { .. } => "Float",
            BatchPayload::Double { .. } => "Double",
            BatchPayload::Timestamp { .. } => "Timestamp",
            BatchPayload::String(_) => "String",
            BatchPayload::Decimal64 { .. } => "Decimal64",
            BatchPayload::Decimal128 { .. } => "Decimal128",
            BatchPayload::List { .. } => "List",
            BatchPayload::Map { .. } => "Map",
            BatchPayload::Struct { .. } => "Struct",
            BatchPayload::Union { .. } => "Union",
        }
    }

    fn grow(&mut self, capacity: usize) {
        match self {
            BatchPayload::Byte { data } => data.resize(capacity, 0),
            BatchPayload::Short { data } => data.resize(capacity, 0),
            BatchPayload::Int { data } => data.resize(capacity, 0),
            BatchPayload::Long { data } => data.resize(capacity, 0),
            BatchPayload::Float { data } => data.resize(capacity, 0.0),
            BatchPayload::Double { data } => data.resize(capacity, 0.0),
            BatchPayload::Timestamp {
                seconds,
                nanoseconds,
            } => {
                seconds.resize(capacity, 0);
                nanoseconds.resize(capacity, 0);
            }
            BatchPayload::String(strings) => {
                strings.starts.resize(capacity, 0);
                strings.lengths.resize(capacity, 0);
                strings.index.resize(capacity, 0);
            }
            BatchPayload::Decimal64 {
                values, read_scales, ..
            } => {
                values.resize(capacity, 0);
                read_scales.resize(capacity, 0);
            }
            BatchPayload::Decimal128 {
                values, read_scales, ..
            } => {
                values.resize(capacity, 0);
                read_scales.resize(capacity, 0);
            }
            BatchPayload::List { offsets, .. } => offsets.resize(capacity + 1, 0),
            BatchPayload::Map { offsets, .. } => offsets.resize(capacity + 1, 0),
            BatchPayload::Struct { .. } => {}
            BatchPayload::Union { tags, offsets, .. } => {
                tags.resize(capacity, 0);
                offsets.resize(capacity, 0);
            }
        }
    }
}

/// One row batch for one schema node.
///
/// `num_elements <= capacity`; `not_null` is meaningful only while
/// `has_nulls` is raised. Child batches of composite payloads are resized by
/// the child readers themselves, never by the parent.
#[derive(Debug)]
pub struct ColumnVectorBatch {
    capacity: usize,
    pub num_elements: usize,
    pub has_nulls: bool,
    /// Byte per row, 1 = present.
    pub not_null: Vec<u8>,
    pub payload: BatchPayload,
}

impl ColumnVectorBatch {
    pub fn new(payload: BatchPayload, capacity: usize) -> Self {
        let mut batch = ColumnVectorBatch {
            capacity: 0,
            num_elements: 0,
            has_nulls: false,
            not_null: Vec::new(),
            payload,
        };
        batch.resize(capacity);
        batch
    }

    /// Build the batch tree for one schema subtree.
    ///
    /// `use_tight_numeric` selects the narrow integer/float payloads instead
    /// of the wide 64-bit ones. `selected` is the stripe's column bitset;
    /// columns past its end count as selected, so an empty slice selects
    /// everything. Struct fields are built for selected children only;
    /// union children are built for every subtype.
    pub fn for_type(
        node: &TypeNode,
        capacity: usize,
        use_tight_numeric: bool,
        selected: &[bool],
    ) -> Result<ColumnVectorBatch> {
        let payload = match node.kind() {
            TypeKind::Boolean | TypeKind::Byte => {
                if use_tight_numeric {
                    BatchPayload::Byte { data: Vec::new() }
                } else {
                    BatchPayload::Long { data: Vec::new() }
                }
            }
            TypeKind::Short => {
                if use_tight_numeric {
                    BatchPayload::Short { data: Vec::new() }
                } else {
                    BatchPayload::Long { data: Vec::new() }
                }
            }
            TypeKind::Int => {
                if use_tight_numeric {
                    BatchPayload::Int { data: Vec::new() }
                } else {
                    BatchPayload::Long { data: Vec::new() }
                }
            }
            TypeKind::Long | TypeKind::Date => BatchPayload::Long { data: Vec::new() },
            TypeKind::Float => {
                if use_tight_numeric {
                    BatchPayload::Float { data: Vec::new() }
                } else {
                    BatchPayload::Double { data: Vec::new() }
                }
            }
            TypeKind::Double => BatchPayload::Double { data: Vec::new() },
            TypeKind::Timestamp | TypeKind::TimestampInstant => BatchPayload::Timestamp {
                seconds: Vec::new(),
                nanoseconds: Vec::new(),
            },
            kind if kind.is_string_family() => BatchPayload::String(StringBatch::default()),
            TypeKind::Decimal => {
                // Precision 0 is the legacy Hive 0.11 layout, decoded at
                // 128 bits with a caller-forced scale.
                if node.precision() != 0 && node.precision() <= 18 {
                    BatchPayload::Decimal64 {
                        values: Vec::new(),
                        read_scales: Vec::new(),
                        precision: node.precision() as i32,
                        scale: node.scale() as i32,
                    }
                } else {
                    BatchPayload::Decimal128 {
                        values: Vec::new(),
                        read_scales: Vec::new(),
                        precision: node.precision() as i32,
                        scale: node.scale() as i32,
                    }
                }
            }
            TypeKind::List => {
                let child = node.children().first().ok_or_else(|| {
                    OrcError::parse(format!(
                        "LIST schema node missing element child: column_id={}",
                        node.column_id()
                    ))
                })?;
                BatchPayload::List {
                    offsets: Vec::new(),
                    elements: Box::new(Self::for_type(
                        child,
                        capacity,
                        use_tight_numeric,
                        selected,
                    )?),
                }
            }
            TypeKind::Map => {
                let [key, value] = node.children() else {
                    return Err(OrcError::parse(format!(
                        "MAP schema node child mismatch: column_id={}, children={}, expected=2",
                        node.column_id(),
                        node.children().len()
                    )));
                };
                BatchPayload::Map {
                    offsets: Vec::new(),
                    keys: Box::new(Self::for_type(key, capacity, use_tight_numeric, selected)?),
                    elements: Box::new(Self::for_type(
                        value,
                        capacity,
                        use_tight_numeric,
                        selected,
                    )?),
                }
            }
            TypeKind::Struct => {
                let mut fields = Vec::new();
                for child in node.children() {
                    if is_selected(selected, child.column_id()) {
                        fields.push(Self::for_type(child, capacity, use_tight_numeric, selected)?);
                    }
                }
                BatchPayload::Struct { fields }
            }
            TypeKind::Union => {
                let mut children = Vec::with_capacity(node.children().len());
                for child in node.children() {
                    children.push(Self::for_type(child, capacity, use_tight_numeric, selected)?);
                }
                BatchPayload::Union {
                    tags: Vec::new(),
                    offsets: Vec::new(),
                    children,
                }
            }
            other => {
                return Err(OrcError::parse(format!(
                    "unsupported schema kind for batch construction: kind={:?}",
                    other
                )));
            }
        };
        Ok(ColumnVectorBatch::new(payload, capacity))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grow this batch (not its children) to hold at least `capacity` rows.
    /// List and map payloads keep one offset slot past the capacity.
    pub fn resize(&mut self, capacity: usize) {
        if capacity < self.capacity {
            return;
        }
        self.not_null.resize(capacity, 1);
        self.payload.grow(capacity);
        self.capacity = capacity;
    }
}

/// Columns past the end of the stripe's selection bitset count as selected.
pub(crate) fn is_selected(selected: &[bool], column_id: u32) -> bool {
    selected.get(column_id as usize).copied().unwrap_or(true)
}
