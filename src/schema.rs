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
//! Reader-side schema tree.
//!
//! Column ids are assigned in pre-order over the tree and are the stable key
//! for every per-column stream and position provider in a stripe.

/// Logical type of one schema node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Date,
    Float,
    Double,
    Timestamp,
    TimestampInstant,
    String,
    Varchar,
    Char,
    Binary,
    Geometry,
    Geography,
    Decimal,
    List,
    Map,
    Struct,
    Union,
}

impl TypeKind {
    /// String-family kinds share the direct/dictionary string readers.
    pub fn is_string_family(self) -> bool {
        matches!(
            self,
            TypeKind::String
                | TypeKind::Varchar
                | TypeKind::Char
                | TypeKind::Binary
                | TypeKind::Geometry
                | TypeKind::Geography
        )
    }
}

/// One node of the reader schema: a kind, a pre-order column id, ordered
/// children, and decimal parameters where applicable.
///
/// `precision == 0` on a decimal node flags the legacy Hive 0.11 layout in
/// which the file carries no precision at all.
#[derive(Clone, Debug)]
pub struct TypeNode {
    column_id: u32,
    kind: TypeKind,
    precision: u32,
    scale: u32,
    children: Vec<TypeNode>,
}

impl TypeNode {
    pub fn new(kind: TypeKind) -> Self {
        TypeNode {
            column_id: 0,
            kind,
            precision: 0,
            scale: 0,
            children: Vec::new(),
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        TypeNode {
            column_id: 0,
            kind: TypeKind::Decimal,
            precision,
            scale,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: TypeKind, children: Vec<TypeNode>) -> Self {
        TypeNode {
            column_id: 0,
            kind,
            precision: 0,
            scale: 0,
            children,
        }
    }

    /// Assign pre-order column ids starting at `first_id`; returns the next
    /// unused id (i.e. `first_id` plus the subtree size).
    pub fn number_columns(&mut self, first_id: u32) -> u32 {
        self.column_id = first_id;
        let mut next = first_id + 1;
        for child in &mut self.children {
            next = child.number_columns(next);
        }
        next
    }

    pub fn column_id(&self) -> u32 {
        self.column_id
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn children(&self) -> &[TypeNode] {
        &self.children
    }

    /// Total number of schema nodes in this subtree.
    pub fn column_count(&self) -> usize {
        1 + self.children.iter().map(TypeNode::column_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_columns_is_preorder() {
        // struct<a:long, b:list<int>, c:string>
        let mut root = TypeNode::with_children(
            TypeKind::Struct,
            vec![
                TypeNode::new(TypeKind::Long),
                TypeNode::with_children(TypeKind::List, vec![TypeNode::new(TypeKind::Int)]),
                TypeNode::new(TypeKind::String),
            ],
        );
        let next = root.number_columns(0);
        assert_eq!(next, 5);
        assert_eq!(root.column_id(), 0);
        assert_eq!(root.children()[0].column_id(), 1);
        assert_eq!(root.children()[1].column_id(), 2);
        assert_eq!(root.children()[1].children()[0].column_id(), 3);
        assert_eq!(root.children()[2].column_id(), 4);
        assert_eq!(root.column_count(), 5);
    }

    #[test]
    fn decimal_carries_precision_and_scale() {
        let node = TypeNode::decimal(38, 10);
        assert_eq!(node.kind(), TypeKind::Decimal);
        assert_eq!(node.precision(), 38);
        assert_eq!(node.scale(), 10);
    }
}
