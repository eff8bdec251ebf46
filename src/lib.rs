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
//! Columnar decode core for ORC-style stripes.
//!
//! Given a stripe of decompressed byte streams and a reader schema, this
//! crate materializes typed column values into row batches: a tree of
//! column readers mirroring the schema tree, each owning its streams and
//! supporting `next` / `skip` / `seek_to_row_group` with null-mask
//! threading through nested types.
//!
//! The crate performs no I/O, no decompression, and no run-length
//! decoding: streams, codec decoders, timezone rules, and decode policy all
//! arrive through the [`stripe::StripeStreams`] trait.

pub mod batch;
pub mod error;
pub mod reader;
pub mod rle;
pub mod schema;
pub mod stream;
pub mod stripe;
pub mod timezone;

pub use batch::{BatchPayload, ColumnVectorBatch, StringBatch, StringDictionary};
pub use error::{OrcError, Result};
pub use reader::{build_reader, ColumnReader};
pub use rle::{ByteRleDecoder, IntRleDecoder, RleVersion};
pub use schema::{TypeKind, TypeNode};
pub use stream::{PositionProvider, PositionProviderMap, SeekableByteStream};
pub use stripe::{
    ColumnEncoding, ColumnEncodingKind, ConvertReader, ErrorSink, ReaderMetrics, SchemaEvolution,
    StreamKind, StripeStreams,
};
pub use timezone::{Timezone, TimezoneVariant, TzRules};
