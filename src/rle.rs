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
//! Run-length decoder seam.
//!
//! The decode core treats RLE as a black box: boolean, byte and integer
//! decoders are constructed by the stripe environment (see
//! [`crate::stripe::StripeStreams`]) and consumed only through the traits
//! below. The two wire formats (V1 and V2) are selected by the column
//! encoding; the core never looks inside either.

use crate::stream::PositionProvider;
use crate::Result;

/// RLE wire format implied by a column encoding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RleVersion {
    V1,
    V2,
}

/// Decoder producing one byte per value (boolean runs produce `0`/`1`).
///
/// When `mask` is supplied, no input value is consumed for positions where
/// `mask[i] == 0` and the output byte at those positions is left exactly as
/// the caller initialized it.
pub trait ByteRleDecoder {
    fn next(&mut self, data: &mut [u8], mask: Option<&[u8]>) -> Result<()>;

    fn skip(&mut self, count: usize) -> Result<()>;

    fn seek(&mut self, positions: &mut PositionProvider) -> Result<()>;
}

/// Decoder producing one 64-bit integer per value, signed or unsigned per
/// its construction. Mask semantics match [`ByteRleDecoder`].
pub trait IntRleDecoder {
    fn next(&mut self, data: &mut [i64], mask: Option<&[u8]>) -> Result<()>;

    fn skip(&mut self, count: usize) -> Result<()>;

    fn seek(&mut self, positions: &mut PositionProvider) -> Result<()>;
}
