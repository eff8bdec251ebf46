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
//! Crate-wide error and result types.
//!
//! Decode failures are fatal to the current call: nothing is retried and a
//! batch touched by a failed call must be discarded.

use thiserror::Error;

/// Errors surfaced by the stripe decode core.
#[derive(Debug, Error)]
pub enum OrcError {
    /// Corrupt or inconsistent stripe data: truncated streams, missing
    /// required streams, out-of-range dictionary entries, decimal rescale
    /// overflow, bad encodings on composite columns.
    #[error("parse error: {0}")]
    Parse(String),

    /// A `(type kind, encoding)` combination the reader factory or a
    /// conversion seam does not handle.
    #[error("not implemented yet: {0}")]
    NotImplemented(String),

    /// I/O failure from the underlying byte-stream layer, propagated
    /// unchanged.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrcError {
    pub fn parse(message: impl Into<String>) -> Self {
        OrcError::Parse(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        OrcError::NotImplemented(message.into())
    }
}

pub type Result<T> = std::result::Result<T, OrcError>;
