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
//! In-memory stripe environment and codec fakes for decode tests.
//!
//! Streams are plain byte vectors sliced into fixed-size chunks. Run-length
//! decoders are vector-backed fakes keyed by the stream name they were
//! created from; masks and seeks behave per the decoder contracts (a seek
//! consumes one position, interpreted as an element index, and a raw stream
//! seek consumes one position, interpreted as a byte offset).
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use orcdec::stripe::{
    ColumnEncoding, ColumnEncodingKind, ErrorSink, ReaderMetrics, SchemaEvolution, StreamKind,
    StripeStreams,
};
use orcdec::timezone::{Timezone, TzRules};
use orcdec::{
    ByteRleDecoder, IntRleDecoder, OrcError, PositionProvider, Result, RleVersion,
    SeekableByteStream,
};

/// Byte stream over an owned vector, sliced into `chunk_size` chunks.
pub struct FakeStream {
    name: String,
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl FakeStream {
    pub fn new(name: String, data: Vec<u8>, chunk_size: usize) -> Self {
        FakeStream {
            name,
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl SeekableByteStream for FakeStream {
    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(Some(chunk))
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        self.pos = (self.pos + count).min(self.data.len());
        Ok(())
    }

    fn seek(&mut self, positions: &mut PositionProvider) -> Result<()> {
        self.pos = positions.next()? as usize;
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Vector-backed byte/boolean run decoder.
pub struct FakeByteRle {
    values: Vec<u8>,
    pos: usize,
}

impl ByteRleDecoder for FakeByteRle {
    fn next(&mut self, data: &mut [u8], mask: Option<&[u8]>) -> Result<()> {
        for (i, slot) in data.iter_mut().enumerate() {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            *slot = *self
                .values
                .get(self.pos)
                .ok_or_else(|| OrcError::parse("fake byte rle exhausted"))?;
            self.pos += 1;
        }
        Ok(())
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        self.pos += count;
        Ok(())
    }

    fn seek(&mut self, positions: &mut PositionProvider) -> Result<()> {
        self.pos = positions.next()? as usize;
        Ok(())
    }
}

/// Vector-backed integer run decoder.
pub struct FakeIntRle {
    values: Vec<i64>,
    pos: usize,
}

impl IntRleDecoder for FakeIntRle {
    fn next(&mut self, data: &mut [i64], mask: Option<&[u8]>) -> Result<()> {
        for (i, slot) in data.iter_mut().enumerate() {
            if let Some(mask) = mask {
                if mask[i] == 0 {
                    continue;
                }
            }
            *slot = *self
                .values
                .get(self.pos)
                .ok_or_else(|| OrcError::parse("fake int rle exhausted"))?;
            self.pos += 1;
        }
        Ok(())
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        self.pos += count;
        Ok(())
    }

    fn seek(&mut self, positions: &mut PositionProvider) -> Result<()> {
        self.pos = positions.next()? as usize;
        Ok(())
    }
}

/// Error sink capturing warning lines for assertions.
#[derive(Default)]
pub struct CapturingSink {
    lines: Mutex<Vec<String>>,
}

impl CapturingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink lock").clone()
    }
}

impl ErrorSink for CapturingSink {
    fn write_line(&self, line: &str) {
        self.lines.lock().expect("sink lock").push(line.to_string());
    }
}

fn stream_name(column_id: u32, kind: StreamKind) -> String {
    format!("col{}-{:?}", column_id, kind)
}

/// In-memory stripe environment.
pub struct FakeStripe {
    raw: HashMap<(u32, StreamKind), Vec<u8>>,
    byte_runs: HashMap<String, Vec<u8>>,
    int_runs: HashMap<String, Vec<i64>>,
    encodings: HashMap<u32, ColumnEncoding>,
    selected: Vec<bool>,
    writer_tz: Arc<dyn Timezone>,
    reader_tz: Arc<dyn Timezone>,
    forced_scale: i32,
    throw_on_overflow: bool,
    pub sink: Arc<CapturingSink>,
    pub metrics: Arc<ReaderMetrics>,
    evolution: Option<Arc<dyn SchemaEvolution>>,
    decimal_as_long: bool,
    chunk_size: usize,
}

impl Default for FakeStripe {
    fn default() -> Self {
        FakeStripe::new()
    }
}

impl FakeStripe {
    pub fn new() -> Self {
        FakeStripe {
            raw: HashMap::new(),
            byte_runs: HashMap::new(),
            int_runs: HashMap::new(),
            encodings: HashMap::new(),
            selected: Vec::new(),
            writer_tz: Arc::new(TzRules::gmt()),
            reader_tz: Arc::new(TzRules::gmt()),
            forced_scale: 0,
            throw_on_overflow: false,
            sink: Arc::new(CapturingSink::default()),
            metrics: Arc::new(ReaderMetrics::default()),
            evolution: None,
            decimal_as_long: false,
            chunk_size: 4,
        }
    }

    /// Raw payload bytes for a `(column, kind)` stream.
    pub fn set_raw(&mut self, column_id: u32, kind: StreamKind, data: Vec<u8>) -> &mut Self {
        self.raw.insert((column_id, kind), data);
        self
    }

    /// Register a PRESENT run for a column (1 = present).
    pub fn set_present(&mut self, column_id: u32, bits: Vec<u8>) -> &mut Self {
        self.set_byte_run(column_id, StreamKind::Present, bits)
    }

    /// Values served by byte/boolean decoders created over this stream.
    pub fn set_byte_run(
        &mut self,
        column_id: u32,
        kind: StreamKind,
        values: Vec<u8>,
    ) -> &mut Self {
        self.byte_runs.insert(stream_name(column_id, kind), values);
        self
    }

    /// Values served by integer decoders created over this stream.
    pub fn set_int_run(
        &mut self,
        column_id: u32,
        kind: StreamKind,
        values: Vec<i64>,
    ) -> &mut Self {
        self.int_runs.insert(stream_name(column_id, kind), values);
        self
    }

    pub fn set_encoding(&mut self, column_id: u32, encoding: ColumnEncoding) -> &mut Self {
        self.encodings.insert(column_id, encoding);
        self
    }

    pub fn set_selected(&mut self, selected: Vec<bool>) -> &mut Self {
        self.selected = selected;
        self
    }

    pub fn set_timezones(
        &mut self,
        writer: Arc<dyn Timezone>,
        reader: Arc<dyn Timezone>,
    ) -> &mut Self {
        self.writer_tz = writer;
        self.reader_tz = reader;
        self
    }

    pub fn set_hive11(&mut self, forced_scale: i32, throw_on_overflow: bool) -> &mut Self {
        self.forced_scale = forced_scale;
        self.throw_on_overflow = throw_on_overflow;
        self
    }

    pub fn set_schema_evolution(&mut self, evolution: Arc<dyn SchemaEvolution>) -> &mut Self {
        self.evolution = Some(evolution);
        self
    }

    pub fn set_decimal_as_long(&mut self, value: bool) -> &mut Self {
        self.decimal_as_long = value;
        self
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) -> &mut Self {
        self.chunk_size = chunk_size;
        self
    }
}

impl StripeStreams for FakeStripe {
    fn stream(
        &self,
        column_id: u32,
        kind: StreamKind,
        _required: bool,
    ) -> Result<Option<Box<dyn SeekableByteStream>>> {
        let name = stream_name(column_id, kind);
        if let Some(data) = self.raw.get(&(column_id, kind)) {
            return Ok(Some(Box::new(FakeStream::new(
                name,
                data.clone(),
                self.chunk_size,
            ))));
        }
        if self.byte_runs.contains_key(&name) || self.int_runs.contains_key(&name) {
            return Ok(Some(Box::new(FakeStream::new(name, Vec::new(), 1))));
        }
        Ok(None)
    }

    fn encoding(&self, column_id: u32) -> Result<ColumnEncoding> {
        Ok(self
            .encodings
            .get(&column_id)
            .copied()
            .unwrap_or(ColumnEncoding::direct(ColumnEncodingKind::Direct)))
    }

    fn selected_columns(&self) -> &[bool] {
        &self.selected
    }

    fn writer_timezone(&self) -> Arc<dyn Timezone> {
        Arc::clone(&self.writer_tz)
    }

    fn reader_timezone(&self) -> Arc<dyn Timezone> {
        Arc::clone(&self.reader_tz)
    }

    fn forced_scale_on_hive11_decimal(&self) -> i32 {
        self.forced_scale
    }

    fn throw_on_hive11_decimal_overflow(&self) -> bool {
        self.throw_on_overflow
    }

    fn error_sink(&self) -> Arc<dyn ErrorSink> {
        Arc::clone(&self.sink) as Arc<dyn ErrorSink>
    }

    fn schema_evolution(&self) -> Option<Arc<dyn SchemaEvolution>> {
        self.evolution.clone()
    }

    fn reader_metrics(&self) -> Arc<ReaderMetrics> {
        Arc::clone(&self.metrics)
    }

    fn is_decimal_as_long(&self) -> bool {
        self.decimal_as_long
    }

    fn create_boolean_rle(
        &self,
        stream: Box<dyn SeekableByteStream>,
    ) -> Result<Box<dyn ByteRleDecoder>> {
        let values = self.byte_runs.get(&stream.name()).cloned().ok_or_else(|| {
            OrcError::parse(format!("no byte run registered for {}", stream.name()))
        })?;
        Ok(Box::new(FakeByteRle { values, pos: 0 }))
    }

    fn create_byte_rle(
        &self,
        stream: Box<dyn SeekableByteStream>,
    ) -> Result<Box<dyn ByteRleDecoder>> {
        self.create_boolean_rle(stream)
    }

    fn create_int_rle(
        &self,
        stream: Box<dyn SeekableByteStream>,
        _signed: bool,
        _version: RleVersion,
    ) -> Result<Box<dyn IntRleDecoder>> {
        let values = self.int_runs.get(&stream.name()).cloned().ok_or_else(|| {
            OrcError::parse(format!("no int run registered for {}", stream.name()))
        })?;
        Ok(Box::new(FakeIntRle { values, pos: 0 }))
    }
}

/// Little-endian base-128 varint of the zig-zag encoding of `value`.
pub fn zigzag_varint(value: i64) -> Vec<u8> {
    let mut encoded = ((value << 1) ^ (value >> 63)) as u64;
    let mut out = Vec::new();
    loop {
        let byte = (encoded & 0x7f) as u8;
        encoded >>= 7;
        if encoded == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

pub fn le_bytes_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn le_bytes_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
