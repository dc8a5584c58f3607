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

//! Column chunk descriptors handed to the decode engine.
//!
//! A [`ColumnChunk`] describes one column of one stripe: the uncompressed bytes
//! of each of its streams, the rows it holds and where its decoded values go.
//! Chunks borrow their stream bytes for `'a` and their output buffers for `'b`,
//! so decoded strings can point straight into the stream bytes.

mod output;

pub use output::{ChunkOutput, ColumnBuffer, ColumnDataMut, OutputColumn, ValidityBitmap};

use std::fmt;

/// Physical type of an ORC column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Binary,
    Varchar,
    Char,
    Timestamp,
    Decimal,
    Date,
}

impl TypeKind {
    /// Whether values are byte strings addressed by (offset, length)
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            TypeKind::String | TypeKind::Binary | TypeKind::Varchar | TypeKind::Char
        )
    }

    /// Whether values are decoded from a SECONDARY stream in addition to the
    /// DATA stream
    pub fn has_secondary(&self, encoding: ColumnEncoding) -> bool {
        match self {
            TypeKind::Timestamp | TypeKind::Decimal => true,
            t if t.is_string_like() => !encoding.is_dictionary(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Boolean => "BOOLEAN",
            TypeKind::Byte => "BYTE",
            TypeKind::Short => "SHORT",
            TypeKind::Int => "INT",
            TypeKind::Long => "LONG",
            TypeKind::Float => "FLOAT",
            TypeKind::Double => "DOUBLE",
            TypeKind::String => "STRING",
            TypeKind::Binary => "BINARY",
            TypeKind::Varchar => "VARCHAR",
            TypeKind::Char => "CHAR",
            TypeKind::Timestamp => "TIMESTAMP",
            TypeKind::Decimal => "DECIMAL",
            TypeKind::Date => "DATE",
        };
        f.write_str(name)
    }
}

/// Column encoding from the stripe footer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnEncoding {
    Direct,
    Dictionary,
    #[default]
    DirectV2,
    DictionaryV2,
}

impl ColumnEncoding {
    pub fn is_dictionary(&self) -> bool {
        matches!(self, ColumnEncoding::Dictionary | ColumnEncoding::DictionaryV2)
    }

    /// Whether integer streams use run length encoding version 1
    pub fn is_rle_v1(&self) -> bool {
        matches!(self, ColumnEncoding::Direct | ColumnEncoding::Dictionary)
    }
}

/// The streams of a column chunk.
///
/// | kind             | contents                                                   |
/// |------------------|------------------------------------------------------------|
/// | `Present`        | validity bits, byte RLE                                    |
/// | `Data`           | values, dictionary indices or string bytes                 |
/// | `Secondary`      | string lengths, timestamp nanoseconds or decimal scales    |
/// | `DictionaryData` | concatenated dictionary strings                            |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Present = 0,
    Data = 1,
    Secondary = 2,
    DictionaryData = 3,
}

pub(crate) const NUM_STREAMS: usize = 4;

/// Location of one dictionary string inside the DICTIONARY_DATA stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DictionaryEntry {
    pub pos: u32,
    pub len: u32,
}

impl DictionaryEntry {
    pub fn new(pos: u32, len: u32) -> Self {
        Self { pos, len }
    }
}

/// One column of one stripe.
#[derive(Debug)]
pub struct ColumnChunk<'a, 'b> {
    type_kind: TypeKind,
    encoding: ColumnEncoding,
    streams: [Option<&'a [u8]>; NUM_STREAMS],
    start_row: usize,
    num_rows: usize,
    dictionary_start: usize,
    dict_len: usize,
    pub(crate) skip_count: usize,
    pub(crate) null_count: usize,
    validity: Option<&'b ValidityBitmap>,
    pub(crate) output: Option<ChunkOutput<'a, 'b>>,
}

impl<'a, 'b> ColumnChunk<'a, 'b> {
    /// Creates a chunk holding rows `[start_row, start_row + num_rows)`
    pub fn new(
        type_kind: TypeKind,
        encoding: ColumnEncoding,
        start_row: usize,
        num_rows: usize,
    ) -> Self {
        Self {
            type_kind,
            encoding,
            streams: [None; NUM_STREAMS],
            start_row,
            num_rows,
            dictionary_start: 0,
            dict_len: 0,
            skip_count: 0,
            null_count: 0,
            validity: None,
            output: None,
        }
    }

    pub fn with_stream(mut self, kind: StreamKind, bytes: &'a [u8]) -> Self {
        self.streams[kind as usize] = Some(bytes);
        self
    }

    /// Places this chunk's dictionary at `[start, start + len)` of the global
    /// dictionary
    pub fn with_dictionary(mut self, start: usize, len: usize) -> Self {
        self.dictionary_start = start;
        self.dict_len = len;
        self
    }

    pub fn with_validity(mut self, validity: &'b ValidityBitmap) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_output(mut self, output: ChunkOutput<'a, 'b>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn type_kind(&self) -> TypeKind {
        self.type_kind
    }

    pub fn encoding(&self) -> ColumnEncoding {
        self.encoding
    }

    pub fn stream(&self, kind: StreamKind) -> Option<&'a [u8]> {
        self.streams[kind as usize]
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn dictionary_start(&self) -> usize {
        self.dictionary_start
    }

    pub fn dict_len(&self) -> usize {
        self.dict_len
    }

    /// Values that precede the output row window and must be skipped
    pub fn skip_count(&self) -> usize {
        self.skip_count
    }

    /// Nulls among this chunk's rows inside the output row window
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    pub fn validity(&self) -> Option<&'b ValidityBitmap> {
        self.validity
    }

    pub(crate) fn uses_dictionary(&self) -> bool {
        self.encoding.is_dictionary() && self.type_kind.is_string_like()
    }
}
