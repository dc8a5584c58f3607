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

use std::sync::atomic::{AtomicU32, Ordering};

use arrow_buffer::{BooleanBuffer, Buffer, NullBuffer};

use crate::column::TypeKind;
use crate::errors::{OrcError, Result};
use crate::properties::DecodeOptions;

/// Validity bitmap shared by all chunks of one output column.
///
/// One bit per output row, least significant bit first, 1 = valid. Chunks own
/// disjoint row ranges, so only the words on either side of a range boundary
/// are written by two chunks; those are updated with atomic read-modify-write.
pub struct ValidityBitmap {
    words: Box<[AtomicU32]>,
    len: usize,
}

impl std::fmt::Debug for ValidityBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidityBitmap")
            .field("len", &self.len)
            .field("null_count", &self.null_count())
            .finish()
    }
}

impl ValidityBitmap {
    /// Bitmap of `len` rows, all null
    pub fn new_null(len: usize) -> Self {
        Self {
            words: (0..len.div_ceil(32)).map(|_| AtomicU32::new(0)).collect(),
            len,
        }
    }

    /// Bitmap of `len` rows, all valid
    pub fn new_valid(len: usize) -> Self {
        let bitmap = Self::new_null(len);
        bitmap.set_range(0, len, true);
        bitmap
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len, "row {i} out of bounds {}", self.len);
        self.word(i / 32) & (1 << (i % 32)) != 0
    }

    #[inline]
    pub fn word(&self, index: usize) -> u32 {
        self.words[index].load(Ordering::Relaxed)
    }

    /// Stores a word whose bits all belong to the caller
    #[inline]
    pub(crate) fn store_word(&self, index: usize, bits: u32) {
        self.words[index].store(bits, Ordering::Relaxed)
    }

    /// Replaces the bits selected by `mask`, leaving other bits untouched
    #[inline]
    pub(crate) fn update_word(&self, index: usize, mask: u32, bits: u32) {
        let word = &self.words[index];
        word.fetch_and(!mask, Ordering::Relaxed);
        word.fetch_or(bits & mask, Ordering::Relaxed);
    }

    /// Sets rows `[start, start + count)` to `valid`
    pub(crate) fn set_range(&self, start: usize, count: usize, valid: bool) {
        let end = (start + count).min(self.len);
        let mut i = start;
        while i < end {
            let bit = i % 32;
            let n = (32 - bit).min(end - i);
            let mask = if n == 32 {
                u32::MAX
            } else {
                ((1u32 << n) - 1) << bit
            };
            let bits = if valid { mask } else { 0 };
            if n == 32 {
                self.store_word(i / 32, bits);
            } else {
                self.update_word(i / 32, mask, bits);
            }
            i += n;
        }
    }

    /// Number of null rows
    pub fn null_count(&self) -> usize {
        let full = self.len / 32;
        let mut valid: usize = (0..full).map(|w| self.word(w).count_ones() as usize).sum();
        let tail = self.len % 32;
        if tail > 0 {
            valid += (self.word(full) & ((1 << tail) - 1)).count_ones() as usize;
        }
        self.len - valid
    }

    /// Copies the bitmap into an arrow [`NullBuffer`]
    pub fn to_null_buffer(&self) -> NullBuffer {
        let bytes: Vec<u8> = (0..self.words.len())
            .flat_map(|w| self.word(w).to_le_bytes())
            .collect();
        NullBuffer::new(BooleanBuffer::new(Buffer::from_vec(bytes), 0, self.len))
    }
}

macro_rules! define_buffers {
    ($($variant:ident($ty:ty),)*) => {
        /// Decoded values of one output column, one slot per output row.
        ///
        /// Strings are slices of the stream bytes they were decoded from. Dates
        /// are days since the Unix epoch (`Date32`) or milliseconds
        /// (`Date64`), timestamps are nanoseconds since the Unix epoch and
        /// decimals are materialized as `f64`.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ColumnBuffer<'a> {
            $($variant(Vec<$ty>),)*
        }

        /// Mutable view of a range of a [`ColumnBuffer`]
        #[derive(Debug, PartialEq)]
        pub enum ColumnDataMut<'a, 'b> {
            $($variant(&'b mut [$ty]),)*
        }

        impl<'a> ColumnBuffer<'a> {
            pub fn len(&self) -> usize {
                match self {
                    $(ColumnBuffer::$variant(v) => v.len(),)*
                }
            }

            pub fn as_data_mut(&mut self) -> ColumnDataMut<'a, '_> {
                match self {
                    $(ColumnBuffer::$variant(v) => ColumnDataMut::$variant(v.as_mut_slice()),)*
                }
            }
        }

        impl<'a, 'b> ColumnDataMut<'a, 'b> {
            pub fn len(&self) -> usize {
                match self {
                    $(ColumnDataMut::$variant(v) => v.len(),)*
                }
            }

            /// Splits the view into `[0, mid)` and `[mid, len)`
            pub fn split_at_mut(self, mid: usize) -> (Self, Self) {
                match self {
                    $(ColumnDataMut::$variant(v) => {
                        let (l, r) = v.split_at_mut(mid);
                        (ColumnDataMut::$variant(l), ColumnDataMut::$variant(r))
                    })*
                }
            }

            pub fn variant_name(&self) -> &'static str {
                match self {
                    $(ColumnDataMut::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

define_buffers! {
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bytes(&'a [u8]),
    TimestampNanos(i64),
    Date32(i32),
    Date64(i64),
    Decimal(f64),
}

impl<'a> ColumnBuffer<'a> {
    /// Allocates `len` default slots in the representation used for `type_kind`.
    /// DATE columns use [`ColumnBuffer::Date32`].
    pub fn new(type_kind: TypeKind, len: usize) -> Self {
        match type_kind {
            TypeKind::Boolean => ColumnBuffer::Boolean(vec![false; len]),
            TypeKind::Byte => ColumnBuffer::Int8(vec![0; len]),
            TypeKind::Short => ColumnBuffer::Int16(vec![0; len]),
            TypeKind::Int => ColumnBuffer::Int32(vec![0; len]),
            TypeKind::Long => ColumnBuffer::Int64(vec![0; len]),
            TypeKind::Float => ColumnBuffer::Float32(vec![0.0; len]),
            TypeKind::Double => ColumnBuffer::Float64(vec![0.0; len]),
            TypeKind::String | TypeKind::Binary | TypeKind::Varchar | TypeKind::Char => {
                ColumnBuffer::Bytes(vec![&[][..]; len])
            }
            TypeKind::Timestamp => ColumnBuffer::TimestampNanos(vec![0; len]),
            TypeKind::Date => ColumnBuffer::Date32(vec![0; len]),
            TypeKind::Decimal => ColumnBuffer::Decimal(vec![0.0; len]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ColumnDataMut<'_, '_> {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this view can hold decoded values of `type_kind`
    pub fn accepts(&self, type_kind: TypeKind) -> bool {
        matches!(
            (type_kind, self),
            (TypeKind::Boolean, ColumnDataMut::Boolean(_))
                | (TypeKind::Byte, ColumnDataMut::Int8(_))
                | (TypeKind::Short, ColumnDataMut::Int16(_))
                | (TypeKind::Int, ColumnDataMut::Int32(_))
                | (TypeKind::Long, ColumnDataMut::Int64(_))
                | (TypeKind::Float, ColumnDataMut::Float32(_))
                | (TypeKind::Double, ColumnDataMut::Float64(_))
                | (
                    TypeKind::String | TypeKind::Binary | TypeKind::Varchar | TypeKind::Char,
                    ColumnDataMut::Bytes(_)
                )
                | (TypeKind::Timestamp, ColumnDataMut::TimestampNanos(_))
                | (TypeKind::Date, ColumnDataMut::Date32(_) | ColumnDataMut::Date64(_))
                | (TypeKind::Decimal, ColumnDataMut::Decimal(_))
        )
    }
}

/// Output slots of one chunk.
///
/// Slot `i` holds output row `row_offset + i`, where output row 0 is the first
/// row of the configured row window.
#[derive(Debug)]
pub struct ChunkOutput<'a, 'b> {
    pub(crate) data: ColumnDataMut<'a, 'b>,
    pub(crate) row_offset: usize,
}

impl<'a, 'b> ChunkOutput<'a, 'b> {
    pub fn new(data: ColumnDataMut<'a, 'b>, row_offset: usize) -> Self {
        Self { data, row_offset }
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An output column: typed values plus an optional validity bitmap.
#[derive(Debug)]
pub struct OutputColumn<'a> {
    pub(crate) validity: Option<ValidityBitmap>,
    pub(crate) buffer: ColumnBuffer<'a>,
}

impl<'a> OutputColumn<'a> {
    /// Allocates an output column of `len` rows for `type_kind`. Nullable
    /// columns start out all valid.
    pub fn new(type_kind: TypeKind, len: usize, nullable: bool) -> Self {
        Self {
            validity: nullable.then(|| ValidityBitmap::new_valid(len)),
            buffer: ColumnBuffer::new(type_kind, len),
        }
    }

    /// Wraps caller allocated buffers
    pub fn from_parts(buffer: ColumnBuffer<'a>, validity: Option<ValidityBitmap>) -> Result<Self> {
        if let Some(v) = &validity {
            if v.len() != buffer.len() {
                return Err(general_err!(
                    "validity bitmap of {} rows for a buffer of {} rows",
                    v.len(),
                    buffer.len()
                ));
            }
        }
        Ok(Self { validity, buffer })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn validity(&self) -> Option<&ValidityBitmap> {
        self.validity.as_ref()
    }

    pub fn buffer(&self) -> &ColumnBuffer<'a> {
        &self.buffer
    }

    pub fn into_parts(self) -> (ColumnBuffer<'a>, Option<ValidityBitmap>) {
        (self.buffer, self.validity)
    }

    /// Splits the column into one output window per chunk.
    ///
    /// `row_ranges` holds the `(start_row, num_rows)` of each chunk of the
    /// column, in row order. Each window covers the chunk rows that fall in
    /// the row window of `options`.
    pub fn chunk_outputs<'b>(
        &'b mut self,
        row_ranges: &[(usize, usize)],
        options: &DecodeOptions,
    ) -> Result<(Option<&'b ValidityBitmap>, Vec<ChunkOutput<'a, 'b>>)> {
        let validity = self.validity.as_ref();
        let mut rest = self.buffer.as_data_mut();
        let mut consumed = 0;
        let mut prev_end = 0;
        let mut outputs = Vec::with_capacity(row_ranges.len());
        for &(start_row, num_rows) in row_ranges {
            if start_row < prev_end {
                return Err(general_err!(
                    "chunk starting at row {} overlaps previous chunk ending at row {}",
                    start_row,
                    prev_end
                ));
            }
            prev_end = start_row + num_rows;

            let window = options.output_window(start_row, num_rows);
            let out_start = window.start;
            let out_len = window.len();
            let available = rest.len();
            if out_start < consumed || out_start - consumed + out_len > available {
                return Err(OrcError::IndexOutOfBound(
                    out_start + out_len,
                    consumed + available,
                ));
            }
            let (_, tail) = rest.split_at_mut(out_start - consumed);
            let (data, tail) = tail.split_at_mut(out_len);
            rest = tail;
            consumed = out_start + out_len;
            outputs.push(ChunkOutput::new(data, out_start));
        }
        Ok((validity, outputs))
    }
}
