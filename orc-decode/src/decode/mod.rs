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

//! Decode phases over column chunks.
//!
//! Decoding runs in two phases. [`decode_nulls_and_dictionaries`] expands
//! PRESENT streams into the validity bitmaps, counts nulls and the values to
//! skip before the row window, and builds the global string dictionary.
//! [`decode_column_data`] then decodes the values of every chunk into its
//! output window. [`decode_stripes`] runs both.
//!
//! Chunks are independent units of work. With [`DecodeOptions::parallel`] they
//! are spread over the rayon thread pool, each worker reusing one
//! [`Workspace`] across the chunks it processes.

mod column_data;
mod dictionary;
mod nulls;
mod row_window;

pub use column_data::timestamp_nanos;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::column::{ColumnChunk, DictionaryEntry, StreamKind};
use crate::encodings::byte_rle::ByteRleRuns;
use crate::encodings::byte_stream::ByteStream;
use crate::encodings::decimal::DecimalRuns;
use crate::encodings::rle_v1::RleV1Runs;
use crate::encodings::rle_v2::RleV2Runs;
use crate::encodings::{rle_v1, rle_v2, DecodeBatch, RleInt};
use crate::errors::{OrcError, Result};
use crate::lanes::NTHREADS;
use crate::properties::DecodeOptions;

/// Values a decoder may be asked for in one call. Values carried over from
/// the previous row window occupy the front, and one longest run of any
/// encoding must still fit behind them.
pub(crate) const VALUE_CAPACITY: usize = 4 * NTHREADS;

/// Rows covered by one row window
pub(crate) const MAX_WINDOW_ROWS: usize = if NTHREADS < 0xfe00 { NTHREADS } else { 0xfe00 };

/// Run tables of every stream decoder
#[derive(Debug, Default)]
pub(crate) struct RunTables {
    pub v1: RleV1Runs,
    pub v2: RleV2Runs,
    pub byte: ByteRleRuns,
    pub decimal: DecimalRuns,
}

/// Typed value lanes.
///
/// Holds the values of one stream in the element type the active column
/// decodes. Switching to another element type reallocates the lanes.
#[derive(Debug)]
pub(crate) enum Lanes {
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    U8(Vec<u8>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Lanes {
    /// Moves the values `[consumed, buffered)` to the front
    pub fn compact(&mut self, consumed: usize, buffered: usize) {
        if consumed == 0 || consumed >= buffered {
            return;
        }
        match self {
            Lanes::I32(v) => v.copy_within(consumed..buffered, 0),
            Lanes::U32(v) => v.copy_within(consumed..buffered, 0),
            Lanes::I64(v) => v.copy_within(consumed..buffered, 0),
            Lanes::U64(v) => v.copy_within(consumed..buffered, 0),
            Lanes::U8(v) => v.copy_within(consumed..buffered, 0),
            Lanes::F32(v) => v.copy_within(consumed..buffered, 0),
            Lanes::F64(v) => v.copy_within(consumed..buffered, 0),
        }
    }
}

/// Element types that can be viewed through [`Lanes`]
pub(crate) trait LaneType: Copy + Default {
    /// Returns the lanes as `Self`, switching their element type if needed
    fn lanes(lanes: &mut Lanes) -> &mut [Self];
}

macro_rules! lane_type {
    ($ty:ty, $variant:ident) => {
        impl LaneType for $ty {
            fn lanes(lanes: &mut Lanes) -> &mut [Self] {
                if !matches!(lanes, Lanes::$variant(_)) {
                    *lanes = Lanes::$variant(vec![<$ty>::default(); VALUE_CAPACITY]);
                }
                match lanes {
                    Lanes::$variant(v) => v.as_mut_slice(),
                    _ => unreachable!("lanes were switched to {}", stringify!($variant)),
                }
            }
        }
    };
}

lane_type!(i32, I32);
lane_type!(u32, U32);
lane_type!(i64, I64);
lane_type!(u64, U64);
lane_type!(u8, U8);
lane_type!(f32, F32);
lane_type!(f64, F64);

/// Scratch state for decoding one chunk at a time.
///
/// Streams are re-pointed at the next chunk's bytes by each phase, so one
/// workspace serves any number of chunks in turn.
pub(crate) struct Workspace<'a> {
    /// DATA or PRESENT stream
    pub bs: ByteStream<'a>,
    /// SECONDARY stream
    pub bs2: ByteStream<'a>,
    pub runs: RunTables,
    /// Row offsets of the current row window
    pub row_ofs: Vec<u32>,
    /// Prefix sum scratch, one entry per lane
    pub scan: Vec<u32>,
    /// Per lane counters
    pub lane_counts: Vec<u32>,
    /// Raw bytes of byte RLE streams
    pub bytes: Vec<u8>,
    pub vals: Lanes,
    pub vals2: Lanes,
}

impl Default for Workspace<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Workspace<'a> {
    pub fn new() -> Self {
        Self {
            bs: ByteStream::default(),
            bs2: ByteStream::default(),
            runs: RunTables {
                v1: RleV1Runs::new(),
                v2: RleV2Runs::new(),
                byte: ByteRleRuns::new(),
                decimal: DecimalRuns::new(),
            },
            row_ofs: vec![0; NTHREADS],
            scan: vec![0; NTHREADS],
            lane_counts: vec![0; NTHREADS],
            bytes: vec![0; VALUE_CAPACITY],
            vals: Lanes::I32(vec![0; VALUE_CAPACITY]),
            vals2: Lanes::U32(vec![0; VALUE_CAPACITY]),
        }
    }
}

/// Decodes an integer stream with the run length encoding version of the column
pub(crate) fn decode_ints<T: RleInt>(
    bs: &mut ByteStream<'_>,
    runs: &mut RunTables,
    vals: &mut [T],
    maxvals: usize,
    rle_v1: bool,
) -> DecodeBatch {
    if rle_v1 {
        rle_v1::decode(bs, &mut runs.v1, vals, maxvals)
    } else {
        rle_v2::decode(bs, &mut runs.v2, vals, maxvals)
    }
}

fn validate_chunk(chunk: &ColumnChunk<'_, '_>, index: usize, options: &DecodeOptions) -> Result<()> {
    let type_kind = chunk.type_kind();
    if chunk.encoding().is_dictionary() && !type_kind.is_string_like() {
        return Err(nyi_err!(
            "dictionary encoding for {} columns (chunk {})",
            type_kind,
            index
        ));
    }
    if type_kind.has_secondary(chunk.encoding())
        && chunk.stream(StreamKind::Data).is_some()
        && chunk.stream(StreamKind::Secondary).is_none()
    {
        return Err(out_of_spec_err!(
            "{} chunk {} has a DATA stream but no SECONDARY stream",
            type_kind,
            index
        ));
    }
    let window = options.output_window(chunk.start_row(), chunk.num_rows());
    match chunk.validity() {
        None if chunk.stream(StreamKind::Present).is_some() => {
            return Err(general_err!(
                "chunk {} has a PRESENT stream but no validity bitmap",
                index
            ));
        }
        Some(validity) if window.end > validity.len() => {
            return Err(OrcError::IndexOutOfBound(window.end, validity.len()));
        }
        _ => {}
    }
    if let Some(output) = &chunk.output {
        if !output.data.accepts(type_kind) {
            return Err(general_err!(
                "chunk {} of type {} cannot be written to a {} buffer",
                index,
                type_kind,
                output.data.variant_name()
            ));
        }
        if output.len() < window.len() {
            return Err(OrcError::IndexOutOfBound(window.len(), output.len()));
        }
    }
    Ok(())
}

fn validate_chunks(chunks: &[ColumnChunk<'_, '_>], options: &DecodeOptions) -> Result<()> {
    chunks
        .iter()
        .enumerate()
        .try_for_each(|(i, chunk)| validate_chunk(chunk, i, options))
}

/// Splits the global dictionary into the disjoint slice owned by each chunk.
/// Chunks without a dictionary get an empty slice.
fn split_dictionary<'d>(
    chunks: &[ColumnChunk<'_, '_>],
    global_dictionary: &'d mut [DictionaryEntry],
) -> Result<Vec<&'d mut [DictionaryEntry]>> {
    let total = global_dictionary.len();
    let mut order: Vec<usize> = (0..chunks.len())
        .filter(|i| chunks[*i].uses_dictionary() && chunks[*i].dict_len() > 0)
        .collect();
    order.sort_by_key(|i| chunks[*i].dictionary_start());

    let mut slices: Vec<&'d mut [DictionaryEntry]> = (0..chunks.len()).map(|_| Default::default()).collect();
    let mut rest = global_dictionary;
    let mut offset = 0;
    for i in order {
        let start = chunks[i].dictionary_start();
        let end = start + chunks[i].dict_len();
        if start < offset {
            return Err(general_err!(
                "dictionary of chunk {} at [{}, {}) overlaps another chunk's dictionary",
                i,
                start,
                end
            ));
        }
        if end > total {
            return Err(OrcError::IndexOutOfBound(end, total));
        }
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(start - offset);
        let (owned, tail) = tail.split_at_mut(end - start);
        rest = tail;
        offset = end;
        slices[i] = owned;
    }
    Ok(slices)
}

fn nulls_and_dictionary<'a>(
    ws: &mut Workspace<'a>,
    chunk: &mut ColumnChunk<'a, '_>,
    dictionary: &mut [DictionaryEntry],
    options: &DecodeOptions,
) {
    nulls::decode_nulls(chunk, ws, options);
    if chunk.uses_dictionary() {
        dictionary::decode_dictionary(chunk, ws, dictionary);
    }
    trace!(
        start_row = chunk.start_row(),
        num_rows = chunk.num_rows(),
        null_count = chunk.null_count(),
        skip_count = chunk.skip_count(),
        dict_len = chunk.dict_len(),
        "decoded nulls"
    );
}

/// Decodes the PRESENT stream of every chunk into its validity bitmap and
/// builds the dictionary of every dictionary encoded string chunk.
///
/// Sets each chunk's null count to the nulls inside the row window and adds
/// the non-null rows before the window to its skip count. Dictionary entries
/// of a chunk are stored at `[dictionary_start, dictionary_start + dict_len)`
/// of `global_dictionary`.
pub fn decode_nulls_and_dictionaries(
    chunks: &mut [ColumnChunk<'_, '_>],
    global_dictionary: &mut [DictionaryEntry],
    options: &DecodeOptions,
) -> Result<()> {
    validate_chunks(chunks, options)?;
    let mut dictionaries = split_dictionary(chunks, global_dictionary)?;
    debug!(
        chunks = chunks.len(),
        first_row = options.first_row(),
        max_num_rows = options.max_num_rows(),
        parallel = options.parallel(),
        "decoding nulls and dictionaries"
    );

    if options.parallel() {
        chunks
            .par_iter_mut()
            .zip(dictionaries.par_iter_mut())
            .for_each_init(Workspace::new, |ws, (chunk, dictionary)| {
                nulls_and_dictionary(ws, chunk, dictionary, options)
            });
    } else {
        let mut ws = Workspace::new();
        for (chunk, dictionary) in chunks.iter_mut().zip(dictionaries.iter_mut()) {
            nulls_and_dictionary(&mut ws, chunk, dictionary, options);
        }
    }
    Ok(())
}

fn column_data<'a>(
    ws: &mut Workspace<'a>,
    chunk: &mut ColumnChunk<'a, '_>,
    global_dictionary: &[DictionaryEntry],
    options: &DecodeOptions,
) {
    column_data::decode_chunk_data(chunk, ws, global_dictionary, options);
    trace!(
        start_row = chunk.start_row(),
        num_rows = chunk.num_rows(),
        skip_count = chunk.skip_count(),
        "decoded column data"
    );
}

/// Decodes the values of every chunk into its output window.
///
/// Must run after [`decode_nulls_and_dictionaries`] has filled the validity
/// bitmaps, skip counts and dictionary of the same chunks.
pub fn decode_column_data(
    chunks: &mut [ColumnChunk<'_, '_>],
    global_dictionary: &[DictionaryEntry],
    options: &DecodeOptions,
) -> Result<()> {
    validate_chunks(chunks, options)?;
    for chunk in chunks.iter().filter(|c| c.uses_dictionary()) {
        let end = chunk.dictionary_start() + chunk.dict_len();
        if end > global_dictionary.len() {
            return Err(OrcError::IndexOutOfBound(end, global_dictionary.len()));
        }
    }
    debug!(
        chunks = chunks.len(),
        first_row = options.first_row(),
        max_num_rows = options.max_num_rows(),
        parallel = options.parallel(),
        "decoding column data"
    );

    if options.parallel() {
        chunks.par_iter_mut().for_each_init(Workspace::new, |ws, chunk| {
            column_data(ws, chunk, global_dictionary, options)
        });
    } else {
        let mut ws = Workspace::new();
        for chunk in chunks.iter_mut() {
            column_data(&mut ws, chunk, global_dictionary, options);
        }
    }
    Ok(())
}

/// Runs [`decode_nulls_and_dictionaries`] then [`decode_column_data`]
pub fn decode_stripes(
    chunks: &mut [ColumnChunk<'_, '_>],
    global_dictionary: &mut [DictionaryEntry],
    options: &DecodeOptions,
) -> Result<()> {
    decode_nulls_and_dictionaries(chunks, global_dictionary, options)?;
    decode_column_data(chunks, global_dictionary, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnBuffer, ColumnEncoding, TypeKind, ValidityBitmap};

    #[test]
    fn test_lanes_switch_and_compact() {
        let mut lanes = Lanes::U32(vec![0; VALUE_CAPACITY]);
        let v = i64::lanes(&mut lanes);
        assert_eq!(v.len(), VALUE_CAPACITY);
        v[..5].copy_from_slice(&[1, 2, 3, 4, 5]);
        lanes.compact(3, 5);
        assert_eq!(&i64::lanes(&mut lanes)[..2], &[4, 5]);
        assert!(matches!(lanes, Lanes::I64(_)));
    }

    #[test]
    fn test_split_dictionary() {
        let chunks = vec![
            ColumnChunk::new(TypeKind::String, ColumnEncoding::DictionaryV2, 0, 10)
                .with_dictionary(3, 2),
            ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 10),
            ColumnChunk::new(TypeKind::String, ColumnEncoding::Dictionary, 10, 10)
                .with_dictionary(0, 3),
        ];
        let mut global = vec![DictionaryEntry::default(); 5];
        let slices = split_dictionary(&chunks, &mut global).unwrap();
        assert_eq!(slices[0].len(), 2);
        assert_eq!(slices[1].len(), 0);
        assert_eq!(slices[2].len(), 3);

        let overlapping = vec![
            ColumnChunk::new(TypeKind::String, ColumnEncoding::DictionaryV2, 0, 10)
                .with_dictionary(0, 3),
            ColumnChunk::new(TypeKind::Char, ColumnEncoding::DictionaryV2, 10, 10)
                .with_dictionary(2, 2),
        ];
        let err = split_dictionary(&overlapping, &mut global).unwrap_err();
        assert!(err.to_string().contains("overlaps"));

        let too_long = vec![ColumnChunk::new(TypeKind::String, ColumnEncoding::DictionaryV2, 0, 1)
            .with_dictionary(4, 2)];
        let err = split_dictionary(&too_long, &mut global).unwrap_err();
        assert!(matches!(err, OrcError::IndexOutOfBound(6, 5)));
    }

    #[test]
    fn test_validation_errors() {
        let options = DecodeOptions::default();
        let present = [0xffu8, 0xff];

        let mut chunks = vec![ColumnChunk::new(TypeKind::Int, ColumnEncoding::Dictionary, 0, 4)];
        let err = decode_stripes(&mut chunks, &mut [], &options).unwrap_err();
        assert!(matches!(err, OrcError::NYI(_)));

        let mut chunks = vec![ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 4)
            .with_stream(StreamKind::Present, &present)];
        let err = decode_stripes(&mut chunks, &mut [], &options).unwrap_err();
        assert!(err.to_string().contains("no validity bitmap"));

        let data = [0u8; 4];
        let mut chunks = vec![ColumnChunk::new(TypeKind::Timestamp, ColumnEncoding::DirectV2, 0, 4)
            .with_stream(StreamKind::Data, &data)];
        let err = decode_stripes(&mut chunks, &mut [], &options).unwrap_err();
        assert!(matches!(err, OrcError::OutOfSpec(_)));

        let validity = ValidityBitmap::new_valid(2);
        let mut chunks = vec![ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 4)
            .with_stream(StreamKind::Present, &present)
            .with_validity(&validity)];
        let err = decode_stripes(&mut chunks, &mut [], &options).unwrap_err();
        assert!(matches!(err, OrcError::IndexOutOfBound(4, 2)));

        let mut buffer = ColumnBuffer::Int64(vec![0; 4]);
        let mut chunks = vec![ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 4)
            .with_output(crate::column::ChunkOutput::new(buffer.as_data_mut(), 0))];
        let err = decode_stripes(&mut chunks, &mut [], &options).unwrap_err();
        assert!(err.to_string().contains("Int64"));

        let mut buffer = ColumnBuffer::Int32(vec![0; 3]);
        let mut chunks = vec![ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 4)
            .with_output(crate::column::ChunkOutput::new(buffer.as_data_mut(), 0))];
        let err = decode_stripes(&mut chunks, &mut [], &options).unwrap_err();
        assert!(matches!(err, OrcError::IndexOutOfBound(4, 3)));
    }
}
