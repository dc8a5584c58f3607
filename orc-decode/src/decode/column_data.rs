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

//! Column data decoding.
//!
//! Each chunk is decoded by a loop over row windows. Every iteration
//!
//! 1. computes the row window, or a skip window while values before the first
//!    output row remain to be drained,
//! 2. tops up the SECONDARY and DATA value buffers with one decoder call each,
//! 3. writes the rows whose values are available to the output,
//! 4. moves unconsumed values to the front of the buffers.
//!
//! Values decoded past the end of a window stay buffered for the next one, so
//! decoders never have to split a run.

use tracing::warn;

use crate::column::{ColumnChunk, ColumnDataMut, ColumnEncoding, DictionaryEntry, StreamKind, TypeKind};
use crate::decode::row_window::RowWindow;
use crate::decode::{decode_ints, LaneType, Lanes, RunTables, Workspace, VALUE_CAPACITY};
use crate::encodings::byte_stream::ByteStream;
use crate::encodings::{byte_rle, decimal, DecodeBatch};
use crate::lanes::inclusive_prefix_sum_u32;
use crate::properties::DecodeOptions;

/// Seconds between the Unix epoch and 2015-01-01 00:00:00 UTC, the ORC
/// timestamp epoch
const ORC_EPOCH_SECONDS: i64 = 1_420_070_400;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Multipliers of the 3-bit trailing zeros code of encoded nanoseconds
const NANOS_SCALE: [u64; 8] = [
    1,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
];

/// Converts ORC timestamp seconds (relative to 2015-01-01) and encoded
/// nanoseconds into nanoseconds since the Unix epoch.
///
/// The low 3 bits of `encoded_nanos` select a power of ten the remaining bits
/// are multiplied with. Negative timestamps with a fractional part are stored
/// with their seconds truncated towards zero and are moved down one second.
///
/// ```
/// # use orc_decode::decode::timestamp_nanos;
/// // 2015-01-01 00:00:00.001
/// assert_eq!(timestamp_nanos(0, (1 << 3) | 5), 1_420_070_400_001_000_000);
/// ```
pub fn timestamp_nanos(seconds: i64, encoded_nanos: u64) -> i64 {
    let mut seconds = seconds.wrapping_add(ORC_EPOCH_SECONDS);
    let nanos = (encoded_nanos >> 3).wrapping_mul(NANOS_SCALE[(encoded_nanos & 7) as usize]) as i64;
    if seconds < 0 && nanos > 0 {
        seconds = seconds.wrapping_sub(1);
    }
    seconds.wrapping_mul(NANOS_PER_SECOND).wrapping_add(nanos)
}

/// Values buffered from one stream
#[derive(Debug, Default, Clone, Copy)]
struct Buffered {
    count: usize,
    exhausted: bool,
}

impl Buffered {
    fn add(&mut self, batch: DecodeBatch) {
        self.count += batch.count;
        self.exhausted = batch.exhausted;
    }
}

/// Streams a column's values are decoded from
#[derive(Debug, Clone, Copy)]
struct ValuePlan {
    type_kind: TypeKind,
    rle_v1: bool,
    dictionary: bool,
    /// Values come from the DATA stream
    primary: bool,
    /// Values come from the SECONDARY stream
    secondary: bool,
}

impl ValuePlan {
    fn new(type_kind: TypeKind, encoding: ColumnEncoding) -> Self {
        let dictionary = encoding.is_dictionary() && type_kind.is_string_like();
        Self {
            type_kind,
            rle_v1: encoding.is_rle_v1(),
            dictionary,
            // direct strings only decode their LENGTH stream
            primary: !type_kind.is_string_like() || dictionary,
            secondary: type_kind.has_secondary(encoding),
        }
    }

    fn direct_strings(&self) -> bool {
        self.type_kind.is_string_like() && !self.dictionary
    }

    fn available(&self, primary: &Buffered, secondary: &Buffered) -> usize {
        match (self.primary, self.secondary) {
            (true, true) => primary.count.min(secondary.count),
            (true, false) => primary.count,
            (false, _) => secondary.count,
        }
    }
}

/// Floating point values stored as little endian IEEE 754
trait FixedWidth: LaneType {
    const WIDTH: usize;

    fn read(bs: &ByteStream<'_>, pos: usize) -> Self;
}

impl FixedWidth for f32 {
    const WIDTH: usize = 4;

    fn read(bs: &ByteStream<'_>, pos: usize) -> Self {
        f32::from_bits(bs.read_u32(pos))
    }
}

impl FixedWidth for f64 {
    const WIDTH: usize = 8;

    fn read(bs: &ByteStream<'_>, pos: usize) -> Self {
        f64::from_bits(bs.read_u64(pos))
    }
}

/// Reads as many whole values as the staged window and `vals` allow
fn decode_fixed<T: FixedWidth>(bs: &mut ByteStream<'_>, vals: &mut [T]) -> DecodeBatch {
    bs.fill();
    let start = bs.pos();
    let n = (bs.max_scan_pos().saturating_sub(start) / T::WIDTH).min(vals.len());
    for (i, v) in vals[..n].iter_mut().enumerate() {
        *v = T::read(bs, start + i * T::WIDTH);
    }
    let consumed = n * T::WIDTH;
    let exhausted = bs.end().saturating_sub(start + consumed) < T::WIDTH;
    bs.flush_bytes(consumed);
    bs.fill();
    DecodeBatch::new(n, exhausted)
}

/// Decodes packed booleans, one value per lane
fn decode_booleans(
    bs: &mut ByteStream<'_>,
    runs: &mut RunTables,
    bytes: &mut [u8],
    vals: &mut [u8],
) -> DecodeBatch {
    let maxbytes = (vals.len() / 8).min(bytes.len());
    let batch = byte_rle::decode(bs, &mut runs.byte, bytes, maxbytes);
    let count = batch.count * 8;
    for (i, v) in vals[..count].iter_mut().enumerate() {
        *v = (bytes[i / 8] >> (7 - i % 8)) & 1;
    }
    DecodeBatch::new(count, batch.exhausted)
}

fn decode_primary(
    plan: &ValuePlan,
    bs: &mut ByteStream<'_>,
    runs: &mut RunTables,
    bytes: &mut [u8],
    vals: &mut Lanes,
    buffered: usize,
) -> DecodeBatch {
    let maxvals = VALUE_CAPACITY - buffered;
    match plan.type_kind {
        TypeKind::Boolean => decode_booleans(bs, runs, bytes, &mut u8::lanes(vals)[buffered..]),
        TypeKind::Byte => byte_rle::decode(bs, &mut runs.byte, &mut u8::lanes(vals)[buffered..], maxvals),
        TypeKind::Short | TypeKind::Int | TypeKind::Date => {
            decode_ints(bs, runs, &mut i32::lanes(vals)[buffered..], maxvals, plan.rle_v1)
        }
        TypeKind::Long | TypeKind::Timestamp => {
            decode_ints(bs, runs, &mut i64::lanes(vals)[buffered..], maxvals, plan.rle_v1)
        }
        TypeKind::Float => decode_fixed(bs, &mut f32::lanes(vals)[buffered..]),
        TypeKind::Double => decode_fixed(bs, &mut f64::lanes(vals)[buffered..]),
        TypeKind::Decimal => decimal::decode(bs, &mut runs.decimal, &mut i64::lanes(vals)[buffered..], maxvals),
        // dictionary indices
        TypeKind::String | TypeKind::Binary | TypeKind::Varchar | TypeKind::Char => {
            decode_ints(bs, runs, &mut u32::lanes(vals)[buffered..], maxvals, plan.rle_v1)
        }
    }
}

fn decode_secondary(
    plan: &ValuePlan,
    bs: &mut ByteStream<'_>,
    runs: &mut RunTables,
    vals: &mut Lanes,
    buffered: usize,
) -> DecodeBatch {
    let maxvals = VALUE_CAPACITY - buffered;
    match plan.type_kind {
        TypeKind::Timestamp => decode_ints(bs, runs, &mut u64::lanes(vals)[buffered..], maxvals, plan.rle_v1),
        TypeKind::Decimal => decode_ints(bs, runs, &mut i32::lanes(vals)[buffered..], maxvals, plan.rle_v1),
        // string lengths
        _ => decode_ints(bs, runs, &mut u32::lanes(vals)[buffered..], maxvals, plan.rle_v1),
    }
}

/// Writes `value(i)` to the output slot of every non-null row of the window,
/// where `i` is the index of the row's value
fn scatter<T>(
    dst: &mut [T],
    row_ofs: &[u32],
    first_slot: usize,
    row_offset: usize,
    value: impl Fn(usize) -> T,
) {
    for (t, ofs) in row_ofs.iter().enumerate() {
        if *ofs == 0 {
            continue;
        }
        let slot = (first_slot + t)
            .checked_sub(row_offset)
            .and_then(|i| dst.get_mut(i));
        if let Some(slot) = slot {
            *slot = value(*ofs as usize - 1);
        }
    }
}

/// Stream bytes that string values point into
struct StringSource<'a, 'd> {
    data: &'a [u8],
    dictionary: &'d [DictionaryEntry],
    dictionary_data: &'a [u8],
}

impl<'a> StringSource<'a, '_> {
    fn lookup(&self, index: u32) -> &'a [u8] {
        self.dictionary
            .get(index as usize)
            .and_then(|e| {
                let pos = e.pos as usize;
                self.dictionary_data.get(pos..pos + e.len as usize)
            })
            .unwrap_or(&[])
    }

    fn direct(&self, pos: usize, len: u32) -> &'a [u8] {
        self.data.get(pos..pos + len as usize).unwrap_or(&[])
    }
}

#[allow(clippy::too_many_arguments)]
fn scatter_values<'a>(
    plan: &ValuePlan,
    dst: &mut ColumnDataMut<'a, '_>,
    row_ofs: &[u32],
    first_slot: usize,
    row_offset: usize,
    vals: &mut Lanes,
    vals2: &mut Lanes,
    string_ends: &[u32],
    str_pos: usize,
    strings: &StringSource<'a, '_>,
) {
    match dst {
        ColumnDataMut::Boolean(dst) => {
            let v = u8::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i] != 0)
        }
        ColumnDataMut::Int8(dst) => {
            let v = u8::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i] as i8)
        }
        ColumnDataMut::Int16(dst) => {
            let v = i32::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i] as i16)
        }
        ColumnDataMut::Int32(dst) | ColumnDataMut::Date32(dst) => {
            let v = i32::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i])
        }
        ColumnDataMut::Date64(dst) => {
            let v = i32::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| {
                i64::from(v[i]) * MILLIS_PER_DAY
            })
        }
        ColumnDataMut::Int64(dst) => {
            let v = i64::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i])
        }
        ColumnDataMut::Float32(dst) => {
            let v = f32::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i])
        }
        ColumnDataMut::Float64(dst) => {
            let v = f64::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| v[i])
        }
        ColumnDataMut::TimestampNanos(dst) => {
            let seconds = i64::lanes(vals);
            let nanos = u64::lanes(vals2);
            scatter(dst, row_ofs, first_slot, row_offset, |i| {
                timestamp_nanos(seconds[i], nanos[i])
            })
        }
        ColumnDataMut::Decimal(dst) => {
            let unscaled = i64::lanes(vals);
            let scale = i32::lanes(vals2);
            scatter(dst, row_ofs, first_slot, row_offset, |i| {
                unscaled[i] as f64 / 10f64.powi(scale[i])
            })
        }
        ColumnDataMut::Bytes(dst) if plan.dictionary => {
            let indices = u32::lanes(vals);
            scatter(dst, row_ofs, first_slot, row_offset, |i| strings.lookup(indices[i]))
        }
        ColumnDataMut::Bytes(dst) => {
            let lengths = u32::lanes(vals2);
            scatter(dst, row_ofs, first_slot, row_offset, |i| {
                let pos = str_pos + string_ends[i].wrapping_sub(lengths[i]) as usize;
                strings.direct(pos, lengths[i])
            })
        }
    }
}

/// Decodes the values of `chunk` into its output window
pub(crate) fn decode_chunk_data<'a>(
    chunk: &mut ColumnChunk<'a, '_>,
    ws: &mut Workspace<'a>,
    global_dictionary: &[DictionaryEntry],
    options: &DecodeOptions,
) {
    let first_row = options.first_row();
    let window = options.row_window(chunk.start_row(), chunk.num_rows());
    let plan = ValuePlan::new(chunk.type_kind(), chunk.encoding());
    let has_present = chunk.stream(StreamKind::Present).is_some();
    let validity = chunk.validity();
    let data = chunk.stream(StreamKind::Data).unwrap_or(&[]);
    let secondary = chunk.stream(StreamKind::Secondary).unwrap_or(&[]);
    let dictionary = if plan.dictionary {
        let start = chunk.dictionary_start();
        global_dictionary
            .get(start..start + chunk.dict_len())
            .unwrap_or(&[])
    } else {
        &[]
    };
    let strings = StringSource {
        data,
        dictionary,
        dictionary_data: chunk.stream(StreamKind::DictionaryData).unwrap_or(&[]),
    };
    let start_row = chunk.start_row();
    let mut skip_count = chunk.skip_count;
    let Some(output) = chunk.output.as_mut() else {
        return;
    };
    if window.is_empty() {
        return;
    }

    ws.bs.init(data);
    ws.bs2.init(secondary);
    let Workspace {
        bs,
        bs2,
        runs,
        row_ofs,
        scan,
        bytes,
        vals,
        vals2,
        ..
    } = ws;

    let is_valid = |row: usize| !has_present || validity.is_some_and(|v| v.is_valid(row - first_row));
    let mut primary = Buffered::default();
    let mut second = Buffered::default();
    let mut cur_row = window.start;
    let mut str_pos = 0usize;
    loop {
        let rw = if skip_count > 0 {
            RowWindow::skip(skip_count)
        } else if cur_row < window.end {
            RowWindow::by_row(row_ofs, cur_row, window.end, is_valid)
        } else {
            break;
        };

        if plan.secondary && second.count < rw.need && !second.exhausted {
            second.add(decode_secondary(&plan, bs2, runs, vals2, second.count));
        }
        if plan.primary && primary.count < rw.need && !primary.exhausted {
            primary.add(decode_primary(&plan, bs, runs, bytes, vals, primary.count));
        }

        let max_vals = rw.need.min(plan.available(&primary, &second));
        let nrows = rw.rows_covered(row_ofs, max_vals);

        let string_ends = &mut scan[..max_vals];
        if plan.direct_strings() {
            string_ends.copy_from_slice(&u32::lanes(vals2)[..max_vals]);
            inclusive_prefix_sum_u32(string_ends);
        }

        if nrows > 0 {
            scatter_values(
                &plan,
                &mut output.data,
                &row_ofs[..nrows],
                cur_row - first_row,
                output.row_offset,
                vals,
                vals2,
                string_ends,
                str_pos,
                &strings,
            );
        }

        if plan.direct_strings() {
            if let Some(total) = string_ends.last() {
                str_pos += *total as usize;
            }
        }
        if plan.primary {
            vals.compact(max_vals, primary.count);
            primary.count -= max_vals;
        }
        if plan.secondary {
            vals2.compact(max_vals, second.count);
            second.count -= max_vals;
        }
        if rw.is_skip() {
            skip_count -= max_vals;
        }
        cur_row += nrows;

        if max_vals == 0 && nrows == 0 {
            if skip_count > 0 || cur_row < window.end {
                warn!(
                    start_row,
                    row = cur_row,
                    end_row = window.end,
                    skip_count,
                    type_kind = %plan.type_kind,
                    "column data ended early, remaining rows keep their default values"
                );
            }
            break;
        }
    }
    chunk.skip_count = skip_count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnBuffer, OutputColumn};
    use crate::decode::decode_stripes;
    use crate::util::test_common::encoder::{
        encode_byte_rle, encode_present, encode_rle_v1, encode_rle_v2_direct, pack_booleans,
        write_signed_varint,
    };

    /// Decodes a single chunk holding every row of a column
    fn decode_column<'a>(
        type_kind: TypeKind,
        encoding: ColumnEncoding,
        num_rows: usize,
        streams: &[(StreamKind, &'a [u8])],
        dictionary: &[DictionaryEntry],
        options: &DecodeOptions,
    ) -> (ColumnBuffer<'a>, Vec<bool>) {
        let window = options.output_window(0, num_rows);
        let mut column = OutputColumn::new(type_kind, window.end, true);
        {
            let (validity, mut outputs) = column.chunk_outputs(&[(0, num_rows)], options).unwrap();
            let mut chunk = ColumnChunk::new(type_kind, encoding, 0, num_rows)
                .with_dictionary(0, dictionary.len())
                .with_validity(validity.unwrap())
                .with_output(outputs.remove(0));
            for &(kind, bytes) in streams {
                chunk = chunk.with_stream(kind, bytes);
            }
            let mut global = dictionary.to_vec();
            decode_stripes(std::slice::from_mut(&mut chunk), &mut global, options).unwrap();
        }
        let (buffer, validity) = column.into_parts();
        let validity = validity.unwrap();
        let valid = (0..validity.len()).map(|i| validity.is_valid(i)).collect();
        (buffer, valid)
    }

    #[test]
    fn test_timestamp_nanos() {
        assert_eq!(timestamp_nanos(0, 0), ORC_EPOCH_SECONDS * NANOS_PER_SECOND);
        // 1000 ns is stored as 1 with the code for 3 trailing zeros
        assert_eq!(timestamp_nanos(-ORC_EPOCH_SECONDS, (1 << 3) | 2), 1000);
        assert_eq!(timestamp_nanos(-ORC_EPOCH_SECONDS, 5 << 3), 5);
        // 1969-12-31 23:59:59 truncated, plus half a second
        assert_eq!(
            timestamp_nanos(-ORC_EPOCH_SECONDS - 1, (5 << 3) | 7),
            -1_500_000_000
        );
        // a fractional second on the lowest representable second wraps
        // instead of overflowing
        let seconds = i64::MIN.wrapping_sub(ORC_EPOCH_SECONDS);
        assert_eq!(
            timestamp_nanos(seconds, (5 << 3) | 7),
            i64::MAX
                .wrapping_mul(NANOS_PER_SECOND)
                .wrapping_add(500_000_000)
        );
    }

    #[test]
    fn test_decode_fixed_across_windows() {
        let values: Vec<f64> = (0..3000).map(|i| i as f64 * 0.5).collect();
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut bs = ByteStream::new(&bytes);
        let mut vals = vec![0f64; VALUE_CAPACITY];
        let mut decoded = vec![];
        loop {
            let batch = decode_fixed(&mut bs, &mut vals);
            decoded.extend_from_slice(&vals[..batch.count]);
            if batch.exhausted {
                break;
            }
        }
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_decode_booleans() {
        let bits: Vec<bool> = (0..20).map(|i| i % 3 == 0).collect();
        let bytes = encode_byte_rle(&pack_booleans(&bits));
        let mut bs = ByteStream::new(&bytes);
        let mut ws = Workspace::new();
        let mut vals = vec![0u8; 64];
        let batch = decode_booleans(&mut bs, &mut ws.runs, &mut ws.bytes, &mut vals);
        assert_eq!(batch, DecodeBatch::new(24, true));
        let decoded: Vec<bool> = vals[..20].iter().map(|v| *v != 0).collect();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn test_ints_with_nulls_and_skip() {
        let valid = [true, false, true, true, false, true, true];
        let present = encode_present(&valid);
        let data = encode_rle_v2_direct(&[1i32, 2, 3, 4, 5]);
        let options = DecodeOptions::builder().set_first_row(3).build();
        let streams = [(StreamKind::Present, &present[..]), (StreamKind::Data, &data[..])];
        let (buffer, valid) =
            decode_column(TypeKind::Int, ColumnEncoding::DirectV2, 7, &streams, &[], &options);
        assert_eq!(valid, vec![true, false, true, true]);
        assert_eq!(buffer, ColumnBuffer::Int32(vec![3, 0, 4, 5]));
    }

    #[test]
    fn test_long_rle_v1_many_windows() {
        let rows = 5000;
        let valid: Vec<bool> = (0..rows).map(|i| i % 4 != 0).collect();
        let values: Vec<i64> = (0..rows as i64).filter(|i| i % 4 != 0).map(|i| i * 3 - 7000).collect();
        let present = encode_present(&valid);
        let data = encode_rle_v1(&values);
        let options = DecodeOptions::builder().set_first_row(1234).build();
        let streams = [(StreamKind::Present, &present[..]), (StreamKind::Data, &data[..])];
        let (buffer, decoded_valid) =
            decode_column(TypeKind::Long, ColumnEncoding::Direct, rows, &streams, &[], &options);
        let ColumnBuffer::Int64(decoded) = buffer else {
            panic!("expected Int64 buffer");
        };
        assert_eq!(decoded.len(), rows - 1234);
        for (i, (v, ok)) in decoded.iter().zip(&decoded_valid).enumerate() {
            let row = i + 1234;
            assert_eq!(*ok, valid[row], "row {row}");
            let expected = if valid[row] { row as i64 * 3 - 7000 } else { 0 };
            assert_eq!(*v, expected, "row {row}");
        }
    }

    #[test]
    fn test_direct_strings() {
        let valid = [true, true, false, true];
        let present = encode_present(&valid);
        let lengths = encode_rle_v2_direct(&[2u32, 0, 3]);
        let data = b"abcde".to_vec();
        let streams = [
            (StreamKind::Present, &present[..]),
            (StreamKind::Data, &data[..]),
            (StreamKind::Secondary, &lengths[..]),
        ];
        let (buffer, valid) = decode_column(
            TypeKind::String,
            ColumnEncoding::DirectV2,
            4,
            &streams,
            &[],
            &DecodeOptions::default(),
        );
        assert_eq!(valid, vec![true, true, false, true]);
        assert_eq!(
            buffer,
            ColumnBuffer::Bytes(vec![&b"ab"[..], &b""[..], &b""[..], &b"cde"[..]])
        );
    }

    #[test]
    fn test_direct_strings_skip_advances_position() {
        let lengths = encode_rle_v2_direct(&[1u32, 2, 3, 4]);
        let data = b"abbcccdddd".to_vec();
        let options = DecodeOptions::builder().set_first_row(2).build();
        let streams = [(StreamKind::Data, &data[..]), (StreamKind::Secondary, &lengths[..])];
        let (buffer, _) =
            decode_column(TypeKind::Binary, ColumnEncoding::DirectV2, 4, &streams, &[], &options);
        assert_eq!(buffer, ColumnBuffer::Bytes(vec![&b"ccc"[..], &b"dddd"[..]]));
    }

    #[test]
    fn test_dictionary_strings() {
        let dictionary_data = b"redgreenblue".to_vec();
        let lengths = encode_rle_v2_direct(&[3u32, 5, 4]);
        // index 7 is outside the dictionary
        let indices = encode_rle_v2_direct(&[2u32, 0, 7, 1, 2]);
        let streams = [
            (StreamKind::Data, &indices[..]),
            (StreamKind::Secondary, &lengths[..]),
            (StreamKind::DictionaryData, &dictionary_data[..]),
        ];
        let dictionary = vec![DictionaryEntry::default(); 3];
        let (buffer, _) = decode_column(
            TypeKind::Varchar,
            ColumnEncoding::DictionaryV2,
            5,
            &streams,
            &dictionary,
            &DecodeOptions::default(),
        );
        assert_eq!(
            buffer,
            ColumnBuffer::Bytes(vec![
                &b"blue"[..],
                &b"red"[..],
                &b""[..],
                &b"green"[..],
                &b"blue"[..]
            ])
        );
    }

    #[test]
    fn test_decimals() {
        let mut data = vec![];
        for v in [12345i64, -5, 7] {
            write_signed_varint(&mut data, v);
        }
        let scales = encode_rle_v2_direct(&[2i32, 0, 1]);
        let streams = [(StreamKind::Data, &data[..]), (StreamKind::Secondary, &scales[..])];
        let (buffer, _) = decode_column(
            TypeKind::Decimal,
            ColumnEncoding::DirectV2,
            3,
            &streams,
            &[],
            &DecodeOptions::default(),
        );
        assert_eq!(buffer, ColumnBuffer::Decimal(vec![123.45, -5.0, 0.7]));
    }

    #[test]
    fn test_booleans_and_bytes() {
        let bits: Vec<bool> = (0..2100).map(|i| i % 5 < 2).collect();
        let data = encode_byte_rle(&pack_booleans(&bits));
        let streams = [(StreamKind::Data, &data[..])];
        let options = DecodeOptions::builder().set_first_row(3).build();
        let (buffer, _) =
            decode_column(TypeKind::Boolean, ColumnEncoding::DirectV2, 2100, &streams, &[], &options);
        assert_eq!(buffer, ColumnBuffer::Boolean(bits[3..].to_vec()));

        let bytes: Vec<u8> = (0..300).map(|i| (i % 256) as u8).collect();
        let data = encode_byte_rle(&bytes);
        let streams = [(StreamKind::Data, &data[..])];
        let (buffer, _) = decode_column(
            TypeKind::Byte,
            ColumnEncoding::DirectV2,
            300,
            &streams,
            &[],
            &DecodeOptions::default(),
        );
        let expected: Vec<i8> = bytes.iter().map(|b| *b as i8).collect();
        assert_eq!(buffer, ColumnBuffer::Int8(expected));
    }

    #[test]
    fn test_truncated_data_keeps_defaults() {
        let data = encode_rle_v2_direct(&[1i32, 2, 3]);
        let streams = [(StreamKind::Data, &data[..])];
        let (buffer, _) = decode_column(
            TypeKind::Short,
            ColumnEncoding::DirectV2,
            6,
            &streams,
            &[],
            &DecodeOptions::default(),
        );
        assert_eq!(buffer, ColumnBuffer::Int16(vec![1, 2, 3, 0, 0, 0]));
    }
}
