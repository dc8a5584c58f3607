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

//! PRESENT stream expansion.
//!
//! The PRESENT stream is a byte RLE stream of validity bits packed most
//! significant bit first. Rows before the row window only contribute to the
//! chunk's skip count. Rows inside the window are copied into the output
//! validity bitmap one destination word per lane.

use tracing::warn;

use crate::column::{ColumnChunk, StreamKind, ValidityBitmap};
use crate::decode::Workspace;
use crate::encodings::byte_rle;
use crate::lanes::{block_reduce_sum, NTHREADS};
use crate::properties::DecodeOptions;
use crate::util::bit_util::{ceil, low_mask32, read_bool32};

/// Rows expanded per batch, 32 per lane
const BATCH_ROWS: usize = NTHREADS * 32;

pub(crate) fn decode_nulls<'a>(
    chunk: &mut ColumnChunk<'a, '_>,
    ws: &mut Workspace<'a>,
    options: &DecodeOptions,
) {
    let start_row = chunk.start_row();
    let num_rows = chunk.num_rows();
    let first_row = options.first_row();
    let window = options.row_window(start_row, num_rows);
    let validity = chunk.validity();

    let Some(present) = chunk.stream(StreamKind::Present) else {
        // every row is valid
        chunk.skip_count += (start_row + num_rows).min(first_row).saturating_sub(start_row);
        if let Some(validity) = validity {
            validity.set_range(window.start - first_row, window.len(), true);
        }
        chunk.null_count = 0;
        return;
    };

    ws.bs.init(present);
    let Workspace {
        bs,
        runs,
        bytes,
        lane_counts,
        ..
    } = ws;
    lane_counts.fill(0);

    let mut skip = 0;
    let mut row = 0;
    while row < num_rows {
        let batch_rows = (num_rows - row).min(BATCH_ROWS);
        let nbytes = ceil(batch_rows, 8);
        let batch = byte_rle::decode(bs, &mut runs.byte, bytes, nbytes);
        let covered = if batch.count == 0 {
            warn!(
                start_row,
                row = start_row + row,
                remaining = num_rows - row,
                "PRESENT stream ended early, treating remaining rows as null"
            );
            bytes[..nbytes].fill(0);
            batch_rows
        } else {
            (batch.count * 8).min(batch_rows)
        };
        let batch_start = start_row + row;
        let batch_end = batch_start + covered;

        if first_row > batch_start {
            let before = batch_end.min(first_row) - batch_start;
            skip += count_valid(bytes, before);
        }

        let lo = batch_start.max(window.start);
        let hi = batch_end.min(window.end);
        if hi > lo {
            if let Some(validity) = validity {
                write_validity(
                    validity,
                    bytes,
                    lo - batch_start,
                    lo - first_row,
                    hi - lo,
                    lane_counts,
                );
            }
        }
        row += covered;
    }

    chunk.skip_count += skip;
    chunk.null_count = block_reduce_sum(lane_counts) as usize;
}

/// Valid rows among the first `rows` bits of `bytes`
fn count_valid(bytes: &[u8], rows: usize) -> usize {
    (0..rows)
        .step_by(32)
        .map(|bit| {
            let nbits = (rows - bit).min(32) as u32;
            (read_bool32(bytes, bit) & low_mask32(nbits)).count_ones() as usize
        })
        .sum()
}

/// Copies `count` bits of `bytes` starting at bit `src` into `validity`
/// starting at row `dst`, counting the nulls of each lane in `lane_counts`.
fn write_validity(
    validity: &ValidityBitmap,
    bytes: &[u8],
    src: usize,
    dst: usize,
    count: usize,
    lane_counts: &mut [u32],
) {
    let first_word = dst / 32;
    let last_word = (dst + count - 1) / 32;
    for (lane, word) in (first_word..=last_word).enumerate() {
        let lo = (word * 32).max(dst);
        let hi = (word * 32 + 32).min(dst + count);
        let nbits = (hi - lo) as u32;
        let shift = (lo % 32) as u32;
        let bits = read_bool32(bytes, src + (lo - dst)) & low_mask32(nbits);
        if nbits == 32 {
            validity.store_word(word, bits);
        } else {
            validity.update_word(word, low_mask32(nbits) << shift, bits << shift);
        }
        lane_counts[lane % lane_counts.len()] += nbits - bits.count_ones();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnEncoding, TypeKind};
    use crate::util::test_common::encoder::encode_present;

    fn decode(chunk: &mut ColumnChunk<'_, '_>, options: &DecodeOptions) {
        let mut ws = Workspace::new();
        decode_nulls(chunk, &mut ws, options);
    }

    #[test]
    fn test_nulls_before_and_inside_window() {
        let valid: Vec<bool> = (0..37).map(|i| i % 3 != 1).collect();
        let present = encode_present(&valid);
        let options = DecodeOptions::builder().set_first_row(5).build();
        let validity = ValidityBitmap::new_null(32);
        let mut chunk = ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 37)
            .with_stream(StreamKind::Present, &present)
            .with_validity(&validity);
        decode(&mut chunk, &options);

        // rows 0, 2 and 3 precede the window
        assert_eq!(chunk.skip_count(), 3);
        assert_eq!(chunk.null_count(), 10);
        for i in 0..32 {
            assert_eq!(validity.is_valid(i), valid[i + 5], "row {}", i + 5);
        }
        assert_eq!(validity.null_count(), 10);
    }

    #[test]
    fn test_rows_outside_window_untouched() {
        let valid: Vec<bool> = (0..37).map(|i| i % 3 != 1).collect();
        let present = encode_present(&valid);
        let options = DecodeOptions::builder()
            .set_first_row(5)
            .set_max_num_rows(20)
            .build();
        let validity = ValidityBitmap::new_valid(64);
        let mut chunk = ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 37)
            .with_stream(StreamKind::Present, &present)
            .with_validity(&validity);
        decode(&mut chunk, &options);

        assert_eq!(chunk.skip_count(), 3);
        // rows 7, 10, 13, 16, 19 and 22
        assert_eq!(chunk.null_count(), 6);
        for i in 0..20 {
            assert_eq!(validity.is_valid(i), valid[i + 5], "row {}", i + 5);
        }
        for i in 20..64 {
            assert!(validity.is_valid(i), "bit {i} outside the window");
        }
        assert_eq!(validity.null_count(), 6);
    }

    #[test]
    fn test_chunks_share_bitmap_words() {
        let first: Vec<bool> = (0..20).map(|i| i % 2 == 0).collect();
        let second: Vec<bool> = (0..30).map(|i| i % 5 != 0).collect();
        let p1 = encode_present(&first);
        let p2 = encode_present(&second);
        let options = DecodeOptions::default();
        let validity = ValidityBitmap::new_null(50);
        let mut chunks = [
            ColumnChunk::new(TypeKind::Long, ColumnEncoding::DirectV2, 0, 20)
                .with_stream(StreamKind::Present, &p1)
                .with_validity(&validity),
            ColumnChunk::new(TypeKind::Long, ColumnEncoding::DirectV2, 20, 30)
                .with_stream(StreamKind::Present, &p2)
                .with_validity(&validity),
        ];
        for chunk in chunks.iter_mut().rev() {
            decode(chunk, &options);
        }
        let expected: Vec<bool> = first.iter().chain(&second).copied().collect();
        for (i, v) in expected.iter().enumerate() {
            assert_eq!(validity.is_valid(i), *v, "row {i}");
        }
        assert_eq!(chunks[0].null_count(), 10);
        assert_eq!(chunks[1].null_count(), 6);
        assert_eq!(chunks[0].skip_count(), 0);
    }

    #[test]
    fn test_no_present_stream() {
        let options = DecodeOptions::builder()
            .set_first_row(10)
            .set_max_num_rows(5)
            .build();
        let validity = ValidityBitmap::new_null(5);
        let mut chunk = ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 4, 100)
            .with_validity(&validity);
        decode(&mut chunk, &options);
        assert_eq!(chunk.skip_count(), 6);
        assert_eq!(chunk.null_count(), 0);
        assert_eq!(validity.null_count(), 0);
    }

    #[test]
    fn test_truncated_present_stream() {
        // covers 16 of 40 rows
        let present = encode_present(&[true; 16]);
        let validity = ValidityBitmap::new_valid(40);
        let mut chunk = ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 40)
            .with_stream(StreamKind::Present, &present)
            .with_validity(&validity);
        decode(&mut chunk, &DecodeOptions::default());
        assert_eq!(chunk.null_count(), 24);
        assert!(validity.is_valid(15));
        assert!(!validity.is_valid(16));
        assert!(!validity.is_valid(39));
    }

    #[test]
    fn test_large_chunk_spans_batches() {
        let rows = BATCH_ROWS + 1000;
        let valid: Vec<bool> = (0..rows).map(|i| i % 7 != 3).collect();
        let present = encode_present(&valid);
        let validity = ValidityBitmap::new_null(rows);
        let mut chunk = ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, rows)
            .with_stream(StreamKind::Present, &present)
            .with_validity(&validity);
        decode(&mut chunk, &DecodeOptions::default());
        let nulls = valid.iter().filter(|v| !**v).count();
        assert_eq!(chunk.null_count(), nulls);
        assert_eq!(validity.null_count(), nulls);
        assert!(!validity.is_valid(BATCH_ROWS + 3 - BATCH_ROWS % 7));
    }
}
