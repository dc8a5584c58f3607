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

//! Integer run length encoding, version 2.
//!
//! Every run starts with a header whose two most significant bits select one
//! of four sub-encodings:
//!
//! ```text
//! short-repeat  00 www ccc                    value(w+1 bytes, big endian)
//!               count = c + 3
//! direct        01 wwwww c | cccccccc         values(width, bit packed)
//! patched-base  10 wwwww c | cccccccc | bbb ppppp | ggg lllll
//!               base(b+1 bytes, sign bit in the msb) offsets(width, bit packed)
//!               patch-list(l entries of (gap << patch-width | patch))
//! delta         11 wwwww c | cccccccc         base(varint) delta(signed varint)
//!               steps(width, bit packed, count - 2 entries)
//!               count = c + 1
//! ```
//!
//! Bit packed values are stored most significant bit first and each packed
//! block is padded to a whole byte.

use crate::encodings::byte_stream::ByteStream;
use crate::encodings::{closest_fixed_bits, DecodeBatch, RleInt, RLE_V2_WIDTHS};
use crate::lanes::{inclusive_scan, NTHREADS};

/// Runs recorded per batch
pub const MAX_RUNS: usize = NTHREADS;

/// Longest run any sub-encoding can express
pub const MAX_RUN_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    ShortRepeat,
    Direct,
    PatchedBase,
    Delta,
}

impl Mode {
    fn from_header(b0: u8) -> Self {
        match b0 >> 6 {
            0 => Mode::ShortRepeat,
            1 => Mode::Direct,
            2 => Mode::PatchedBase,
            _ => Mode::Delta,
        }
    }

    fn header_len(self) -> usize {
        match self {
            Mode::ShortRepeat => 1,
            Mode::Direct | Mode::Delta => 2,
            Mode::PatchedBase => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    mode: Mode,
    /// Index of the first value of the run in the output
    out: u32,
    count: u32,
    /// Stream position of the run header
    pos: u32,
}

/// Run table and expansion scratch rebuilt by every [`decode`] call.
#[derive(Debug, Default)]
pub struct RleV2Runs {
    runs: Vec<Run>,
    steps: Vec<u64>,
}

impl RleV2Runs {
    pub fn new() -> Self {
        Self {
            runs: Vec::with_capacity(MAX_RUNS),
            steps: Vec::with_capacity(MAX_RUN_LENGTH),
        }
    }
}

#[inline]
fn packed_bytes(width: u32, count: usize) -> usize {
    (width as usize * count + 7) >> 3
}

#[inline]
fn run_count(bs: &ByteStream<'_>, pos: usize) -> usize {
    (((bs.read_byte(pos) as usize & 1) << 8) | bs.read_byte(pos + 1) as usize) + 1
}

#[inline]
fn data_width(b0: u8) -> u32 {
    RLE_V2_WIDTHS[((b0 >> 1) & 0x1f) as usize]
}

#[inline]
fn delta_width(b0: u8) -> u32 {
    match (b0 >> 1) & 0x1f {
        0 => 0,
        code => RLE_V2_WIDTHS[code as usize],
    }
}

/// Patch list geometry of a patched base run
#[derive(Debug, Clone, Copy)]
struct PatchHeader {
    base_bytes: usize,
    patch_width: u32,
    gap_width: u32,
    list_len: usize,
}

impl PatchHeader {
    fn read(bs: &ByteStream<'_>, pos: usize) -> Self {
        let b2 = bs.read_byte(pos + 2);
        let b3 = bs.read_byte(pos + 3);
        Self {
            base_bytes: (b2 >> 5) as usize + 1,
            patch_width: RLE_V2_WIDTHS[(b2 & 0x1f) as usize],
            gap_width: (b3 >> 5) as u32 + 1,
            list_len: (b3 & 0x1f) as usize,
        }
    }

    /// Width of one packed (gap, patch) entry, `None` when the pair cannot be
    /// read as a single 64-bit field.
    fn entry_width(&self) -> Option<u32> {
        let total = self.gap_width + self.patch_width;
        (total <= 64).then(|| closest_fixed_bits(total))
    }
}

/// Returns the mode, value count and byte length of the run at `pos`, or
/// `None` if the header is malformed.
fn parse_run<T: RleInt>(bs: &ByteStream<'_>, pos: usize) -> Option<(Mode, usize, usize)> {
    let b0 = bs.read_byte(pos);
    let mode = Mode::from_header(b0);
    let parsed = match mode {
        Mode::ShortRepeat => {
            let width_bytes = ((b0 >> 3) & 7) as usize + 1;
            let n = (b0 & 7) as usize + 3;
            (n, 1 + width_bytes)
        }
        Mode::Direct => {
            let n = run_count(bs, pos);
            (n, 2 + packed_bytes(data_width(b0), n))
        }
        Mode::PatchedBase => {
            let n = run_count(bs, pos);
            let patch = PatchHeader::read(bs, pos);
            let entry_width = patch.entry_width()?;
            let len = 4
                + patch.base_bytes
                + packed_bytes(data_width(b0), n)
                + packed_bytes(entry_width, patch.list_len);
            (n, len)
        }
        Mode::Delta => {
            let n = run_count(bs, pos);
            let base_len = bs.varint_length::<T>(pos + 2);
            let delta_len = bs.varint_length::<i64>(pos + 2 + base_len);
            let w = delta_width(b0);
            let steps = if w > 0 && n > 2 {
                packed_bytes(w, n - 2)
            } else {
                0
            };
            (n, 2 + base_len + delta_len + steps)
        }
    };
    Some((mode, parsed.0, parsed.1))
}

/// Decodes up to `maxvals` values into the front of `vals`.
///
/// Stops early when the next run would not fit in `maxvals`, when the run
/// table is full or when the next run is not entirely staged in the window of
/// `bs`. A malformed run header ends the batch and marks it exhausted.
pub fn decode<T: RleInt>(
    bs: &mut ByteStream<'_>,
    runs: &mut RleV2Runs,
    vals: &mut [T],
    maxvals: usize,
) -> DecodeBatch {
    let maxvals = maxvals.min(vals.len());
    bs.fill();
    runs.runs.clear();

    let start = bs.pos();
    let end = bs.end();
    let maxpos = bs.max_scan_pos();
    let mut pos = start;
    let mut numvals = 0usize;
    let mut exhausted = false;
    while numvals < maxvals && runs.runs.len() < MAX_RUNS {
        if pos >= maxpos {
            exhausted = pos >= end;
            break;
        }
        let header_end = pos + Mode::from_header(bs.read_byte(pos)).header_len();
        if header_end > maxpos {
            exhausted = header_end > end;
            break;
        }
        let Some((mode, n, len)) = parse_run::<T>(bs, pos) else {
            exhausted = true;
            break;
        };
        if pos + len > maxpos {
            exhausted = pos + len > end;
            break;
        }
        if numvals + n > maxvals {
            break;
        }
        runs.runs.push(Run {
            mode,
            out: numvals as u32,
            count: n as u32,
            pos: pos as u32,
        });
        pos += len;
        numvals += n;
    }

    let RleV2Runs { runs, steps } = runs;
    for run in runs.iter() {
        let out = run.out as usize;
        let n = run.count as usize;
        let dst = &mut vals[out..out + n];
        match run.mode {
            Mode::ShortRepeat => expand_short_repeat(bs, run.pos as usize, dst),
            Mode::Direct => expand_direct(bs, run.pos as usize, dst),
            Mode::PatchedBase => expand_patched_base(bs, run.pos as usize, dst),
            Mode::Delta => expand_delta(bs, run.pos as usize, dst, steps),
        }
    }

    bs.flush_bytes(pos - start);
    bs.fill();
    DecodeBatch::new(numvals, exhausted)
}

fn expand_short_repeat<T: RleInt>(bs: &ByteStream<'_>, pos: usize, dst: &mut [T]) {
    let width_bytes = ((bs.read_byte(pos) >> 3) & 7) as u32 + 1;
    let v = T::from_stream(bs.read_bits64_be((pos + 1) * 8, width_bytes * 8));
    dst.fill(v);
}

fn expand_direct<T: RleInt>(bs: &ByteStream<'_>, pos: usize, dst: &mut [T]) {
    let w = data_width(bs.read_byte(pos));
    let bitpos = (pos + 2) * 8;
    for (i, v) in dst.iter_mut().enumerate() {
        *v = T::from_stream(bs.read_bits64_be(bitpos + i * w as usize, w));
    }
}

fn expand_patched_base<T: RleInt>(bs: &ByteStream<'_>, pos: usize, dst: &mut [T]) {
    let w = data_width(bs.read_byte(pos));
    let patch = PatchHeader::read(bs, pos);
    let Some(entry_width) = patch.entry_width() else {
        return;
    };
    let n = dst.len();

    let base_bits = patch.base_bytes as u32 * 8;
    let raw_base = bs.read_bits64_be((pos + 4) * 8, base_bits);
    let sign = 1u64 << (base_bits - 1);
    let base = if raw_base & sign != 0 {
        (raw_base & (sign - 1)).wrapping_neg()
    } else {
        raw_base
    };

    let data_pos = pos + 4 + patch.base_bytes;
    for (i, v) in dst.iter_mut().enumerate() {
        *v = T::from_bits(bs.read_bits64_be(data_pos * 8 + i * w as usize, w));
    }

    // Gaps are prefix summed into absolute positions within the run
    let list_pos = (data_pos + packed_bytes(w, n)) * 8;
    let patch_mask = if patch.patch_width >= 64 {
        u64::MAX
    } else {
        (1u64 << patch.patch_width) - 1
    };
    let mut offset = 0usize;
    for j in 0..patch.list_len {
        let entry = bs.read_bits64_be(list_pos + j * entry_width as usize, entry_width);
        offset += (entry >> patch.patch_width) as usize;
        let value = entry & patch_mask;
        if offset < n && w < 64 {
            let slot = &mut dst[offset];
            *slot = T::from_bits(slot.to_bits() | (value << w));
        }
    }

    for v in dst.iter_mut() {
        *v = T::from_bits(v.to_bits().wrapping_add(base));
    }
}

fn expand_delta<T: RleInt>(bs: &ByteStream<'_>, pos: usize, dst: &mut [T], steps: &mut Vec<u64>) {
    let w = delta_width(bs.read_byte(pos));
    let n = dst.len();
    let (base, base_len) = bs.decode_varint::<T>(pos + 2);
    let (delta, delta_len) = bs.decode_varint::<i64>(pos + 2 + base_len);
    let bitpos = (pos + 2 + base_len + delta_len) * 8;

    steps.clear();
    steps.resize(n, 0);
    if n > 1 {
        steps[1] = delta as u64;
    }
    for (i, step) in steps.iter_mut().enumerate().skip(2) {
        *step = if w == 0 {
            delta as u64
        } else {
            let magnitude = bs.read_bits64_be(bitpos + (i - 2) * w as usize, w);
            if delta < 0 {
                magnitude.wrapping_neg()
            } else {
                magnitude
            }
        };
    }
    inclusive_scan(steps.as_mut_slice(), u64::wrapping_add);

    for (v, s) in dst.iter_mut().zip(steps.iter()) {
        *v = T::from_bits(base.to_bits().wrapping_add(*s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::zigzag_decode;
    use crate::util::test_common::encoder::{
        to_stream, write_delta, write_direct, write_patched_base, write_short_repeat,
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn decode_all<T: RleInt>(bytes: &[u8], batch: usize) -> Vec<T> {
        let mut bs = ByteStream::new(bytes);
        let mut runs = RleV2Runs::new();
        let mut vals = vec![T::default(); batch];
        let mut result = vec![];
        loop {
            let b = decode(&mut bs, &mut runs, &mut vals, batch);
            result.extend_from_slice(&vals[..b.count]);
            if b.count == 0 {
                assert!(b.exhausted);
                break;
            }
        }
        result
    }

    #[test]
    fn test_short_repeat() {
        // ORC format documentation example: 10000 repeated 5 times
        let bytes = [0x0a, 0x27, 0x10];
        assert_eq!(decode_all::<u32>(&bytes, 64), vec![10000; 5]);

        for width_bytes in 1..=8u32 {
            for count in 3..=10 {
                let max = if width_bytes == 8 {
                    i64::MAX
                } else {
                    (1i64 << (width_bytes * 8 - 1)) - 1
                };
                for v in [-max - 1, -1, 0, max] {
                    let mut bytes = vec![];
                    write_short_repeat(&mut bytes, to_stream(v), count);
                    assert_eq!(decode_all::<i64>(&bytes, 64), vec![v; count]);
                }
                let v = u64::MAX >> (64 - width_bytes * 8);
                let mut bytes = vec![];
                write_short_repeat(&mut bytes, v, count);
                assert_eq!(decode_all::<u64>(&bytes, 64), vec![v; count]);
            }
        }
    }

    #[test]
    fn test_direct() {
        // ORC format documentation example
        let bytes = [0x5e, 0x03, 0x5c, 0xa1, 0xab, 0x1e, 0xde, 0xad, 0xbe, 0xef];
        assert_eq!(
            decode_all::<u32>(&bytes, 64),
            vec![23713, 43806, 57005, 48879]
        );

        let mut rng = StdRng::seed_from_u64(5);
        for w in RLE_V2_WIDTHS {
            for count in [1, 2, 7, 64, 511, 512] {
                let mask = if w == 64 { u64::MAX } else { (1u64 << w) - 1 };
                let values: Vec<u64> = (0..count).map(|_| rng.random::<u64>() & mask).collect();
                let mut bytes = vec![];
                write_direct(&mut bytes, &values, w);
                assert_eq!(decode_all::<u64>(&bytes, 1024), values, "width {w}");

                let signed: Vec<i64> = values.iter().map(|v| zigzag_decode(*v)).collect();
                assert_eq!(decode_all::<i64>(&bytes, 1024), signed, "width {w}");
            }
        }
    }

    #[test]
    fn test_delta() {
        // ORC format documentation example: primes 2..29
        let bytes = [0xc6, 0x09, 0x02, 0x02, 0x22, 0x42, 0x42, 0x46];
        assert_eq!(
            decode_all::<u32>(&bytes, 64),
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
        );

        // fixed zero delta
        let mut bytes = vec![];
        write_delta(&mut bytes, to_stream(-7i32), 0, 0, &[], 20);
        assert_eq!(decode_all::<i32>(&bytes, 64), vec![-7; 20]);

        // fixed negative delta
        let mut bytes = vec![];
        write_delta(&mut bytes, to_stream(100i32), -3, 0, &[], 6);
        assert_eq!(decode_all::<i32>(&bytes, 64), vec![100, 97, 94, 91, 88, 85]);

        // descending with varying steps
        let mut bytes = vec![];
        write_delta(&mut bytes, to_stream(1000i64), -5, 4, &[1, 15, 0, 7], 6);
        assert_eq!(
            decode_all::<i64>(&bytes, 64),
            vec![1000, 995, 994, 979, 979, 972]
        );

        // two values only
        let mut bytes = vec![];
        write_delta(&mut bytes, 9, 4, 2, &[], 2);
        assert_eq!(decode_all::<u32>(&bytes, 64), vec![9, 13]);

        // single value
        let mut bytes = vec![];
        write_delta(&mut bytes, 9, 0, 0, &[], 1);
        assert_eq!(decode_all::<u64>(&bytes, 64), vec![9]);
    }

    #[test]
    fn test_delta_random_monotonic() {
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..50 {
            let n = rng.random_range(3..=512);
            let w = RLE_V2_WIDTHS[rng.random_range(1..20)];
            let descending = rng.random_bool(0.5);
            let first = rng.random_range(1..1000i64);
            let magnitudes: Vec<u64> = (0..n - 2).map(|_| rng.random_range(0..(1u64 << w.min(16)))).collect();
            let delta = if descending { -first } else { first };
            let base = rng.random_range(-1_000_000i64..1_000_000);

            let mut expected = vec![base, base + delta];
            for m in &magnitudes {
                let last = *expected.last().unwrap();
                expected.push(if descending { last - *m as i64 } else { last + *m as i64 });
            }

            let mut bytes = vec![];
            write_delta(&mut bytes, to_stream(base), delta, w, &magnitudes, n);
            assert_eq!(decode_all::<i64>(&bytes, 1024), expected);
        }
    }

    #[test]
    fn test_patched_base() {
        // ORC format documentation example
        let bytes = [
            0x8e, 0x13, 0x2b, 0x21, 0x07, 0xd0, 0x1e, 0x00, 0x14, 0x70, 0x28, 0x32, 0x3c, 0x46,
            0x50, 0x5a, 0x64, 0x6e, 0x78, 0x82, 0x8c, 0x96, 0xa0, 0xaa, 0xb4, 0xbe, 0xfc, 0xe8,
        ];
        assert_eq!(
            decode_all::<i64>(&bytes, 64),
            vec![
                2030, 2000, 2020, 1000000, 2040, 2050, 2060, 2070, 2080, 2090, 2100, 2110, 2120,
                2130, 2140, 2150, 2160, 2170, 2180, 2190
            ]
        );
    }

    #[test]
    fn test_patched_base_boundaries() {
        let n = 40;
        let w = 8;
        let offsets: Vec<u64> = (0..n as u64).map(|i| (i * 37) & 0xff).collect();
        let base = -5000i64;
        // patches at the first slot, the midpoint and the last slot
        let patches = [(0u64, 0x3u64), (20, 0xabc), (19, 0x7ff)];
        let mut bytes = vec![];
        write_patched_base(&mut bytes, base, &offsets, w, 5, 12, &patches);

        let mut expected: Vec<i64> = offsets.iter().map(|o| base + *o as i64).collect();
        expected[0] += 0x3 << w;
        expected[20] += 0xabc << w;
        expected[39] += 0x7ff << w;
        assert_eq!(decode_all::<i64>(&bytes, 64), expected);
        let narrow: Vec<i32> = expected.iter().map(|v| *v as i32).collect();
        assert_eq!(decode_all::<i32>(&bytes, 64), narrow);
    }

    #[test]
    fn test_patched_base_rejects_wide_patch_entries() {
        // gap width 8 + patch width 64 cannot be read as one field
        let mut bytes = vec![0x8e, 0x01, 31, (7 << 5) | 1, 0x01];
        bytes.extend_from_slice(&[0; 16]);
        let mut bs = ByteStream::new(&bytes);
        let mut runs = RleV2Runs::new();
        let mut vals = vec![0i64; 64];
        let b = decode(&mut bs, &mut runs, &mut vals, 64);
        assert_eq!(b, DecodeBatch::new(0, true));
    }

    #[test]
    fn test_capacity_and_truncation() {
        let mut bytes = vec![];
        write_direct(&mut bytes, &(0..100).collect::<Vec<u64>>(), 8);
        write_short_repeat(&mut bytes, 42, 10);

        let mut bs = ByteStream::new(&bytes);
        let mut runs = RleV2Runs::new();
        let mut vals = vec![0u64; 200];
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 99),
            DecodeBatch::new(0, false)
        );
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 105),
            DecodeBatch::new(100, false)
        );
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 105),
            DecodeBatch::new(10, true)
        );

        // direct run cut short
        let truncated = &bytes[..50];
        let mut bs = ByteStream::new(truncated);
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 200),
            DecodeBatch::new(0, true)
        );
    }

    #[test]
    fn test_mixed_runs_across_windows() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut bytes = vec![];
        let mut expected: Vec<i64> = vec![];
        while bytes.len() < 4 * crate::encodings::byte_stream::BUFFER_SIZE {
            match rng.random_range(0..3) {
                0 => {
                    let v = rng.random_range(-100_000i64..100_000);
                    let count = rng.random_range(3..=10);
                    write_short_repeat(&mut bytes, to_stream(v), count);
                    expected.extend(std::iter::repeat(v).take(count));
                }
                1 => {
                    let count = rng.random_range(1..=512);
                    let values: Vec<i64> = (0..count).map(|_| rng.random_range(-3000..3000)).collect();
                    let raws: Vec<u64> = values.iter().map(|v| to_stream(*v)).collect();
                    write_direct(&mut bytes, &raws, 14);
                    expected.extend(values);
                }
                _ => {
                    let count = rng.random_range(3..=512);
                    let base = rng.random_range(-100_000i64..100_000);
                    let magnitudes: Vec<u64> = (0..count - 2).map(|_| rng.random_range(0..200)).collect();
                    write_delta(&mut bytes, to_stream(base), 3, 8, &magnitudes, count);
                    let mut last = base + 3;
                    expected.push(base);
                    expected.push(last);
                    for m in magnitudes {
                        last += m as i64;
                        expected.push(last);
                    }
                }
            }
        }
        assert_eq!(decode_all::<i64>(&bytes, 4096), expected);
    }
}
