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

//! Canonical encoders for the stream encodings the decoders read.

use crate::encodings::{closest_fixed_bits, zigzag_encode, RleInt, RLE_V2_WIDTHS};

/// Appends `v` as a base-128 varint
pub fn write_varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Appends `v` as a zig-zag encoded varint
pub fn write_signed_varint(out: &mut Vec<u8>, v: i64) {
    write_varint(out, zigzag_encode(v))
}

/// Returns the integer a stream stores for `v`: zig-zag encoded when `T` is signed
pub fn to_stream<T: RleInt>(v: T) -> u64 {
    if T::SIGNED {
        let bits = v.to_bits() as i64;
        let raw = zigzag_encode(bits);
        if T::BITS == 32 {
            raw & u32::MAX as u64
        } else {
            raw
        }
    } else {
        v.to_bits()
    }
}

/// Appends `values` bit packed most significant bit first, padded to a byte
pub fn write_packed(out: &mut Vec<u8>, values: &[u64], width: u32) {
    let mut acc: u128 = 0;
    let mut bits = 0u32;
    for v in values {
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        acc = (acc << width) | (v & mask) as u128;
        bits += width;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
        acc &= (1u128 << bits) - 1;
    }
    if bits > 0 {
        out.push((acc << (8 - bits)) as u8);
    }
}

fn width_code(width: u32) -> u8 {
    RLE_V2_WIDTHS
        .iter()
        .position(|w| *w == width)
        .unwrap_or_else(|| panic!("{width} is not an RLE v2 width")) as u8
}

fn significant_bytes(v: u64) -> u32 {
    ((64 - v.leading_zeros()).div_ceil(8)).max(1)
}

/// Appends an RLE v2 short repeat run of `count` (3..=10) copies of the stream
/// integer `raw`
pub fn write_short_repeat(out: &mut Vec<u8>, raw: u64, count: usize) {
    assert!((3..=10).contains(&count));
    let bytes = significant_bytes(raw);
    out.push((((bytes - 1) << 3) as u8) | (count - 3) as u8);
    for i in (0..bytes).rev() {
        out.push((raw >> (8 * i)) as u8);
    }
}

fn write_header(out: &mut Vec<u8>, mode: u8, code: u8, count: usize) {
    assert!((1..=512).contains(&count));
    let n = count - 1;
    out.push((mode << 6) | (code << 1) | (n >> 8) as u8);
    out.push(n as u8);
}

/// Appends an RLE v2 direct run of the stream integers `raws`
pub fn write_direct(out: &mut Vec<u8>, raws: &[u64], width: u32) {
    write_header(out, 1, width_code(width), raws.len());
    write_packed(out, raws, width);
}

/// Appends an RLE v2 delta run of `count` values.
///
/// `width == 0` writes a fixed delta run, otherwise `magnitudes` holds the
/// `count - 2` unsigned step sizes that follow the first delta.
pub fn write_delta(
    out: &mut Vec<u8>,
    base_raw: u64,
    delta: i64,
    width: u32,
    magnitudes: &[u64],
    count: usize,
) {
    let code = if width == 0 { 0 } else { width_code(width) };
    write_header(out, 3, code, count);
    write_varint(out, base_raw);
    write_signed_varint(out, delta);
    if width > 0 && count > 2 {
        assert_eq!(magnitudes.len(), count - 2);
        write_packed(out, magnitudes, width);
    }
}

/// Appends an RLE v2 patched base run.
///
/// Values are `base + offsets[i]`, with `patches` holding `(gap, patch)`
/// pairs whose gaps sum to the patched positions and whose patch bits are
/// placed above the low `width` bits of the offset.
pub fn write_patched_base(
    out: &mut Vec<u8>,
    base: i64,
    offsets: &[u64],
    width: u32,
    gap_width: u32,
    patch_width: u32,
    patches: &[(u64, u64)],
) {
    assert!((1..=8).contains(&gap_width));
    assert!(patches.len() < 32);
    write_header(out, 2, width_code(width), offsets.len());

    let magnitude = base.unsigned_abs();
    let base_bytes = significant_bytes(magnitude << 1 | 1);
    out.push((((base_bytes - 1) << 5) as u8) | width_code(patch_width));
    out.push((((gap_width - 1) << 5) as u8) | patches.len() as u8);

    let sign = if base < 0 {
        1u64 << (base_bytes * 8 - 1)
    } else {
        0
    };
    let encoded_base = magnitude | sign;
    for i in (0..base_bytes).rev() {
        out.push((encoded_base >> (8 * i)) as u8);
    }

    write_packed(out, offsets, width);
    let entries: Vec<u64> = patches
        .iter()
        .map(|(gap, patch)| (gap << patch_width) | patch)
        .collect();
    write_packed(out, &entries, closest_fixed_bits(gap_width + patch_width));
}

/// Encodes `values` as RLE v2 direct runs of at most 512 values
pub fn encode_rle_v2_direct<T: RleInt>(values: &[T]) -> Vec<u8> {
    let mut out = vec![];
    for chunk in values.chunks(512) {
        let raws: Vec<u64> = chunk.iter().map(|v| to_stream(*v)).collect();
        let max = raws.iter().copied().max().unwrap_or(0);
        let width = closest_fixed_bits(64 - max.leading_zeros());
        write_direct(&mut out, &raws, width);
    }
    out
}

/// Encodes `values` with RLE v1, using repeat runs wherever three or more
/// values share a delta that fits in a byte.
pub fn encode_rle_v1<T: RleInt>(values: &[T]) -> Vec<u8> {
    let delta_at = |i: usize| values[i + 1].to_bits().wrapping_sub(values[i].to_bits()) as i64;
    let run_len = |i: usize| -> usize {
        if i + 2 >= values.len() {
            return 1;
        }
        let d = delta_at(i);
        if !(-128..=127).contains(&d) || delta_at(i + 1) != d {
            return 1;
        }
        let mut n = 3;
        while n < 130 && i + n < values.len() && delta_at(i + n - 1) == d {
            n += 1;
        }
        n
    };

    let mut out = vec![];
    let mut i = 0;
    while i < values.len() {
        let n = run_len(i);
        if n >= 3 {
            out.push((n - 3) as u8);
            out.push(delta_at(i) as i8 as u8);
            write_varint(&mut out, to_stream(values[i]));
            i += n;
            continue;
        }
        let mut end = i + 1;
        while end < values.len() && end - i < 128 && run_len(end) < 3 {
            end += 1;
        }
        out.push((0x100 - (end - i)) as u8);
        for v in &values[i..end] {
            write_varint(&mut out, to_stream(*v));
        }
        i = end;
    }
    out
}

/// Encodes `values` with byte RLE
pub fn encode_byte_rle(values: &[u8]) -> Vec<u8> {
    let run_len = |i: usize| -> usize {
        let mut n = 1;
        while n < 130 && i + n < values.len() && values[i + n] == values[i] {
            n += 1;
        }
        n
    };

    let mut out = vec![];
    let mut i = 0;
    while i < values.len() {
        let n = run_len(i);
        if n >= 3 {
            out.push((n - 3) as u8);
            out.push(values[i]);
            i += n;
            continue;
        }
        let mut end = i + 1;
        while end < values.len() && end - i < 128 && run_len(end) < 3 {
            end += 1;
        }
        out.push((0x100 - (end - i)) as u8);
        out.extend_from_slice(&values[i..end]);
        i = end;
    }
    out
}

/// Packs `bits` 8 to a byte, most significant bit first
pub fn pack_booleans(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|c| {
            c.iter()
                .enumerate()
                .fold(0u8, |acc, (i, b)| acc | ((*b as u8) << (7 - i)))
        })
        .collect()
}

/// Byte RLE encoded PRESENT stream for `valid`
pub fn encode_present(valid: &[bool]) -> Vec<u8> {
    encode_byte_rle(&pack_booleans(valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_packed() {
        let mut out = vec![];
        write_packed(&mut out, &[0b101, 0b011, 0b111], 3);
        assert_eq!(out, vec![0b1010_1111, 0b1000_0000]);
    }

    #[test]
    fn test_rle_v1_shapes() {
        let values: Vec<u32> = vec![7, 8, 9, 10, 1, 5];
        let bytes = encode_rle_v1(&values);
        assert_eq!(bytes, vec![0x01, 0x01, 0x07, 0xfe, 0x01, 0x05]);
    }

    #[test]
    fn test_patched_base_matches_format_example() {
        let offsets: Vec<u64> = vec![
            30, 0, 20, 112, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150, 160, 170, 180,
            190,
        ];
        let mut out = vec![];
        write_patched_base(&mut out, 2000, &offsets, 8, 2, 12, &[(3, 3898)]);
        assert_eq!(
            out,
            vec![
                0x8e, 0x13, 0x2b, 0x21, 0x07, 0xd0, 0x1e, 0x00, 0x14, 0x70, 0x28, 0x32, 0x3c,
                0x46, 0x50, 0x5a, 0x64, 0x6e, 0x78, 0x82, 0x8c, 0x96, 0xa0, 0xaa, 0xb4, 0xbe,
                0xfc, 0xe8
            ]
        );
    }
}
