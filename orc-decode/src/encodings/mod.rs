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

//! Decoders for the ORC stream encodings.
//!
//! All decoders share the same batch contract: they are handed a
//! [`ByteStream`](byte_stream::ByteStream) and a maximum number of values, and
//! return a [`DecodeBatch`] describing how many values were produced. A short
//! batch is not an error; callers re-invoke for the remainder.

pub mod byte_rle;
pub mod byte_stream;
pub mod decimal;
pub mod rle_v1;
pub mod rle_v2;

use std::fmt::Debug;

/// Result of one decoder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeBatch {
    /// Number of values written to the front of the output
    pub count: usize,
    /// `true` when the stream cannot produce any further complete run, either
    /// because its bytes are used up or because the next run is malformed.
    /// `false` means the batch stopped on a capacity limit and a later call
    /// will make progress.
    pub exhausted: bool,
}

impl DecodeBatch {
    pub(crate) fn new(count: usize, exhausted: bool) -> Self {
        Self { count, exhausted }
    }
}

/// Bit widths addressed by the 5-bit width code of RLE v2 headers.
pub(crate) const RLE_V2_WIDTHS: [u32; 32] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 26,
    28, 30, 32, 40, 48, 56, 64,
];

/// Rounds `width` up to the next width representable by [`RLE_V2_WIDTHS`]
pub(crate) fn closest_fixed_bits(width: u32) -> u32 {
    match width {
        0 => 1,
        1..=24 => width,
        25..=26 => 26,
        27..=28 => 28,
        29..=30 => 30,
        31..=32 => 32,
        33..=40 => 40,
        41..=48 => 48,
        49..=56 => 56,
        _ => 64,
    }
}

/// Integer element types produced by the run-length decoders.
///
/// Run expansion is carried out on 64-bit two's complement bit patterns with
/// wrapping arithmetic and truncated to the element width on store, which gives
/// the same low bits as doing the arithmetic at the element width.
pub trait RleInt: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Width of the element in bits
    const BITS: u32;
    /// Whether values are zig-zag encoded in the stream
    const SIGNED: bool;
    /// Longest varint accepted for this element width
    const MAX_VARINT_LEN: usize;

    /// Truncates a 64-bit pattern to this type
    fn from_bits(v: u64) -> Self;

    /// Widens to a 64-bit pattern, sign extending signed types
    fn to_bits(self) -> u64;

    /// Interprets a raw stream integer, applying zig-zag decoding when signed
    #[inline]
    fn from_stream(raw: u64) -> Self {
        if Self::SIGNED {
            let raw = if Self::BITS == 32 {
                raw as u32 as u64
            } else {
                raw
            };
            Self::from_bits(zigzag_decode(raw) as u64)
        } else {
            Self::from_bits(raw)
        }
    }

    #[inline]
    fn wrapping_add(self, other: Self) -> Self {
        Self::from_bits(self.to_bits().wrapping_add(other.to_bits()))
    }
}

macro_rules! impl_rle_int {
    ($ty:ty, $signed:expr, $varint:expr) => {
        impl RleInt for $ty {
            const BITS: u32 = <$ty>::BITS;
            const SIGNED: bool = $signed;
            const MAX_VARINT_LEN: usize = $varint;

            #[inline]
            fn from_bits(v: u64) -> Self {
                v as $ty
            }

            #[inline]
            fn to_bits(self) -> u64 {
                self as u64
            }
        }
    };
}

impl_rle_int!(u32, false, 5);
impl_rle_int!(i32, true, 5);
impl_rle_int!(u64, false, 10);
impl_rle_int!(i64, true, 10);

/// `(u >> 1) ^ -(u & 1)`
#[inline]
pub fn zigzag_decode(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Inverse of [`zigzag_decode`]
#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}
