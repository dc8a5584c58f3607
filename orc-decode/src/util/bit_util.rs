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

//! Utils for working with the bit orders of ORC streams and validity bitmaps.
//!
//! ORC packs booleans most significant bit first, validity bitmaps are least
//! significant bit first.

/// Returns the ceil of `value`/`divisor`
#[inline]
pub fn ceil(value: usize, divisor: usize) -> usize {
    value.div_ceil(divisor)
}

/// Returns whether bit `i` of MSB-first packed `data` is set.
/// Bits past the end of `data` read as unset.
#[inline]
pub fn get_bit_msb(data: &[u8], i: usize) -> bool {
    data.get(i / 8).is_some_and(|b| b & (0x80 >> (i % 8)) != 0)
}

/// Returns a word whose low `bits` bits are set
#[inline]
pub fn low_mask32(bits: u32) -> u32 {
    match bits {
        0 => 0,
        32.. => u32::MAX,
        _ => (1 << bits) - 1,
    }
}

/// Reads 32 bits of MSB-first packed `data` starting at bit `offset` and
/// returns them least significant bit first, so that bit `k` of the result is
/// stream bit `offset + k`. Bits past the end of `data` read as unset.
pub fn read_bool32(data: &[u8], offset: usize) -> u32 {
    let first = offset / 8;
    let mut acc = 0u64;
    for i in 0..5 {
        let b = data.get(first + i).copied().unwrap_or(0);
        acc |= (b.reverse_bits() as u64) << (8 * i);
    }
    (acc >> (offset % 8)) as u32
}
