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

//! DECIMAL DATA streams: one unbounded zig-zag varint per non-null value.

use crate::encodings::byte_stream::ByteStream;
use crate::encodings::DecodeBatch;

/// A 38 digit unscaled value needs 127 bits, 19 varint bytes
pub const MAX_DECIMAL_VARINT_LEN: usize = 19;

/// Varint start positions found by the scan
#[derive(Debug, Default)]
pub struct DecimalRuns {
    pos: Vec<u32>,
}

impl DecimalRuns {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decodes up to `maxvals` unscaled decimal values into the front of `vals`.
///
/// Values wider than 64 bits keep their low 64 bits.
pub fn decode(
    bs: &mut ByteStream<'_>,
    runs: &mut DecimalRuns,
    vals: &mut [i64],
    maxvals: usize,
) -> DecodeBatch {
    let maxvals = maxvals.min(vals.len());
    bs.fill();
    runs.pos.clear();

    let start = bs.pos();
    let end = bs.end();
    let maxpos = bs.max_scan_pos();
    let mut pos = start;
    let mut exhausted = false;
    while runs.pos.len() < maxvals {
        if pos >= maxpos {
            exhausted = pos >= end;
            break;
        }
        let mut p = pos;
        while p < maxpos && p - pos < MAX_DECIMAL_VARINT_LEN && bs.read_byte(p) & 0x80 != 0 {
            p += 1;
        }
        if p - pos == MAX_DECIMAL_VARINT_LEN {
            exhausted = true;
            break;
        }
        if p >= maxpos {
            exhausted = p >= end;
            break;
        }
        runs.pos.push(pos as u32);
        pos = p + 1;
    }

    for (v, p) in vals.iter_mut().zip(&runs.pos) {
        *v = decode_unbounded(bs, *p as usize);
    }

    bs.flush_bytes(pos - start);
    bs.fill();
    DecodeBatch::new(runs.pos.len(), exhausted)
}

fn decode_unbounded(bs: &ByteStream<'_>, pos: usize) -> i64 {
    let mut raw = 0u128;
    for i in 0..MAX_DECIMAL_VARINT_LEN {
        let b = bs.read_byte(pos + i);
        let shift = 7 * i as u32;
        if shift < 128 {
            raw |= ((b & 0x7f) as u128) << shift;
        }
        if b & 0x80 == 0 {
            break;
        }
    }
    let v = ((raw >> 1) as i128) ^ -((raw & 1) as i128);
    v as i64
}
