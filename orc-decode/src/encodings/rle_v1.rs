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

//! Integer run length encoding, version 1.
//!
//! ```text
//! encoded-data := <run>*
//! run          := <repeat-run> | <literal-run>
//! repeat-run   := control(0..=0x7f) delta(i8) base(varint)
//!                 control + 3 values: base, base + delta, base + 2 * delta, ...
//! literal-run  := control(0x80..=0xff) varint{256 - control}
//! ```

use crate::encodings::byte_stream::ByteStream;
use crate::encodings::{DecodeBatch, RleInt};
use crate::lanes::{NUM_WARPS, WARP_SIZE};

/// Repeat runs recorded per batch
pub const MAX_RUNS: usize = NUM_WARPS * 12;

const NO_LITERAL: u32 = u32::MAX;

/// A repeat run found by the scan
#[derive(Debug, Clone, Copy, Default)]
struct RepeatRun {
    /// Index of the first value of the run in the output
    out: u32,
    count: u32,
    delta: i8,
    /// Stream position of the base varint
    base_pos: u32,
}

/// Run table rebuilt by every [`decode`] call.
#[derive(Debug, Default)]
pub struct RleV1Runs {
    runs: Vec<RepeatRun>,
    /// Stream position of the varint for each literal output slot
    literal_pos: Vec<u32>,
}

impl RleV1Runs {
    pub fn new() -> Self {
        Self {
            runs: Vec::with_capacity(MAX_RUNS),
            literal_pos: Vec::new(),
        }
    }
}

/// Decodes up to `maxvals` values into the front of `vals`.
///
/// Stops early when the next run would not fit in `maxvals`, when the run
/// table is full or when the next run is not entirely staged in the window of
/// `bs`. The stream is advanced past every run that was decoded.
pub fn decode<T: RleInt>(
    bs: &mut ByteStream<'_>,
    runs: &mut RleV1Runs,
    vals: &mut [T],
    maxvals: usize,
) -> DecodeBatch {
    let maxvals = maxvals.min(vals.len());
    bs.fill();

    runs.runs.clear();
    runs.literal_pos.clear();
    runs.literal_pos.resize(maxvals, NO_LITERAL);

    // Single lane scan for run boundaries
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
        let control = bs.read_byte(pos);
        if control <= 0x7f {
            let n = control as usize + 3;
            if numvals + n > maxvals {
                break;
            }
            let run_end = pos + 2 + bs.varint_length::<T>(pos + 2);
            if run_end > maxpos {
                exhausted = run_end > end;
                break;
            }
            runs.runs.push(RepeatRun {
                out: numvals as u32,
                count: n as u32,
                delta: bs.read_byte(pos + 1) as i8,
                base_pos: (pos + 2) as u32,
            });
            pos = run_end;
            numvals += n;
        } else {
            let n = 0x100 - control as usize;
            if numvals + n > maxvals {
                break;
            }
            let mut p = pos + 1;
            let mut found = 0;
            while found < n && p < maxpos {
                runs.literal_pos[numvals + found] = p as u32;
                p += bs.varint_length::<T>(p);
                found += 1;
            }
            if found < n || p > maxpos {
                runs.literal_pos[numvals..numvals + found].fill(NO_LITERAL);
                exhausted = p > end || (found < n && p >= end);
                break;
            }
            pos = p;
            numvals += n;
        }
    }

    // Repeat runs, one sub-group per run
    for run in &runs.runs {
        let (base, _) = bs.decode_varint::<T>(run.base_pos as usize);
        let delta = run.delta as i64 as u64;
        let out = run.out as usize;
        for chunk_start in (0..run.count as usize).step_by(WARP_SIZE) {
            let chunk_end = (chunk_start + WARP_SIZE).min(run.count as usize);
            for i in chunk_start..chunk_end {
                let v = base.to_bits().wrapping_add(delta.wrapping_mul(i as u64));
                vals[out + i] = T::from_bits(v);
            }
        }
    }

    // Literal slots, one lane per value
    for (t, p) in runs.literal_pos[..numvals].iter().enumerate() {
        if *p != NO_LITERAL {
            vals[t] = bs.decode_varint::<T>(*p as usize).0;
        }
    }

    bs.flush_bytes(pos - start);
    bs.fill();
    DecodeBatch::new(numvals, exhausted)
}
