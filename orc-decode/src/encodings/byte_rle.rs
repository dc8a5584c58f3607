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

//! Byte run length encoding, used by PRESENT streams and by the DATA streams
//! of BYTE and BOOLEAN columns. Booleans are packed 8 to a byte, most
//! significant bit first.
//!
//! ```text
//! run     := control(0..=0x7f) byte          control + 3 repeats of byte
//! literal := control(0x80..=0xff) byte{256 - control}
//! ```

use crate::encodings::byte_stream::ByteStream;
use crate::encodings::DecodeBatch;
use crate::lanes::NTHREADS;

/// Runs recorded per batch
pub const MAX_RUNS: usize = NTHREADS;

#[derive(Debug, Clone, Copy)]
struct Run {
    out: u32,
    count: u32,
    /// Position of the first payload byte
    pos: u32,
    repeat: bool,
}

/// Run table rebuilt by every [`decode`] call.
#[derive(Debug, Default)]
pub struct ByteRleRuns {
    runs: Vec<Run>,
}

impl ByteRleRuns {
    pub fn new() -> Self {
        Self {
            runs: Vec::with_capacity(MAX_RUNS),
        }
    }
}

/// Decodes up to `maxvals` bytes into the front of `vals`.
pub fn decode(
    bs: &mut ByteStream<'_>,
    runs: &mut ByteRleRuns,
    vals: &mut [u8],
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
        let control = bs.read_byte(pos);
        let (n, len, repeat) = if control <= 0x7f {
            (control as usize + 3, 2, true)
        } else {
            let n = 0x100 - control as usize;
            (n, 1 + n, false)
        };
        if numvals + n > maxvals {
            break;
        }
        if pos + len > maxpos {
            exhausted = pos + len > end;
            break;
        }
        runs.runs.push(Run {
            out: numvals as u32,
            count: n as u32,
            pos: (pos + 1) as u32,
            repeat,
        });
        pos += len;
        numvals += n;
    }

    for run in &runs.runs {
        let out = run.out as usize;
        let dst = &mut vals[out..out + run.count as usize];
        let src = run.pos as usize;
        if run.repeat {
            dst.fill(bs.read_byte(src));
        } else {
            for (i, v) in dst.iter_mut().enumerate() {
                *v = bs.read_byte(src + i);
            }
        }
    }

    bs.flush_bytes(pos - start);
    bs.fill();
    DecodeBatch::new(numvals, exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_common::encoder::{encode_byte_rle, pack_booleans};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn decode_all(bytes: &[u8], batch: usize) -> Vec<u8> {
        let mut bs = ByteStream::new(bytes);
        let mut runs = ByteRleRuns::new();
        let mut vals = vec![0; batch];
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
    fn test_run_and_literal() {
        // 100 zeros, then the literals 0x44 0x45
        let bytes = [0x61, 0x00, 0xfe, 0x44, 0x45];
        let mut expected = vec![0u8; 100];
        expected.extend_from_slice(&[0x44, 0x45]);
        assert_eq!(decode_all(&bytes, 1024), expected);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut values = vec![];
        while values.len() < 50_000 {
            if rng.random_bool(0.4) {
                let v: u8 = rng.random();
                let n = rng.random_range(1..300);
                values.extend(std::iter::repeat(v).take(n));
            } else {
                let n = rng.random_range(1..300);
                values.extend((0..n).map(|_| rng.random::<u8>()));
            }
        }
        let bytes = encode_byte_rle(&values);
        assert_eq!(decode_all(&bytes, 4096), values);
        assert_eq!(decode_all(&bytes, 131), values);
    }

    #[test]
    fn test_boolean_boundaries() {
        for rows in [8usize, 9, 64] {
            let bits: Vec<bool> = (0..rows).map(|i| i % 3 != 1).collect();
            let bytes = encode_byte_rle(&pack_booleans(&bits));
            let decoded = decode_all(&bytes, 1024);
            assert_eq!(decoded.len(), rows.div_ceil(8));
            let unpacked: Vec<bool> = (0..rows)
                .map(|i| decoded[i / 8] & (0x80 >> (i % 8)) != 0)
                .collect();
            assert_eq!(unpacked, bits);
        }
    }

    #[test]
    fn test_truncated_literal() {
        let bytes = [0xf0, 1, 2, 3];
        let mut bs = ByteStream::new(&bytes);
        let mut runs = ByteRleRuns::new();
        let mut vals = vec![0; 64];
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 64),
            DecodeBatch::new(0, true)
        );
    }

    #[test]
    fn test_run_larger_than_request() {
        // a 10 byte run cannot be split across batches
        let bytes = [0x07, 0xff];
        let mut bs = ByteStream::new(&bytes);
        let mut runs = ByteRleRuns::new();
        let mut vals = vec![0; 64];
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 4),
            DecodeBatch::new(0, false)
        );
        assert_eq!(
            decode(&mut bs, &mut runs, &mut vals, 64),
            DecodeBatch::new(10, true)
        );
        assert_eq!(&vals[..10], &[0xff; 10]);
    }
}
