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

//! Dictionary construction for dictionary encoded string chunks.
//!
//! The LENGTH stream holds one unsigned length per dictionary entry. Entry
//! positions are the running sum of the preceding lengths within the chunk's
//! DICTIONARY_DATA stream.

use tracing::warn;

use crate::column::{ColumnChunk, DictionaryEntry, StreamKind};
use crate::decode::{decode_ints, LaneType, Workspace};
use crate::lanes::{inclusive_prefix_sum_u32, NTHREADS};

/// Fills `entries` with the chunk's `dict_len` dictionary entries
pub(crate) fn decode_dictionary<'a>(
    chunk: &ColumnChunk<'a, '_>,
    ws: &mut Workspace<'a>,
    entries: &mut [DictionaryEntry],
) {
    ws.bs2.init(chunk.stream(StreamKind::Secondary).unwrap_or(&[]));
    let rle_v1 = chunk.encoding().is_rle_v1();
    let Workspace {
        bs2,
        runs,
        scan,
        vals2,
        ..
    } = ws;
    let lengths = u32::lanes(vals2);

    let mut pos = 0u32;
    let mut done = 0;
    while done < entries.len() {
        let maxvals = (entries.len() - done).min(NTHREADS);
        let batch = decode_ints(bs2, runs, lengths, maxvals, rle_v1);
        if batch.count == 0 {
            warn!(
                start_row = chunk.start_row(),
                decoded = done,
                dict_len = entries.len(),
                "dictionary LENGTH stream ended early, remaining entries are empty"
            );
            entries[done..].fill(DictionaryEntry::new(pos, 0));
            break;
        }
        let n = batch.count;
        let ends = &mut scan[..n];
        ends.copy_from_slice(&lengths[..n]);
        let total = inclusive_prefix_sum_u32(ends);
        for ((entry, end), len) in entries[done..done + n].iter_mut().zip(&*ends).zip(&lengths[..n]) {
            *entry = DictionaryEntry::new(pos.wrapping_add(*end).wrapping_sub(*len), *len);
        }
        pos = pos.wrapping_add(total);
        done += n;
    }
}
