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

//! Row windows of the column data phase.
//!
//! Each iteration of the data loop covers a window of up to
//! [`MAX_WINDOW_ROWS`] rows. A row's offset is the 1-based index of its value
//! among the window's non-null rows, or 0 for a null row. Values are consumed
//! in order, so row `t` can be written once `row_ofs[t]` values are available.
//!
//! While values before the row window are being skipped, a window covers no
//! rows and only drains values.

use crate::decode::MAX_WINDOW_ROWS;
use crate::lanes::inclusive_prefix_sum_u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowWindow {
    /// Rows covered, 0 while skipping
    pub rows: usize,
    /// Values needed to complete the window
    pub need: usize,
}

impl RowWindow {
    /// Window that drains `skip_count` values ahead of the first row
    pub fn skip(skip_count: usize) -> Self {
        Self {
            rows: 0,
            need: skip_count.min(MAX_WINDOW_ROWS),
        }
    }

    pub fn is_skip(&self) -> bool {
        self.rows == 0 && self.need > 0
    }

    /// Computes the offsets of rows `[cur_row, min(end_row, cur_row + row_ofs.len()))`
    pub fn by_row(
        row_ofs: &mut [u32],
        cur_row: usize,
        end_row: usize,
        is_valid: impl Fn(usize) -> bool,
    ) -> Self {
        let rows = end_row
            .saturating_sub(cur_row)
            .min(MAX_WINDOW_ROWS)
            .min(row_ofs.len());
        let ofs = &mut row_ofs[..rows];
        for (t, o) in ofs.iter_mut().enumerate() {
            *o = is_valid(cur_row + t) as u32;
        }
        let need = inclusive_prefix_sum_u32(ofs);
        // a null row repeats the offset of the row before it
        for t in (0..rows).rev() {
            let prev = if t > 0 { ofs[t - 1] } else { 0 };
            if ofs[t] == prev {
                ofs[t] = 0;
            }
        }
        Self {
            rows,
            need: need as usize,
        }
    }

    /// Rows that can be written with `max_vals` values available, stopping
    /// at the first row whose value is missing
    pub fn rows_covered(&self, row_ofs: &[u32], max_vals: usize) -> usize {
        row_ofs[..self.rows]
            .iter()
            .position(|o| *o as usize > max_vals)
            .unwrap_or(self.rows)
    }
}
