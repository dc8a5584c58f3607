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

//! Configuration via [`DecodeOptions`]

use std::ops::Range;

/// Default first output row
pub const DEFAULT_FIRST_ROW: usize = 0;
/// Default number of output rows: all of them
pub const DEFAULT_MAX_NUM_ROWS: usize = usize::MAX;
/// Default scheduling of column chunks
pub const DEFAULT_PARALLEL: bool = true;

/// Configuration of a decode invocation.
///
/// Use [`DecodeOptionsBuilder`] to assemble these options.
///
/// # Example
///
/// ```rust
/// use orc_decode::properties::DecodeOptions;
///
/// // Create options with default configuration.
/// let options = DecodeOptions::builder().build();
///
/// // Use properties builder to set a row window.
/// let options = DecodeOptions::builder()
///     .set_first_row(1000)
///     .set_max_num_rows(500)
///     .build();
/// assert_eq!(options.row_window(0, 10_000), 1000..1500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    first_row: usize,
    max_num_rows: usize,
    parallel: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DecodeOptions {
    /// Returns builder for decode options with default values.
    pub fn builder() -> DecodeOptionsBuilder {
        DecodeOptionsBuilder::with_defaults()
    }

    /// First row, counted across all stripes, that is materialized
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    /// Maximum number of rows materialized
    pub fn max_num_rows(&self) -> usize {
        self.max_num_rows
    }

    /// Whether column chunks are decoded on the rayon thread pool
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// End of the row window, exclusive
    pub fn end_row(&self) -> usize {
        self.first_row.saturating_add(self.max_num_rows)
    }

    /// Rows of the chunk `[start_row, start_row + num_rows)` that fall inside
    /// the row window. Chunks outside the window give an empty range at the
    /// nearest window edge.
    pub fn row_window(&self, start_row: usize, num_rows: usize) -> Range<usize> {
        let window_end = self.end_row();
        let lo = start_row.max(self.first_row).min(window_end);
        let hi = (start_row + num_rows).min(window_end).max(lo);
        lo..hi
    }

    /// [`Self::row_window`] in output row numbering, where output row 0 is
    /// `first_row`
    pub fn output_window(&self, start_row: usize, num_rows: usize) -> Range<usize> {
        let rows = self.row_window(start_row, num_rows);
        rows.start - self.first_row..rows.end - self.first_row
    }
}

/// Builder for [`DecodeOptions`]
#[derive(Debug, Clone)]
pub struct DecodeOptionsBuilder {
    first_row: Option<usize>,
    max_num_rows: Option<usize>,
    parallel: Option<bool>,
}

impl DecodeOptionsBuilder {
    /// Returns default state of the builder.
    fn with_defaults() -> Self {
        Self {
            first_row: None,
            max_num_rows: None,
            parallel: None,
        }
    }

    /// Finalizes the configuration and returns immutable decode options.
    pub fn build(self) -> DecodeOptions {
        DecodeOptions {
            first_row: self.first_row.unwrap_or(DEFAULT_FIRST_ROW),
            max_num_rows: self.max_num_rows.unwrap_or(DEFAULT_MAX_NUM_ROWS),
            parallel: self.parallel.unwrap_or(DEFAULT_PARALLEL),
        }
    }

    /// Sets the first materialized row. Rows before it are decoded only as far
    /// as needed to skip them.
    pub fn set_first_row(mut self, value: usize) -> Self {
        self.first_row = Some(value);
        self
    }

    /// Sets the maximum number of materialized rows.
    pub fn set_max_num_rows(mut self, value: usize) -> Self {
        self.max_num_rows = Some(value);
        self
    }

    /// Enable/disable decoding column chunks in parallel.
    ///
    /// Results are identical either way.
    pub fn set_parallel(mut self, value: bool) -> Self {
        self.parallel = Some(value);
        self
    }
}
