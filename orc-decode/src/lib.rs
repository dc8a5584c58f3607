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

//! Lane-parallel decoding of [Apache ORC] stripe streams into typed column
//! buffers.
//!
//! The input is a set of [`ColumnChunk`]s, one per column per stripe, each
//! holding the uncompressed bytes of its streams. Decoding runs in two phases:
//!
//! 1. [`decode_nulls_and_dictionaries`] expands PRESENT streams into validity
//!    bitmaps and builds string dictionaries,
//! 2. [`decode_column_data`] decodes the values into the output buffers.
//!
//! Within a chunk, decoders scan runs on a single lane and expand them on a
//! group of [`NTHREADS`](lanes::NTHREADS) lanes. Chunks are spread over the
//! rayon thread pool.
//!
//! ```
//! use arrow_array::Array;
//! use orc_decode::{
//!     decode_stripes, ColumnChunk, ColumnEncoding, DecodeOptions, OutputColumn, StreamKind,
//!     TypeKind,
//! };
//!
//! // INT column, RLE v2 direct run of 10, 20, 30, 40, 50
//! let data = [0x4e, 0x04, 0x14, 0x28, 0x3c, 0x50, 0x64];
//! let options = DecodeOptions::default();
//! let mut column = OutputColumn::new(TypeKind::Int, 5, true);
//! let (validity, mut outputs) = column.chunk_outputs(&[(0, 5)], &options).unwrap();
//! let mut chunks = vec![ColumnChunk::new(TypeKind::Int, ColumnEncoding::DirectV2, 0, 5)
//!     .with_stream(StreamKind::Data, &data)
//!     .with_validity(validity.unwrap())
//!     .with_output(outputs.remove(0))];
//! decode_stripes(&mut chunks, &mut [], &options).unwrap();
//! drop(chunks);
//!
//! let array = column.into_array(TypeKind::Int).unwrap();
//! assert_eq!(array.len(), 5);
//! ```
//!
//! [Apache ORC]: https://orc.apache.org/

#[macro_use]
pub mod errors;

pub mod arrow;
pub mod column;
pub mod decode;
pub mod encodings;
pub mod lanes;
pub mod properties;
pub mod util;

pub use column::{
    ChunkOutput, ColumnBuffer, ColumnChunk, ColumnDataMut, ColumnEncoding, DictionaryEntry,
    OutputColumn, StreamKind, TypeKind, ValidityBitmap,
};
pub use decode::{decode_column_data, decode_nulls_and_dictionaries, decode_stripes};
pub use properties::DecodeOptions;
