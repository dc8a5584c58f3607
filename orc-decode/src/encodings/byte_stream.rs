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

//! Circular staging window over one uncompressed ORC stream.
//!
//! Positions handed to the read methods are logical stream positions. Logical
//! position 0 is the 8-byte aligned address at or before the first stream byte,
//! so the first stream byte sits at [`ByteStream::pos`] right after `init`.
//! Only bytes of the window `[pos, pos + BUFFER_SIZE - 8)` are guaranteed to be
//! staged; reads elsewhere return whatever the buffer slot holds.

use crate::encodings::RleInt;
use crate::lanes::NTHREADS;

/// log2 of [`BUFFER_SIZE`]
pub const LOG2_BUFFER_SIZE: u32 = 13;

/// Capacity of the staging buffer in bytes
pub const BUFFER_SIZE: usize = 1 << LOG2_BUFFER_SIZE;

const WORDS: usize = BUFFER_SIZE >> 3;

// A full refill must be coverable by one word per lane
const _: () = assert!(WORDS <= NTHREADS);

/// Byte stream cursor with an 8 KiB circular staging buffer
pub struct ByteStream<'a> {
    /// Stream bytes, starting `lead` bytes after logical position 0
    data: &'a [u8],
    lead: usize,
    /// Logical read position
    pos: usize,
    /// Logical length, padded to a multiple of 8
    len: usize,
    fill_pos: usize,
    fill_count: usize,
    buf: Box<[u8; BUFFER_SIZE]>,
}

impl Default for ByteStream<'_> {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl std::fmt::Debug for ByteStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("lead", &self.lead)
            .field("pos", &self.pos)
            .field("len", &self.len)
            .field("end", &self.end())
            .finish()
    }
}

impl<'a> ByteStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut stream = Self {
            data: &[],
            lead: 0,
            pos: 0,
            len: 0,
            fill_pos: 0,
            fill_count: 0,
            buf: Box::new([0; BUFFER_SIZE]),
        };
        stream.init(data);
        stream
    }

    /// Points the stream at `data` and schedules the first fill
    pub fn init(&mut self, data: &'a [u8]) {
        let lead = if data.is_empty() {
            0
        } else {
            data.as_ptr() as usize & 7
        };
        self.data = data;
        self.lead = lead;
        self.pos = lead;
        self.len = (data.len() + lead + 7) & !7;
        self.fill_pos = 0;
        self.fill_count = self.len.min(BUFFER_SIZE) >> 3;
    }

    /// Logical read position
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Padded logical length
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical position one past the last stream byte
    #[inline]
    pub fn end(&self) -> usize {
        self.lead + self.data.len()
    }

    /// Bytes left between the read position and the end of the stream
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end().saturating_sub(self.pos)
    }

    /// Last logical position a decoder may scan up to before the staged window
    /// runs out.
    #[inline]
    pub fn max_scan_pos(&self) -> usize {
        self.end().min(self.pos + (BUFFER_SIZE - 8))
    }

    /// Copies the words scheduled by the last `init` or `flush_bytes` into the
    /// circular buffer, one word per lane.
    pub fn fill(&mut self) {
        let first = self.fill_pos >> 3;
        for t in 0..self.fill_count {
            let word = first + t;
            let slot = (word & (WORDS - 1)) << 3;
            let bytes = self.load_word(word);
            self.buf[slot..slot + 8].copy_from_slice(&bytes);
        }
        self.fill_count = 0;
    }

    /// Stages words `[pos / 8, pos / 8 + count)`.
    pub fn fill_words(&mut self, pos: usize, count: usize) {
        self.fill_pos = pos & !7;
        self.fill_count = count.min(WORDS);
        self.fill();
    }

    /// Reads word `index` from the stream. Bytes outside the stream read as 0.
    fn load_word(&self, index: usize) -> [u8; 8] {
        let mut word = [0u8; 8];
        let start = index << 3;
        for (i, b) in word.iter_mut().enumerate() {
            let logical = start + i;
            if logical >= self.lead {
                if let Some(v) = self.data.get(logical - self.lead) {
                    *b = *v;
                }
            }
        }
        word
    }

    /// Advances the read position by `consumed` bytes and schedules the refill
    /// that keeps the window full. Returns the number of words to refill.
    pub fn flush_bytes(&mut self, consumed: usize) -> usize {
        let pos = self.pos;
        let pos_new = (pos + consumed).min(self.len);
        self.pos = pos_new;
        let fill_from = (pos + BUFFER_SIZE).min(self.len);
        let fill_to = (pos_new + BUFFER_SIZE).min(self.len);
        self.fill_pos = fill_from;
        self.fill_count = (fill_to >> 3) - (fill_from >> 3);
        self.fill_count
    }

    #[inline]
    pub fn read_byte(&self, pos: usize) -> u8 {
        self.buf[pos & (BUFFER_SIZE - 1)]
    }

    /// Little endian u32 at `pos`, reassembled across the wrap boundary
    #[inline]
    pub fn read_u32(&self, pos: usize) -> u32 {
        u32::from_le_bytes(std::array::from_fn(|i| self.read_byte(pos + i)))
    }

    /// Little endian u64 at `pos`, reassembled across the wrap boundary
    #[inline]
    pub fn read_u64(&self, pos: usize) -> u64 {
        u64::from_le_bytes(std::array::from_fn(|i| self.read_byte(pos + i)))
    }

    /// Big endian bit field of `width <= 32` bits starting at bit `bitpos`
    #[inline]
    pub fn read_bits_be(&self, bitpos: usize, width: u32) -> u32 {
        debug_assert!(width <= 32);
        self.read_bits64_be(bitpos, width.min(32)) as u32
    }

    /// Big endian bit field of `width <= 64` bits starting at bit `bitpos`
    pub fn read_bits64_be(&self, bitpos: usize, width: u32) -> u64 {
        debug_assert!(width <= 64);
        if width == 0 {
            return 0;
        }
        let width = width.min(64);
        let byte = bitpos >> 3;
        let shift = (bitpos & 7) as u32;
        // 72 bits cover any 64-bit field at any bit offset within the first byte
        let mut acc: u128 = 0;
        for i in 0..9 {
            acc = (acc << 8) | self.read_byte(byte + i) as u128;
        }
        let field = acc >> (72 - shift - width);
        let mask = (1u128 << width) - 1;
        (field & mask) as u64
    }

    /// Length in bytes of the base-128 varint at `pos`, capped to the longest
    /// varint `T` accepts.
    pub fn varint_length<T: RleInt>(&self, pos: usize) -> usize {
        if self.read_byte(pos) <= 0x7f {
            return 1;
        }
        // Locate the first byte without the continuation bit, four bytes at a time
        let mut len = 0;
        while len < T::MAX_VARINT_LEN {
            let next = self.read_u32(pos + len);
            let stop = !next & 0x8080_8080;
            if stop != 0 {
                let found = len + (stop.trailing_zeros() as usize >> 3) + 1;
                return found.min(T::MAX_VARINT_LEN);
            }
            len += 4;
        }
        T::MAX_VARINT_LEN
    }

    /// Decodes the varint at `pos`, returning the value and its length in bytes.
    /// Signed element types are zig-zag decoded.
    pub fn decode_varint<T: RleInt>(&self, pos: usize) -> (T, usize) {
        let len = self.varint_length::<T>(pos);
        let mut raw = 0u64;
        for i in 0..len {
            let b = (self.read_byte(pos + i) & 0x7f) as u64;
            let shift = 7 * i as u32;
            if shift < 64 {
                raw |= b << shift;
            }
        }
        (T::from_stream(raw), len)
    }
}
