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

//! Lock-step lane model used by the decode phases.
//!
//! A column chunk is processed by one lane group of [`NTHREADS`] logical lanes,
//! organised as [`NUM_WARPS`] sub-groups of [`WARP_SIZE`] lanes. On the CPU a
//! phase is a loop over every lane of the group, and the end of that loop is the
//! barrier: no lane observes values written by another lane in the same phase.
//!
//! Sub-group collectives ([`SubGroup`]) read every lane's register before any
//! lane's register is written, which is how SIMD shuffles behave.

use std::ops::Add;

/// Lanes per sub-group
pub const WARP_SIZE: usize = 32;

/// Sub-groups per lane group
pub const NUM_WARPS: usize = 32;

/// Lanes per lane group
pub const NTHREADS: usize = WARP_SIZE * NUM_WARPS;

/// Register file of one sub-group of `N` lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubGroup<T, const N: usize = WARP_SIZE> {
    regs: [T; N],
}

impl<T: Copy + Default, const N: usize> Default for SubGroup<T, N> {
    fn default() -> Self {
        Self {
            regs: [T::default(); N],
        }
    }
}

impl<T: Copy + Default, const N: usize> SubGroup<T, N> {
    /// Creates a sub-group where lane `i` holds `f(i)`
    pub fn from_fn(f: impl FnMut(usize) -> T) -> Self {
        Self {
            regs: std::array::from_fn(f),
        }
    }

    /// Loads up to `N` lanes from `src`, remaining lanes get `T::default()`
    pub fn load(src: &[T]) -> Self {
        Self::from_fn(|i| src.get(i).copied().unwrap_or_default())
    }

    /// Writes the first `dst.len().min(N)` lanes to `dst`
    pub fn store(&self, dst: &mut [T]) {
        let n = dst.len().min(N);
        dst[..n].copy_from_slice(&self.regs[..n]);
    }

    #[inline]
    pub fn lane(&self, i: usize) -> T {
        self.regs[i]
    }

    pub fn lanes(&self) -> &[T; N] {
        &self.regs
    }

    /// Value of `src_lane` as seen by every lane
    #[inline]
    pub fn broadcast(&self, src_lane: usize) -> T {
        self.regs[src_lane % N]
    }

    /// Each lane receives the register of lane `i - delta`; lanes below `delta`
    /// keep their own value.
    pub fn shuffle_up(&self, delta: usize) -> Self {
        Self::from_fn(|i| {
            if i >= delta {
                self.regs[i - delta]
            } else {
                self.regs[i]
            }
        })
    }

    /// Each lane receives the register of lane `i ^ mask`
    pub fn shuffle_xor(&self, mask: usize) -> Self {
        Self::from_fn(|i| self.regs[(i ^ mask) % N])
    }

    /// Inclusive Hillis-Steele scan under `op`.
    pub fn inclusive_scan(&mut self, op: impl Fn(T, T) -> T) {
        let mut delta = 1;
        while delta < N {
            let shifted = self.shuffle_up(delta);
            for i in delta..N {
                self.regs[i] = op(shifted.regs[i], self.regs[i]);
            }
            delta <<= 1;
        }
    }
}

impl<T, const N: usize> SubGroup<T, N>
where
    T: Copy + Default + Add<Output = T>,
{
    /// Inclusive prefix sum across the sub-group
    pub fn inclusive_prefix_sum(&mut self) {
        self.inclusive_scan(|a, b| a + b)
    }

    /// Sum of all lanes, computed with an XOR butterfly so that every lane ends
    /// up holding the total.
    pub fn reduce_sum(&self) -> T {
        let mut acc = *self;
        let mut mask = N >> 1;
        while mask > 0 {
            let other = acc.shuffle_xor(mask);
            for i in 0..N {
                acc.regs[i] = acc.regs[i] + other.regs[i];
            }
            mask >>= 1;
        }
        acc.regs[0]
    }
}

/// Inclusive scan of `values` across a whole lane group.
///
/// Each sub-group scans its own lanes, the sub-group totals are scanned in turn
/// and the exclusive total of the preceding sub-groups is then added to every lane.
pub fn inclusive_scan<T>(values: &mut [T], op: impl Fn(T, T) -> T + Copy)
where
    T: Copy + Default,
{
    let mut carry: Option<T> = None;
    for chunk in values.chunks_mut(WARP_SIZE) {
        let mut group = SubGroup::<T, WARP_SIZE>::load(chunk);
        group.inclusive_scan(op);
        let total = group.lane(chunk.len() - 1);
        match carry {
            Some(c) => {
                for (dst, v) in chunk.iter_mut().zip(group.lanes()) {
                    *dst = op(c, *v);
                }
                carry = Some(op(c, total));
            }
            None => {
                group.store(chunk);
                carry = Some(total);
            }
        }
    }
}

/// Wrapping inclusive prefix sum of `values`, returning the total
pub fn inclusive_prefix_sum_u32(values: &mut [u32]) -> u32 {
    inclusive_scan(values, u32::wrapping_add);
    values.last().copied().unwrap_or(0)
}

/// Sums one counter per lane: sub-group reduction then a reduction over the
/// sub-group totals.
pub fn block_reduce_sum(per_lane: &[u32]) -> u32 {
    let totals: Vec<u32> = per_lane
        .chunks(WARP_SIZE)
        .map(|c| SubGroup::<u32, WARP_SIZE>::load(c).reduce_sum())
        .collect();
    totals
        .chunks(WARP_SIZE)
        .map(|c| SubGroup::<u32, WARP_SIZE>::load(c).reduce_sum())
        .sum()
}
