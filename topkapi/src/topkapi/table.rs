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

//! Dense `rows x width` table of buckets.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::hash::hash64;
use crate::topkapi::bucket::Bucket;
use crate::topkapi::sketch::LocalHeavyHitter;

/// Row-major grid of buckets. Row `i` places a key in column
/// `(h1 + i * h2) mod width`, where `h1` and `h2` are the halves of one
/// 64-bit hash of the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DenseTable {
    rows: usize,
    width: usize,
    buckets: Vec<Bucket>,
}

impl DenseTable {
    /// Allocates an empty table. Callers validate that `rows * width` fits.
    pub fn new(rows: usize, width: usize) -> Self {
        Self {
            rows,
            width,
            buckets: vec![Bucket::default(); rows * width],
        }
    }

    /// Rebuilds a table from its bucket array, as read back from bytes.
    pub fn from_buckets(rows: usize, width: usize, buckets: Vec<Bucket>) -> Self {
        debug_assert_eq!(buckets.len(), rows * width);
        Self {
            rows,
            width,
            buckets,
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    #[cfg(test)]
    pub fn bucket(&self, row: usize, column: usize) -> &Bucket {
        &self.buckets[row * self.width + column]
    }

    pub fn update(&mut self, key: &str, count: u64, seed: u64) {
        let (h1, h2) = split_hash(hash64(key.as_bytes(), seed));
        for row in 0..self.rows {
            let column = column_for(h1, h2, row, self.width);
            self.buckets[row * self.width + column].observe(key, count);
        }
    }

    /// Columns `key` maps to, one per row.
    #[cfg(test)]
    pub fn columns(&self, key: &str, seed: u64) -> impl Iterator<Item = usize> + use<> {
        let (h1, h2) = split_hash(hash64(key.as_bytes(), seed));
        let width = self.width;
        (0..self.rows).map(move |row| column_for(h1, h2, row, width))
    }

    /// Collects the resident keys of every bucket whose volume reaches
    /// `threshold`, each reported with the smallest such volume across rows.
    ///
    /// The output is in first-seen (row-major) order and unsorted.
    pub fn heavy_hitters(&self, threshold: u64) -> Vec<LocalHeavyHitter> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut hitters: Vec<LocalHeavyHitter> = Vec::new();
        for bucket in &self.buckets {
            if bucket.hits < threshold {
                continue;
            }
            let Some(key) = bucket.resident.as_deref() else {
                continue;
            };
            match seen.entry(key) {
                Entry::Occupied(entry) => {
                    let hitter = &mut hitters[*entry.get()];
                    hitter.count = hitter.count.min(bucket.hits);
                }
                Entry::Vacant(entry) => {
                    entry.insert(hitters.len());
                    hitters.push(LocalHeavyHitter {
                        key: key.to_owned(),
                        count: bucket.hits,
                    });
                }
            }
        }
        hitters
    }

    /// Number of distinct resident keys.
    pub fn num_residents(&self) -> usize {
        let mut keys: Vec<&str> = self
            .buckets
            .iter()
            .filter_map(|bucket| bucket.resident.as_deref())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.resident.is_none())
    }

    /// Cell-wise merge; `other` must have the same shape.
    pub fn merge(&mut self, other: &DenseTable) {
        debug_assert_eq!((self.rows, self.width), (other.rows, other.width));
        for (ours, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            ours.merge(theirs);
        }
    }
}

#[inline]
fn split_hash(hash: u64) -> (u32, u32) {
    (hash as u32, (hash >> 32) as u32)
}

/// Enhanced double hashing over 32-bit halves; the sum wraps at 32 bits.
#[inline]
fn column_for(h1: u32, h2: u32, row: usize, width: usize) -> usize {
    let h = h1.wrapping_add((row as u32).wrapping_mul(h2));
    (u64::from(h) % width as u64) as usize
}
