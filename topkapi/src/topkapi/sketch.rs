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

//! Topkapi sketch implementation.

use std::collections::BTreeMap;

use log::debug;
use log::trace;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_preamble_longs_is;
use crate::codec::assert::ensure_remaining;
use crate::codec::assert::ensure_serial_version_is;
use crate::codec::assert::insufficient_data;
use crate::codec::family::Family;
use crate::error::Error;
use crate::hash::DEFAULT_SEED;
use crate::topkapi::bucket::Bucket;
use crate::topkapi::params::Dimensions;
use crate::topkapi::params::TOP_K_MARGIN;
use crate::topkapi::params::delta_of;
use crate::topkapi::params::epsilon_of;
use crate::topkapi::serde::read_key;
use crate::topkapi::serde::read_resident;
use crate::topkapi::serde::write_key;
use crate::topkapi::serde::write_resident;
use crate::topkapi::serialization::*;
use crate::topkapi::table::DenseTable;

/// Result row of a heavy-hitter query: a key and its estimated count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeavyHitter {
    pub(super) key: String,
    pub(super) count: u64,
}

impl LocalHeavyHitter {
    /// Returns the key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the estimated count.
    ///
    /// Exact while the sketch is in overlay mode; afterwards the smallest
    /// per-row volume among the rows where the key is resident.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Splits the row into key and count.
    pub fn into_parts(self) -> (String, u64) {
        (self.key, self.count)
    }
}

/// Either exact per-key counts or the dense table; never both.
///
/// The only transition is overlay to dense.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Counters {
    Overlay(BTreeMap<String, u64>),
    Dense(DenseTable),
}

/// Heavy-hitter sketch over string keys.
///
/// Use [`TopkapiSketchBuilder`] for configuration beyond the two shorthand
/// constructors. See [`crate::topkapi`] for an overview and accuracy notes.
///
/// The sketch has no internal synchronization. Shard ingestion by building one
/// sketch per thread with the same dimensions and seed, then [`merge`](Self::merge)
/// them on a single thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopkapiSketch {
    rows: usize,
    width: usize,
    seed: u64,
    total_weight: u64,
    counters: Counters,
}

impl TopkapiSketch {
    /// Creates a sketch whose estimates are within a factor `epsilon` of the
    /// true count with probability `1 - delta`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// unless both `delta` and `epsilon` lie in the open interval (0, 1).
    ///
    /// # Examples
    ///
    /// ```
    /// # use topkapi::topkapi::TopkapiSketch;
    /// let sketch = TopkapiSketch::new(0.05, 0.01).unwrap();
    /// assert_eq!(sketch.width(), 100);
    /// assert_eq!(sketch.rows(), 4);
    /// ```
    pub fn new(delta: f64, epsilon: f64) -> Result<Self, Error> {
        TopkapiSketchBuilder::with_accuracy(delta, epsilon).build()
    }

    /// Creates a sketch sized to find the top `k` keys in a corpus of roughly
    /// `approx_corpus_size` events, failing with probability `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `k` is zero, `delta` is outside (0, 1), or the corpus is too small to
    /// size a sketch from.
    pub fn with_top_k(k: u64, approx_corpus_size: u64, delta: f64) -> Result<Self, Error> {
        TopkapiSketchBuilder::for_top_k(k, approx_corpus_size, delta).build()
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of buckets per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the hash seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the sum of all counts passed to the sketch, including merged ones.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns the nominal error bound, `1 / width`.
    pub fn epsilon(&self) -> f64 {
        epsilon_of(self.width)
    }

    /// Returns the nominal failure probability, `2 / e^rows`.
    pub fn delta(&self) -> f64 {
        delta_of(self.rows)
    }

    /// Returns true while keys are still counted exactly.
    pub fn is_sparse(&self) -> bool {
        matches!(self.counters, Counters::Overlay(_))
    }

    /// Returns true if no key was ever inserted.
    pub fn is_empty(&self) -> bool {
        match &self.counters {
            Counters::Overlay(entries) => entries.is_empty(),
            Counters::Dense(table) => table.is_empty(),
        }
    }

    /// Returns the number of distinct keys currently tracked: every key while
    /// sparse, the distinct bucket residents once dense.
    pub fn num_tracked_keys(&self) -> usize {
        match &self.counters {
            Counters::Overlay(entries) => entries.len(),
            Counters::Dense(table) => table.num_residents(),
        }
    }

    /// Updates the sketch with a count of one.
    pub fn update(&mut self, key: &str) {
        self.update_with_count(key, 1);
    }

    /// Updates the sketch with a key and count.
    ///
    /// A zero count adds no volume but may still claim empty buckets.
    pub fn update_with_count(&mut self, key: &str, count: u64) {
        self.total_weight = self.total_weight.saturating_add(count);
        let promote = match &mut self.counters {
            Counters::Overlay(entries) => {
                match entries.get_mut(key) {
                    Some(total) => *total = total.saturating_add(count),
                    None => {
                        entries.insert(key.to_owned(), count);
                    }
                }
                entries.len() >= self.width
            }
            Counters::Dense(table) => {
                table.update(key, count, self.seed);
                false
            }
        };
        if promote {
            self.promote();
        }
    }

    /// Returns the keys whose estimated count reaches `threshold`, sorted by
    /// count in descending order.
    ///
    /// While the sketch is sparse every tracked key is returned with its exact
    /// count and `threshold` is not applied.
    ///
    /// # Examples
    ///
    /// ```
    /// # use topkapi::topkapi::TopkapiSketch;
    /// let mut sketch = TopkapiSketch::new(0.05, 0.1).unwrap();
    /// for key in ["a", "a", "a", "b", "b", "c"] {
    ///     sketch.update(key);
    /// }
    /// let rows: Vec<_> = sketch
    ///     .heavy_hitters(1)
    ///     .into_iter()
    ///     .map(|row| row.into_parts())
    ///     .collect();
    /// assert_eq!(
    ///     rows,
    ///     vec![("a".to_string(), 3), ("b".to_string(), 2), ("c".to_string(), 1)]
    /// );
    /// ```
    pub fn heavy_hitters(&self, threshold: u64) -> Vec<LocalHeavyHitter> {
        let mut hitters = match &self.counters {
            Counters::Overlay(entries) => entries
                .iter()
                .map(|(key, count)| LocalHeavyHitter {
                    key: key.clone(),
                    count: *count,
                })
                .collect(),
            Counters::Dense(table) => table.heavy_hitters(threshold),
        };
        hitters.sort_by(|a, b| b.count.cmp(&a.count));
        hitters
    }

    /// Returns at most `k` of the heaviest keys.
    pub fn top_k(&self, k: usize) -> Vec<LocalHeavyHitter> {
        let mut hitters = self.heavy_hitters(1);
        hitters.truncate(k);
        hitters
    }

    /// Merges another sketch into this one.
    ///
    /// A sparse `other` is replayed key by key. Otherwise this sketch is made
    /// dense and the tables are combined cell by cell: equal residents pool
    /// their counters and volumes, different residents are resolved in favor
    /// of the larger eviction counter, whose cell is taken as is. Repeated
    /// merges are not known to preserve the accuracy bounds of a single sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketches`](crate::error::ErrorKind::IncompatibleSketches)
    /// if the sketches differ in rows, width or seed. This sketch is left
    /// unchanged in that case.
    pub fn merge(&mut self, other: &TopkapiSketch) -> Result<(), Error> {
        if self.rows != other.rows || self.width != other.width || self.seed != other.seed {
            debug!(
                "rejecting topkapi merge: {}x{} seed {} vs {}x{} seed {}",
                self.rows, self.width, self.seed, other.rows, other.width, other.seed
            );
            return Err(
                Error::incompatible_sketches("sketches must share rows, width and seed")
                    .with_context("rows", format!("{} vs {}", self.rows, other.rows))
                    .with_context("width", format!("{} vs {}", self.width, other.width))
                    .with_context("seed", format!("{} vs {}", self.seed, other.seed)),
            );
        }

        match &other.counters {
            Counters::Overlay(entries) => {
                trace!("replaying {} overlay entries into topkapi sketch", entries.len());
                for (key, count) in entries {
                    self.update_with_count(key, *count);
                }
                // replay already accounted for the volume of every entry
            }
            Counters::Dense(theirs) => {
                trace!("merging dense topkapi tables cell by cell");
                self.promote();
                if let Counters::Dense(ours) = &mut self.counters {
                    ours.merge(theirs);
                }
                self.total_weight = self.total_weight.saturating_add(other.total_weight);
            }
        }
        Ok(())
    }

    /// Serializes this sketch into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument) if a
    /// tracked key is longer than `u32::MAX - 1` bytes or the overlay holds more than
    /// `u32::MAX` keys; neither fits the length-prefixed layout.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size_hint());
        bytes.write_u8(PREAMBLE_LONGS);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::TOPKAPI.id);
        bytes.write_u8(if self.is_sparse() { OVERLAY_FLAG_MASK } else { 0 });
        // rows fit in a u32, checked at construction
        bytes.write_u32_le(self.rows as u32);
        bytes.write_u64_le(self.width as u64);
        bytes.write_u64_le(self.seed);
        bytes.write_u64_le(self.total_weight);

        match &self.counters {
            Counters::Overlay(entries) => {
                let len = u32::try_from(entries.len()).map_err(|_| {
                    Error::invalid_argument("overlay too large to serialize")
                        .with_context("entries", entries.len())
                })?;
                bytes.write_u32_le(len);
                for (key, count) in entries {
                    bytes.write_u64_le(*count);
                    write_key(&mut bytes, key)?;
                }
            }
            Counters::Dense(table) => {
                for bucket in table.buckets() {
                    bytes.write_u64_le(bucket.hits);
                }
                for bucket in table.buckets() {
                    bytes.write_i64_le(bucket.counter);
                }
                for bucket in table.buckets() {
                    write_resident(&mut bytes, bucket.resident.as_deref())?;
                }
            }
        }
        Ok(bytes.into_bytes())
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`](crate::error::ErrorKind::InvalidData) if the
    /// bytes are truncated, belong to another sketch family or version, or
    /// describe an impossible sketch.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);
        let preamble_longs = cursor
            .read_u8()
            .map_err(insufficient_data("preamble_longs"))?;
        let serial_version = cursor
            .read_u8()
            .map_err(insufficient_data("serial_version"))?;
        let family_id = cursor.read_u8().map_err(insufficient_data("family_id"))?;
        Family::TOPKAPI.validate_id(family_id)?;
        ensure_serial_version_is(SERIAL_VERSION, serial_version)?;
        ensure_preamble_longs_is(PREAMBLE_LONGS, preamble_longs)?;

        let flags = cursor.read_u8().map_err(insufficient_data("flags"))?;
        let rows = cursor.read_u32_le().map_err(insufficient_data("rows"))?;
        let width = cursor.read_u64_le().map_err(insufficient_data("width"))?;
        let seed = cursor.read_u64_le().map_err(insufficient_data("seed"))?;
        let total_weight = cursor
            .read_u64_le()
            .map_err(insufficient_data("total_weight"))?;

        let width = usize::try_from(width)
            .map_err(|_| Error::deserial(format!("width {width} is not addressable")))?;
        let Dimensions { rows, width } = Dimensions::new(rows as usize, width)
            .map_err(|err| Error::deserial(err.message()))?;

        let counters = if flags & OVERLAY_FLAG_MASK != 0 {
            Counters::Overlay(read_overlay(&mut cursor, width)?)
        } else {
            Counters::Dense(read_table(&mut cursor, rows, width)?)
        };

        Ok(TopkapiSketch {
            rows,
            width,
            seed,
            total_weight,
            counters,
        })
    }

    /// Replaces the overlay with a dense table holding the same counts.
    /// Does nothing once dense.
    fn promote(&mut self) {
        let Counters::Overlay(entries) = &mut self.counters else {
            return;
        };
        debug!(
            "promoting topkapi overlay with {} keys to a {}x{} table",
            entries.len(),
            self.rows,
            self.width
        );
        let entries = std::mem::take(entries);
        let mut table = DenseTable::new(self.rows, self.width);
        for (key, count) in &entries {
            table.update(key, *count, self.seed);
        }
        self.counters = Counters::Dense(table);
    }

    fn serialized_size_hint(&self) -> usize {
        let preamble = PREAMBLE_LONGS as usize * 8;
        match &self.counters {
            Counters::Overlay(entries) => {
                preamble + 4 + entries.keys().map(|key| 12 + key.len()).sum::<usize>()
            }
            Counters::Dense(table) => {
                preamble
                    + table
                        .buckets()
                        .iter()
                        .map(|bucket| {
                            BUCKET_NUMERIC_BYTES + 4 + bucket.resident.as_ref().map_or(0, String::len)
                        })
                        .sum::<usize>()
            }
        }
    }
}

fn read_overlay(cursor: &mut SketchSlice<'_>, width: usize) -> Result<BTreeMap<String, u64>, Error> {
    let num_entries = cursor
        .read_u32_le()
        .map_err(insufficient_data("num_entries"))? as usize;
    if num_entries >= width {
        return Err(Error::deserial(format!(
            "overlay holds {num_entries} keys but must hold fewer than width {width}"
        )));
    }
    let mut entries = BTreeMap::new();
    for _ in 0..num_entries {
        let count = cursor.read_u64_le().map_err(insufficient_data("count"))?;
        let key = read_key(cursor)?;
        if entries.insert(key, count).is_some() {
            return Err(Error::deserial("duplicate key in overlay"));
        }
    }
    Ok(entries)
}

fn read_table(cursor: &mut SketchSlice<'_>, rows: usize, width: usize) -> Result<DenseTable, Error> {
    let num_buckets = rows * width;
    let numeric_bytes = num_buckets
        .checked_mul(BUCKET_NUMERIC_BYTES)
        .ok_or_else(|| Error::deserial("table size overflow"))?;
    ensure_remaining(cursor.remaining(), numeric_bytes, "table")?;

    let mut buckets = vec![Bucket::default(); num_buckets];
    for bucket in buckets.iter_mut() {
        bucket.hits = cursor.read_u64_le().map_err(insufficient_data("hits"))?;
    }
    for bucket in buckets.iter_mut() {
        bucket.counter = cursor
            .read_i64_le()
            .map_err(insufficient_data("counters"))?;
    }
    for bucket in buckets.iter_mut() {
        bucket.resident = read_resident(cursor)?;
    }
    Ok(DenseTable::from_buckets(rows, width, buckets))
}

/// Builder for [`TopkapiSketch`].
///
/// Pick how the sketch is sized with one of the constructors, then adjust the
/// remaining options:
///
/// ```
/// # use topkapi::topkapi::TopkapiSketchBuilder;
/// let sketch = TopkapiSketchBuilder::for_top_k(20, 1_000_000, 0.05)
///     .seed(42)
///     .build()
///     .unwrap();
/// assert_eq!(sketch.seed(), 42);
/// assert!(sketch.is_sparse());
/// ```
#[derive(Debug, Clone)]
pub struct TopkapiSketchBuilder {
    sizing: Sizing,
    seed: u64,
    top_k_margin: f64,
    sparse: bool,
}

#[derive(Debug, Clone, Copy)]
enum Sizing {
    Accuracy {
        delta: f64,
        epsilon: f64,
    },
    TopK {
        k: u64,
        approx_corpus_size: u64,
        delta: f64,
    },
    Dimensions {
        rows: usize,
        width: usize,
    },
}

impl TopkapiSketchBuilder {
    fn with_sizing(sizing: Sizing) -> Self {
        Self {
            sizing,
            seed: DEFAULT_SEED,
            top_k_margin: TOP_K_MARGIN,
            sparse: true,
        }
    }

    /// Sizes the sketch from a failure probability `delta` and error bound
    /// `epsilon`: `width = ceil(1 / epsilon)`, `rows = ceil(ln(2 / delta))`.
    pub fn with_accuracy(delta: f64, epsilon: f64) -> Self {
        Self::with_sizing(Sizing::Accuracy { delta, epsilon })
    }

    /// Sizes the sketch for a top-`k` query over roughly `approx_corpus_size`
    /// events: the width is about `margin * k * ln(approx_corpus_size)`, the
    /// rows follow from `delta`.
    pub fn for_top_k(k: u64, approx_corpus_size: u64, delta: f64) -> Self {
        Self::with_sizing(Sizing::TopK {
            k,
            approx_corpus_size,
            delta,
        })
    }

    /// Uses explicit dimensions.
    pub fn with_dimensions(rows: usize, width: usize) -> Self {
        Self::with_sizing(Sizing::Dimensions { rows, width })
    }

    /// Sets the hash seed. Defaults to [`DEFAULT_SEED`].
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the safety margin of [`for_top_k`](Self::for_top_k) sizing.
    /// Defaults to [`TOP_K_MARGIN`].
    pub fn top_k_margin(mut self, margin: f64) -> Self {
        self.top_k_margin = margin;
        self
    }

    /// Enables or disables exact counting until `width` distinct keys are seen.
    /// Enabled by default; when disabled the dense table is allocated upfront.
    pub fn sparse(mut self, enabled: bool) -> Self {
        self.sparse = enabled;
        self
    }

    /// Builds the sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if the sizing parameters are out of range.
    pub fn build(self) -> Result<TopkapiSketch, Error> {
        let Dimensions { rows, width } = match self.sizing {
            Sizing::Accuracy { delta, epsilon } => Dimensions::for_accuracy(delta, epsilon)?,
            Sizing::TopK {
                k,
                approx_corpus_size,
                delta,
            } => Dimensions::for_top_k(k, approx_corpus_size, delta, self.top_k_margin)?,
            Sizing::Dimensions { rows, width } => Dimensions::new(rows, width)?,
        };
        let counters = if self.sparse {
            Counters::Overlay(BTreeMap::new())
        } else {
            Counters::Dense(DenseTable::new(rows, width))
        };
        Ok(TopkapiSketch {
            rows,
            width,
            seed: self.seed,
            total_weight: 0,
            counters,
        })
    }
}
