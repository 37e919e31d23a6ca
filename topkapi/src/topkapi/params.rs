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

//! Derivation of sketch dimensions from accuracy targets.

use crate::error::Error;
use crate::topkapi::bucket::Bucket;

/// Default safety margin applied when sizing a sketch for a top-k query.
///
/// The width grows as `margin * k * ln(corpus_size)`. The value is empirical:
/// it is the smallest factor for which merged sketches kept their error rate
/// under control on word-count corpora.
pub const TOP_K_MARGIN: f64 = 55.0;

/// Rows and columns of a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Dimensions {
    pub rows: usize,
    pub width: usize,
}

impl Dimensions {
    /// Validates explicit dimensions.
    pub fn new(rows: usize, width: usize) -> Result<Self, Error> {
        if rows == 0 {
            return Err(Error::invalid_argument("rows must be at least 1"));
        }
        if width == 0 {
            return Err(Error::invalid_argument("width must be at least 1"));
        }
        if u32::try_from(rows).is_err() {
            return Err(Error::invalid_argument(format!(
                "rows must be at most {}; got {rows}",
                u32::MAX
            )));
        }
        let table_bytes = rows
            .checked_mul(width)
            .and_then(|buckets| buckets.checked_mul(size_of::<Bucket>()));
        if !table_bytes.is_some_and(|bytes| bytes <= isize::MAX as usize) {
            return Err(Error::invalid_argument("rows * width buckets exceed addressable memory")
                .with_context("rows", rows)
                .with_context("width", width));
        }
        Ok(Self { rows, width })
    }

    /// `width = ceil(1 / epsilon)`, `rows = ceil(ln(2 / delta))`.
    ///
    /// `delta` is the failure probability and `epsilon` the error bound; both must lie in
    /// the open interval (0, 1).
    pub fn for_accuracy(delta: f64, epsilon: f64) -> Result<Self, Error> {
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(Error::invalid_argument(format!(
                "epsilon must be in range (0, 1); got {epsilon}"
            )));
        }
        if !(delta > 0.0 && delta < 1.0) {
            return Err(Error::invalid_argument(format!(
                "delta must be in range (0, 1); got {delta}"
            )));
        }
        let width = (1.0 / epsilon).ceil();
        let rows = (2.0 / delta).ln().ceil();
        if width >= usize::MAX as f64 {
            return Err(Error::invalid_argument(format!(
                "epsilon {epsilon} requires more buckets than addressable"
            )));
        }
        Self::new(rows as usize, width as usize)
    }

    /// Sizes a sketch for the `k` most frequent keys of a corpus of roughly
    /// `approx_corpus_size` events.
    pub fn for_top_k(
        k: u64,
        approx_corpus_size: u64,
        delta: f64,
        margin: f64,
    ) -> Result<Self, Error> {
        let epsilon = epsilon_for_top_k(k, approx_corpus_size, margin)?;
        Self::for_accuracy(delta, epsilon)
    }
}

/// Error bound equivalent to `margin * k * ln(approx_corpus_size)` buckets per row.
pub(super) fn epsilon_for_top_k(k: u64, approx_corpus_size: u64, margin: f64) -> Result<f64, Error> {
    if k < 1 {
        return Err(Error::invalid_argument("k must be at least 1"));
    }
    if !(margin.is_finite() && margin > 0.0) {
        return Err(Error::invalid_argument(format!(
            "top-k margin must be a positive number; got {margin}"
        )));
    }
    let buckets = margin * k as f64 * (approx_corpus_size as f64).ln();
    if !(buckets > 1.0) {
        return Err(Error::invalid_argument(format!(
            "corpus size {approx_corpus_size} is too small to size a top-{k} sketch"
        )));
    }
    Ok(1.0 / buckets)
}

/// Nominal error bound of a sketch `width` buckets wide.
pub(super) fn epsilon_of(width: usize) -> f64 {
    1.0 / width as f64
}

/// Nominal failure probability of a sketch with `rows` rows.
pub(super) fn delta_of(rows: usize) -> f64 {
    2.0 / (rows as f64).exp()
}
