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

//! Topkapi sketch for finding heavy hitters in data streams.
//!
//! # Overview
//!
//! This sketch is based on the paper "Topkapi: Parallel and Fast Sketches for Finding Top-K
//! Frequent Elements" by Ankush Mandal, He Jiang, Anshumali Shrivastava and Vivek Sarkar
//! (NeurIPS 2018).
//!
//! Each of the `rows` rows of a `rows x width` table hashes a key to one bucket. A bucket
//! runs a one-counter Misra-Gries vote to elect a resident key, and separately accumulates
//! every count hashed into it, like a Count-Min cell. At query time the resident of a bucket
//! is reported with the bucket volume; a key resident in several rows keeps the smallest of
//! those volumes.
//!
//! Until `width` distinct keys have been seen the sketch counts keys exactly in a sparse
//! overlay. Reaching `width` distinct keys promotes it, once and for good, to the dense
//! table.
//!
//! # Accuracy
//!
//! For a sketch sized with error bound `epsilon` and failure probability `delta`
//! (`width = ceil(1/epsilon)`, `rows = ceil(ln(2/delta))`), a key whose frequency exceeds
//! `1/width` of the stream volume is reported, with probability `1 - 2e^-rows`, with a count
//! within the nominal error factor of its true count. In a sketch that was never merged,
//! volumes only ever grow, so a reported count never falls below the true count of the key
//! that holds the bucket. A reported count never exceeds [`TopkapiSketch::total_weight`].
//! Keys below that frequency may be missing or misreported.
//!
//! Merging combines tables bucket by bucket. When the two cells hold different keys, the
//! weaker cell's volume is dropped, so a merged sketch may under-report a key. The rule is a
//! heuristic: repeated merges are not known to preserve the bounds above.
//!
//! # Examples
//!
//! ```
//! # use topkapi::topkapi::TopkapiSketch;
//! let mut sketch = TopkapiSketch::with_top_k(10, 100_000, 0.05).unwrap();
//! sketch.update_with_count("apple", 3);
//! sketch.update("banana");
//! let top = sketch.top_k(1);
//! assert_eq!(top[0].key(), "apple");
//! assert_eq!(top[0].count(), 3);
//! ```
//!
//! # Merging
//!
//! ```
//! # use topkapi::topkapi::TopkapiSketchBuilder;
//! let builder = TopkapiSketchBuilder::with_dimensions(4, 16);
//! let mut left = builder.clone().build().unwrap();
//! let mut right = builder.build().unwrap();
//! left.update("a");
//! right.update_with_count("b", 2);
//!
//! left.merge(&right).unwrap();
//! assert_eq!(left.heavy_hitters(1).len(), 2);
//! ```
//!
//! # Serialization
//!
//! ```
//! # use topkapi::topkapi::TopkapiSketch;
//! let mut sketch = TopkapiSketch::new(0.05, 0.01).unwrap();
//! sketch.update_with_count("42", 2);
//!
//! let bytes = sketch.serialize().unwrap();
//! let decoded = TopkapiSketch::deserialize(&bytes).unwrap();
//! assert_eq!(decoded, sketch);
//! ```

mod bucket;
mod params;
mod serde;
mod serialization;
mod sketch;
mod table;

pub use self::params::TOP_K_MARGIN;
pub use self::sketch::LocalHeavyHitter;
pub use self::sketch::TopkapiSketch;
pub use self::sketch::TopkapiSketchBuilder;
