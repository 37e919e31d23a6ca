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

use std::collections::HashMap;

use googletest::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use topkapi::error::ErrorKind;
use topkapi::hash::DEFAULT_SEED;
use topkapi::topkapi::LocalHeavyHitter;
use topkapi::topkapi::TopkapiSketch;
use topkapi::topkapi::TopkapiSketchBuilder;

/// 4000 singletons with eight heavy keys interleaved; `heavy-j` is seen every
/// `j + 2` singletons.
fn skewed_stream() -> Vec<String> {
    let mut stream = Vec::new();
    for i in 0..4000 {
        stream.push(format!("noise-{i}"));
        for j in 0..8 {
            if i % (j + 2) == 0 {
                stream.push(format!("heavy-{j}"));
            }
        }
    }
    stream
}

fn exact_counts(stream: &[String]) -> HashMap<&str, u64> {
    let mut counts = HashMap::new();
    for key in stream {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }
    counts
}

fn render(rows: &[LocalHeavyHitter]) -> String {
    rows.iter()
        .map(|row| format!("{}={}", row.key(), row.count()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Words whose index is a multiple of a small prime are replaced by the word at
/// that prime, leaving eight heavy keys among a few thousand singletons.
fn prime_copied_corpus(len: usize) -> Vec<String> {
    let mut words: Vec<String> = (0..len).map(|i| format!("word-{i}")).collect();
    for p in [2, 3, 5, 7, 11, 13, 17, 23] {
        for i in (p..len).step_by(p) {
            words[i] = words[p].clone();
        }
    }
    words
}

fn heavy_keys() -> Vec<String> {
    (0..8).map(|j| format!("heavy-{j}")).collect()
}

#[test]
fn test_init_defaults() {
    let sketch = TopkapiSketch::new(0.05, 0.01).unwrap();
    assert_eq!(sketch.rows(), 4);
    assert_eq!(sketch.width(), 100);
    assert_eq!(sketch.seed(), DEFAULT_SEED);
    assert!(sketch.is_empty());
    assert!(sketch.is_sparse());
    assert_eq!(sketch.total_weight(), 0);
    assert_eq!(sketch.num_tracked_keys(), 0);
    assert!(sketch.heavy_hitters(0).is_empty());
}

#[test]
fn test_construction_validation() {
    for bad in [0.0, 1.0, -0.1, 1.1] {
        let err = TopkapiSketch::new(bad, 0.1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = TopkapiSketch::new(0.1, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
    let err = TopkapiSketch::with_top_k(0, 1000, 0.05).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = TopkapiSketchBuilder::with_dimensions(0, 16).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_unallocatable_shapes_fail_at_construction() {
    // would otherwise only fail once the second key promotes the overlay
    let err = TopkapiSketchBuilder::with_dimensions(1 << 60, 2)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = TopkapiSketchBuilder::with_accuracy(0.05, 1e-17)
        .sparse(false)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = TopkapiSketch::new(0.05, 1e-17).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = TopkapiSketchBuilder::with_dimensions(u32::MAX as usize + 1, 1)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_nominal_bounds_follow_dimensions() {
    let sketch = TopkapiSketch::new(0.01, 0.0625).unwrap();
    assert_eq!(sketch.width(), 16);
    assert_eq!(sketch.rows(), 6);
    assert_that!(sketch.epsilon(), approx_eq(1.0 / 16.0));
    assert_that!(sketch.delta(), approx_eq(2.0 * (-6.0f64).exp()));
    assert_that!(sketch.delta(), le(0.01));
}

#[test]
fn test_top_k_sizing() {
    let sketch = TopkapiSketch::with_top_k(20, 1_000_000, 0.05).unwrap();
    // 55 * 20 * ln(1_000_000) = 15197.06
    assert_eq!(sketch.width(), 15198);
    assert_eq!(sketch.rows(), 4);

    let narrow = TopkapiSketchBuilder::for_top_k(20, 1_000_000, 0.05)
        .top_k_margin(5.0)
        .build()
        .unwrap();
    assert_eq!(narrow.width(), 1382);
}

#[test]
fn test_overlay_counts_exactly() {
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 4).build().unwrap();
    for key in ["a", "a", "a", "b", "b", "c"] {
        sketch.update(key);
    }
    assert!(sketch.is_sparse());
    insta::assert_snapshot!(render(&sketch.heavy_hitters(1)), @"a=3 b=2 c=1");
}

#[test]
fn test_overlay_exact_below_width() {
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 64).build().unwrap();
    let mut expected = HashMap::new();
    for i in 0..1000u64 {
        let key = format!("k{}", (i * 5) % 63);
        sketch.update_with_count(&key, i % 5 + 1);
        *expected.entry(key).or_insert(0u64) += i % 5 + 1;
    }
    assert!(sketch.is_sparse());
    let rows = sketch.heavy_hitters(1);
    assert_eq!(rows.len(), expected.len());
    for row in &rows {
        assert_eq!(Some(&row.count()), expected.get(row.key()));
    }
    assert!(rows.windows(2).all(|w| w[0].count() >= w[1].count()));
}

#[test]
fn test_overlay_ignores_threshold() {
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 8).build().unwrap();
    sketch.update_with_count("big", 100);
    sketch.update("small");
    let rows = sketch.heavy_hitters(50);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].key(), "small");
}

#[test]
fn test_zero_count_update() {
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 8).build().unwrap();
    sketch.update_with_count("nothing", 0);
    assert!(!sketch.is_empty());
    assert_eq!(sketch.total_weight(), 0);
    let rows = sketch.heavy_hitters(1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].count(), 0);
}

#[test]
fn test_top_heavy_hitters_in_order() {
    let stream = skewed_stream();
    let exact = exact_counts(&stream);
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 64).build().unwrap();
    for key in &stream {
        sketch.update(key);
    }
    assert!(!sketch.is_sparse());
    assert_eq!(sketch.total_weight(), stream.len() as u64);

    let top = sketch.top_k(8);
    let keys: Vec<String> = top.iter().map(|row| row.key().to_string()).collect();
    assert_eq!(keys, heavy_keys());
    for row in &top {
        let true_count = exact[row.key()];
        assert_that!(row.count(), ge(true_count));
        // within a few buckets' worth of noise
        assert_that!(row.count(), le(true_count + 2 * stream.len() as u64 / 64));
    }
}

#[test]
fn test_error_rate_within_delta() {
    let stream = prime_copied_corpus(20_000);
    let exact = exact_counts(&stream);
    let delta = 0.05;
    let mut sketch = TopkapiSketch::with_top_k(5, stream.len() as u64, delta).unwrap();
    for key in &stream {
        sketch.update(key);
    }
    assert_eq!(sketch.width(), 2724);
    assert!(exact.len() > sketch.width());
    assert!(!sketch.is_sparse());

    // fraction of reported keys whose count leaves [exact * (1 - eps), exact * (1 + eps)]
    let epsilon = sketch.epsilon();
    let rows = sketch.heavy_hitters(1);
    let outside = rows
        .iter()
        .filter(|row| {
            let true_count = exact[row.key()] as f64;
            let lower = (true_count * (1.0 - epsilon)).floor() as u64;
            let upper = (true_count * (1.0 + epsilon)).ceil() as u64;
            row.count() < lower || row.count() > upper
        })
        .count();
    let error_rate = outside as f64 / rows.len() as f64;
    assert_that!(error_rate, lt(delta));

    let mut top: Vec<String> = sketch
        .top_k(8)
        .iter()
        .map(|row| row.key().to_string())
        .collect();
    top.sort();
    let mut expected: Vec<String> = [2, 3, 5, 7, 11, 13, 17, 23]
        .iter()
        .map(|p| format!("word-{p}"))
        .collect();
    expected.sort();
    assert_eq!(top, expected);
}

#[test]
fn test_no_false_negatives_above_margin() {
    let stream = skewed_stream();
    let exact = exact_counts(&stream);
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 64).build().unwrap();
    for key in &stream {
        sketch.update(key);
    }

    for threshold in [200u64, 450, 600, 1000] {
        let rows = sketch.heavy_hitters(threshold);
        let reported: HashMap<&str, u64> =
            rows.iter().map(|row| (row.key(), row.count())).collect();
        assert!(rows.iter().all(|row| row.count() >= threshold));

        let margin = threshold as f64 * (1.0 + sketch.epsilon());
        for (key, true_count) in &exact {
            if *true_count as f64 >= margin {
                let count = reported.get(key).copied();
                assert!(
                    count.is_some_and(|count| count >= *true_count),
                    "{key} ({true_count}) missing at threshold {threshold}"
                );
            }
        }
    }
}

#[test]
fn test_estimates_bounded_on_random_stream() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut sketch = TopkapiSketchBuilder::with_dimensions(3, 32).build().unwrap();
    let mut exact: HashMap<String, u64> = HashMap::new();
    for _ in 0..20_000 {
        // squaring skews the draw towards small ids
        let draw: f64 = rng.random();
        let key = format!("id-{}", (draw * draw * 500.0) as u64);
        let count = rng.random_range(1..4u64);
        sketch.update_with_count(&key, count);
        *exact.entry(key).or_insert(0) += count;
    }
    let total: u64 = exact.values().sum();
    assert_eq!(sketch.total_weight(), total);

    for row in sketch.heavy_hitters(1) {
        assert_that!(row.count(), ge(exact[row.key()]));
        assert_that!(row.count(), le(total));
    }
}

#[test]
fn test_merge_disjoint_sparse() {
    let builder = TopkapiSketchBuilder::with_dimensions(4, 16);
    let mut left = builder.clone().build().unwrap();
    let mut right = builder.build().unwrap();
    for key in ["a", "a", "b", "c"] {
        left.update(key);
    }
    for key in ["x", "y", "y", "z"] {
        right.update(key);
    }
    let before: Vec<LocalHeavyHitter> = left
        .heavy_hitters(1)
        .into_iter()
        .chain(right.heavy_hitters(1))
        .collect();

    left.merge(&right).unwrap();
    assert_eq!(left.total_weight(), 8);
    let merged: HashMap<String, u64> = left
        .heavy_hitters(1)
        .into_iter()
        .map(LocalHeavyHitter::into_parts)
        .collect();
    assert_eq!(merged.len(), 6);
    for row in before {
        assert_that!(merged[row.key()], ge(row.count()));
    }
}

#[test]
fn test_merge_identical_dense_doubles() {
    let stream = skewed_stream();
    let mut left = TopkapiSketchBuilder::with_dimensions(4, 64).build().unwrap();
    for key in &stream {
        left.update(key);
    }
    let right = left.clone();
    left.merge(&right).unwrap();

    let doubled: Vec<(String, u64)> = right
        .heavy_hitters(1)
        .into_iter()
        .map(|row| (row.key().to_string(), row.count() * 2))
        .collect();
    let merged: Vec<(String, u64)> = left
        .heavy_hitters(1)
        .into_iter()
        .map(LocalHeavyHitter::into_parts)
        .collect();
    assert_eq!(merged, doubled);
    assert_eq!(left.total_weight(), 2 * right.total_weight());
}

#[test]
fn test_sharded_merge_recovers_heavy_hitters() {
    let stream = skewed_stream();
    let exact = exact_counts(&stream);
    let builder = TopkapiSketchBuilder::with_dimensions(4, 64);
    let mut shards: Vec<TopkapiSketch> = (0..4).map(|_| builder.clone().build().unwrap()).collect();
    for (i, key) in stream.iter().enumerate() {
        shards[i % 4].update(key);
    }

    let mut merged = shards.remove(0);
    for shard in &shards {
        merged.merge(shard).unwrap();
    }
    assert_eq!(merged.total_weight(), stream.len() as u64);

    let top = merged.top_k(8);
    let keys: Vec<String> = top.iter().map(|row| row.key().to_string()).collect();
    assert_eq!(keys, heavy_keys());
    // merges may drop volume; on this stream every heavy key wins its cells in all shards
    for row in &top {
        assert_that!(row.count(), ge(exact[row.key()]));
    }
}

#[test]
fn test_merge_can_drop_losing_volume() {
    let builder = TopkapiSketchBuilder::with_dimensions(1, 1).sparse(false);
    let mut left = builder.clone().build().unwrap();
    left.update_with_count("a", 3);
    left.update_with_count("b", 1);
    let mut right = builder.build().unwrap();
    right.update_with_count("a", 5);
    right.update_with_count("a", 5);

    left.merge(&right).unwrap();
    assert_eq!(left.total_weight(), 14);
    // "b" evicted "a" on the left, so the left volume is lost: 10 < 13
    let rows = left.heavy_hitters(1);
    insta::assert_snapshot!(render(&rows), @"a=10");
}

#[test]
fn test_merge_incompatible() {
    let mut left = TopkapiSketchBuilder::with_dimensions(4, 16).build().unwrap();
    for key in ["a", "b", "a"] {
        left.update(key);
    }
    let before = left.heavy_hitters(1);

    let wider = TopkapiSketchBuilder::with_dimensions(4, 32).build().unwrap();
    let err = left.merge(&wider).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleSketches);

    let taller = TopkapiSketchBuilder::with_dimensions(5, 16).build().unwrap();
    let err = left.merge(&taller).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleSketches);

    assert_eq!(left.heavy_hitters(1), before);
}

#[test]
fn test_top_k_truncates() {
    let mut sketch = TopkapiSketchBuilder::with_dimensions(4, 32).build().unwrap();
    for (key, count) in [("a", 5), ("b", 9), ("c", 1), ("d", 7)] {
        sketch.update_with_count(key, count);
    }
    insta::assert_snapshot!(render(&sketch.top_k(2)), @"b=9 d=7");
    assert_eq!(sketch.top_k(10).len(), 4);
    assert!(sketch.top_k(0).is_empty());
}
