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

//! A single cell of the dense table.

/// Outcome of one key competing for a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Contest {
    /// The incoming key is the resident; its counter grew.
    Reinforced(i64),
    /// Another key is resident and survived with a smaller counter.
    Weakened(i64),
    /// The resident lost; the incoming key takes over with a counter of one.
    Evicted,
}

/// Majority-vote step: the resident gains `amount` when it is seen again and
/// loses `amount` when any other key is seen.
pub(super) fn compete(resident: Option<&str>, incoming: &str, counter: i64, amount: u64) -> Contest {
    let amount = i64::try_from(amount).unwrap_or(i64::MAX);
    if resident == Some(incoming) {
        return Contest::Reinforced(counter.saturating_add(amount));
    }
    match counter.saturating_sub(amount) {
        remaining if remaining <= 0 => Contest::Evicted,
        remaining => Contest::Weakened(remaining),
    }
}

/// Cell holding a candidate key, its eviction counter, and the total volume
/// hashed into the cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Bucket {
    pub resident: Option<String>,
    pub counter: i64,
    pub hits: u64,
}

impl Bucket {
    pub fn observe(&mut self, key: &str, amount: u64) {
        self.hits = self.hits.saturating_add(amount);
        match compete(self.resident.as_deref(), key, self.counter, amount) {
            Contest::Reinforced(counter) | Contest::Weakened(counter) => self.counter = counter,
            Contest::Evicted => {
                match &mut self.resident {
                    Some(resident) => {
                        resident.clear();
                        resident.push_str(key);
                    }
                    None => self.resident = Some(key.to_owned()),
                }
                self.counter = 1;
            }
        }
    }

    /// Folds `other`, the same cell of another sketch, into this one.
    ///
    /// Matching residents pool their counters; otherwise the cell with the larger
    /// counter wins outright and the loser's volume is dropped.
    pub fn merge(&mut self, other: &Bucket) {
        if self.resident == other.resident {
            self.counter = self.counter.saturating_add(other.counter);
            self.hits = self.hits.saturating_add(other.hits);
        } else if self.counter < other.counter {
            self.clone_from(other);
        }
    }
}
