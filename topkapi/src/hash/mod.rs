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

//! Keyed hashing used to place keys in sketch rows.

mod murmurhash;

pub use self::murmurhash::MurmurHash3X64128;

/// Seed used by sketches unless one is configured explicitly.
///
/// Sketches only merge with sketches built from the same seed.
pub const DEFAULT_SEED: u64 = 1337;

/// Hashes `bytes` with `seed` and returns the low 64 bits of the 128-bit digest.
#[inline]
pub fn hash64(bytes: &[u8], seed: u64) -> u64 {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    hasher.write_bytes(bytes);
    hasher.finish128().0
}
