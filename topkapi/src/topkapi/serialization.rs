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

//! Serialization constants for topkapi sketches.
//!
//! # Binary layout (little-endian)
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0 | preamble longs (4) |
//! | 1 | serial version (1) |
//! | 2 | family id |
//! | 3 | flags |
//! | 4..8 | rows (u32) |
//! | 8..16 | width (u64) |
//! | 16..24 | hash seed (u64) |
//! | 24..32 | total weight (u64) |
//!
//! In overlay mode the preamble is followed by a u32 entry count and, per
//! entry, a u64 count and a length-prefixed key.
//!
//! In dense mode it is followed by three row-major `rows x width` matrices:
//! u64 hit totals, i64 eviction counters, then length-prefixed resident keys
//! where a length of `u32::MAX` marks an empty cell.
//!
//! Keys are therefore limited to [`MAX_KEY_LEN`] bytes.

/// Serialization version.
pub(super) const SERIAL_VERSION: u8 = 1;
/// Preamble longs; the preamble is the same for both modes.
pub(super) const PREAMBLE_LONGS: u8 = 4;

/// Flag set while the sketch still tracks keys exactly in its overlay.
pub(super) const OVERLAY_FLAG_MASK: u8 = 1;

/// Key length marking a bucket without resident.
pub(super) const NO_RESIDENT: u32 = u32::MAX;

/// Longest key, in bytes, a length prefix can describe.
pub(super) const MAX_KEY_LEN: usize = NO_RESIDENT as usize - 1;

/// Bytes per bucket spent on the two numeric matrices.
pub(super) const BUCKET_NUMERIC_BYTES: usize = 16;
