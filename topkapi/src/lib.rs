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

//! Bounded-memory heavy-hitter estimation for keyed event streams.
//!
//! The [`topkapi`] module holds the sketch. It tracks approximate counts of the most
//! frequent keys of a stream in a fixed `rows x width` table, answers threshold queries
//! sorted by count, merges with sketches built on other shards, and serializes to bytes.
//!
//! Sketches are not synchronized. Mutating a sketch while another thread reads it requires
//! external locking; parallel ingestion builds one sketch per thread and merges them.

pub mod error;
pub mod hash;
pub mod topkapi;

pub(crate) mod codec;
