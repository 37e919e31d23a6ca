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

use std::hash::Hasher;

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;
const BLOCK_LEN: usize = 16;

/// Streaming MurmurHash3 (x64, 128-bit variant).
///
/// Input may be fed in arbitrary pieces; the digest only depends on the
/// concatenated bytes and the seed.
#[derive(Debug, Clone)]
pub struct MurmurHash3X64128 {
    h1: u64,
    h2: u64,
    buf: [u8; BLOCK_LEN],
    buf_len: usize,
    total_len: u64,
}

impl Default for MurmurHash3X64128 {
    fn default() -> Self {
        Self::with_seed(super::DEFAULT_SEED)
    }
}

impl MurmurHash3X64128 {
    /// Creates a hasher with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            h1: seed,
            h2: seed,
            buf: [0; BLOCK_LEN],
            buf_len: 0,
            total_len: 0,
        }
    }

    /// Feeds raw bytes into the hasher.
    pub fn write_bytes(&mut self, mut bytes: &[u8]) {
        self.total_len += bytes.len() as u64;

        if self.buf_len > 0 {
            let take = (BLOCK_LEN - self.buf_len).min(bytes.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&bytes[..take]);
            self.buf_len += take;
            bytes = &bytes[take..];
            if self.buf_len < BLOCK_LEN {
                return;
            }
            let block = self.buf;
            self.process_block(&block);
            self.buf_len = 0;
        }

        let mut chunks = bytes.chunks_exact(BLOCK_LEN);
        for block in &mut chunks {
            self.process_block(block);
        }
        let rest = chunks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.buf_len = rest.len();
    }

    /// Returns both 64-bit halves of the digest.
    pub fn finish128(&self) -> (u64, u64) {
        let mut h1 = self.h1;
        let mut h2 = self.h2;
        let tail = &self.buf[..self.buf_len];

        if tail.len() > 8 {
            let mut k2 = read_partial_le(&tail[8..]);
            k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
            h2 ^= k2;
        }
        if !tail.is_empty() {
            let mut k1 = read_partial_le(&tail[..tail.len().min(8)]);
            k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
            h1 ^= k1;
        }

        h1 ^= self.total_len;
        h2 ^= self.total_len;
        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);
        h1 = fmix64(h1);
        h2 = fmix64(h2);
        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);
        (h1, h2)
    }

    fn process_block(&mut self, block: &[u8]) {
        let mut k1 = read_partial_le(&block[..8]);
        let mut k2 = read_partial_le(&block[8..]);

        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        self.h1 ^= k1;
        self.h1 = self
            .h1
            .rotate_left(27)
            .wrapping_add(self.h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dc_e729);

        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        self.h2 ^= k2;
        self.h2 = self
            .h2
            .rotate_left(31)
            .wrapping_add(self.h1)
            .wrapping_mul(5)
            .wrapping_add(0x3849_5ab5);
    }
}

impl Hasher for MurmurHash3X64128 {
    fn finish(&self) -> u64 {
        self.finish128().0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }
}

/// Reads up to eight bytes as a little-endian integer.
#[inline]
fn read_partial_le(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(word)
}

#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(bytes: &[u8], seed: u64) -> (u64, u64) {
        let mut hasher = MurmurHash3X64128::with_seed(seed);
        hasher.write_bytes(bytes);
        hasher.finish128()
    }

    #[test]
    fn test_reference_vectors() {
        assert_eq!(digest(b"", 0), (0, 0));
        assert_eq!(
            digest(b"foo", 0),
            (
                (-2129773440516405919i64) as u64,
                9128664383759220103u64
            )
        );
        assert_eq!(
            digest(b"hello", 1337),
            (0x9881_d779_cb48_36bd, 0xf480_47b1_d853_a3e7)
        );
        assert_eq!(
            digest(b"The quick brown fox jumps over the lazy dog", 1337),
            (0xbc71_8004_e0d8_7ee4, 0xf95a_9fc0_1a18_1755)
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let input = b"The quick brown fox jumps over the lazy dog";
        let expected = digest(input, 1337);
        for split in [1, 7, 15, 16, 17, 32, 40] {
            let mut hasher = MurmurHash3X64128::with_seed(1337);
            let (head, tail) = input.split_at(split);
            hasher.write(head);
            hasher.write(tail);
            assert_eq!(hasher.finish128(), expected, "split at {split}");
        }
    }
}
