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

//! Little-endian byte cursors shared by sketch serializers.

pub(crate) mod assert;
pub(crate) mod family;

use std::io;

/// Growable output buffer for serialized sketches.
#[derive(Debug, Default)]
pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

impl SketchBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.write(&value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.write(&value.to_le_bytes());
    }

    pub fn write_i64_le(&mut self, value: i64) {
        self.write(&value.to_le_bytes());
    }
}

/// Read cursor over a serialized sketch image.
#[derive(Debug)]
pub(crate) struct SketchSlice<'a> {
    slice: &'a [u8],
}

impl<'a> SketchSlice<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self { slice }
    }

    /// Returns the number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.slice.len()
    }

    /// Consumes exactly `len` bytes.
    pub fn read_slice(&mut self, len: usize) -> io::Result<&'a [u8]> {
        if self.slice.len() < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        let (head, tail) = self.slice.split_at(len);
        self.slice = tail;
        Ok(head)
    }

    pub fn read_exact<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_slice(N)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let [b] = self.read_exact::<1>()?;
        Ok(b)
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.read_exact().map(u32::from_le_bytes)
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        self.read_exact().map(u64::from_le_bytes)
    }

    pub fn read_i64_le(&mut self) -> io::Result<i64> {
        self.read_exact().map(i64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let mut out = SketchBytes::with_capacity(21);
        out.write_u8(7);
        out.write_u32_le(0xdead_beef);
        out.write_u64_le(u64::MAX - 1);
        out.write_i64_le(-42);
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 21);

        let mut cursor = SketchSlice::new(&bytes);
        assert_eq!(cursor.read_u8().unwrap(), 7);
        assert_eq!(cursor.read_u32_le().unwrap(), 0xdead_beef);
        assert_eq!(cursor.read_u64_le().unwrap(), u64::MAX - 1);
        assert_eq!(cursor.read_i64_le().unwrap(), -42);
        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.read_u8().is_err());
    }

    #[test]
    fn test_short_read_does_not_consume() {
        let bytes = [1u8, 2, 3];
        let mut cursor = SketchSlice::new(&bytes);
        assert!(cursor.read_u32_le().is_err());
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.read_slice(2).unwrap(), &[1, 2]);
    }
}
