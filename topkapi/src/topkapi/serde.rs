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

//! Length-prefixed key encoding.

use std::str;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_remaining;
use crate::codec::assert::insufficient_data;
use crate::error::Error;
use crate::topkapi::serialization::MAX_KEY_LEN;
use crate::topkapi::serialization::NO_RESIDENT;

/// Length prefix for a key of `len` bytes; `NO_RESIDENT` is never produced.
fn key_len_prefix(len: usize) -> Result<u32, Error> {
    if len > MAX_KEY_LEN {
        return Err(Error::invalid_argument(format!(
            "key of {len} bytes exceeds the serializable limit of {MAX_KEY_LEN} bytes"
        )));
    }
    u32::try_from(len).map_err(|_| Error::invalid_argument(format!("key of {len} bytes is too long")))
}

pub(super) fn write_key(out: &mut SketchBytes, key: &str) -> Result<(), Error> {
    out.write_u32_le(key_len_prefix(key.len())?);
    out.write(key.as_bytes());
    Ok(())
}

pub(super) fn write_resident(out: &mut SketchBytes, resident: Option<&str>) -> Result<(), Error> {
    match resident {
        Some(key) => write_key(out, key),
        None => {
            out.write_u32_le(NO_RESIDENT);
            Ok(())
        }
    }
}

pub(super) fn read_key(cursor: &mut SketchSlice<'_>) -> Result<String, Error> {
    let len = cursor.read_u32_le().map_err(insufficient_data("key length"))?;
    read_key_payload(cursor, len)
}

pub(super) fn read_resident(cursor: &mut SketchSlice<'_>) -> Result<Option<String>, Error> {
    let len = cursor
        .read_u32_le()
        .map_err(insufficient_data("resident length"))?;
    if len == NO_RESIDENT {
        return Ok(None);
    }
    read_key_payload(cursor, len).map(Some)
}

fn read_key_payload(cursor: &mut SketchSlice<'_>, len: u32) -> Result<String, Error> {
    let len = len as usize;
    ensure_remaining(cursor.remaining(), len, "key payload")?;
    let bytes = cursor.read_slice(len).map_err(insufficient_data("key payload"))?;
    match str::from_utf8(bytes) {
        Ok(key) => Ok(key.to_owned()),
        Err(_) => Err(Error::deserial("invalid UTF-8 key payload")),
    }
}
