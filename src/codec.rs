// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Payload field codec.
//!
//! Integers are little-endian and fixed width. Strings are a `u32` byte
//! length followed by UTF-8 bytes. Readers return `UnexpectedEof` when the
//! buffer ends early and `InvalidData` for bytes that cannot be a valid field;
//! the event dispatcher turns those into journal errors.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

use crate::types::{InodeId, Version};

pub type Reader<'a> = Cursor<&'a [u8]>;

pub(crate) fn put_u8(buf: &mut Vec<u8>, val: u8) {
    buf.push(val);
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

pub(crate) fn put_u64(buf: &mut Vec<u8>, val: u64) {
    buf.extend_from_slice(&val.to_le_bytes());
}

pub(crate) fn put_ino(buf: &mut Vec<u8>, ino: InodeId) {
    put_u64(buf, ino.0);
}

pub(crate) fn put_version(buf: &mut Vec<u8>, version: Version) {
    put_u64(buf, version.0);
}

pub(crate) fn put_str(buf: &mut Vec<u8>, s: &str) {
    debug_assert!(s.len() <= u32::MAX as usize, "string field longer than u32::MAX");
    put_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

pub(crate) fn get_u8(cursor: &mut Reader<'_>) -> io::Result<u8> {
    cursor.read_u8()
}

pub(crate) fn get_u32(cursor: &mut Reader<'_>) -> io::Result<u32> {
    cursor.read_u32::<LittleEndian>()
}

pub(crate) fn get_u64(cursor: &mut Reader<'_>) -> io::Result<u64> {
    cursor.read_u64::<LittleEndian>()
}

pub(crate) fn get_ino(cursor: &mut Reader<'_>) -> io::Result<InodeId> {
    get_u64(cursor).map(InodeId)
}

pub(crate) fn get_version(cursor: &mut Reader<'_>) -> io::Result<Version> {
    get_u64(cursor).map(Version)
}

pub(crate) fn get_str(cursor: &mut Reader<'_>) -> io::Result<String> {
    let len = get_u32(cursor)? as usize;
    // Check before allocating so a corrupt length cannot request gigabytes.
    if remaining(cursor) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("string of {} bytes overruns buffer", len),
        ));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub(crate) fn remaining(cursor: &Reader<'_>) -> usize {
    let len = cursor.get_ref().len() as u64;
    len.saturating_sub(cursor.position()) as usize
}
