// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append sinks.
//!
//! A sink stores the journal's bytes in one linear address space. Offsets
//! only grow: trimming moves the expire position forward and never reuses
//! an offset.

use crate::error::{JournalError, JournalResult};

pub trait LogSink {
    /// Appends `bytes` durably and returns the offset just past them.
    fn append(&mut self, bytes: &[u8]) -> JournalResult<u64>;

    /// Forgets everything before `expire_to`.
    fn trim(&mut self, expire_to: u64) -> JournalResult<()>;

    /// Bytes from the expire position to the write position, and the offset
    /// of the first of them.
    fn read_live(&mut self) -> JournalResult<(u64, Vec<u8>)>;

    fn expire_pos(&self) -> u64;

    fn write_pos(&self) -> u64;
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    base: u64,
    bytes: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink holding a journal that starts at offset `base`.
    pub fn from_bytes(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn live_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, bytes: &[u8]) -> JournalResult<u64> {
        self.bytes.extend_from_slice(bytes);
        Ok(self.write_pos())
    }

    fn trim(&mut self, expire_to: u64) -> JournalResult<()> {
        if expire_to < self.base || expire_to > self.write_pos() {
            return Err(JournalError::Sink(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "trim to {} outside live range {}..{}",
                    expire_to,
                    self.base,
                    self.write_pos()
                ),
            )));
        }
        self.bytes.drain(..(expire_to - self.base) as usize);
        self.base = expire_to;
        Ok(())
    }

    fn read_live(&mut self) -> JournalResult<(u64, Vec<u8>)> {
        Ok((self.base, self.bytes.clone()))
    }

    fn expire_pos(&self) -> u64 {
        self.base
    }

    fn write_pos(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }
}
