// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Inode number table change.

use core::fmt;
use std::io;

use super::{EventKind, EventPayload};
use crate::codec::{self, Reader};
use crate::completion::Completion;
use crate::mds::{CommitTarget, MdsError, MdsState};
use crate::types::{InodeId, Version};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AllocOp {
    Alloc = 1,
    Free = 2,
}

impl AllocOp {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(AllocOp::Alloc),
            2 => Some(AllocOp::Free),
            _ => None,
        }
    }
}

/// An extent of inode numbers taken from or returned to the inode table,
/// which is at `table_version` afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocEvent {
    pub op: AllocOp,
    pub start: InodeId,
    pub len: u32,
    pub table_version: Version,
}

impl AllocEvent {
    pub fn new(op: AllocOp, start: InodeId, len: u32, table_version: Version) -> Self {
        Self {
            op,
            start,
            len,
            table_version,
        }
    }
}

impl EventPayload for AllocEvent {
    const KIND: EventKind = EventKind::Alloc;

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        codec::put_u8(buf, self.op as u8);
        codec::put_ino(buf, self.start);
        codec::put_u32(buf, self.len);
        codec::put_version(buf, self.table_version);
    }

    fn decode_payload(cursor: &mut Reader<'_>) -> io::Result<Self> {
        let raw = codec::get_u8(cursor)?;
        let op = AllocOp::from_u8(raw).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("unknown alloc op {}", raw))
        })?;
        Ok(Self {
            op,
            start: codec::get_ino(cursor)?,
            len: codec::get_u32(cursor)?,
            table_version: codec::get_version(cursor)?,
        })
    }

    fn can_expire(&self, mds: &MdsState) -> bool {
        mds.store()
            .is_committed(CommitTarget::InoTable, self.table_version)
    }

    fn retire(&self, mds: &mut MdsState, done: Completion) {
        mds.commit(CommitTarget::InoTable, self.table_version, done);
    }

    fn has_happened(&self, mds: &MdsState) -> bool {
        mds.ino_table().version() >= self.table_version
    }

    fn replay(&self, mds: &mut MdsState) -> Result<(), MdsError> {
        mds.apply_alloc(self.op, self.start, self.len, self.table_version)
    }
}

impl fmt::Display for AllocEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.op {
            AllocOp::Alloc => "alloc",
            AllocOp::Free => "free",
        };
        write!(
            f,
            "{} {}+{} table {}",
            verb, self.start, self.len, self.table_version
        )
    }
}
