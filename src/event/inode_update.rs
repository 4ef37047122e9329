// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Inode attribute update.

use core::fmt;
use std::io;

use super::{EventKind, EventPayload};
use crate::codec::{self, Reader};
use crate::completion::Completion;
use crate::mds::{CommitTarget, MdsError, MdsState};
use crate::types::{InodeAttrs, InodeId, Version};

/// New attributes of one inode at `version`.
///
/// The inode write to the primary store may still be in flight when this is
/// journaled, so expiry waits for the store to reach `version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InodeUpdateEvent {
    pub ino: InodeId,
    pub version: Version,
    pub attrs: InodeAttrs,
}

impl InodeUpdateEvent {
    pub fn new(ino: InodeId, version: Version, attrs: InodeAttrs) -> Self {
        Self { ino, version, attrs }
    }

    fn target(&self) -> CommitTarget {
        CommitTarget::Inode(self.ino)
    }
}

impl EventPayload for InodeUpdateEvent {
    const KIND: EventKind = EventKind::InodeUpdate;

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        codec::put_ino(buf, self.ino);
        codec::put_version(buf, self.version);
        codec::put_u64(buf, self.attrs.size);
        codec::put_u32(buf, self.attrs.mode);
        codec::put_u64(buf, self.attrs.mtime);
    }

    fn decode_payload(cursor: &mut Reader<'_>) -> io::Result<Self> {
        let ino = codec::get_ino(cursor)?;
        let version = codec::get_version(cursor)?;
        let size = codec::get_u64(cursor)?;
        let mode = codec::get_u32(cursor)?;
        let mtime = codec::get_u64(cursor)?;
        Ok(Self {
            ino,
            version,
            attrs: InodeAttrs { size, mode, mtime },
        })
    }

    fn can_expire(&self, mds: &MdsState) -> bool {
        mds.store().is_committed(self.target(), self.version)
    }

    fn retire(&self, mds: &mut MdsState, done: Completion) {
        mds.commit(self.target(), self.version, done);
    }

    fn has_happened(&self, mds: &MdsState) -> bool {
        mds.inode(self.ino)
            .map_or(false, |inode| inode.version >= self.version)
    }

    fn replay(&self, mds: &mut MdsState) -> Result<(), MdsError> {
        mds.apply_inode(self.ino, self.attrs, self.version);
        Ok(())
    }
}

impl fmt::Display for InodeUpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ino {} {} size={} mode={:o} mtime={}",
            self.ino, self.version, self.attrs.size, self.attrs.mode, self.attrs.mtime
        )
    }
}
