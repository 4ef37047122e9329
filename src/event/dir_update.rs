// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Directory entry link.

use core::fmt;
use std::io;

use super::{EventKind, EventPayload};
use crate::codec::{self, Reader};
use crate::completion::Completion;
use crate::mds::{CommitTarget, MdsError, MdsState};
use crate::types::{InodeId, Version};

/// `dir/name` now points at `target`; the directory is at `dir_version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirUpdateEvent {
    pub dir: InodeId,
    pub name: String,
    pub target: InodeId,
    pub dir_version: Version,
}

impl DirUpdateEvent {
    pub fn new(dir: InodeId, name: &str, target: InodeId, dir_version: Version) -> Self {
        Self {
            dir,
            name: name.to_string(),
            target,
            dir_version,
        }
    }
}

impl EventPayload for DirUpdateEvent {
    const KIND: EventKind = EventKind::DirUpdate;

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        codec::put_ino(buf, self.dir);
        codec::put_str(buf, &self.name);
        codec::put_ino(buf, self.target);
        codec::put_version(buf, self.dir_version);
    }

    fn decode_payload(cursor: &mut Reader<'_>) -> io::Result<Self> {
        Ok(Self {
            dir: codec::get_ino(cursor)?,
            name: codec::get_str(cursor)?,
            target: codec::get_ino(cursor)?,
            dir_version: codec::get_version(cursor)?,
        })
    }

    fn can_expire(&self, mds: &MdsState) -> bool {
        mds.store()
            .is_committed(CommitTarget::Dir(self.dir), self.dir_version)
    }

    fn retire(&self, mds: &mut MdsState, done: Completion) {
        mds.commit(CommitTarget::Dir(self.dir), self.dir_version, done);
    }

    fn has_happened(&self, mds: &MdsState) -> bool {
        mds.projected_version(CommitTarget::Dir(self.dir)) >= self.dir_version
    }

    fn replay(&self, mds: &mut MdsState) -> Result<(), MdsError> {
        mds.apply_link(self.dir, &self.name, self.target, self.dir_version);
        Ok(())
    }
}

impl fmt::Display for DirUpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "link {}/{:?} -> {} dir {}",
            self.dir, self.name, self.target, self.dir_version
        )
    }
}
