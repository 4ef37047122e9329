// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Metadata server state.
//!
//! The authoritative in-memory namespace the journal protects: inodes,
//! directories and the inode number table, each carrying a projected
//! version, plus the primary store those versions are eventually written to.
//!
//! Two write paths exist:
//! - live mutations (`update_inode`, `link`, ...) change state and return
//!   the event to journal
//! - replay appliers (`apply_*`) re-create logged state during recovery and
//!   are idempotent

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::completion::Completion;
use crate::error::CommitStatus;
use crate::event::{AllocEvent, AllocOp, DirUpdateEvent, InodeUpdateEvent, UnlinkEvent};
use crate::types::{InodeAttrs, InodeId, Version};

pub mod ino_table;
pub mod store;

pub use ino_table::InoTable;
pub use store::{CommitTarget, PrimaryStore};

pub const ROOT_INO: InodeId = InodeId(1);

/// First inode number the allocator hands out.
pub const FIRST_FREE_INO: InodeId = InodeId(0x1000);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MdsError {
    #[error("dentry {dir}/{name} points at {found}, journal expected {expected}")]
    DentryMismatch {
        dir: InodeId,
        name: String,
        expected: InodeId,
        found: InodeId,
    },

    #[error("invalid inode extent: start {start}, len {len}")]
    InvalidExtent { start: InodeId, len: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inode {
    pub ino: InodeId,
    pub attrs: InodeAttrs,
    pub version: Version,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dir {
    pub version: Version,
    pub entries: BTreeMap<String, InodeId>,
}

pub struct MdsState {
    inodes: FxHashMap<InodeId, Inode>,
    dirs: FxHashMap<InodeId, Dir>,
    ino_table: InoTable,
    store: PrimaryStore,
}

impl MdsState {
    pub fn new() -> Self {
        Self {
            inodes: FxHashMap::default(),
            dirs: FxHashMap::default(),
            ino_table: InoTable::new(FIRST_FREE_INO),
            store: PrimaryStore::new(),
        }
    }

    // --- Read APIs ---

    pub fn inode(&self, ino: InodeId) -> Option<&Inode> {
        self.inodes.get(&ino)
    }

    pub fn dir(&self, dir: InodeId) -> Option<&Dir> {
        self.dirs.get(&dir)
    }

    pub fn lookup(&self, dir: InodeId, name: &str) -> Option<InodeId> {
        self.dirs.get(&dir).and_then(|d| d.entries.get(name).copied())
    }

    pub fn ino_table(&self) -> &InoTable {
        &self.ino_table
    }

    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }

    /// Current in-memory version of `target`; 0 if it does not exist.
    pub fn projected_version(&self, target: CommitTarget) -> Version {
        match target {
            CommitTarget::Inode(ino) => self.inodes.get(&ino).map(|i| i.version),
            CommitTarget::Dir(dir) => self.dirs.get(&dir).map(|d| d.version),
            CommitTarget::InoTable => Some(self.ino_table.version()),
        }
        .unwrap_or_default()
    }

    // --- Live mutations ---

    pub fn update_inode(&mut self, ino: InodeId, attrs: InodeAttrs) -> InodeUpdateEvent {
        let version = self.projected_version(CommitTarget::Inode(ino)).next();
        self.inodes.insert(ino, Inode { ino, attrs, version });
        InodeUpdateEvent::new(ino, version, attrs)
    }

    pub fn link(&mut self, dir: InodeId, name: &str, target: InodeId) -> DirUpdateEvent {
        let d = self.dirs.entry(dir).or_default();
        d.entries.insert(name.to_string(), target);
        d.version = d.version.next();
        DirUpdateEvent::new(dir, name, target, d.version)
    }

    /// Removes `dir/name`. `None` when there is no such entry.
    pub fn unlink(&mut self, dir: InodeId, name: &str) -> Option<UnlinkEvent> {
        let d = self.dirs.get_mut(&dir)?;
        let target = d.entries.remove(name)?;
        d.version = d.version.next();
        Some(UnlinkEvent::new(dir, name, target, d.version))
    }

    pub fn alloc_inos(&mut self, len: u32) -> Result<AllocEvent, MdsError> {
        let (start, version) = self.ino_table.allocate(len)?;
        Ok(AllocEvent::new(AllocOp::Alloc, start, len, version))
    }

    pub fn free_inos(&mut self, start: InodeId, len: u32) -> Result<AllocEvent, MdsError> {
        let version = self.ino_table.release(start, len)?;
        Ok(AllocEvent::new(AllocOp::Free, start, len, version))
    }

    // --- Replay appliers ---

    pub(crate) fn apply_inode(&mut self, ino: InodeId, attrs: InodeAttrs, version: Version) {
        match self.inodes.get_mut(&ino) {
            Some(inode) if inode.version >= version => {}
            Some(inode) => {
                inode.attrs = attrs;
                inode.version = version;
            }
            None => {
                self.inodes.insert(ino, Inode { ino, attrs, version });
            }
        }
    }

    pub(crate) fn apply_link(&mut self, dir: InodeId, name: &str, target: InodeId, version: Version) {
        let d = self.dirs.entry(dir).or_default();
        d.entries.insert(name.to_string(), target);
        d.version = d.version.max(version);
    }

    pub(crate) fn apply_unlink(
        &mut self,
        dir: InodeId,
        name: &str,
        target: InodeId,
        version: Version,
    ) -> Result<(), MdsError> {
        let d = self.dirs.entry(dir).or_default();
        match d.entries.get(name) {
            Some(found) if *found != target => {
                return Err(MdsError::DentryMismatch {
                    dir,
                    name: name.to_string(),
                    expected: target,
                    found: *found,
                });
            }
            Some(_) => {
                d.entries.remove(name);
            }
            None => {}
        }
        d.version = d.version.max(version);
        Ok(())
    }

    pub(crate) fn apply_alloc(
        &mut self,
        op: AllocOp,
        start: InodeId,
        len: u32,
        version: Version,
    ) -> Result<(), MdsError> {
        self.ino_table.apply(op, start, len, version)
    }

    // --- Primary store ---

    pub fn store(&self) -> &PrimaryStore {
        &self.store
    }

    pub fn committed_version(&self, target: CommitTarget) -> Version {
        self.store.committed_version(target)
    }

    /// Requests a write of `target` covering at least `needed`. The write
    /// carries the projected version when that is newer.
    pub fn commit(&mut self, target: CommitTarget, needed: Version, done: Completion) {
        let version = self.projected_version(target).max(needed);
        self.store.commit(target, version, done);
    }

    /// I/O completion path: the write of `target` finished with `status`.
    pub fn finish_commit(&mut self, target: CommitTarget, status: CommitStatus) -> usize {
        self.store.finish(target, status)
    }

    /// Finishes every in-flight write, including writes queued behind them.
    pub fn finish_all_commits(&mut self, status: CommitStatus) -> usize {
        let mut fired = 0;
        while self.store.has_pending() {
            for target in self.store.pending() {
                fired += self.store.finish(target, status.clone());
            }
        }
        fired
    }

    pub fn pending_commits(&self) -> Vec<CommitTarget> {
        self.store.pending()
    }

    /// Treats the whole in-memory state as durable, as when it was just
    /// loaded from the primary store.
    pub fn mark_all_committed(&mut self) {
        for inode in self.inodes.values() {
            self.store
                .mark_committed(CommitTarget::Inode(inode.ino), inode.version);
        }
        for (dir, d) in self.dirs.iter() {
            self.store.mark_committed(CommitTarget::Dir(*dir), d.version);
        }
        self.store
            .mark_committed(CommitTarget::InoTable, self.ino_table.version());
    }

    // --- Verification ---

    /// Hash of the namespace state in canonical order. Excludes the primary
    /// store's commit bookkeeping.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();

        let mut inos: Vec<_> = self.inodes.values().collect();
        inos.sort_by_key(|i| i.ino);
        hasher.update(&(inos.len() as u64).to_le_bytes());
        for inode in inos {
            hasher.update(&inode.ino.0.to_le_bytes());
            hasher.update(&inode.version.0.to_le_bytes());
            hasher.update(&inode.attrs.size.to_le_bytes());
            hasher.update(&inode.attrs.mode.to_le_bytes());
            hasher.update(&inode.attrs.mtime.to_le_bytes());
        }

        let mut dirs: Vec<_> = self.dirs.iter().collect();
        dirs.sort_by_key(|(ino, _)| **ino);
        hasher.update(&(dirs.len() as u64).to_le_bytes());
        for (ino, d) in dirs {
            hasher.update(&ino.0.to_le_bytes());
            hasher.update(&d.version.0.to_le_bytes());
            hasher.update(&(d.entries.len() as u64).to_le_bytes());
            for (name, target) in d.entries.iter() {
                hasher.update(&(name.len() as u32).to_le_bytes());
                hasher.update(name.as_bytes());
                hasher.update(&target.0.to_le_bytes());
            }
        }

        hasher.update(&self.ino_table.version().0.to_le_bytes());
        hasher.update(&self.ino_table.next_free().0.to_le_bytes());
        for (start, end) in self.ino_table.extents() {
            hasher.update(&start.to_le_bytes());
            hasher.update(&end.to_le_bytes());
        }

        *hasher.finalize().as_bytes()
    }
}

impl Default for MdsState {
    fn default() -> Self {
        Self::new()
    }
}
