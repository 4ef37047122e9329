// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Inode number allocator.

use core::cmp::{max, min};
use std::collections::BTreeMap;

use super::MdsError;
use crate::event::AllocOp;
use crate::types::{InodeId, Version};

/// Hands out inode numbers from a high-water mark and tracks which are live.
/// Every change bumps the table version; the journal records that version
/// so replay can tell whether a logged change is already reflected.
///
/// Live numbers are kept as disjoint, non-adjacent `start -> end` extents,
/// so a table's memory follows the number of extents, not their length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InoTable {
    version: Version,
    next: u64,
    allocated: BTreeMap<u64, u64>,
}

impl InoTable {
    pub fn new(first_free: InodeId) -> Self {
        Self {
            version: Version(0),
            next: first_free.0,
            allocated: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// First number never handed out.
    pub fn next_free(&self) -> InodeId {
        InodeId(self.next)
    }

    pub fn is_allocated(&self, ino: InodeId) -> bool {
        self.allocated
            .range(..=ino.0)
            .next_back()
            .map_or(false, |(_, &end)| ino.0 < end)
    }

    pub fn allocated_count(&self) -> u64 {
        self.allocated.iter().map(|(start, end)| end - start).sum()
    }

    /// Live extents as `(start, end)` pairs, `end` exclusive, in order.
    pub(crate) fn extents(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.allocated.iter().map(|(&start, &end)| (start, end))
    }

    /// Takes `len` fresh numbers. Returns the first one and the new version.
    pub(crate) fn allocate(&mut self, len: u32) -> Result<(InodeId, Version), MdsError> {
        let start = InodeId(self.next);
        let end = extent_end(start, len)?;
        self.insert_range(start.0, end);
        self.next = end;
        self.version = self.version.next();
        Ok((start, self.version))
    }

    /// Returns `len` numbers starting at `start`.
    pub(crate) fn release(&mut self, start: InodeId, len: u32) -> Result<Version, MdsError> {
        let end = extent_end(start, len)?;
        self.remove_range(start.0, end);
        self.version = self.version.next();
        Ok(self.version)
    }

    /// Re-applies a logged change. Safe to repeat.
    pub(crate) fn apply(
        &mut self,
        op: AllocOp,
        start: InodeId,
        len: u32,
        version: Version,
    ) -> Result<(), MdsError> {
        let end = extent_end(start, len)?;
        match op {
            AllocOp::Alloc => {
                self.insert_range(start.0, end);
                self.next = max(self.next, end);
            }
            AllocOp::Free => self.remove_range(start.0, end),
        }
        self.version = max(self.version, version);
        Ok(())
    }

    /// Marks `start..end` live, merging with every extent it touches.
    fn insert_range(&mut self, start: u64, end: u64) {
        let mut lo = start;
        let mut hi = end;
        if let Some((&s, &e)) = self.allocated.range(..=start).next_back() {
            if e >= start {
                lo = s;
                hi = max(hi, e);
            }
        }
        let touched: Vec<u64> = self
            .allocated
            .range(lo..=hi)
            .map(|(&s, _)| s)
            .collect();
        for s in touched {
            if let Some(e) = self.allocated.remove(&s) {
                hi = max(hi, e);
            }
        }
        self.allocated.insert(lo, hi);
    }

    /// Marks `start..end` free, splitting the extents it cuts.
    fn remove_range(&mut self, start: u64, end: u64) {
        let mut cut = Vec::new();
        if let Some((&s, &e)) = self.allocated.range(..start).next_back() {
            if e > start {
                cut.push((s, e));
            }
        }
        cut.extend(
            self.allocated
                .range(start..end)
                .map(|(&s, &e)| (s, e)),
        );
        for (s, e) in cut {
            self.allocated.remove(&s);
            if s < start {
                self.allocated.insert(s, min(e, start));
            }
            if e > end {
                self.allocated.insert(end, e);
            }
        }
    }
}

fn extent_end(start: InodeId, len: u32) -> Result<u64, MdsError> {
    if len == 0 {
        return Err(MdsError::InvalidExtent { start, len });
    }
    start
        .0
        .checked_add(len as u64)
        .ok_or(MdsError::InvalidExtent { start, len })
}
