// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Primary store commit tracking.
//!
//! Models the asynchronous write path of the server's authoritative object
//! store. A commit request names a target and the version it needs; the
//! completion fires when a write covering that version finishes. Writes are
//! finished by the I/O path (`finish`), possibly long after the request.

use core::cmp::max;
use rustc_hash::FxHashMap;

use crate::completion::Completion;
use crate::error::CommitStatus;
use crate::types::{InodeId, Version};

/// An object the primary store writes as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommitTarget {
    Inode(InodeId),
    Dir(InodeId),
    InoTable,
}

struct PendingWrite {
    version: Version,
    waiters: Vec<Completion>,
}

/// The write on the device plus, at most, one write queued behind it for
/// waiters needing a newer version than the one already in flight.
struct InFlight {
    current: PendingWrite,
    queued: Option<PendingWrite>,
}

#[derive(Default)]
pub struct PrimaryStore {
    committed: FxHashMap<CommitTarget, Version>,
    in_flight: FxHashMap<CommitTarget, InFlight>,
}

impl PrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed_version(&self, target: CommitTarget) -> Version {
        self.committed.get(&target).copied().unwrap_or_default()
    }

    pub fn is_committed(&self, target: CommitTarget, version: Version) -> bool {
        self.committed_version(target) >= version
    }

    /// Records `version` as durable without a write (state loaded from the store).
    pub fn mark_committed(&mut self, target: CommitTarget, version: Version) {
        let slot = self.committed.entry(target).or_default();
        *slot = max(*slot, version);
    }

    /// Requests that `target` be durable at `version` or newer.
    ///
    /// Completes `done` immediately when that is already true; otherwise it
    /// waits on the in-flight write or on the one queued behind it.
    pub fn commit(&mut self, target: CommitTarget, version: Version, done: Completion) {
        if self.is_committed(target, version) {
            done.complete(Ok(()));
            return;
        }

        match self.in_flight.get_mut(&target) {
            None => {
                tracing::debug!(?target, %version, "primary store write issued");
                self.in_flight.insert(
                    target,
                    InFlight {
                        current: PendingWrite {
                            version,
                            waiters: vec![done],
                        },
                        queued: None,
                    },
                );
            }
            Some(flight) if flight.current.version >= version => {
                flight.current.waiters.push(done);
            }
            Some(flight) => {
                let next = flight.queued.get_or_insert_with(|| PendingWrite {
                    version,
                    waiters: Vec::new(),
                });
                next.version = max(next.version, version);
                next.waiters.push(done);
            }
        }
    }

    /// Finishes the in-flight write of `target` and fires its waiters with
    /// `status`. A queued write becomes the new in-flight write.
    ///
    /// Returns the number of completions fired.
    pub fn finish(&mut self, target: CommitTarget, status: CommitStatus) -> usize {
        let Some(flight) = self.in_flight.remove(&target) else {
            return 0;
        };

        match &status {
            Ok(()) => self.mark_committed(target, flight.current.version),
            Err(e) => tracing::warn!(?target, version = %flight.current.version, "primary store write failed: {}", e),
        }

        let fired = flight.current.waiters.len();
        for waiter in flight.current.waiters {
            waiter.complete(status.clone());
        }

        if let Some(next) = flight.queued {
            self.in_flight.insert(
                target,
                InFlight {
                    current: next,
                    queued: None,
                },
            );
        }

        fired
    }

    /// Targets with a write in flight, in a stable order.
    pub fn pending(&self) -> Vec<CommitTarget> {
        let mut targets: Vec<_> = self.in_flight.keys().copied().collect();
        targets.sort();
        targets
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }
}
