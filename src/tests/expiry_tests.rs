// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::{Arc, Mutex};

use crate::completion::Completion;
use crate::error::{CommitError, CommitStatus};
use crate::event::{InodeUpdateEvent, LogEvent, StringEvent};
use crate::mds::{CommitTarget, MdsState, ROOT_INO};
use crate::types::{InodeAttrs, InodeId, Version};

type Seen = Arc<Mutex<Vec<CommitStatus>>>;

fn recorder() -> (Seen, impl Fn() -> Completion) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let handle = seen.clone();
    let make = move || {
        let log = handle.clone();
        Completion::new(move |status| log.lock().unwrap().push(status))
    };
    (seen, make)
}

#[test]
fn test_marker_expires_and_retires_immediately() {
    let mut mds = MdsState::new();
    let ev = LogEvent::from(StringEvent::new("note"));
    assert!(ev.can_expire(&mds));

    let (seen, done) = recorder();
    ev.retire(&mut mds, done());
    assert_eq!(*seen.lock().unwrap(), vec![Ok(())]);
    assert!(!mds.store().has_pending());
}

#[test]
fn test_inode_update_expires_after_commit() {
    let mut mds = MdsState::new();
    let ev = LogEvent::from(mds.update_inode(
        InodeId(7),
        InodeAttrs {
            size: 1024,
            ..Default::default()
        },
    ));
    assert!(!ev.can_expire(&mds));

    let (seen, done) = recorder();
    ev.retire(&mut mds, done());
    assert!(seen.lock().unwrap().is_empty());
    assert!(!ev.can_expire(&mds));

    assert_eq!(mds.finish_commit(CommitTarget::Inode(InodeId(7)), Ok(())), 1);
    assert!(ev.can_expire(&mds));

    // Nothing left in flight: a second finish fires nobody.
    assert_eq!(mds.finish_commit(CommitTarget::Inode(InodeId(7)), Ok(())), 0);
    assert_eq!(*seen.lock().unwrap(), vec![Ok(())]);
}

#[test]
fn test_retire_covers_event_version_not_state_version() {
    // State that never applied the update: its projected version is 0.
    let mut mds = MdsState::new();
    let ev = LogEvent::from(InodeUpdateEvent::new(
        InodeId(7),
        Version(1),
        InodeAttrs {
            size: 1024,
            ..Default::default()
        },
    ));
    assert!(!ev.can_expire(&mds));

    let (seen, done) = recorder();
    ev.retire(&mut mds, done());
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(mds.pending_commits(), vec![CommitTarget::Inode(InodeId(7))]);

    mds.finish_commit(CommitTarget::Inode(InodeId(7)), Ok(()));
    assert_eq!(*seen.lock().unwrap(), vec![Ok(())]);
    assert!(ev.can_expire(&mds));
}

#[test]
fn test_retire_after_commit_fires_synchronously() {
    let mut mds = MdsState::new();
    let ev = LogEvent::from(mds.link(ROOT_INO, "etc", InodeId(0x1001)));
    mds.mark_all_committed();
    assert!(ev.can_expire(&mds));

    let (seen, done) = recorder();
    ev.retire(&mut mds, done());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_older_update_rides_newer_write() {
    let mut mds = MdsState::new();
    let first = LogEvent::from(mds.update_inode(InodeId(3), InodeAttrs::default()));
    let second = LogEvent::from(mds.update_inode(
        InodeId(3),
        InodeAttrs {
            size: 1,
            ..Default::default()
        },
    ));

    let (seen, done) = recorder();
    first.retire(&mut mds, done());
    second.retire(&mut mds, done());

    // Both ask for the projected version, so one write covers them.
    assert_eq!(mds.finish_commit(CommitTarget::Inode(InodeId(3)), Ok(())), 2);
    assert!(first.can_expire(&mds));
    assert!(second.can_expire(&mds));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn test_failed_commit_keeps_event_live() {
    let mut mds = MdsState::new();
    let ev = LogEvent::from(mds.alloc_inos(8).unwrap());

    let (seen, done) = recorder();
    ev.retire(&mut mds, done());
    mds.finish_commit(CommitTarget::InoTable, Err(CommitError::Io("ENOSPC".into())));

    assert!(!ev.can_expire(&mds));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Err(CommitError::Io("ENOSPC".into()))]
    );
}

#[test]
fn test_dropped_store_abandons_waiters() {
    let mut mds = MdsState::new();
    assert!(mds.unlink(ROOT_INO, "missing").is_none());
    let ev = LogEvent::from(mds.link(ROOT_INO, "tmp", InodeId(0x2000)));

    let (seen, done) = recorder();
    ev.retire(&mut mds, done());
    drop(mds);
    assert_eq!(*seen.lock().unwrap(), vec![Err(CommitError::Abandoned)]);
}
