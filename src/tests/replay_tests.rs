// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::JournalError;
use crate::event::{
    AllocEvent, AllocOp, EventKind, EventPayload, InodeUpdateEvent, LogEvent, StringEvent,
    UnlinkEvent,
};
use crate::journal::{MdLog, MemorySink};
use crate::mds::{MdsError, MdsState, ROOT_INO};
use crate::types::{InodeAttrs, InodeId, Version};

/// Builds a small namespace through live mutations and journals every step.
fn journaled_workload() -> (MdsState, MemorySink) {
    let mut mds = MdsState::new();
    let mut log = MdLog::new(MemorySink::new());

    log.submit(StringEvent::new("mds.a up")).unwrap();
    let alloc = mds.alloc_inos(4).unwrap();
    let first = alloc.start;
    log.submit(alloc).unwrap();

    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        let ino = InodeId(first.0 + i as u64);
        log.submit(mds.link(ROOT_INO, name, ino)).unwrap();
        log.submit(mds.update_inode(
            ino,
            InodeAttrs {
                size: 100 * (i as u64 + 1),
                mode: 0o100644,
                mtime: 10 + i as u64,
            },
        ))
        .unwrap();
    }

    let gone = mds.unlink(ROOT_INO, "b").unwrap();
    log.submit(gone).unwrap();
    log.submit(mds.free_inos(InodeId(first.0 + 3), 1).unwrap()).unwrap();

    (mds, log.into_sink())
}

#[test]
fn test_recovery_rebuilds_live_state() {
    let (live, sink) = journaled_workload();
    let mut recovered = MdsState::new();
    let (_, report) = MdLog::recover(sink, &mut recovered).unwrap();

    assert_eq!(report.decoded, 10);
    assert_eq!(report.replayed, 9);
    assert_eq!(report.skipped, 1);
    assert_eq!(recovered.digest(), live.digest());
    assert_eq!(recovered.lookup(ROOT_INO, "b"), None);
}

#[test]
fn test_second_replay_changes_nothing() {
    let (_, sink) = journaled_workload();
    let mut mds = MdsState::new();
    let (log, _) = MdLog::recover(sink, &mut mds).unwrap();
    let after_first = mds.digest();

    let sink = MemorySink::from_bytes(0, log.sink().live_bytes().to_vec());
    let (_, report) = MdLog::recover(sink, &mut mds).unwrap();
    assert_eq!(report.replayed, 0);
    assert_eq!(report.skipped, report.decoded);
    assert_eq!(mds.digest(), after_first);
}

#[test]
fn test_forced_double_apply_is_harmless() {
    let mut mds = MdsState::new();
    let update = InodeUpdateEvent::new(
        InodeId(9),
        Version(4),
        InodeAttrs {
            size: 4096,
            ..Default::default()
        },
    );
    let alloc = AllocEvent::new(AllocOp::Alloc, InodeId(0x1000), 8, Version(1));

    update.replay(&mut mds).unwrap();
    alloc.replay(&mut mds).unwrap();
    let once = mds.digest();

    update.replay(&mut mds).unwrap();
    alloc.replay(&mut mds).unwrap();
    assert_eq!(mds.digest(), once);
}

#[test]
fn test_stale_event_has_happened() {
    let mut mds = MdsState::new();
    mds.update_inode(InodeId(5), InodeAttrs::default());
    mds.update_inode(InodeId(5), InodeAttrs::default());

    let old = LogEvent::from(InodeUpdateEvent::new(
        InodeId(5),
        Version(1),
        InodeAttrs {
            size: 1,
            ..Default::default()
        },
    ));
    assert!(old.has_happened(&mds));

    // Applying it anyway must not roll the inode back.
    old.body().replay(&mut mds).unwrap();
    assert_eq!(mds.inode(InodeId(5)).unwrap().version, Version(2));
    assert_eq!(mds.inode(InodeId(5)).unwrap().attrs.size, 0);
}

#[test]
fn test_widest_alloc_replays_and_frees() {
    let mut bytes = Vec::new();
    let start = InodeId(0x1000);
    LogEvent::from(AllocEvent::new(AllocOp::Alloc, start, u32::MAX, Version(1)))
        .encode(&mut bytes);
    LogEvent::from(AllocEvent::new(AllocOp::Free, InodeId(0x2000), 16, Version(2)))
        .encode(&mut bytes);

    let mut mds = MdsState::new();
    let (log, report) = MdLog::recover(MemorySink::from_bytes(0, bytes), &mut mds).unwrap();
    assert_eq!(report.replayed, 2);
    assert_eq!(log.live_len(), 2);

    let table = mds.ino_table();
    assert_eq!(table.allocated_count(), u32::MAX as u64 - 16);
    assert!(!table.is_allocated(InodeId(0x2000)));
    assert!(table.is_allocated(InodeId(0x2010)));
    assert_eq!(table.next_free(), InodeId(0x1000 + u32::MAX as u64));
    assert_eq!(table.version(), Version(2));
}

#[test]
fn test_unlink_of_wrong_target_fails_replay() {
    let mut mds = MdsState::new();
    mds.link(ROOT_INO, "a", InodeId(5));

    let ev = LogEvent::from(UnlinkEvent::new(ROOT_INO, "a", InodeId(6), Version(2)));
    assert!(!ev.has_happened(&mds));
    match ev.replay(&mut mds) {
        Err(JournalError::Replay {
            kind: EventKind::Unlink,
            source: MdsError::DentryMismatch { found, .. },
            ..
        }) => assert_eq!(found, InodeId(5)),
        other => panic!("expected dentry mismatch, got {:?}", other),
    }
    assert_eq!(mds.lookup(ROOT_INO, "a"), Some(InodeId(5)));
}

#[test]
fn test_replay_stops_at_corrupt_record() {
    let mut bytes = Vec::new();
    LogEvent::from(crate::event::DirUpdateEvent::new(
        ROOT_INO,
        "kept",
        InodeId(0x1000),
        Version(1),
    ))
    .encode(&mut bytes);
    let bad_at = bytes.len() as u64;
    bytes.extend_from_slice(&77u32.to_le_bytes());
    LogEvent::from(crate::event::DirUpdateEvent::new(
        ROOT_INO,
        "lost",
        InodeId(0x1001),
        Version(2),
    ))
    .encode(&mut bytes);

    let mut mds = MdsState::new();
    let err = MdLog::recover(MemorySink::from_bytes(0, bytes), &mut mds)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        JournalError::UnknownEventType { tag: 77, offset } if offset == bad_at
    ));
    assert_eq!(mds.lookup(ROOT_INO, "kept"), Some(InodeId(0x1000)));
    assert_eq!(mds.lookup(ROOT_INO, "lost"), None);
}
