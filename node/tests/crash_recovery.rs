// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use mds_journal::event::{EventKind, StringEvent};
use mds_journal::mds::ROOT_INO;
use mds_journal::types::{InodeAttrs, InodeId};
use mds_journal::{JournalError, LogSink, MdLog, MdsState};
use mds_node::errors::NodeError;
use mds_node::journal_file::{JournalFile, HEADER_SIZE};
use mds_node::recovery::{recover_from_journal, write_back_and_trim};
use std::fs::OpenOptions;
use tempfile::tempdir;

/// Runs a small workload against a fresh journal and returns the live state
/// plus the end offset of every event.
fn write_workload(path: &std::path::Path) -> (MdsState, Vec<u64>) {
    let mut mds = MdsState::new();
    let mut log = MdLog::new(JournalFile::create(path).unwrap());
    let mut ends = Vec::new();

    ends.push(log.submit(StringEvent::new("mds.a boot")).unwrap());
    let alloc = mds.alloc_inos(3).unwrap();
    let first = alloc.start;
    ends.push(log.submit(alloc).unwrap());
    for i in 0..3u64 {
        let ino = InodeId(first.0 + i);
        ends.push(log.submit(mds.link(ROOT_INO, &format!("f{}", i), ino)).unwrap());
        ends.push(
            log.submit(mds.update_inode(
                ino,
                InodeAttrs {
                    size: 512 * (i + 1),
                    mode: 0o100600,
                    mtime: 99,
                },
            ))
            .unwrap(),
        );
    }
    ends.push(log.submit(mds.unlink(ROOT_INO, "f1").unwrap()).unwrap());
    (mds, ends)
}

#[test]
fn test_restart_replays_to_same_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    let (live, ends) = write_workload(&path);

    let mut restarted = MdsState::new();
    let (log, report) = recover_from_journal(&path, &mut restarted).unwrap();

    assert_eq!(report.decoded, ends.len());
    assert_eq!(report.end_offset, *ends.last().unwrap());
    assert_eq!(report.state_digest, live.digest());
    assert_eq!(restarted.lookup(ROOT_INO, "f1"), None);
    assert!(restarted.lookup(ROOT_INO, "f2").is_some());

    let offsets: Vec<_> = log.live_events().filter_map(|e| e.end_offset()).collect();
    assert_eq!(offsets, ends);
}

#[test]
fn test_torn_tail_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    let (_, ends) = write_workload(&path);

    let full = std::fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(full - 1).unwrap();

    let mut mds = MdsState::new();
    let err = recover_from_journal(&path, &mut mds).err().unwrap();
    assert!(err.is_corruption());
    match err {
        NodeError::Journal(JournalError::Truncated { kind, offset }) => {
            assert_eq!(kind, EventKind::Unlink);
            assert_eq!(offset, ends[ends.len() - 2]);
        }
        other => panic!("expected truncation, got {}", other),
    }
}

#[test]
fn test_bad_tag_stops_replay() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    let (_, ends) = write_workload(&path);

    // Overwrite the tag of the third event.
    let mut data = std::fs::read(&path).unwrap();
    let at = (HEADER_SIZE + ends[1]) as usize;
    data[at..at + 4].copy_from_slice(&0xdead_u32.to_le_bytes());
    std::fs::write(&path, &data).unwrap();

    let mut mds = MdsState::new();
    match recover_from_journal(&path, &mut mds) {
        Err(NodeError::Journal(JournalError::UnknownEventType { tag, offset })) => {
            assert_eq!(tag, 0xdead);
            assert_eq!(offset, ends[1]);
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("replay accepted a bad tag"),
    }
    // The allocation before the bad record was applied, the links after it were not.
    assert_eq!(mds.ino_table().allocated_count(), 3);
    assert_eq!(mds.lookup(ROOT_INO, "f0"), None);
}

#[test]
fn test_trim_persists_across_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    write_workload(&path);

    let mut mds = MdsState::new();
    let (mut log, _) = recover_from_journal(&path, &mut mds).unwrap();
    let trimmed = write_back_and_trim(&mut log, &mut mds).unwrap();
    assert_eq!(trimmed.expire_pos, log.write_pos());

    let tail = log
        .submit(mds.update_inode(InodeId(0x1000), InodeAttrs::default()))
        .unwrap();
    drop(log);

    let journal = JournalFile::open(&path).unwrap();
    assert_eq!(journal.expire_pos(), trimmed.expire_pos);
    drop(journal);

    let mut restarted = MdsState::new();
    let (_, report) = recover_from_journal(&path, &mut restarted).unwrap();
    assert_eq!(report.decoded, 1);
    assert_eq!(report.start_offset, trimmed.expire_pos);
    assert_eq!(report.end_offset, tail);
}

#[test]
fn test_damaged_header_refuses_to_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    write_workload(&path);

    let mut data = std::fs::read(&path).unwrap();
    data[10] ^= 0xff;
    std::fs::write(&path, &data).unwrap();

    let mut mds = MdsState::new();
    let err = recover_from_journal(&path, &mut mds).err().unwrap();
    assert!(matches!(err, NodeError::InvalidHeader(_)));
    assert!(err.is_corruption());
}
