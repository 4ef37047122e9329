// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use mds_journal::event::{DirUpdateEvent, StringEvent, UnlinkEvent};
use mds_journal::mds::ROOT_INO;
use mds_journal::types::{InodeAttrs, InodeId, Version};
use mds_journal::{EventKind, JournalError, MdLog, MdsState};
use mds_journal_cli::commands::{inspect, verify};
use mds_journal_cli::scan::{scan_bytes, scan_journal};
use mds_node::journal_file::{JournalFile, HEADER_SIZE};
use std::path::Path;
use tempfile::tempdir;

fn write_fixture(path: &Path) -> Vec<u64> {
    let mut mds = MdsState::new();
    let mut log = MdLog::new(JournalFile::create(path).unwrap());
    let mut ends = Vec::new();
    ends.push(log.submit(StringEvent::new("fixture")).unwrap());
    ends.push(log.submit(mds.link(ROOT_INO, "foo", InodeId(7))).unwrap());
    ends.push(
        log.submit(mds.update_inode(
            InodeId(7),
            InodeAttrs {
                size: 1024,
                ..Default::default()
            },
        ))
        .unwrap(),
    );
    ends.push(log.submit(mds.unlink(ROOT_INO, "foo").unwrap()).unwrap());
    ends
}

#[test]
fn test_integration_workflow() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    let ends = write_fixture(&path);

    let scan = scan_journal(&path).unwrap();
    assert!(scan.is_clean());
    let kinds: Vec<_> = scan.events.iter().map(|e| e.event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::String,
            EventKind::DirUpdate,
            EventKind::InodeUpdate,
            EventKind::Unlink
        ]
    );
    let scanned_ends: Vec<_> = scan.events.iter().map(|e| e.end).collect();
    assert_eq!(scanned_ends, ends);

    assert!(inspect::run(&path, None).is_ok());
    assert!(inspect::run(&path, Some(EventKind::Unlink)).is_ok());
    assert!(verify::run(&path).is_ok());
}

#[test]
fn test_verify_reports_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    let ends = write_fixture(&path);

    let mut data = std::fs::read(&path).unwrap();
    let at = (HEADER_SIZE + ends[0]) as usize;
    data[at..at + 4].copy_from_slice(&42u32.to_le_bytes());
    std::fs::write(&path, &data).unwrap();

    let scan = scan_journal(&path).unwrap();
    assert_eq!(scan.events.len(), 1);
    assert!(matches!(
        scan.error,
        Some(JournalError::UnknownEventType { tag: 42, offset }) if offset == ends[0]
    ));

    // Inspect still lists what it could read; verify fails.
    assert!(inspect::run(&path, None).is_ok());
    assert!(verify::run(&path).is_err());
}

#[test]
fn test_verify_catches_inconsistent_unlink() {
    let mut bytes = Vec::new();
    mds_journal::LogEvent::from(UnlinkEvent::new(ROOT_INO, "ghost", InodeId(9), Version(1)))
        .encode(&mut bytes);
    let scan = scan_bytes(0, &bytes);
    assert!(scan.is_clean());

    // An unlink of a missing dentry replays cleanly.
    let dir = tempdir().unwrap();
    let path = dir.path().join("mds.journal");
    let mut log = MdLog::new(JournalFile::create(&path).unwrap());
    log.submit(UnlinkEvent::new(ROOT_INO, "ghost", InodeId(9), Version(1)))
        .unwrap();
    assert!(verify::run(&path).is_ok());

    // One naming the wrong target does not.
    log.submit(DirUpdateEvent::new(ROOT_INO, "real", InodeId(5), Version(2)))
        .unwrap();
    log.submit(UnlinkEvent::new(ROOT_INO, "real", InodeId(6), Version(3)))
        .unwrap();
    assert!(verify::run(&path).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(verify::run(&dir.path().join("absent.journal")).is_err());
}
