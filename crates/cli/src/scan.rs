// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read-only walk over a journal's live events.

use std::io::Cursor;
use std::path::Path;

use mds_journal::{JournalError, LogEvent, LogSink};
use mds_node::journal_file::JournalFile;

pub struct ScannedEvent {
    pub start: u64,
    pub end: u64,
    pub event: LogEvent,
}

/// Events decoded before the first bad record, and that record's error.
pub struct Scan {
    pub expire_pos: u64,
    pub write_pos: u64,
    pub events: Vec<ScannedEvent>,
    pub error: Option<JournalError>,
}

impl Scan {
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }
}

pub fn scan_journal(path: &Path) -> anyhow::Result<Scan> {
    let mut journal = JournalFile::open(path)?;
    let (base, bytes) = journal.read_live()?;
    Ok(scan_bytes(base, &bytes))
}

pub fn scan_bytes(base: u64, bytes: &[u8]) -> Scan {
    let mut cursor = Cursor::new(bytes);
    let mut events = Vec::new();
    let mut error = None;

    while (cursor.position() as usize) < bytes.len() {
        let start = base + cursor.position();
        match LogEvent::decode_from(&mut cursor) {
            Ok(event) => events.push(ScannedEvent {
                start,
                end: base + cursor.position(),
                event,
            }),
            Err(e) => {
                error = Some(e.rebase(base));
                break;
            }
        }
    }

    Scan {
        expire_pos: base,
        write_pos: base + bytes.len() as u64,
        events,
        error,
    }
}
