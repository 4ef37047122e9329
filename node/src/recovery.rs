// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Crash Recovery
//!
//! Startup path of the metadata server:
//! - open the journal file (or create an empty one)
//! - replay every live event that is not yet reflected in server state
//! - optionally write the recovered state back and trim the journal

use std::path::Path;
use std::time::Instant;

use mds_journal::{MdLog, MdsState, TrimReport};

use crate::errors::NodeResult;
use crate::journal_file::JournalFile;
use crate::telemetry::{EVENTS_EXPIRED, REPLAY_DURATION};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub decoded: usize,
    pub replayed: usize,
    pub skipped: usize,
    pub start_offset: u64,
    pub end_offset: u64,
    /// Blake3 of the namespace after replay.
    pub state_digest: [u8; 32],
}

/// Replays the journal at `path` into `mds`.
///
/// A missing file is a fresh journal. Any corruption aborts recovery with the
/// offset of the bad record; nothing past it is applied.
pub fn recover_from_journal(
    path: &Path,
    mds: &mut MdsState,
) -> NodeResult<(MdLog<JournalFile>, RecoveryReport)> {
    let span = tracing::info_span!("journal_recovery", path = %path.display());
    let _guard = span.enter();

    let journal = JournalFile::open_or_create(path)?;
    let start = Instant::now();
    let (log, replay) = MdLog::recover(journal, mds)?;
    metrics::histogram!(REPLAY_DURATION, start.elapsed().as_secs_f64());

    let report = RecoveryReport {
        decoded: replay.decoded,
        replayed: replay.replayed,
        skipped: replay.skipped,
        start_offset: replay.start_offset,
        end_offset: replay.end_offset,
        state_digest: mds.digest(),
    };
    tracing::info!(
        decoded = report.decoded,
        replayed = report.replayed,
        end_offset = report.end_offset,
        digest = %blake3::Hash::from(report.state_digest).to_hex(),
        "recovery complete"
    );
    Ok((log, report))
}

/// Commits every live event's effect to the primary store, then trims the
/// journal up to the last of them.
///
/// The primary store here is in-process, so its writes are finished inline.
pub fn write_back_and_trim(
    log: &mut MdLog<JournalFile>,
    mds: &mut MdsState,
) -> NodeResult<TrimReport> {
    let first = log.trim(mds)?;
    let written = mds.finish_all_commits(Ok(()));
    let second = log.trim(mds)?;

    let expired = first.expired + second.expired;
    metrics::counter!(EVENTS_EXPIRED, expired as u64);
    tracing::info!(
        expired,
        written,
        expire_pos = second.expire_pos,
        "journal trimmed after write-back"
    );

    Ok(TrimReport {
        expired,
        retires_issued: first.retires_issued + second.retires_issued,
        retires_failed: first.retires_failed + second.retires_failed,
        expire_pos: second.expire_pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mds_journal::event::StringEvent;
    use mds_journal::types::{InodeAttrs, InodeId};
    use tempfile::tempdir;

    #[test]
    fn test_missing_journal_recovers_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mds.journal");

        let mut mds = MdsState::new();
        let (log, report) = recover_from_journal(&path, &mut mds).unwrap();
        assert_eq!(report.decoded, 0);
        assert_eq!(log.live_len(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_write_back_empties_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mds.journal");

        let mut mds = MdsState::new();
        let (mut log, _) = recover_from_journal(&path, &mut mds).unwrap();
        log.submit(StringEvent::new("boot")).unwrap();
        log.submit(mds.update_inode(InodeId(7), InodeAttrs::default()))
            .unwrap();

        let report = write_back_and_trim(&mut log, &mut mds).unwrap();
        assert_eq!(report.expired, 2);
        assert_eq!(report.expire_pos, log.write_pos());
        assert_eq!(log.live_len(), 0);
    }
}
