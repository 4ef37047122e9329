// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Journal manager.
//!
//! Owns the live (unexpired) events of one journal and drives them through
//! their lifecycle:
//!
//! ```text
//! submit ─► encode ─► sink.append ─► end_offset set
//! trim   ─► expire oldest-first while can_expire
//!        ─► retire the rest (at most once in flight per event)
//!        ─► sink.trim(end_offset of last expired)
//! recover ─► decode back-to-back ─► replay unless has_happened
//! ```
//!
//! Retire completions may fire inside `retire` or later from the primary
//! store's I/O path. Either way they land on a channel drained by
//! `poll_retired`, so the manager never assumes synchronous completion.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::codec;
use crate::completion::Completion;
use crate::error::{CommitError, CommitStatus, JournalError, JournalResult};
use crate::event::LogEvent;
use crate::mds::MdsState;

pub mod sink;

pub use sink::{LogSink, MemorySink};

#[derive(Clone, Debug, PartialEq, Eq)]
enum RetireState {
    Idle,
    InFlight,
    Retired,
    Failed(CommitError),
}

#[derive(Debug)]
struct LiveEvent {
    event: LogEvent,
    retire: RetireState,
}

/// Outcome of one `trim` pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrimReport {
    /// Events dropped from the log.
    pub expired: usize,
    /// Retires issued during this pass.
    pub retires_issued: usize,
    /// Retire completions that reported failure since the previous pass.
    pub retires_failed: usize,
    pub expire_pos: u64,
}

/// Outcome of replaying a journal into server state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub decoded: usize,
    pub replayed: usize,
    pub skipped: usize,
    pub start_offset: u64,
    pub end_offset: u64,
}

pub struct MdLog<S: LogSink> {
    sink: S,
    live: VecDeque<LiveEvent>,
    write_pos: u64,
    retired_tx: Sender<(u64, CommitStatus)>,
    retired_rx: Receiver<(u64, CommitStatus)>,
}

impl<S: LogSink> MdLog<S> {
    /// Manager over a sink with no live events. Use `recover` for a sink
    /// that already holds a journal.
    pub fn new(sink: S) -> Self {
        let (retired_tx, retired_rx) = mpsc::channel();
        let write_pos = sink.write_pos();
        Self {
            sink,
            live: VecDeque::new(),
            write_pos,
            retired_tx,
            retired_rx,
        }
    }

    /// Decodes every live event in `sink` in order and replays the ones
    /// that have not happened yet. The decoded events stay live.
    ///
    /// Stops at the first corrupt record; nothing after it is applied.
    pub fn recover(mut sink: S, mds: &mut MdsState) -> JournalResult<(Self, ReplayReport)> {
        let (base, bytes) = sink.read_live()?;
        let mut log = Self::new(sink);
        let mut report = ReplayReport {
            start_offset: base,
            end_offset: base,
            ..Default::default()
        };

        let mut cursor = Cursor::new(bytes.as_slice());
        while codec::remaining(&cursor) > 0 {
            let mut event = LogEvent::decode_from(&mut cursor).map_err(|e| {
                tracing::error!(error = %e, "journal replay stopped at corrupt record");
                e.rebase(base)
            })?;
            let end = base + cursor.position();
            event.set_end_offset(end);
            report.decoded += 1;

            if event.has_happened(mds) {
                tracing::trace!(%event, "already applied");
                report.skipped += 1;
            } else {
                tracing::debug!(%event, "replaying");
                event.replay(mds)?;
                report.replayed += 1;
            }

            report.end_offset = end;
            log.live.push_back(LiveEvent {
                event,
                retire: RetireState::Idle,
            });
        }

        log.write_pos = report.end_offset;
        tracing::info!(
            decoded = report.decoded,
            replayed = report.replayed,
            skipped = report.skipped,
            "journal replay complete"
        );
        Ok((log, report))
    }

    /// Encodes and appends `event`, recording where it ends.
    pub fn submit(&mut self, event: impl Into<LogEvent>) -> JournalResult<u64> {
        let mut event = event.into();
        let mut buf = Vec::new();
        event.encode(&mut buf);

        let end = self.sink.append(&buf)?;
        if end < self.write_pos {
            return Err(JournalError::OffsetRegression {
                returned: end,
                write_pos: self.write_pos,
            });
        }
        event.set_end_offset(end);
        self.write_pos = end;

        tracing::debug!(%event, "journaled");
        self.live.push_back(LiveEvent {
            event,
            retire: RetireState::Idle,
        });
        Ok(end)
    }

    /// Drains retire completions that have fired, returning them as
    /// `(end_offset, status)` pairs.
    pub fn poll_retired(&mut self) -> Vec<(u64, CommitStatus)> {
        let outcomes: Vec<_> = self.retired_rx.try_iter().collect();
        for (end, status) in outcomes.iter() {
            // Already expired events are no longer tracked.
            let Some(entry) = self
                .live
                .iter_mut()
                .find(|e| e.event.end_offset() == Some(*end))
            else {
                continue;
            };
            entry.retire = match status {
                Ok(()) => RetireState::Retired,
                Err(e) => {
                    tracing::warn!(event = %entry.event, error = %e, "retire failed");
                    RetireState::Failed(e.clone())
                }
            };
        }
        outcomes
    }

    /// Expires every event at the head of the log whose effect is durable,
    /// then retires the events still blocked so a later pass can expire them.
    ///
    /// Events leave the log only after the sink has accepted the new expire
    /// position.
    pub fn trim(&mut self, mds: &mut MdsState) -> JournalResult<TrimReport> {
        let mut report = TrimReport::default();
        report.retires_failed = self
            .poll_retired()
            .iter()
            .filter(|(_, status)| status.is_err())
            .count();

        for entry in self.live.iter_mut() {
            if entry.event.can_expire(mds) {
                continue;
            }
            match entry.retire {
                RetireState::Idle | RetireState::Failed(_) => {}
                RetireState::InFlight => continue,
                RetireState::Retired => {
                    tracing::warn!(event = %entry.event, "retired event still not expirable, re-arming");
                }
            }
            let Some(end) = entry.event.end_offset() else {
                continue;
            };
            entry.retire = RetireState::InFlight;
            let tx = self.retired_tx.clone();
            entry.event.retire(
                mds,
                Completion::new(move |status| {
                    // The manager may be gone by the time a late write lands.
                    let _ = tx.send((end, status));
                }),
            );
            report.retires_issued += 1;
        }

        // Retires that completed synchronously may have unblocked the head.
        self.poll_retired();

        let (count, expire_to) = self.expirable_prefix(mds);
        if let Some(end) = expire_to {
            self.sink.trim(end)?;
            self.live.drain(..count);
            report.expired = count;
            tracing::debug!(expired = count, expire_pos = end, "journal trimmed");
        }
        report.expire_pos = self.sink.expire_pos();
        Ok(report)
    }

    /// Length of the expirable run at the head and the end offset of its last
    /// event.
    fn expirable_prefix(&self, mds: &MdsState) -> (usize, Option<u64>) {
        let mut count = 0;
        let mut expire_to = None;
        for entry in self.live.iter() {
            if !entry.event.can_expire(mds) {
                break;
            }
            count += 1;
            expire_to = entry.event.end_offset();
        }
        (count, expire_to)
    }

    pub fn live_events(&self) -> impl Iterator<Item = &LogEvent> {
        self.live.iter().map(|e| &e.event)
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// Live events with a retire still waiting on the primary store.
    pub fn retires_in_flight(&self) -> usize {
        self.live
            .iter()
            .filter(|e| e.retire == RetireState::InFlight)
            .count()
    }

    pub fn write_pos(&self) -> u64 {
        self.write_pos
    }

    pub fn expire_pos(&self) -> u64 {
        self.sink.expire_pos()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
