// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::event::EventKind;
use crate::mds::MdsError;
use std::io;
use thiserror::Error;

/// Failures surfaced by the journal core.
///
/// Decode errors are fatal for recovery: a record whose boundaries cannot be
/// trusted stops the replay loop instead of being guessed at.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("unknown event type {tag} at offset {offset}")]
    UnknownEventType { tag: u32, offset: u64 },

    #[error("event header truncated at offset {offset}: {remaining} bytes left")]
    TruncatedHeader { offset: u64, remaining: usize },

    #[error("{kind} payload truncated at offset {offset}")]
    Truncated { kind: EventKind, offset: u64 },

    #[error("{kind} payload corrupt at offset {offset}: {reason}")]
    Corrupt {
        kind: EventKind,
        offset: u64,
        reason: String,
    },

    #[error("replay of {kind} ending at {offset:?} failed: {source}")]
    Replay {
        kind: EventKind,
        offset: Option<u64>,
        #[source]
        source: MdsError,
    },

    #[error("sink returned end offset {returned} behind write position {write_pos}")]
    OffsetRegression { returned: u64, write_pos: u64 },

    #[error("journal sink error: {0}")]
    Sink(#[from] io::Error),
}

impl JournalError {
    /// Shifts buffer-relative offsets into the journal's address space.
    pub fn rebase(self, base: u64) -> Self {
        match self {
            JournalError::UnknownEventType { tag, offset } => JournalError::UnknownEventType {
                tag,
                offset: offset + base,
            },
            JournalError::TruncatedHeader { offset, remaining } => JournalError::TruncatedHeader {
                offset: offset + base,
                remaining,
            },
            JournalError::Truncated { kind, offset } => JournalError::Truncated {
                kind,
                offset: offset + base,
            },
            JournalError::Corrupt { kind, offset, reason } => JournalError::Corrupt {
                kind,
                offset: offset + base,
                reason,
            },
            other => other,
        }
    }

    /// True for errors that mean the log bytes themselves cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            JournalError::UnknownEventType { .. }
                | JournalError::TruncatedHeader { .. }
                | JournalError::Truncated { .. }
                | JournalError::Corrupt { .. }
        )
    }
}

pub type JournalResult<T> = std::result::Result<T, JournalError>;

/// Failure status delivered through a retire completion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("primary store write failed: {0}")]
    Io(String),

    #[error("completion dropped before the commit finished")]
    Abandoned,
}

pub type CommitStatus = std::result::Result<(), CommitError>;
