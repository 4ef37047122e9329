// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! mds-journal: the event core of a metadata server's write-ahead journal.
//!
//! Every namespace mutation is journaled as a tagged `LogEvent` before it is
//! durable in the primary store. Events know how to encode themselves, when
//! their bytes can be dropped (`can_expire`), how to push the primary store
//! towards that point (`retire`), and how to re-apply themselves after a
//! crash (`has_happened` / `replay`).

pub mod codec;
pub mod completion;
pub mod error;
pub mod event;
pub mod journal;
pub mod mds;
pub mod types;

pub use completion::Completion;
pub use error::{CommitError, CommitStatus, JournalError, JournalResult};
pub use event::{EventBody, EventKind, EventPayload, LogEvent};
pub use journal::{LogSink, MdLog, MemorySink, ReplayReport, TrimReport};
pub use mds::{CommitTarget, MdsState};

#[cfg(test)]
pub mod tests;
