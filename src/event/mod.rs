// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Journal events.
//!
//! Every metadata mutation the server makes is recorded as one `LogEvent`
//! before it is considered durable.
//!
//! # Wire form
//! ```text
//! [tag: u32 LE][payload...]
//! ```
//! The tag selects the payload decoder. Payloads are self-delimiting, so a
//! run of events parses back-to-back from one cursor with no extra framing.
//!
//! # Lifecycle
//! - encoded and appended by the journal manager, which records `end_offset`
//! - kept until `can_expire` holds; `retire` pushes the primary store there
//! - on recovery, decoded in order and replayed unless `has_happened`

use core::fmt;
use std::io::{self, Cursor};

use crate::codec::{self, Reader};
use crate::completion::Completion;
use crate::error::{JournalError, JournalResult};
use crate::mds::{MdsError, MdsState};

pub mod alloc;
pub mod dir_update;
pub mod inode_update;
pub mod string;
pub mod unlink;

pub use self::alloc::{AllocEvent, AllocOp};
pub use self::dir_update::DirUpdateEvent;
pub use self::inode_update::InodeUpdateEvent;
pub use self::string::StringEvent;
pub use self::unlink::UnlinkEvent;

/// Size of the type tag preceding every payload.
pub const TAG_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum EventKind {
    String = 1,
    InodeUpdate = 2,
    DirUpdate = 3,
    Unlink = 4,
    Alloc = 5,
}

impl EventKind {
    pub const fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(EventKind::String),
            2 => Some(EventKind::InodeUpdate),
            3 => Some(EventKind::DirUpdate),
            4 => Some(EventKind::Unlink),
            5 => Some(EventKind::Alloc),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::String => "String",
            EventKind::InodeUpdate => "InodeUpdate",
            EventKind::DirUpdate => "DirUpdate",
            EventKind::Unlink => "Unlink",
            EventKind::Alloc => "Alloc",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behaviour every concrete event supplies.
///
/// `has_happened` and `retire` default to the "nothing pending" answers.
/// `can_expire` and `replay` have no default: each variant states its expiry
/// policy and its state effect explicitly.
pub trait EventPayload: Sized + fmt::Display {
    const KIND: EventKind;

    /// Appends the payload (not the tag) to `buf`.
    fn encode_payload(&self, buf: &mut Vec<u8>);

    /// Reads one payload, leaving the cursor just past it.
    fn decode_payload(cursor: &mut Reader<'_>) -> io::Result<Self>;

    /// Is the effect already committed to the primary store?
    fn can_expire(&self, mds: &MdsState) -> bool;

    /// Arranges for `done` to fire once this event is expirable.
    fn retire(&self, mds: &mut MdsState, done: Completion) {
        let _ = mds;
        done.complete(Ok(()));
    }

    /// Is the effect already reflected in server state?
    fn has_happened(&self, mds: &MdsState) -> bool {
        let _ = mds;
        true
    }

    /// Applies the effect to server state. Callers check `has_happened` first.
    fn replay(&self, mds: &mut MdsState) -> Result<(), MdsError>;
}

/// The closed set of event variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventBody {
    String(StringEvent),
    InodeUpdate(InodeUpdateEvent),
    DirUpdate(DirUpdateEvent),
    Unlink(UnlinkEvent),
    Alloc(AllocEvent),
}

macro_rules! dispatch {
    ($body:expr, $ev:ident => $call:expr) => {
        match $body {
            EventBody::String($ev) => $call,
            EventBody::InodeUpdate($ev) => $call,
            EventBody::DirUpdate($ev) => $call,
            EventBody::Unlink($ev) => $call,
            EventBody::Alloc($ev) => $call,
        }
    };
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::String(_) => StringEvent::KIND,
            EventBody::InodeUpdate(_) => InodeUpdateEvent::KIND,
            EventBody::DirUpdate(_) => DirUpdateEvent::KIND,
            EventBody::Unlink(_) => UnlinkEvent::KIND,
            EventBody::Alloc(_) => AllocEvent::KIND,
        }
    }

    pub fn encode_payload(&self, buf: &mut Vec<u8>) {
        dispatch!(self, ev => ev.encode_payload(buf))
    }

    fn decode_payload(kind: EventKind, cursor: &mut Reader<'_>) -> io::Result<Self> {
        Ok(match kind {
            EventKind::String => EventBody::String(StringEvent::decode_payload(cursor)?),
            EventKind::InodeUpdate => {
                EventBody::InodeUpdate(InodeUpdateEvent::decode_payload(cursor)?)
            }
            EventKind::DirUpdate => EventBody::DirUpdate(DirUpdateEvent::decode_payload(cursor)?),
            EventKind::Unlink => EventBody::Unlink(UnlinkEvent::decode_payload(cursor)?),
            EventKind::Alloc => EventBody::Alloc(AllocEvent::decode_payload(cursor)?),
        })
    }

    pub fn can_expire(&self, mds: &MdsState) -> bool {
        dispatch!(self, ev => ev.can_expire(mds))
    }

    pub fn retire(&self, mds: &mut MdsState, done: Completion) {
        dispatch!(self, ev => ev.retire(mds, done))
    }

    pub fn has_happened(&self, mds: &MdsState) -> bool {
        dispatch!(self, ev => ev.has_happened(mds))
    }

    pub fn replay(&self, mds: &mut MdsState) -> Result<(), MdsError> {
        dispatch!(self, ev => ev.replay(mds))
    }
}

impl fmt::Display for EventBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, ev => fmt::Display::fmt(ev, f))
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for EventBody {
                fn from(ev: $ty) -> Self {
                    EventBody::$variant(ev)
                }
            }

            impl From<$ty> for LogEvent {
                fn from(ev: $ty) -> Self {
                    LogEvent::new(EventBody::$variant(ev))
                }
            }
        )*
    };
}

impl_from_variant!(
    String(StringEvent),
    InodeUpdate(InodeUpdateEvent),
    DirUpdate(DirUpdateEvent),
    Unlink(UnlinkEvent),
    Alloc(AllocEvent),
);

/// One journal record: a variant plus the log position it ends at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    body: EventBody,
    end_offset: Option<u64>,
}

impl LogEvent {
    pub fn new(body: EventBody) -> Self {
        Self {
            body,
            end_offset: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }

    pub fn body(&self) -> &EventBody {
        &self.body
    }

    pub fn into_body(self) -> EventBody {
        self.body
    }

    /// Offset just past this event's bytes, once the journal manager has
    /// appended (or recovered) it.
    pub fn end_offset(&self) -> Option<u64> {
        self.end_offset
    }

    /// Written once, by the journal manager only.
    pub(crate) fn set_end_offset(&mut self, end: u64) {
        debug_assert!(
            self.end_offset.is_none(),
            "end offset of {} already set to {:?}",
            self.kind(),
            self.end_offset
        );
        self.end_offset = Some(end);
    }

    /// Appends tag and payload.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        codec::put_u32(buf, self.kind().tag());
        self.body.encode_payload(buf);
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }

    /// Decodes the single event at the start of `buf`.
    pub fn decode(buf: &[u8]) -> JournalResult<Self> {
        let mut cursor = Cursor::new(buf);
        Self::decode_from(&mut cursor)
    }

    /// Decodes one event at the cursor and advances past it.
    ///
    /// Error offsets are cursor positions of the event's first byte.
    pub fn decode_from(cursor: &mut Reader<'_>) -> JournalResult<Self> {
        let start = cursor.position();
        let remaining = codec::remaining(cursor);
        if remaining < TAG_SIZE {
            return Err(JournalError::TruncatedHeader {
                offset: start,
                remaining,
            });
        }
        let tag = codec::get_u32(cursor)?;
        let kind = EventKind::from_tag(tag).ok_or(JournalError::UnknownEventType {
            tag,
            offset: start,
        })?;

        let body = EventBody::decode_payload(kind, cursor).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => JournalError::Truncated {
                kind,
                offset: start,
            },
            _ => JournalError::Corrupt {
                kind,
                offset: start,
                reason: e.to_string(),
            },
        })?;

        Ok(Self::new(body))
    }

    pub fn can_expire(&self, mds: &MdsState) -> bool {
        self.body.can_expire(mds)
    }

    pub fn retire(&self, mds: &mut MdsState, done: Completion) {
        self.body.retire(mds, done)
    }

    pub fn has_happened(&self, mds: &MdsState) -> bool {
        self.body.has_happened(mds)
    }

    pub fn replay(&self, mds: &mut MdsState) -> JournalResult<()> {
        debug_assert!(
            !self.has_happened(mds),
            "replay of {} that has already happened",
            self
        );
        self.body.replay(mds).map_err(|source| JournalError::Replay {
            kind: self.kind(),
            offset: self.end_offset,
            source,
        })
    }

    /// Writes the diagnostic line for this event.
    pub fn print<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event({}) {}", self.kind(), self.body)?;
        if let Some(end) = self.end_offset {
            write!(f, " @{}", end)?;
        }
        Ok(())
    }
}
