// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Free-form journal marker.

use core::fmt;
use std::io;

use super::{EventKind, EventPayload};
use crate::codec::{self, Reader};
use crate::mds::{MdsError, MdsState};

/// Annotation with no namespace effect (mount markers, operator notes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringEvent {
    pub message: String,
}

impl StringEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl EventPayload for StringEvent {
    const KIND: EventKind = EventKind::String;

    fn encode_payload(&self, buf: &mut Vec<u8>) {
        codec::put_str(buf, &self.message);
    }

    fn decode_payload(cursor: &mut Reader<'_>) -> io::Result<Self> {
        Ok(Self {
            message: codec::get_str(cursor)?,
        })
    }

    // Nothing to write back.
    fn can_expire(&self, _mds: &MdsState) -> bool {
        true
    }

    fn replay(&self, _mds: &mut MdsState) -> Result<(), MdsError> {
        tracing::info!(message = %self.message, "journal marker");
        Ok(())
    }
}

impl fmt::Display for StringEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.message)
    }
}
