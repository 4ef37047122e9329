// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! File-backed journal sink.
//!
//! # File Format
//! ```text
//! [Header: 24 bytes][Event][Event][Event]...
//! ```
//!
//! Header:
//! - magic: `b"MDSJ"`
//! - version: u32 (1)
//! - expire_pos: u64
//! - crc64 of the 16 bytes above
//!
//! Journal offset `o` lives at file position `HEADER_SIZE + o`. Trimming only
//! moves `expire_pos`; expired bytes stay on disk until the file is rewritten.

use byteorder::{LittleEndian, ReadBytesExt};
use crc64fast::Digest;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use mds_journal::{JournalError, JournalResult, LogSink};

use crate::errors::{NodeError, NodeResult};
use crate::telemetry::EVENTS_APPENDED;

pub const MAGIC: &[u8; 4] = b"MDSJ";
pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: u64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct JournalHeader {
    version: u32,
    expire_pos: u64,
}

impl JournalHeader {
    fn to_bytes(self) -> [u8; HEADER_SIZE as usize] {
        let mut bytes = [0u8; HEADER_SIZE as usize];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.expire_pos.to_le_bytes());
        let crc = header_crc(&bytes[0..16]);
        bytes[16..24].copy_from_slice(&crc.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; HEADER_SIZE as usize]) -> NodeResult<Self> {
        if &bytes[0..4] != MAGIC {
            return Err(NodeError::InvalidHeader("bad magic".into()));
        }
        let mut cursor = Cursor::new(&bytes[4..]);
        let version = cursor.read_u32::<LittleEndian>()?;
        let expire_pos = cursor.read_u64::<LittleEndian>()?;
        let stored_crc = cursor.read_u64::<LittleEndian>()?;

        let crc = header_crc(&bytes[0..16]);
        if crc != stored_crc {
            return Err(NodeError::InvalidHeader(format!(
                "checksum mismatch: stored {:016x}, computed {:016x}",
                stored_crc, crc
            )));
        }
        if version != FORMAT_VERSION {
            return Err(NodeError::InvalidHeader(format!(
                "unsupported version {}",
                version
            )));
        }
        Ok(Self { version, expire_pos })
    }
}

fn header_crc(bytes: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(bytes);
    digest.sum64()
}

/// Journal stored in one local file. Every append is fsync'd before the
/// end offset is returned.
pub struct JournalFile {
    path: PathBuf,
    file: File,
    expire_pos: u64,
    write_pos: u64,
}

impl JournalFile {
    /// Creates an empty journal, replacing any file at `path`.
    pub fn create(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let mut journal = Self {
            path,
            file,
            expire_pos: 0,
            write_pos: 0,
        };
        journal.write_header()?;
        tracing::info!(path = ?journal.path, "created journal");
        Ok(journal)
    }

    /// Opens an existing journal and validates its header.
    pub fn open(path: impl AsRef<Path>) -> NodeResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let len = file.metadata()?.len();
        if len < HEADER_SIZE {
            return Err(NodeError::InvalidHeader(format!(
                "file is {} bytes, header needs {}",
                len, HEADER_SIZE
            )));
        }
        let mut header_bytes = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header_bytes)?;
        let header = JournalHeader::from_bytes(&header_bytes)?;

        let write_pos = len - HEADER_SIZE;
        if header.expire_pos > write_pos {
            return Err(NodeError::InvalidHeader(format!(
                "expire position {} past end of journal {}",
                header.expire_pos, write_pos
            )));
        }

        tracing::debug!(?path, expire_pos = header.expire_pos, write_pos, "opened journal");
        Ok(Self {
            path,
            file,
            expire_pos: header.expire_pos,
            write_pos,
        })
    }

    pub fn open_or_create(path: impl AsRef<Path>) -> NodeResult<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_header(&mut self) -> io::Result<()> {
        let header = JournalHeader {
            version: FORMAT_VERSION,
            expire_pos: self.expire_pos,
        };
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.sync_all()
    }
}

impl LogSink for JournalFile {
    fn append(&mut self, bytes: &[u8]) -> JournalResult<u64> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE + self.write_pos))?;
        self.file.write_all(bytes)?;
        self.file.sync_data()?;
        self.write_pos += bytes.len() as u64;

        metrics::increment_counter!(EVENTS_APPENDED);
        Ok(self.write_pos)
    }

    fn trim(&mut self, expire_to: u64) -> JournalResult<()> {
        if expire_to < self.expire_pos || expire_to > self.write_pos {
            return Err(JournalError::Sink(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "trim to {} outside live range {}..{}",
                    expire_to, self.expire_pos, self.write_pos
                ),
            )));
        }
        let previous = self.expire_pos;
        self.expire_pos = expire_to;
        if let Err(e) = self.write_header() {
            self.expire_pos = previous;
            return Err(e.into());
        }
        Ok(())
    }

    fn read_live(&mut self) -> JournalResult<(u64, Vec<u8>)> {
        let len = (self.write_pos - self.expire_pos) as usize;
        let mut bytes = vec![0u8; len];
        self.file.seek(SeekFrom::Start(HEADER_SIZE + self.expire_pos))?;
        self.file.read_exact(&mut bytes)?;
        Ok((self.expire_pos, bytes))
    }

    fn expire_pos(&self) -> u64 {
        self.expire_pos
    }

    fn write_pos(&self) -> u64 {
        self.write_pos
    }
}
