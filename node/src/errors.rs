// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use mds_journal::JournalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid journal header: {0}")]
    InvalidHeader(String),

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

impl NodeError {
    /// True when the on-disk bytes are damaged, as opposed to the disk
    /// being unreachable.
    pub fn is_corruption(&self) -> bool {
        match self {
            NodeError::Journal(e) => e.is_corruption(),
            NodeError::InvalidHeader(_) => true,
            _ => false,
        }
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
